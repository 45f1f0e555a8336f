//! File watcher with debouncing.
//!
//! Translates raw `notify` events into [`FileEvent`]s. Content changes are
//! debounced per path so an editor's burst of writes becomes one save;
//! removals and renames go out immediately, after dropping any pending
//! change for the same path so per-path order is preserved.

use crate::error::Result;
use crate::event::FileEvent;
use crate::filter::WatchFilter;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How often pending changes are checked when no events arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// A raw change before debouncing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawChange {
    /// Contents may have changed. `created` if the path is new.
    Touched { path: PathBuf, created: bool },
    Removed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

fn classify(event: Event) -> Vec<RawChange> {
    let touched = |paths: Vec<PathBuf>, created: bool| -> Vec<RawChange> {
        paths
            .into_iter()
            .map(|path| RawChange::Touched { path, created })
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => touched(event.paths, true),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut paths = event.paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![RawChange::Renamed { from, to }],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.into_iter().map(RawChange::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => touched(event.paths, true),
        EventKind::Modify(_) => touched(event.paths, false),
        EventKind::Remove(_) => event.paths.into_iter().map(RawChange::Removed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Debouncing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Pending {
    last_seen: Instant,
    created: bool,
}

/// Per-path debounce state.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Pending>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    fn touch(&mut self, path: PathBuf, created: bool, now: Instant) {
        let entry = self.pending.entry(path).or_insert(Pending {
            last_seen: now,
            created,
        });
        entry.last_seen = now;
        entry.created |= created;
    }

    fn cancel(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Takes every path quiet for at least the window. Sorted by path.
    fn take_ready(&mut self, now: Instant) -> Vec<(PathBuf, bool)> {
        let mut ready: Vec<(PathBuf, bool)> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_seen) >= self.window)
            .map(|(path, p)| (path.clone(), p.created))
            .collect();
        ready.sort();

        for (path, _) in &ready {
            self.pending.remove(path);
        }
        ready
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Watches the filter's root and sends [`FileEvent`]s to `tx` until `tx`'s
/// receiver is dropped.
pub async fn watch(
    filter: WatchFilter,
    debounce: Duration,
    tx: mpsc::Sender<FileEvent>,
) -> Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::channel::<notify::Result<Event>>(256);

    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = notify_tx.blocking_send(res);
        },
        Config::default(),
    )?;

    watcher.watch(filter.root(), RecursiveMode::Recursive)?;
    info!("File watcher started for {}", filter.root().display());

    let mut debouncer = Debouncer::new(debounce);

    loop {
        for (path, created) in debouncer.take_ready(Instant::now()) {
            if !filter.accepts(&path) {
                continue;
            }
            let event = if !path.exists() {
                FileEvent::Deleted(path)
            } else if created {
                FileEvent::Created(path)
            } else {
                FileEvent::Saved(path)
            };
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }

        let event = match tokio::time::timeout(POLL_INTERVAL, notify_rx.recv()).await {
            Ok(Some(Ok(event))) => event,
            Ok(Some(Err(e))) => {
                warn!("Watch error: {}", e);
                continue;
            }
            Ok(None) => break,
            Err(_) => continue,
        };

        for change in classify(event) {
            let outgoing = match change {
                RawChange::Touched { path, created } => {
                    if filter.accepts(&path) {
                        debouncer.touch(path, created, Instant::now());
                    }
                    None
                }
                RawChange::Removed(path) => {
                    debouncer.cancel(&path);
                    (!filter.is_excluded(&path)).then_some(FileEvent::Deleted(path))
                }
                RawChange::Renamed { from, to } => {
                    debouncer.cancel(&from);
                    debouncer.cancel(&to);
                    if filter.is_excluded(&from) && filter.is_excluded(&to) {
                        None
                    } else {
                        Some(FileEvent::Renamed { from, to })
                    }
                }
            };

            if let Some(event) = outgoing {
                debug!("Forwarding {} {}", event.label(), event.path().display());
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(
            classify(event(EventKind::Create(CreateKind::File), &["/ws/src/a.ts"])),
            vec![RawChange::Touched {
                path: "/ws/src/a.ts".into(),
                created: true
            }]
        );
        assert_eq!(
            classify(event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/ws/src/a.ts"]
            )),
            vec![RawChange::Touched {
                path: "/ws/src/a.ts".into(),
                created: false
            }]
        );
        assert_eq!(
            classify(event(EventKind::Remove(RemoveKind::File), &["/ws/src/a.ts"])),
            vec![RawChange::Removed("/ws/src/a.ts".into())]
        );
        assert!(classify(event(EventKind::Any, &["/ws/src/a.ts"])).is_empty());
    }

    #[test]
    fn test_classify_rename() {
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/ws/src/old.ts", "/ws/src/new.ts"],
        );
        assert_eq!(
            classify(both),
            vec![RawChange::Renamed {
                from: "/ws/src/old.ts".into(),
                to: "/ws/src/new.ts".into()
            }]
        );

        let from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/ws/src/old.ts"],
        );
        assert_eq!(
            classify(from),
            vec![RawChange::Removed("/ws/src/old.ts".into())]
        );
    }

    #[test]
    fn test_debouncer_coalesces_bursts() {
        let window = Duration::from_millis(100);
        let mut debouncer = Debouncer::new(window);
        let t0 = Instant::now();
        let path = PathBuf::from("/ws/src/a.ts");

        debouncer.touch(path.clone(), true, t0);
        debouncer.touch(path.clone(), false, t0 + Duration::from_millis(60));

        assert!(debouncer.take_ready(t0 + Duration::from_millis(100)).is_empty());

        let ready = debouncer.take_ready(t0 + Duration::from_millis(160));
        assert_eq!(ready, vec![(path.clone(), true)]);
        assert!(debouncer.take_ready(t0 + Duration::from_millis(500)).is_empty());
    }

    #[test]
    fn test_debouncer_cancel() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let path = PathBuf::from("/ws/src/a.ts");
        let now = Instant::now();

        debouncer.touch(path.clone(), false, now);
        debouncer.cancel(&path);

        assert!(debouncer.take_ready(now).is_empty());
    }
}
