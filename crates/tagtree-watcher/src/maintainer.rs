//! Incremental graph maintenance.
//!
//! The maintainer keeps, per tracked file, the set of edges that file last
//! declared. When the file changes it re-extracts, diffs the new set
//! against the cached one, and applies only the difference to the index.
//! Nothing is ever rebuilt from scratch after the initial scan.
//!
//! Each event runs to completion (read, extract, diff, add, remove, maybe
//! notify) before the next one starts, and the index write lock is held
//! for the whole apply step, so readers never see a half-updated file.

use crate::event::FileEvent;
use crate::filter::WatchFilter;
use crate::notifier::ChangeNotifier;
use crate::reader::ContentReader;
use crate::scan::{enumerate_files, enumerate_under};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tagtree_core::{EdgeKey, Extraction, Extractor, SourceFile, TagTreeError};
use tagtree_graph::TagIndex;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

/// The index shared between the maintainer and everything that reads it.
pub type SharedIndex = Arc<RwLock<TagIndex>>;

/// How many files the initial scan reads at once.
const DEFAULT_READ_CONCURRENCY: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The path is not tracked and was not taken on.
    Ignored,
    /// The file was processed but the graph did not change.
    Unchanged,
    /// The graph changed and observers were notified.
    Changed,
    /// The file could not be read; the last known state was kept.
    Failed,
}

/// Summary of a full scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Files accepted by the filter and read successfully.
    pub files_tracked: usize,
    /// Files that were tracked before but no longer exist.
    pub files_dropped: usize,
    /// Edges in the index after the scan.
    pub edges: usize,
    /// Nodes in the index after the scan.
    pub nodes: usize,
    /// Files that could not be read, with the reason.
    pub failures: Vec<(String, String)>,
    /// Whether observers were notified.
    pub changed: bool,
    pub duration_ms: u64,
}

/// What the maintainer remembers about one file.
#[derive(Debug, Clone)]
struct FileRecord {
    source: SourceFile,
    edges: BTreeSet<EdgeKey>,
}

// ─────────────────────────────────────────────────────────────────────────────
// GraphMaintainer
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps a [`TagIndex`] in step with the files under a root.
pub struct GraphMaintainer<R> {
    extractor: Extractor,
    filter: WatchFilter,
    index: SharedIndex,
    notifier: ChangeNotifier,
    reader: R,
    /// Per-file cache of declared edges, keyed by attribution key.
    files: HashMap<String, FileRecord>,
    read_concurrency: usize,
}

impl<R: ContentReader> GraphMaintainer<R> {
    pub fn new(
        extractor: Extractor,
        filter: WatchFilter,
        index: SharedIndex,
        notifier: ChangeNotifier,
        reader: R,
    ) -> Self {
        Self {
            extractor,
            filter,
            index,
            notifier,
            reader,
            files: HashMap::new(),
            read_concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    /// Sets how many files a scan reads concurrently.
    pub fn with_read_concurrency(mut self, n: usize) -> Self {
        self.read_concurrency = n.max(1);
        self
    }

    pub fn index(&self) -> SharedIndex {
        self.index.clone()
    }

    /// Paths of every tracked file, sorted.
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .values()
            .map(|record| record.source.location.clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.files.contains_key(&*path.to_string_lossy())
    }

    /// Edges `path` declared when it was last read.
    pub fn declared_by(&self, path: &Path) -> Option<&BTreeSet<EdgeKey>> {
        self.files
            .get(&*path.to_string_lossy())
            .map(|record| &record.edges)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────────────

    /// Discovers every trackable file under the root.
    ///
    /// Reads run concurrently; each file's edges are applied one file at a
    /// time as its read completes. Observers are notified once at the end
    /// if anything changed.
    pub async fn initial_scan(&mut self) -> ScanReport {
        self.scan(false).await
    }

    /// Re-scans the whole root, also dropping tracked files that vanished
    /// without an event. Recovers from missed events.
    pub async fn rescan(&mut self) -> ScanReport {
        self.scan(true).await
    }

    async fn scan(&mut self, drop_missing: bool) -> ScanReport {
        let start = Instant::now();
        let filter = self.filter.clone();
        let paths = match tokio::task::spawn_blocking(move || enumerate_files(&filter)).await {
            Ok(paths) => Ok(paths),
            Err(e) => {
                error!("File enumeration failed: {}", e);
                Err(e.to_string())
            }
        };
        self.scan_paths(paths, drop_missing, start).await
    }

    /// Applies an enumeration result. A failed enumeration tells nothing
    /// about which files still exist, so it never drops tracked files.
    async fn scan_paths(
        &mut self,
        paths: std::result::Result<Vec<PathBuf>, String>,
        drop_missing: bool,
        start: Instant,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        let paths = match paths {
            Ok(paths) => paths,
            Err(reason) => {
                warn!("Keeping {} tracked files after failed enumeration", self.files.len());
                report
                    .failures
                    .push((self.filter.root().display().to_string(), reason));
                report.duration_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        info!(
            "Scanning {} files under {}",
            paths.len(),
            self.filter.root().display()
        );

        let mut changed = false;

        if drop_missing {
            let present: HashSet<String> = paths
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect();
            let missing: Vec<String> = self
                .files
                .keys()
                .filter(|key| !present.contains(*key))
                .cloned()
                .collect();
            report.files_dropped = missing.len();
            changed |= self.forget_keys(&missing).await;
        }

        let extractor = self.extractor;
        let reader = &self.reader;
        let mut reads = stream::iter(paths)
            .map(move |path| async move {
                let result = reader.read(&path).await;
                (path, result)
            })
            .buffer_unordered(self.read_concurrency);

        while let Some((path, result)) = reads.next().await {
            match result {
                Ok(text) => {
                    let extraction = extractor.extract(&path, &text);
                    changed |= apply(&mut self.files, &self.index, extraction).await;
                    report.files_tracked += 1;
                }
                Err(e) => {
                    let err = TagTreeError::read_failure(&path, e);
                    warn!("Skipping during scan: {}", err);
                    report
                        .failures
                        .push((path.display().to_string(), err.to_string()));
                }
            }
        }
        drop(reads);

        if changed {
            self.notifier.fire();
        }

        {
            let index = self.index.read().await;
            report.nodes = index.node_count();
            report.edges = index.edge_count();
        }
        report.changed = changed;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scan complete: {} files, {} nodes, {} edges in {}ms",
            report.files_tracked, report.nodes, report.edges, report.duration_ms
        );
        report
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Applies one file event to the index.
    pub async fn handle(&mut self, event: FileEvent) -> Outcome {
        let outcome = match event {
            FileEvent::Saved(path) | FileEvent::Created(path) => self.update(&path).await,
            FileEvent::Deleted(path) => {
                if self.forget(&path).await {
                    Outcome::Changed
                } else {
                    Outcome::Ignored
                }
            }
            FileEvent::Renamed { from, to } => {
                let removed = self.forget(&from).await;
                let added = self.update_moved(&to).await;
                match (removed, added) {
                    (true, _) | (_, Outcome::Changed) => Outcome::Changed,
                    (false, other) => other,
                }
            }
        };

        if outcome == Outcome::Changed {
            self.notifier.fire();
        }
        outcome
    }

    /// Handles events until the channel closes.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<FileEvent>) {
        info!("Graph maintainer started");

        while let Some(event) = rx.recv().await {
            let start = Instant::now();
            let label = event.label();
            let path = event.path().display().to_string();

            let outcome = self.handle(event).await;

            debug!(
                "{} {} -> {:?} in {:?}",
                label,
                path,
                outcome,
                start.elapsed()
            );
        }

        info!("Event source closed, graph maintainer stopping");
    }

    /// Re-reads `path` and applies the difference. Does not notify.
    async fn update(&mut self, path: &Path) -> Outcome {
        if !self.filter.accepts(path) {
            return Outcome::Ignored;
        }

        let text = match self.reader.read(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Keeping previous state: {}", TagTreeError::read_failure(path, e));
                return Outcome::Failed;
            }
        };

        let extraction = self.extractor.extract(path, &text);
        if apply(&mut self.files, &self.index, extraction).await {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }

    /// Rename target: a file, or a directory whose files are all new.
    async fn update_moved(&mut self, to: &Path) -> Outcome {
        let is_dir = tokio::fs::metadata(to)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return self.update(to).await;
        }

        let filter = self.filter.clone();
        let dir = to.to_path_buf();
        let paths = tokio::task::spawn_blocking(move || enumerate_under(&filter, &dir))
            .await
            .unwrap_or_default();

        let mut outcome = Outcome::Ignored;
        for path in paths {
            match self.update(&path).await {
                Outcome::Changed => outcome = Outcome::Changed,
                Outcome::Unchanged if outcome == Outcome::Ignored => outcome = Outcome::Unchanged,
                _ => {}
            }
        }
        outcome
    }

    /// Drops `path`, or every tracked file below it if it was a directory,
    /// withdrawing all their declarations. Returns true if anything was
    /// tracked there. Does not notify.
    async fn forget(&mut self, path: &Path) -> bool {
        let key = path.to_string_lossy().to_string();
        let keys: Vec<String> = if self.files.contains_key(&key) {
            vec![key]
        } else {
            self.files
                .iter()
                .filter(|(_, record)| record.source.location.starts_with(path))
                .map(|(key, _)| key.clone())
                .collect()
        };

        if keys.is_empty() {
            debug!("Ignoring removal of untracked path {}", path.display());
            return false;
        }

        self.forget_keys(&keys).await;
        true
    }

    /// Returns true if any record was dropped.
    async fn forget_keys(&mut self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return false;
        }

        let mut index = self.index.write().await;
        let mut dropped = false;
        for key in keys {
            if let Some(record) = self.files.remove(key) {
                for edge in &record.edges {
                    index.remove_edge(edge, &record.source.key);
                }

                let source = &record.source;
                let successor = self
                    .files
                    .values()
                    .find(|other| other.source.node_name == source.node_name)
                    .map(|other| other.source.kind());
                index.release_file(&source.node_name, &source.location, successor);

                debug!(
                    "Dropped {} ({} edges)",
                    record.source.location.display(),
                    record.edges.len()
                );
                dropped = true;
            }
        }
        dropped
    }
}

/// Diffs `extraction` against the cached edges of its file and applies the
/// difference: additions first, then removals. Returns true if the graph
/// visibly changed.
async fn apply(
    files: &mut HashMap<String, FileRecord>,
    index: &SharedIndex,
    extraction: Extraction,
) -> bool {
    let Extraction { file, edges } = extraction;

    let (to_add, to_remove): (Vec<EdgeKey>, Vec<EdgeKey>) = match files.get(&file.key) {
        Some(previous) => (
            edges.difference(&previous.edges).cloned().collect(),
            previous.edges.difference(&edges).cloned().collect(),
        ),
        None => (edges.iter().cloned().collect(), Vec::new()),
    };

    let mut changed = !to_add.is_empty();
    if changed || !to_remove.is_empty() {
        let mut index = index.write().await;
        for edge in &to_add {
            index.add_edge(edge, &file);
        }
        for edge in &to_remove {
            changed |= index.remove_edge(edge, &file.key);
        }
    }

    debug!(
        "{}: +{} -{} edges",
        file.location.display(),
        to_add.len(),
        to_remove.len()
    );

    files.insert(
        file.key.clone(),
        FileRecord {
            source: file,
            edges,
        },
    );
    changed
}
