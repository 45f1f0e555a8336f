//! A workspace session.
//!
//! The session owns the index and notifier for one workspace root and hands
//! them to whoever needs them: the maintainer that writes, and the tree and
//! completion consumers that read. There is no process-wide instance.

use crate::error::Result;
use crate::event::FileEvent;
use crate::filter::WatchFilter;
use crate::maintainer::{GraphMaintainer, SharedIndex};
use crate::notifier::ChangeNotifier;
use crate::reader::ContentReader;
use crate::watch::watch;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tagtree_core::{EdgeKey, TagTreeConfig};
use tagtree_graph::{children, Node, TagIndex, TreeItem};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    config: TagTreeConfig,
    filter: WatchFilter,
    index: SharedIndex,
    notifier: ChangeNotifier,
}

impl Session {
    /// Opens a session rooted at `root`.
    pub fn open(root: &Path, config: TagTreeConfig) -> Result<Self> {
        config.validate()?;
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let filter = WatchFilter::new(&root, &config)?;

        Ok(Self {
            root,
            config,
            filter,
            index: Arc::new(RwLock::new(TagIndex::new())),
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TagTreeConfig {
        &self.config
    }

    pub fn filter(&self) -> &WatchFilter {
        &self.filter
    }

    pub fn index(&self) -> SharedIndex {
        self.index.clone()
    }

    pub fn notifier(&self) -> ChangeNotifier {
        self.notifier.clone()
    }

    /// Creates a maintainer writing to this session's index.
    pub fn maintainer<R: ContentReader>(&self, reader: R) -> GraphMaintainer<R> {
        GraphMaintainer::new(
            self.config.extractor(),
            self.filter.clone(),
            self.index.clone(),
            self.notifier.clone(),
            reader,
        )
    }

    /// Starts watching the root in the background.
    pub fn spawn_watcher(&self, tx: mpsc::Sender<FileEvent>) -> JoinHandle<()> {
        let filter = self.filter.clone();
        let debounce = Duration::from_millis(self.config.debounce_ms);

        tokio::spawn(async move {
            if let Err(e) = watch(filter, debounce, tx).await {
                error!("File watcher error: {}", e);
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Consumer queries
    // ─────────────────────────────────────────────────────────────────────

    /// Tree rows under `parent`, or the top level.
    pub async fn children(&self, parent: Option<&str>) -> Vec<TreeItem> {
        children(&*self.index.read().await, parent)
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.index.read().await.nodes()
    }

    pub async fn tags(&self) -> Vec<Node> {
        self.index.read().await.tags()
    }

    /// Completion candidates starting with `prefix`.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Vec<Node> {
        self.index.read().await.suggest(prefix, limit)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Manual edits
    // ─────────────────────────────────────────────────────────────────────

    /// Accepts a drag and drop of `dropped` onto `target`.
    ///
    /// The dropped names join the target's inbound set as manual edges,
    /// outside file attribution. Always notifies. Returns how many names
    /// were new to the inbound set.
    pub async fn accept_drop(&self, dropped: &[String], target: &str) -> usize {
        let merged = self.index.write().await.link_manual(dropped, target);
        debug!("Dropped {} names onto {:?}, {} new", dropped.len(), target, merged);
        self.notifier.fire();
        merged
    }

    /// Removes a manual edge. Notifies if the edge disappeared.
    pub async fn unlink(&self, edge: &EdgeKey) -> bool {
        let removed = self.index.write().await.unlink_manual(edge);
        if removed {
            self.notifier.fire();
        }
        removed
    }

    /// Stars or unstars a node. Notifies if the node exists.
    pub async fn set_starred(&self, name: &str, starred: bool) -> bool {
        let found = self.index.write().await.set_starred(name, starred);
        if found {
            self.notifier.fire();
        }
        found
    }

    /// Flips a node's star. Returns the new state, or None for an unknown
    /// node.
    pub async fn toggle_star(&self, name: &str) -> Option<bool> {
        let starred = {
            let mut index = self.index.write().await;
            let starred = !index.node(name)?.starred;
            index.set_starred(name, starred);
            starred
        };
        self.notifier.fire();
        Some(starred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FsReader;
    use std::fs;
    use tagtree_graph::Relation;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[tokio::test]
    async fn test_initial_scan_then_save_then_delete() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/foo.ts", "// #[alpha]\n// #[beta]\n");
        write(dir.path(), "README.md", "#[ignored]");

        let session = Session::open(dir.path(), TagTreeConfig::default()).unwrap();
        let mut maintainer = session.maintainer(FsReader);

        let report = maintainer.initial_scan().await;
        assert_eq!(report.files_tracked, 1);
        assert!(report.changed);
        assert!(report.failures.is_empty());

        let mut tags: Vec<String> = session.tags().await.into_iter().map(|n| n.name).collect();
        tags.sort();
        assert_eq!(tags, vec!["alpha", "beta"]);

        let foo = session.root().join("src/foo.ts");
        fs::write(&foo, "// #[alpha]\n").unwrap();
        maintainer.handle(FileEvent::Saved(foo.clone())).await;
        let tags: Vec<String> = session.tags().await.into_iter().map(|n| n.name).collect();
        assert_eq!(tags, vec!["alpha"]);

        fs::remove_file(&foo).unwrap();
        maintainer.handle(FileEvent::Deleted(foo)).await;
        assert!(session.tags().await.is_empty());
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent_and_drops_missing() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/a.ts", "#[one]");
        write(dir.path(), "src/b.ts", "#[two]");

        let session = Session::open(dir.path(), TagTreeConfig::default()).unwrap();
        let mut maintainer = session.maintainer(FsReader);
        maintainer.initial_scan().await;
        let generation = session.notifier().generation();

        let again = maintainer.rescan().await;
        assert!(!again.changed);
        assert_eq!(session.notifier().generation(), generation);

        fs::remove_file(session.root().join("src/b.ts")).unwrap();
        let after = maintainer.rescan().await;
        assert_eq!(after.files_dropped, 1);
        assert!(after.changed);
        assert!(session.index().read().await.node("two").is_none());
    }

    #[tokio::test]
    async fn test_renamed_directory_is_rediscovered() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/lib/a.ts", "#[alpha]");
        write(dir.path(), "src/lib/nested/b.ts", "#[beta]");
        write(dir.path(), "src/keep.ts", "#[alpha]");

        let session = Session::open(dir.path(), TagTreeConfig::default()).unwrap();
        let mut maintainer = session.maintainer(FsReader);
        maintainer.initial_scan().await;

        let from = session.root().join("src/lib");
        let to = session.root().join("src/lib2");
        fs::rename(&from, &to).unwrap();

        let outcome = maintainer
            .handle(FileEvent::Renamed {
                from,
                to: to.clone(),
            })
            .await;

        assert_eq!(outcome, crate::maintainer::Outcome::Changed);
        assert_eq!(
            maintainer.tracked_files(),
            vec![
                session.root().join("src/keep.ts"),
                to.join("a.ts"),
                to.join("nested/b.ts"),
            ]
        );

        let index = session.index();
        let index = index.read().await;
        let moved = to.join("a.ts").to_string_lossy().to_string();
        let declarers = index.declarers(&EdgeKey::new("a", "alpha")).unwrap();
        assert_eq!(declarers.iter().collect::<Vec<_>>(), vec![&moved]);
        assert!(index.has_edge(&EdgeKey::new("b", "beta")));
        assert_eq!(index.node("alpha").unwrap().inbound, vec!["a", "keep"]);
    }

    #[tokio::test]
    async fn test_children_and_suggest() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/foo.ts", "#[todo] #[today]");
        write(dir.path(), "src/bar.ts", "#[todo]");

        let session = Session::open(dir.path(), TagTreeConfig::default()).unwrap();
        session.maintainer(FsReader).initial_scan().await;

        let roots: Vec<String> = session
            .children(None)
            .await
            .into_iter()
            .map(|item| item.node.name)
            .collect();
        assert_eq!(roots, vec!["today", "todo", "bar", "foo"]);

        let under_todo = session.children(Some("todo")).await;
        assert!(under_todo.iter().all(|i| i.relation == Relation::Inbound));
        assert_eq!(under_todo.len(), 2);

        let names: Vec<String> = session
            .suggest("tod", 10)
            .await
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["today", "todo"]);
    }

    #[tokio::test]
    async fn test_accept_drop_notifies() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/foo.ts", "#[alpha]");
        write(dir.path(), "src/bar.ts", "#[beta]");

        let session = Session::open(dir.path(), TagTreeConfig::default()).unwrap();
        session.maintainer(FsReader).initial_scan().await;
        let mut rx = session.notifier().subscribe();

        let merged = session.accept_drop(&["bar".to_string()], "alpha").await;

        assert_eq!(merged, 1);
        assert!(rx.recv().await.is_ok());
        let alpha = session.index().read().await.node("alpha").unwrap();
        assert_eq!(alpha.inbound, vec!["bar", "foo"]);

        assert!(session.unlink(&EdgeKey::new("bar", "alpha")).await);
        assert!(session.set_starred("alpha", true).await);
        assert!(!session.set_starred("ghost", true).await);
        assert_eq!(session.toggle_star("alpha").await, Some(false));
        assert_eq!(session.toggle_star("ghost").await, None);
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let config = TagTreeConfig {
            extensions: Vec::new(),
            ..Default::default()
        };
        assert!(Session::open(dir.path(), config).is_err());
    }
}
