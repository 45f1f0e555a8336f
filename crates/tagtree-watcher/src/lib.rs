//! Tagtree Watcher - Incremental graph maintenance
//!
//! This crate keeps a [`TagIndex`](tagtree_graph::TagIndex) in step with
//! the files under a workspace root:
//!
//! - [`Session`] owns the index and the [`ChangeNotifier`] for one root.
//! - [`GraphMaintainer`] runs the initial scan and then applies one
//!   [`FileEvent`] at a time, diffing each file's declared edges against
//!   what it declared before.
//! - [`watch`] turns file-system notifications into [`FileEvent`]s.
//!
//! Reads go through [`ContentReader`] so contents can come from disk or
//! from memory.

mod error;
mod event;
mod filter;
mod maintainer;
mod notifier;
mod reader;
mod scan;
mod session;
mod watch;

pub use error::{Result, WatchError};
pub use event::FileEvent;
pub use filter::WatchFilter;
pub use maintainer::{GraphMaintainer, Outcome, ScanReport, SharedIndex};
pub use notifier::{ChangeNotifier, GraphChanged};
pub use reader::{ContentReader, FsReader, MemoryReader};
pub use scan::{enumerate_files, enumerate_under};
pub use session::Session;
pub use watch::watch;
