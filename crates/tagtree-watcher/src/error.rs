//! Errors raised while setting up scanning and watching.
//!
//! Per-file problems during maintenance are not errors: they are logged and
//! the last known state is kept.

use tagtree_core::TagTreeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] ignore::Error),

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Core(#[from] TagTreeError),
}

pub type Result<T> = std::result::Result<T, WatchError>;
