//! File events consumed by the maintainer.

use std::path::{Path, PathBuf};

/// A change to one path, as reported by whatever watches the file system.
///
/// Events for the same path must arrive in order; events for unrelated
/// paths may interleave freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Contents changed.
    Saved(PathBuf),
    /// A new file appeared.
    Created(PathBuf),
    /// The path (a file or a whole directory) is gone.
    Deleted(PathBuf),
    /// The path moved.
    Renamed { from: PathBuf, to: PathBuf },
}

impl FileEvent {
    /// The path an editor would associate with this event.
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Saved(path) | FileEvent::Created(path) | FileEvent::Deleted(path) => path,
            FileEvent::Renamed { to, .. } => to,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileEvent::Saved(_) => "saved",
            FileEvent::Created(_) => "created",
            FileEvent::Deleted(_) => "deleted",
            FileEvent::Renamed { .. } => "renamed",
        }
    }
}
