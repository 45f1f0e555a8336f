//! Where file contents come from.
//!
//! The maintainer never opens files itself; it asks a [`ContentReader`].
//! On disk that is [`FsReader`]. An editor holding unsaved buffers, or a
//! test, can serve contents from memory instead.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[async_trait]
pub trait ContentReader: Send + Sync {
    /// Reads the full contents of `path`.
    async fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads files from disk. Invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

#[async_trait]
impl ContentReader for FsReader {
    async fn read(&self, path: &Path) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Serves contents from memory.
#[derive(Debug, Default)]
pub struct MemoryReader {
    files: RwLock<HashMap<PathBuf, String>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }
}

#[async_trait]
impl ContentReader for MemoryReader {
    async fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} is not loaded", path.display()),
                )
            })
    }
}

#[async_trait]
impl<R: ContentReader + ?Sized> ContentReader for std::sync::Arc<R> {
    async fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_reader_lossy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"#[ok] \xff").unwrap();

        let text = FsReader.read(&path).await.unwrap();
        assert!(text.starts_with("#[ok]"));

        let missing = FsReader.read(&dir.path().join("missing.txt")).await;
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_reader() {
        let reader = MemoryReader::new();
        reader.insert("/ws/src/a.ts", "#[x]");

        assert_eq!(reader.read(Path::new("/ws/src/a.ts")).await.unwrap(), "#[x]");

        reader.remove(Path::new("/ws/src/a.ts"));
        assert!(reader.read(Path::new("/ws/src/a.ts")).await.is_err());
    }
}
