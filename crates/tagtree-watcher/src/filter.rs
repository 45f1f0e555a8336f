//! Which paths are worth tracking.

use crate::error::Result;
use ignore::overrides::{Override, OverrideBuilder};
use std::path::{Component, Path, PathBuf};
use tagtree_core::TagTreeConfig;

/// Directories that never hold anything worth indexing.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/target/**",
    "**/node_modules/**",
    "**/.tagtree/**",
];

/// Decides whether a path under the workspace root is tracked.
///
/// A tracked file has an allowed extension, sits below a directory named
/// like the configured source directory, and matches no exclusion glob.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    extensions: Vec<String>,
    source_dir: Option<String>,
    excludes: Override,
}

impl WatchFilter {
    pub fn new(root: &Path, config: &TagTreeConfig) -> Result<Self> {
        let mut builder = OverrideBuilder::new(root);
        for pattern in DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(config.exclude.iter().map(String::as_str))
        {
            // Override globs are whitelists unless negated.
            builder.add(&format!("!{}", pattern.trim_start_matches('!')))?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            extensions: config.extensions.clone(),
            source_dir: config.source_dir.clone(),
            excludes: builder.build()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn overrides(&self) -> &Override {
        &self.excludes
    }

    /// Returns true if `path` should be tracked.
    pub fn accepts(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.root) {
            Ok(relative) => relative,
            Err(_) => return false,
        };

        self.has_extension(relative) && self.in_source_dir(relative) && !self.excluded(relative)
    }

    /// Returns true if `path` lies in an excluded part of the tree.
    pub fn is_excluded(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(relative) => self.excluded(relative),
            Err(_) => true,
        }
    }

    fn excluded(&self, relative: &Path) -> bool {
        self.excludes.matched(relative, false).is_ignore()
    }

    fn has_extension(&self, relative: &Path) -> bool {
        relative
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    fn in_source_dir(&self, relative: &Path) -> bool {
        let source_dir = match &self.source_dir {
            Some(dir) => dir,
            None => return true,
        };

        relative
            .parent()
            .map(|parent| {
                parent.components().any(|c| match c {
                    Component::Normal(name) => name.to_str() == Some(source_dir.as_str()),
                    _ => false,
                })
            })
            .unwrap_or(false)
    }
}
