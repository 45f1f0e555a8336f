//! Full enumeration of trackable files.

use crate::filter::WatchFilter;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lists every file under the filter's root that the filter accepts.
///
/// Honors `.gitignore` files and the filter's exclusion globs. The result
/// is sorted.
pub fn enumerate_files(filter: &WatchFilter) -> Vec<PathBuf> {
    enumerate_under(filter, filter.root())
}

/// Like [`enumerate_files`], restricted to the subtree at `dir`.
pub fn enumerate_under(filter: &WatchFilter, dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .ignore(true)
        .overrides(filter.overrides().clone())
        .build();

    let mut paths = Vec::new();
    let mut seen = 0usize;

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Walker error: {}", e);
                continue;
            }
        };

        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        seen += 1;

        if filter.accepts(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    debug!(
        "Enumerated {} of {} files under {}",
        paths.len(),
        seen,
        dir.display()
    );
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tagtree_core::TagTreeConfig;
    use tempfile::tempdir;

    #[test]
    fn test_enumerate_applies_filter() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "src/a.ts",
            "src/nested/b.md",
            "src/skip.rs",
            "docs/c.ts",
            "node_modules/pkg/src/d.ts",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "#[x]").unwrap();
        }

        let filter = WatchFilter::new(root, &TagTreeConfig::default()).unwrap();
        let files = enumerate_files(&filter);

        assert_eq!(
            files,
            vec![root.join("src/a.ts"), root.join("src/nested/b.md")]
        );

        let nested = enumerate_under(&filter, &root.join("src/nested"));
        assert_eq!(nested, vec![root.join("src/nested/b.md")]);
    }
}
