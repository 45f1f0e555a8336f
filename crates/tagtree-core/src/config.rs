//! Workspace configuration.
//!
//! Settings live in `.tagtree/config.json` under the workspace root, written
//! by `tagtree init`. Every field has a default so a partial file is fine.

use crate::error::{Result, TagTreeError};
use crate::extract::{Extractor, FileNaming, Grammar};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding per-workspace settings.
pub const CONFIG_DIR: &str = ".tagtree";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagTreeConfig {
    /// Annotation syntax to recognize.
    pub grammar: Grammar,

    /// How file nodes are named.
    pub file_naming: FileNaming,

    /// Extensions (without the dot) of files worth reading.
    pub extensions: Vec<String>,

    /// Files must sit somewhere below a directory with this name.
    /// `None` tracks the whole tree.
    pub source_dir: Option<String>,

    /// Glob patterns excluded from scanning and watching.
    pub exclude: Vec<String>,

    /// Debounce window for content change events.
    pub debounce_ms: u64,
}

impl Default for TagTreeConfig {
    fn default() -> Self {
        Self {
            grammar: Grammar::Tag,
            file_naming: FileNaming::Stem,
            extensions: ["ts", "tsx", "js", "jsx", "md", "txt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source_dir: Some("src".to_string()),
            exclude: vec!["**/node_modules/**".to_string()],
            debounce_ms: 150,
        }
    }
}

impl TagTreeConfig {
    /// Path of the workspace settings file for `root`.
    pub fn workspace_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Reads settings from `path`. A missing file is `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TagTreeError::read_failure(path, e)),
        };

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TagTreeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(Some(config))
    }

    /// Loads the settings for a workspace.
    ///
    /// The workspace file wins, then `fallback` (usually the per-user file),
    /// then the defaults.
    pub fn load(root: &Path, fallback: Option<&Path>) -> Result<Self> {
        if let Some(config) = Self::from_file(&Self::workspace_path(root))? {
            return Ok(config);
        }

        if let Some(path) = fallback {
            if let Some(config) = Self::from_file(path)? {
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    /// Writes these settings as the workspace file for `root`.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let path = Self::workspace_path(root);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(TagTreeError::Config(
                "at least one extension must be watched".to_string(),
            ));
        }

        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(TagTreeError::Config(format!(
                "extension {:?} must not include the leading dot",
                ext
            )));
        }

        Ok(())
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(self.grammar, self.file_naming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = TagTreeConfig::load(dir.path(), None).unwrap();
        assert_eq!(config, TagTreeConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = TagTreeConfig::workspace_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "grammar": "arrow", "source_dir": null }"#).unwrap();

        let config = TagTreeConfig::load(dir.path(), None).unwrap();

        assert_eq!(config.grammar, Grammar::Arrow);
        assert_eq!(config.source_dir, None);
        assert_eq!(config.debounce_ms, 150);
        assert!(config.extensions.contains(&"ts".to_string()));
    }

    #[test]
    fn test_workspace_file_wins_over_fallback() {
        let dir = tempdir().unwrap();
        let fallback = dir.path().join("user.json");
        fs::write(&fallback, r#"{ "file_naming": "path" }"#).unwrap();

        let config = TagTreeConfig::load(dir.path(), Some(&fallback)).unwrap();
        assert_eq!(config.file_naming, FileNaming::Path);

        TagTreeConfig::default().write(dir.path()).unwrap();
        let config = TagTreeConfig::load(dir.path(), Some(&fallback)).unwrap();
        assert_eq!(config.file_naming, FileNaming::Stem);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = TagTreeConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, TagTreeError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let config = TagTreeConfig {
            extensions: vec![".ts".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
