//! Tree configuration: which directory entries are skipped while building,
//! and how backgrounds behave across a reload.
//!
//! Stored as JSON, every field optional:
//!
//! ```json
//! { "ignored_suffixes": [".png", ".py"], "keep_backgrounds_on_reload": false }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// File extensions (with leading dot) never added to the tree.
    /// Compared case-insensitively.
    pub ignored_suffixes: Vec<String>,
    /// Name prefixes never added to the tree (hidden files, `_private`).
    pub ignored_prefixes: Vec<String>,
    /// Keep a shape-compatible external background on a leaf whose data is
    /// replaced by a reload. When false every repopulated leaf starts without
    /// an external background.
    pub keep_backgrounds_on_reload: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            ignored_suffixes: [".png", ".jpg", ".ico", ".svg", ".pdf", ".ipynb", ".py", ".pyc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_prefixes: vec!["_".to_string(), ".".to_string()],
            keep_backgrounds_on_reload: true,
        }
    }
}

impl TreeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::debug!("Loaded tree configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Whether a directory entry should be left out of the tree.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.ignored_prefixes.iter().any(|p| !p.is_empty() && name.starts_with(p.as_str())) {
            return true;
        }
        let ext = match path.extension() {
            Some(e) => format!(".{}", e.to_string_lossy().to_lowercase()),
            None => return false,
        };
        self.ignored_suffixes
            .iter()
            .any(|s| s.to_lowercase() == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let config = TreeConfig::default();
        assert!(config.is_ignored(Path::new("/data/plot.png")));
        assert!(config.is_ignored(Path::new("/data/PLOT.PNG")));
        assert!(config.is_ignored(Path::new("/data/.hidden")));
        assert!(config.is_ignored(Path::new("/data/_scratch.txt")));
        assert!(!config.is_ignored(Path::new("/data/spectrum.txt")));
        assert!(!config.is_ignored(Path::new("/data/noext")));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TreeConfig::from_json_str(r#"{"keep_backgrounds_on_reload": false}"#).unwrap();
        assert!(!config.keep_backgrounds_on_reload);
        assert_eq!(config.ignored_prefixes, vec!["_", "."]);
        assert_eq!(config.ignored_suffixes.len(), 8);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = TreeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, r#"{"ignored_suffixes": [".raw8"], "ignored_prefixes": []}"#).unwrap();
        let config = TreeConfig::load(&path).unwrap();
        assert!(config.is_ignored(Path::new("a.RAW8")));
        assert!(!config.is_ignored(Path::new("a.png")));
        assert!(!config.is_ignored(Path::new(".hidden")));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TreeConfig::default();
        let parsed = TreeConfig::from_json_str(&config.to_json()).unwrap();
        assert_eq!(parsed, config);
    }
}
