//! [`FeatureDir`] builder for config-root test scenarios.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary config root with helpers for writing feature files.
///
/// # Example
///
/// ```rust,no_run
/// use opts_test_utils::FeatureDir;
/// use serde_json::json;
///
/// let dir = FeatureDir::new();
/// dir.feature("base", json!({"options": {"msg": {"greeting": "hi"}}}));
/// dir.feature("child", json!({"imports": ["base"], "options": {"msg": {"name": "x"}}}));
/// dir.enable_configurable_strings();
/// ```
pub struct FeatureDir {
    temp_dir: TempDir,
}

impl Default for FeatureDir {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDir {
    /// Create an empty temporary config root.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the config root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write feature `name` as `<name>.json`. Returns the file path.
    pub fn feature(&self, name: &str, document: Value) -> PathBuf {
        self.write(
            &format!("{name}.json"),
            &serde_json::to_string_pretty(&document).unwrap(),
        )
    }

    /// Write a file with raw content, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `.opts/config.json` with the given builder settings.
    pub fn settings(&self, settings: Value) -> PathBuf {
        self.write(".opts/config.json", &settings.to_string())
    }

    /// Enable configurable strings for this root.
    pub fn enable_configurable_strings(&self) -> PathBuf {
        self.settings(serde_json::json!({"areConfigurableStringsEnabled": true}))
    }

    /// Delete a file inside the root.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }
}
