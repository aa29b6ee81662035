//! Configuration for package operations

use serde::{Deserialize, Serialize};

/// Name of the manifest file at the root of every package
pub const DEFAULT_MANIFEST_FILENAME: &str = "manifest_v1.yaml";

/// Configuration for reading, applying and writing packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Manifest location relative to the package root
    pub manifest_filename: String,
    /// Stop the apply loop at the first task that fails with an error
    ///
    /// Off by default: every task is attempted and every failure is reported.
    pub halt_on_apply_error: bool,
    /// Keep the previous contents of overwritten files so the run can be rolled back
    pub backup_overwritten: bool,
}

impl PackageConfig {
    /// Parse a configuration document; missing keys take their defaults
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn with_manifest_filename(mut self, filename: impl Into<String>) -> Self {
        self.manifest_filename = filename.into();
        self
    }

    pub fn with_halt_on_apply_error(mut self, halt: bool) -> Self {
        self.halt_on_apply_error = halt;
        self
    }

    pub fn with_backups(mut self, backup: bool) -> Self {
        self.backup_overwritten = backup;
        self
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            manifest_filename: DEFAULT_MANIFEST_FILENAME.to_string(),
            halt_on_apply_error: false,
            backup_overwritten: true,
        }
    }
}
