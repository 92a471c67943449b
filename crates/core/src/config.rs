//! Transform configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options accepted by the package transform entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    /// Extract the package to a scratch directory and rewrite parts there,
    /// instead of streaming entries archive-to-archive.
    pub use_staged_directory: bool,
}

impl TransformConfig {
    /// Create the default configuration (streaming strategy).
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the staged-directory strategy.
    pub fn with_staged_directory(mut self, staged: bool) -> Self {
        self.use_staged_directory = staged;
        self
    }

    /// Parse a JSON configuration such as `{"useStagedDirectory": true}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
