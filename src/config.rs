//! Scan configuration, loaded from `.assetgraph/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{AssetGraphError, Result};

/// Directory (relative to the project root) holding the config file.
pub const CONFIG_DIR: &str = ".assetgraph";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of scan workers. 0 means one per available core.
    pub workers: usize,
    /// Project-relative prefixes whose files are never scanned.
    pub reserved_prefixes: Vec<String>,
    /// Extension of the companion metadata file (`<asset>.<ext>`).
    pub meta_extension: String,
    /// Honour .gitignore during full-scan discovery.
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            reserved_prefixes: vec!["ProjectSettings".to_string()],
            meta_extension: "meta".to_string(),
            respect_gitignore: true,
        }
    }
}

impl ScanConfig {
    /// Load from `path`, falling back to defaults if the file is missing or invalid.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match Self::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config of the project rooted at `root`.
    pub fn load_for_project(root: &Path) -> Self {
        Self::load(&root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AssetGraphError::config(e.to_string()))
    }

    /// Effective worker count, never zero.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
