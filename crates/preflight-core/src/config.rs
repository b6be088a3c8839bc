//! Configuration management for preflight runs.
//!
//! This module defines the `PreflightConfig` struct, which selects between the
//! behaviors a run can have: which base strategy anchors relative references,
//! whether the document is validated, what is reported, and whether path items
//! are scanned for `$ref` extension keys. The configuration can be loaded from
//! a YAML file or created programmatically.
//!
//! # Examples
//!
//! ```no_run
//! use preflight_core::config::{PreflightConfig, ReportMode};
//!
//! // Create a new config programmatically
//! let mut config = PreflightConfig::default();
//! config.report = ReportMode::Raw;
//! config.validate = false;
//!
//! // Or load from a config file
//! # async fn load() -> preflight_core::Result<()> {
//! let config = PreflightConfig::from_file("preflight.yaml").await?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::location::BaseStrategy;
use crate::Error;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use tokio::fs;

/// What to print after a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Labeled summary of the `info` object
    #[default]
    Summary,
    /// The whole resolved document as JSON
    Raw,
    /// Nothing beyond success or failure
    None,
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "raw" => Ok(Self::Raw),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown report mode '{other}' (expected 'summary', 'raw' or 'none')"
            )),
        }
    }
}

/// Configuration for a preflight run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Root directory checked before loading (defaults to the working directory)
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// How relative `$ref`s are anchored
    #[serde(default)]
    pub base_strategy: BaseStrategy,

    /// Whether to validate the loaded document
    #[serde(default = "default_true")]
    pub validate: bool,

    /// What to print on success
    #[serde(default)]
    pub report: ReportMode,

    /// Whether to report `$ref` keys found on path items
    #[serde(default = "default_true")]
    pub scan_refs: bool,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            base_strategy: BaseStrategy::default(),
            validate: true,
            report: ReportMode::default(),
            scan_refs: true,
        }
    }
}

impl PreflightConfig {
    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::config(format!("cannot serialize config: {e}")))?;
        fs::write(path, content)
            .await
            .map_err(|e| Error::io(path.display().to_string(), e))
    }
}

fn default_true() -> bool {
    true
}
