//! Processing settings
//!
//! A processing run is described by a small JSON document:
//!
//! ```json
//! {
//!     "configs": "configs.dat",
//!     "corrections": ["corr_factors_a.dat", "corr_factors_b.dat"],
//!     "fix_sign": true,
//!     "logging": { "level": "debug" }
//! }
//! ```
//!
//! Relative paths in a settings file are resolved against the directory of
//! that file.

use crate::logging::LogConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings of one processing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingSettings {
    /// Configuration file (`A B M N` per line)
    pub configs: PathBuf,
    /// Correction files; no calibration when empty
    #[serde(default)]
    pub corrections: Vec<PathBuf>,
    /// Normalize signs with the geometric factor
    #[serde(default)]
    pub fix_sign: bool,
    /// Logging setup
    #[serde(default)]
    pub logging: LogConfig,
}

impl ProcessingSettings {
    /// Settings that only construct quadrupoles from `configs`
    #[must_use]
    pub fn new(configs: impl Into<PathBuf>) -> Self {
        Self {
            configs: configs.into(),
            corrections: Vec::new(),
            fix_sign: false,
            logging: LogConfig::default(),
        }
    }

    /// Add a correction file
    #[must_use]
    pub fn correction(mut self, path: impl Into<PathBuf>) -> Self {
        self.corrections.push(path.into());
        self
    }

    /// Enable or disable sign normalization
    #[must_use]
    pub fn fix_sign(mut self, enabled: bool) -> Self {
        self.fix_sign = enabled;
        self
    }

    /// Parse settings from a JSON string; paths are kept as written
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Settings`] for invalid JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or decoded.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        Ok(match path.parent() {
            Some(base) => settings.relative_to(base),
            None => settings,
        })
    }

    /// Resolve relative paths against `base`
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };
        self.configs = resolve(self.configs);
        self.corrections = self.corrections.into_iter().map(resolve).collect();
        self
    }
}
