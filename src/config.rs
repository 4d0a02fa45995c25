//! Scanner configuration.
//!
//! Loads settings from config.json next to the executable. Every field has a
//! default so partial files work, and a missing or broken file falls back to
//! the defaults entirely.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ocr::{CommandRecognizer, MergeParams, Tolerance};
use crate::paths;
use crate::relic::Thresholds;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Fragment sorting and merging tolerances
    pub merge: MergeParams,
    /// Fuzzy matching cutoffs
    pub thresholds: Thresholds,
    /// Slack around each region when picking merged lines, in pixels
    pub box_tolerance: i32,
    /// External single-row recognizer used for screenshots
    pub recognizer: CommandRecognizer,
    /// Vocabulary file, relative to the executable directory unless absolute
    pub vocabulary_file: String,
    /// Region layout file, relative to the executable directory unless absolute
    pub regions_file: String,
    /// Result file written by `scan`
    pub output_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            merge: MergeParams::default(),
            thresholds: Thresholds::default(),
            box_tolerance: 10,
            recognizer: CommandRecognizer::default(),
            vocabulary_file: "relic_config.json".to_string(),
            regions_file: "regions.json".to_string(),
            output_file: "result.json".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::Uniform(self.box_tolerance)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        paths::resolve(&self.vocabulary_file)
    }

    pub fn regions_path(&self) -> PathBuf {
        paths::resolve(&self.regions_file)
    }

    pub fn output_path(&self) -> PathBuf {
        paths::resolve(&self.output_file)
    }

    /// Loads `path`, falling back to defaults when it is absent or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        tracing::info!("Looking for config at: {}", path.display());

        if !path.exists() {
            tracing::info!("{} not found. Using default config.", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}
