//! Engine configuration.
//!
//! Every tunable constant lives here, grouped by component. Missing fields
//! fall back to their defaults, so a config file only needs the values it
//! overrides.

use crate::drift::DriftConfig;
use crate::geo::ShapeConfig;
use crate::interaction::{PreviewConfig, ResizeConfig};
use crate::perimeter::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub shape: ShapeConfig,
    pub resize: ResizeConfig,
    pub preview: PreviewConfig,
    pub drift: DriftConfig,
    pub search: SearchConfig,
    /// Shown when reverse geocoding fails.
    pub address_placeholder: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shape: ShapeConfig::default(),
            resize: ResizeConfig::default(),
            preview: PreviewConfig::default(),
            drift: DriftConfig::default(),
            search: SearchConfig::default(),
            address_placeholder: "Address unknown".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config, falling back to defaults on error.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse engine config: {}", e);
                Self::default()
            }
        }
    }

    /// Loads a JSON config file, falling back to defaults if the file is
    /// missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => {
                log::info!("Loaded engine config from {}", path.display());
                Self::from_json(&json)
            }
            Err(e) => {
                log::warn!("Failed to read engine config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
