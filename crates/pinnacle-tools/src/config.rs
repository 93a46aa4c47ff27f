//! JSON configuration file.
//!
//! ```json
//! {
//!   "validation": { "max_texture_resolution": 2048 },
//!   "optimization": { "profile": "mobile", "flatten_hierarchy": false },
//!   "conversion": { "target_format": "usdz", "filename_suffix": "" }
//! }
//! ```
//!
//! Every section and field is optional. In the optimization section,
//! fields override the preset of the named `profile` rather than the
//! desktop defaults.

use crate::convert::BatchConversionOptions;
use crate::error::ConfigError;
use crate::optimizer::OptimizationSettings;
use pinnacle_lint::ValidationOptions;
use pinnacle_scene::OptimizationProfile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinnacleConfig {
    pub validation: ValidationOptions,
    pub optimization: OptimizationSettings,
    pub conversion: BatchConversionOptions,
}

impl PinnacleConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Some(section) = value.get_mut("optimization") {
            expand_profile(section)?;
        }
        serde_json::from_value(value)
    }
}

/// Fills fields missing from the optimization section with the named
/// profile's preset.
fn expand_profile(section: &mut Value) -> Result<(), serde_json::Error> {
    let Some(fields) = section.as_object_mut() else {
        return Ok(());
    };
    let Some(profile) = fields.get("profile") else {
        return Ok(());
    };
    let profile: OptimizationProfile = serde_json::from_value(profile.clone())?;
    let Value::Object(preset) = serde_json::to_value(OptimizationSettings::for_profile(profile))? else {
        return Ok(());
    };
    for (key, default) in preset {
        fields.entry(key).or_insert(default);
    }
    Ok(())
}
