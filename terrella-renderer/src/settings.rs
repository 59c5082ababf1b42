use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, TextureFilter};

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Requests a tile gets before a transient failure is treated as absent
    /// imagery.
    pub max_loading_attempts: u32,
    /// Projected radius, in pixels, above which a tile is split.
    pub split_threshold: f64,
    pub max_level: u32,
    pub texture_filter: TextureFilter,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            max_loading_attempts: 3,
            split_threshold: 256.0,
            max_level: 18,
            texture_filter: TextureFilter::Linear,
        }
    }
}

impl RendererSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: RendererSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loading_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_loading_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.split_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "split_threshold must be positive, got {}",
                self.split_threshold
            )));
        }
        Ok(())
    }
}
