use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Near/far pairs of the default cascade, each slice slightly overlapping the
/// next.
pub const DEFAULT_FRUSTUMS: [[f64; 2]; 4] = [
    [1.0, 100.0 + 0.075],
    [100.0, 1000.0 + 0.075],
    [1000.0, 1e6 + 10000.0],
    [1e6, 1e9],
];
pub const DEFAULT_VIEW_ANGLE: f64 = 47.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub view_angle: f64,
    pub frustums: Vec<[f64; 2]>,
    pub width: u32,
    pub height: u32,
    pub eye: DVec3,
    pub look: DVec3,
    pub up: DVec3,
}
impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            view_angle: DEFAULT_VIEW_ANGLE,
            frustums: DEFAULT_FRUSTUMS.to_vec(),
            width: 1280,
            height: 720,
            eye: DVec3::new(0.0, 0.0, 30_000_000.0),
            look: DVec3::ZERO,
            up: DVec3::Y,
        }
    }
}
impl CameraOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: CameraOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.view_angle > 0.0 && self.view_angle < 180.0) {
            return Err(ConfigError::InvalidViewAngle(self.view_angle));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        if self.frustums.is_empty() {
            return Err(ConfigError::NoFrustums);
        }
        for (index, [near, far]) in self.frustums.iter().copied().enumerate() {
            if !(near > 0.0 && far > near) {
                return Err(ConfigError::InvalidFrustum { index, near, far });
            }
        }
        if self.eye == self.look {
            return Err(ConfigError::Invalid("eye and look coincide".to_string()));
        }
        Ok(())
    }
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = CameraOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.frustums.len(), 4);
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let options = CameraOptions::from_json(r#"{"view_angle": 60, "width": 800, "height": 600}"#)
            .unwrap();
        assert_eq!(options.view_angle, 60.0);
        assert_eq!(options.frustums, DEFAULT_FRUSTUMS.to_vec());
        assert_eq!(options.up, DVec3::Y);
    }
    #[test]
    fn rejects_bad_cascade() {
        let err = CameraOptions::from_json(r#"{"frustums": [[10, 1]]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrustum { index: 0, .. }));
        let err = CameraOptions::from_json(r#"{"frustums": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoFrustums));
        let err = CameraOptions::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
