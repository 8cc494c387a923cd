//! Render configuration.
//!
//! Mutated by the interactive side under the shared lock; every render call
//! works from a copy taken while the lock is held.

use std::path::Path;

use facetrace_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::{RenderError, RenderResult};

/// How per-pixel jitter streams are seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterSeeding {
    /// One stream per worker, seeded with `(pass, worker)`. Rows are
    /// claimed in a race, so jitter per pixel varies between runs.
    #[default]
    PerWorker,
    /// One stream per row, seeded with `(pass, row)`. Output is
    /// reproducible regardless of thread count.
    PerRow,
}

/// Camera, image and pass settings for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,

    pub eye: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,

    /// Index of the pass being rendered; filled in by the controller
    #[serde(skip)]
    pub pass: u32,
    /// Passes to render per request
    pub max_passes: u32,

    /// Offset added to the interpolated UV before the texture lookup
    pub uv_offset: [f32; 2],

    pub jitter: JitterSeeding,
    /// Average the color plane across passes instead of overwriting it
    pub accumulate: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            eye: Vec3::new(0.0, 0.0, 1500.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov: 8.0,
            pass: 0,
            max_passes: 1,
            uv_offset: [0.0, 0.0],
            jitter: JitterSeeding::PerWorker,
            accumulate: false,
        }
    }
}

impl RenderConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> RenderResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RenderError::Config(e.to_string()))
    }

    /// Reject settings that can never produce an image.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Config(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(RenderError::Config(format!(
                "fov must be in (0, 180) degrees, got {}",
                self.fov
            )));
        }
        Ok(())
    }

    /// Restore the default camera, keeping image size and pass settings.
    pub fn reset_camera(&mut self) {
        let defaults = Self::default();
        self.eye = defaults.eye;
        self.look_at = defaults.look_at;
        self.up = defaults.up;
        self.fov = defaults.fov;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();

        assert_eq!((config.width, config.height), (512, 512));
        assert_eq!(config.eye, Vec3::new(0.0, 0.0, 1500.0));
        assert_eq!(config.fov, 8.0);
        assert_eq!(config.max_passes, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RenderConfig::from_json_str(
            r#"{ "width": 64, "height": 32, "eye": [0.0, 0.0, 5.0], "jitter": "per_row" }"#,
        )
        .unwrap();

        assert_eq!((config.width, config.height), (64, 32));
        assert_eq!(config.eye, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(config.jitter, JitterSeeding::PerRow);
        assert_eq!(config.fov, 8.0);
        assert!(!config.accumulate);
    }

    #[test]
    fn test_json_round_trip_skips_pass() {
        let config = RenderConfig {
            pass: 7,
            accumulate: true,
            ..Default::default()
        };
        let parsed = RenderConfig::from_json_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(parsed.pass, 0);
        assert!(parsed.accumulate);
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "width": 0 }"#),
            Err(RenderError::Config(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "fov": 180.0 }"#),
            Err(RenderError::Config(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str("not json"),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn test_reset_camera() {
        let mut config = RenderConfig {
            width: 32,
            eye: Vec3::new(3.0, 4.0, 5.0),
            fov: 30.0,
            ..Default::default()
        };
        config.reset_camera();

        assert_eq!(config.width, 32);
        assert_eq!(config.eye, Vec3::new(0.0, 0.0, 1500.0));
        assert_eq!(config.fov, 8.0);
    }
}
