//! Turning G-buffer planes into displayable RGBA.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::{BufferKind, RenderBuffer, CHANNELS};
use crate::{RenderError, RenderResult};

/// Display gamma applied to color-like planes.
pub const DISPLAY_GAMMA: f32 = 2.2;

/// Which plane to show.
pub type BufferMode = BufferKind;

/// How planes are mapped for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Depth values mapped to 0 and 1 (either order)
    pub depth_range: [f32; 2],
    /// Map normalized depth through a blue-green-red ramp
    pub pseudo_color: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            depth_range: [1400.0, 1700.0],
            pseudo_color: false,
        }
    }
}

impl DisplaySettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        serde_json::from_str(json).map_err(|e| RenderError::Config(e.to_string()))
    }

    /// Load a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Float RGBA for one plane, same size and row order as the buffer.
pub fn display_rgba(buffer: &RenderBuffer, mode: BufferMode, settings: &DisplaySettings) -> Vec<f32> {
    let plane = buffer.plane(mode);

    match mode {
        BufferKind::Color | BufferKind::Texcoord | BufferKind::Diffuse => plane
            .chunks_exact(CHANNELS)
            .flat_map(|p| [gamma(p[0]), gamma(p[1]), gamma(p[2]), p[3]])
            .collect(),
        BufferKind::Normal | BufferKind::Position => plane.to_vec(),
        BufferKind::Depth => {
            let [a, b] = settings.depth_range;
            let min = a.min(b);
            let span = (b - a).abs().max(f32::EPSILON);

            plane
                .chunks_exact(CHANNELS)
                .flat_map(|p| {
                    let v = (p[0] - min) / span;
                    if settings.pseudo_color {
                        pseudo_color(v)
                    } else {
                        [v, v, v, 1.0]
                    }
                })
                .collect()
        }
    }
}

/// Blue (0) through green (0.5) to red (1), alpha 1.
pub fn pseudo_color(v: f32) -> [f32; 4] {
    let r = if v <= 0.5 {
        0.0
    } else if v < 0.75 {
        (v - 0.5) / 0.25
    } else {
        1.0
    };
    let g = if v <= 0.25 {
        v / 0.25
    } else if v < 0.75 {
        1.0
    } else {
        1.0 - (v - 0.75) / 0.25
    };
    let b = if v <= 0.25 {
        1.0
    } else if v < 0.5 {
        1.0 - (v - 0.25) / 0.25
    } else {
        0.0
    };
    [r, g, b, 1.0]
}

#[inline]
pub(crate) fn gamma(x: f32) -> f32 {
    x.max(0.0).powf(1.0 / DISPLAY_GAMMA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelSample;

    fn one_pixel(sample: PixelSample) -> RenderBuffer {
        let mut buffer = RenderBuffer::new(1, 1);
        buffer.rows_mut()[0].store(0, &sample, 1.0);
        buffer
    }

    #[test]
    fn test_color_gamma_keeps_alpha() {
        let buffer = one_pixel(PixelSample {
            color: [0.25, 1.0, 0.0, 0.5],
            ..Default::default()
        });
        let rgba = display_rgba(&buffer, BufferMode::Color, &DisplaySettings::default());

        assert!((rgba[0] - 0.25f32.powf(1.0 / 2.2)).abs() < 1e-6);
        assert_eq!(rgba[1], 1.0);
        assert_eq!(rgba[2], 0.0);
        assert_eq!(rgba[3], 0.5);
    }

    #[test]
    fn test_normal_passthrough() {
        let normal = [0.5, 0.5, 0.0, 1.0];
        let buffer = one_pixel(PixelSample {
            normal,
            ..Default::default()
        });
        assert_eq!(
            display_rgba(&buffer, BufferMode::Normal, &DisplaySettings::default()),
            normal
        );
    }

    #[test]
    fn test_depth_normalization() {
        let settings = DisplaySettings {
            depth_range: [10.0, 2.0],
            pseudo_color: false,
        };
        let buffer = one_pixel(PixelSample {
            depth: [6.0, 6.0, 6.0, 1.0],
            ..Default::default()
        });

        assert_eq!(
            display_rgba(&buffer, BufferMode::Depth, &settings),
            [0.5, 0.5, 0.5, 1.0]
        );
    }

    #[test]
    fn test_depth_zero_range() {
        let settings = DisplaySettings {
            depth_range: [5.0, 5.0],
            pseudo_color: false,
        };
        let buffer = one_pixel(PixelSample {
            depth: [5.0; 4],
            ..Default::default()
        });
        let rgba = display_rgba(&buffer, BufferMode::Depth, &settings);
        assert!(rgba.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_pseudo_color_endpoints() {
        assert_eq!(pseudo_color(0.0), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(pseudo_color(0.5), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(pseudo_color(1.0), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_settings_from_json() {
        let settings = DisplaySettings::from_json_str(r#"{ "pseudo_color": true }"#).unwrap();
        assert!(settings.pseudo_color);
        assert_eq!(settings.depth_range, [1400.0, 1700.0]);

        assert!(matches!(
            DisplaySettings::from_json_str(r#"{ "depth_range": 3 }"#),
            Err(RenderError::Config(_))
        ));
    }
}
