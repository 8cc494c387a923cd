//! Albedo texture used by the diffuse G-buffer plane.
//!
//! Pixels are stored as linear floats, row-major, `channels` floats per
//! pixel. A zero-width texture is the "no texture" sentinel: every lookup
//! into it is a no-op.

use std::path::Path;

use facetrace_math::Vec3;
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture: {0}")]
    LoadError(String),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("texture data has {actual} floats, expected {expected} for {width}x{height}x{channels}")]
    SizeMismatch {
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u32),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A float image sampled with nearest-neighbour lookup.
///
/// `data` always holds `width * height * channels` floats; build through
/// [`Texture::new`].
#[derive(Clone, Debug, Default)]
pub struct Texture {
    width: u32,
    height: u32,
    /// Floats per pixel (3 or 4)
    channels: u32,
    /// Pixel data, row-major, `channels` floats per pixel
    data: Vec<f32>,
}

impl Texture {
    /// Create a texture from raw float data.
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<f32>) -> TextureResult<Self> {
        if !(3..=4).contains(&channels) {
            return Err(TextureError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// The "no texture" sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 3,
            data: color.to_array().to_vec(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True for the zero-width sentinel.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Nearest-neighbour lookup without filtering.
    ///
    /// `(u, v)` is scaled by the texture size and clamped into
    /// `[0, width) x [0, height)`; there is no V flip. Returns `None` for
    /// the empty sentinel.
    pub fn sample_nearest(&self, u: f32, v: f32) -> Option<Vec3> {
        if self.is_empty() {
            return None;
        }

        let tx = texel_coord(u, self.width);
        let ty = texel_coord(v, self.height);
        let offset = (ty * self.width as usize + tx) * self.channels as usize;

        Some(Vec3::from_slice(&self.data[offset..offset + 3]))
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

#[inline]
fn texel_coord(s: f32, size: u32) -> usize {
    // `as` saturates NaN to 0, matching the clamp for negatives.
    ((s * size as f32) as i64).clamp(0, size as i64 - 1) as usize
}

/// Load a texture from a file path as linear RGB floats.
pub fn load_texture(path: impl AsRef<Path>) -> TextureResult<Texture> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| {
        TextureError::LoadError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data: Vec<f32> = rgb.as_raw().iter().map(|&c| srgb_to_linear(c)).collect();

    let texture = Texture::new(width, height, 3, data)?;
    log::info!(
        "Loaded texture: {} ({}x{}, {:.1} KB)",
        path.display(),
        width,
        height,
        texture.size_bytes() as f32 / 1024.0
    );
    Ok(texture)
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_2x2() -> Texture {
        #[rustfmt::skip]
        let data = vec![
            1.0, 0.0, 0.0,   0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,   1.0, 1.0, 1.0,
        ];
        Texture::new(2, 2, 3, data).unwrap()
    }

    #[test]
    fn test_solid_color_texture() {
        let tex = Texture::solid_color(Vec3::new(1.0, 0.5, 0.0));
        assert_eq!((tex.width(), tex.height(), tex.channels()), (1, 1, 3));
        assert_eq!(tex.data(), [1.0, 0.5, 0.0]);

        for (u, v) in [(0.0, 0.0), (0.5, 0.5), (0.99, 0.01)] {
            assert_eq!(tex.sample_nearest(u, v), Some(Vec3::new(1.0, 0.5, 0.0)));
        }
    }

    #[test]
    fn test_sample_nearest_quadrants() {
        let tex = checker_2x2();

        assert_eq!(tex.sample_nearest(0.25, 0.25), Some(Vec3::X));
        assert_eq!(tex.sample_nearest(0.75, 0.25), Some(Vec3::Y));
        assert_eq!(tex.sample_nearest(0.25, 0.75), Some(Vec3::Z));
        assert_eq!(tex.sample_nearest(0.75, 0.75), Some(Vec3::ONE));
    }

    #[test]
    fn test_sample_nearest_clamps() {
        let tex = checker_2x2();

        assert_eq!(tex.sample_nearest(-3.0, -0.5), Some(Vec3::X));
        assert_eq!(tex.sample_nearest(1.0, 1.0), Some(Vec3::ONE));
        assert_eq!(tex.sample_nearest(7.5, 0.0), Some(Vec3::Y));
        assert_eq!(tex.sample_nearest(f32::NAN, 0.0), Some(Vec3::X));
    }

    #[test]
    fn test_empty_texture_is_noop() {
        let tex = Texture::empty();
        assert!(tex.is_empty());
        assert_eq!(tex.sample_nearest(0.5, 0.5), None);
    }

    #[test]
    fn test_rgba_texture_ignores_alpha() {
        let tex = Texture::new(1, 1, 4, vec![0.2, 0.3, 0.4, 0.5]).unwrap();
        assert_eq!(tex.sample_nearest(0.0, 0.0), Some(Vec3::new(0.2, 0.3, 0.4)));
    }

    #[test]
    fn test_new_rejects_bad_sizes() {
        assert!(matches!(
            Texture::new(2, 2, 3, vec![0.0; 5]),
            Err(TextureError::SizeMismatch { expected: 12, actual: 5, .. })
        ));
        assert!(matches!(
            Texture::new(1, 1, 1, vec![0.0]),
            Err(TextureError::UnsupportedChannels(1))
        ));
    }

    #[test]
    fn test_every_texel_is_addressable() {
        // Largest texel offset of a validated texture stays inside the data
        let tex = Texture::new(3, 2, 4, (0..24).map(|i| i as f32).collect()).unwrap();
        assert_eq!(tex.sample_nearest(1.0, 1.0), Some(Vec3::new(20.0, 21.0, 22.0)));
        assert_eq!(tex.data().len(), 24);
    }

    #[test]
    fn test_srgb_to_linear() {
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
