//! PNG export of G-buffer planes.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::buffer::{BufferKind, RenderBuffer, CHANNELS};
use crate::display::{display_rgba, gamma, BufferMode, DisplaySettings};
use crate::{RenderError, RenderResult};

/// Planes written by [`save_buffers`]: file name, plane, gamma.
const EXPORTS: [(&str, BufferKind, bool); 3] = [
    ("buffer_color.png", BufferKind::Color, true),
    ("buffer_texture.png", BufferKind::Diffuse, true),
    ("buffer_normal.png", BufferKind::Normal, false),
];

/// Quantize an RGBA float plane to 8-bit RGB.
///
/// Values are clamped to [0, 1] after the optional 1/2.2 gamma. Alpha is
/// dropped. Row 0 of the plane is the top row of the image.
pub fn plane_to_rgb8(plane: &[f32], width: u32, height: u32, apply_gamma: bool) -> RenderResult<RgbImage> {
    let expected = width as usize * height as usize * CHANNELS;
    if plane.len() != expected {
        return Err(RenderError::Config(format!(
            "plane has {} floats, expected {expected} for {width}x{height}",
            plane.len()
        )));
    }

    let quantize = |x: f32| {
        let x = if apply_gamma { gamma(x) } else { x };
        (x.clamp(0.0, 1.0) * 255.0) as u8
    };

    let bytes: Vec<u8> = plane
        .chunks_exact(CHANNELS)
        .flat_map(|p| [quantize(p[0]), quantize(p[1]), quantize(p[2])])
        .collect();

    RgbImage::from_vec(width, height, bytes)
        .ok_or_else(|| RenderError::Config(format!("cannot build {width}x{height} image")))
}

/// Write one plane as an RGB8 PNG.
pub fn save_plane_png(
    path: impl AsRef<Path>,
    plane: &[f32],
    width: u32,
    height: u32,
    apply_gamma: bool,
) -> RenderResult<()> {
    let path = path.as_ref();
    plane_to_rgb8(plane, width, height, apply_gamma)?.save(path)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Write the color, texture and normal planes into `dir`.
pub fn save_buffers(dir: impl AsRef<Path>, buffer: &RenderBuffer) -> RenderResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let (width, height) = buffer.dimensions();
    EXPORTS
        .iter()
        .map(|&(name, kind, apply_gamma)| {
            let path = dir.join(name);
            save_plane_png(&path, buffer.plane(kind), width, height, apply_gamma)?;
            Ok(path)
        })
        .collect()
}

/// Write one plane as shown on screen, to `dir/display_<plane>.png`.
///
/// Goes through [`display_rgba`], so gamma and depth mapping follow
/// `settings` and are not applied a second time here.
pub fn save_display_png(
    dir: impl AsRef<Path>,
    buffer: &RenderBuffer,
    mode: BufferMode,
    settings: &DisplaySettings,
) -> RenderResult<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("display_{}.png", mode.name()));
    let (width, height) = buffer.dimensions();
    save_plane_png(&path, &display_rgba(buffer, mode, settings), width, height, false)?;
    Ok(path)
}
