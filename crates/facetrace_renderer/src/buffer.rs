//! G-buffer storage.
//!
//! Six planes of `width * height * 4` floats each, row-major. The planes
//! are always resized together so their dimensions never disagree.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Floats per pixel in every plane.
pub const CHANNELS: usize = 4;

/// Depth written to pixels whose ray missed the mesh.
pub const DEPTH_MISS: f32 = 1000.0;

/// Identifies one plane of the G-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    /// Shaded color (rgba)
    Color,
    /// Face normal remapped to [0, 1]
    Normal,
    /// World-space hit position
    Position,
    /// Hit distance
    Depth,
    /// Interpolated UV
    Texcoord,
    /// Albedo from the texture
    Diffuse,
}

impl BufferKind {
    pub const ALL: [BufferKind; 6] = [
        BufferKind::Color,
        BufferKind::Normal,
        BufferKind::Position,
        BufferKind::Depth,
        BufferKind::Texcoord,
        BufferKind::Diffuse,
    ];

    /// Lowercase name, as used in JSON and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Color => "color",
            BufferKind::Normal => "normal",
            BufferKind::Position => "position",
            BufferKind::Depth => "depth",
            BufferKind::Texcoord => "texcoord",
            BufferKind::Diffuse => "diffuse",
        }
    }
}

impl FromStr for BufferKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BufferKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RenderError::Config(format!("unknown buffer plane '{s}'")))
    }
}

/// Per-pixel result of shading, one `[f32; 4]` per plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    pub color: [f32; 4],
    pub normal: [f32; 4],
    pub position: [f32; 4],
    pub depth: [f32; 4],
    pub texcoord: [f32; 4],
    pub diffuse: [f32; 4],
}

impl Default for PixelSample {
    /// The cleared pixel: zero everywhere, depth at the miss sentinel.
    fn default() -> Self {
        Self {
            color: [0.0; 4],
            normal: [0.0; 4],
            position: [0.0; 4],
            depth: [DEPTH_MISS; 4],
            texcoord: [0.0; 4],
            diffuse: [0.0; 4],
        }
    }
}

/// The six output planes of a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderBuffer {
    width: u32,
    height: u32,
    pub rgba: Vec<f32>,
    pub normal: Vec<f32>,
    pub position: Vec<f32>,
    pub depth: Vec<f32>,
    pub texcoord: Vec<f32>,
    pub diffuse: Vec<f32>,
}

impl RenderBuffer {
    /// Allocate all planes at `width x height`, cleared to the miss state.
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.resize(width, height);
        buffer
    }

    /// Resize every plane in lockstep and clear it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize * CHANNELS;
        for kind in BufferKind::ALL {
            let fill = if kind == BufferKind::Depth { DEPTH_MISS } else { 0.0 };
            let plane = self.plane_mut(kind);
            plane.clear();
            plane.resize(len, fill);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` of every plane.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Flat float view of one plane.
    pub fn plane(&self, kind: BufferKind) -> &[f32] {
        match kind {
            BufferKind::Color => &self.rgba,
            BufferKind::Normal => &self.normal,
            BufferKind::Position => &self.position,
            BufferKind::Depth => &self.depth,
            BufferKind::Texcoord => &self.texcoord,
            BufferKind::Diffuse => &self.diffuse,
        }
    }

    fn plane_mut(&mut self, kind: BufferKind) -> &mut Vec<f32> {
        match kind {
            BufferKind::Color => &mut self.rgba,
            BufferKind::Normal => &mut self.normal,
            BufferKind::Position => &mut self.position,
            BufferKind::Depth => &mut self.depth,
            BufferKind::Texcoord => &mut self.texcoord,
            BufferKind::Diffuse => &mut self.diffuse,
        }
    }

    /// The four channels of pixel `(x, y)` in one plane.
    pub fn pixel(&self, kind: BufferKind, x: u32, y: u32) -> [f32; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let plane = self.plane(kind);
        [plane[offset], plane[offset + 1], plane[offset + 2], plane[offset + 3]]
    }

    /// Split the buffer into one mutable view per row.
    ///
    /// Rows never overlap, so each view can be handed to a different
    /// worker thread.
    pub fn rows_mut(&mut self) -> Vec<GBufferRow<'_>> {
        let stride = (self.width as usize * CHANNELS).max(1);
        self.rgba
            .chunks_mut(stride)
            .zip(self.normal.chunks_mut(stride))
            .zip(self.position.chunks_mut(stride))
            .zip(self.depth.chunks_mut(stride))
            .zip(self.texcoord.chunks_mut(stride))
            .zip(self.diffuse.chunks_mut(stride))
            .enumerate()
            .map(
                |(y, (((((color, normal), position), depth), texcoord), diffuse))| GBufferRow {
                    y: y as u32,
                    color,
                    normal,
                    position,
                    depth,
                    texcoord,
                    diffuse,
                },
            )
            .collect()
    }
}

/// Mutable view of one row across all six planes.
pub struct GBufferRow<'a> {
    y: u32,
    color: &'a mut [f32],
    normal: &'a mut [f32],
    position: &'a mut [f32],
    depth: &'a mut [f32],
    texcoord: &'a mut [f32],
    diffuse: &'a mut [f32],
}

impl GBufferRow<'_> {
    /// Row index in the image.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of pixels in the row.
    pub fn width(&self) -> u32 {
        (self.color.len() / CHANNELS) as u32
    }

    /// Overwrite pixel `x` in every plane.
    ///
    /// With `color_weight < 1` the color plane keeps a running average:
    /// `old + (new - old) * color_weight`.
    #[inline]
    pub fn store(&mut self, x: u32, sample: &PixelSample, color_weight: f32) {
        let range = x as usize * CHANNELS..(x as usize + 1) * CHANNELS;

        if color_weight >= 1.0 {
            self.color[range.clone()].copy_from_slice(&sample.color);
        } else {
            for (old, new) in self.color[range.clone()].iter_mut().zip(sample.color) {
                *old += (new - *old) * color_weight;
            }
        }
        self.normal[range.clone()].copy_from_slice(&sample.normal);
        self.position[range.clone()].copy_from_slice(&sample.position);
        self.depth[range.clone()].copy_from_slice(&sample.depth);
        self.texcoord[range.clone()].copy_from_slice(&sample.texcoord);
        self.diffuse[range].copy_from_slice(&sample.diffuse);
    }
}
