//! facetrace renderer - progressive G-buffer ray casting
//!
//! Casts one jittered primary ray per pixel against a triangle mesh and
//! writes color, normal, position, depth, texcoord and diffuse planes.
//! Rows are spread across a worker pool; a background controller repeats
//! passes on request.

mod bvh;
mod error;
mod oracle;
mod triangle;

pub mod buffer;
pub mod camera;
pub mod config;
pub mod controller;
pub mod controls;
pub mod dispatch;
pub mod display;
pub mod export;
pub mod renderer;
pub mod sampler;
pub mod shader;

pub use buffer::{BufferKind, GBufferRow, PixelSample, RenderBuffer, DEPTH_MISS};
pub use bvh::{BvhStats, MeshBvh};
pub use camera::CameraFrame;
pub use config::{JitterSeeding, RenderConfig};
pub use controller::{ControllerState, RenderController, RenderState, DEFAULT_POLL_INTERVAL};
pub use dispatch::{DispatchReport, ScanlineDispatcher};
pub use display::{display_rgba, BufferMode, DisplaySettings};
pub use error::{BuildError, RenderError, RenderResult};
pub use export::{save_buffers, save_display_png, save_plane_png};
pub use oracle::{IntersectionOracle, TriangleHit};
pub use renderer::Renderer;
pub use sampler::SampleStream;
pub use shader::GBufferShader;
pub use triangle::{intersect_triangle, Barycentric};

/// Re-export math types used in the public API
pub use facetrace_math::{Aabb, Interval, Quat, Ray, Vec3};
