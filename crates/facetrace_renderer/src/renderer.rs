//! Render context and the single-pass entry point.
//!
//! A [`Renderer`] owns the mesh, texture, accelerator and worker pool. It
//! holds no per-frame state: each [`Renderer::render_one_pass`] call takes
//! the config, orientation and target buffer explicitly.

use std::sync::Arc;
use std::time::Instant;

use facetrace_core::{Mesh, Texture};
use facetrace_math::Quat;
use parking_lot::Mutex;

use crate::buffer::RenderBuffer;
use crate::camera::CameraFrame;
use crate::config::{JitterSeeding, RenderConfig};
use crate::dispatch::{DispatchReport, ScanlineDispatcher};
use crate::sampler::SampleStream;
use crate::shader::GBufferShader;
use crate::{BuildError, IntersectionOracle, MeshBvh, RenderError, RenderResult};

/// Mesh, texture, accelerator and worker pool for G-buffer rendering.
pub struct Renderer {
    mesh: Option<Arc<Mesh>>,
    texture: Arc<Texture>,
    accelerator: Option<Box<dyn IntersectionOracle>>,
    dispatcher: ScanlineDispatcher,
}

impl Renderer {
    /// Renderer with one worker per hardware thread.
    pub fn new() -> RenderResult<Self> {
        Ok(Self::with_dispatcher(ScanlineDispatcher::new()?))
    }

    /// Renderer with a fixed worker count.
    pub fn with_threads(threads: usize) -> RenderResult<Self> {
        Ok(Self::with_dispatcher(ScanlineDispatcher::with_threads(threads)?))
    }

    fn with_dispatcher(dispatcher: ScanlineDispatcher) -> Self {
        Self {
            mesh: None,
            texture: Arc::new(Texture::empty()),
            accelerator: None,
            dispatcher,
        }
    }

    /// Replace the mesh. The accelerator must be rebuilt afterwards.
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        log::info!(
            "Mesh set: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        self.mesh = Some(mesh);
        self.accelerator = None;
    }

    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Replace the albedo texture. [`Texture::empty`] disables lookups.
    pub fn set_texture(&mut self, texture: Arc<Texture>) {
        self.texture = texture;
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// Build the reference BVH over the current mesh.
    ///
    /// On failure the renderer is left unbuilt and every render call fails
    /// with [`RenderError::NotBuilt`] until a build succeeds.
    pub fn build_accelerator(&mut self) -> Result<(), BuildError> {
        self.accelerator = None;
        let mesh = self.mesh.clone().ok_or(BuildError::NoMesh)?;
        let bvh = MeshBvh::build(mesh)?;
        self.accelerator = Some(Box::new(bvh));
        Ok(())
    }

    /// Install an externally built oracle for the current mesh.
    ///
    /// The mesh is validated first, since shading indexes it with the
    /// triangle ids the oracle reports. On failure the renderer is unbuilt.
    pub fn set_accelerator(&mut self, oracle: Box<dyn IntersectionOracle>) -> Result<(), BuildError> {
        self.accelerator = None;
        let mesh = self.mesh.as_deref().ok_or(BuildError::NoMesh)?;
        mesh.validate()?;
        self.accelerator = Some(oracle);
        Ok(())
    }

    /// True once both a mesh and an accelerator are in place.
    pub fn is_built(&self) -> bool {
        self.mesh.is_some() && self.accelerator.is_some()
    }

    pub fn num_threads(&self) -> usize {
        self.dispatcher.num_threads()
    }

    /// Render one pass into `buffer`.
    ///
    /// Fails before any worker starts if the accelerator is missing, the
    /// buffer size disagrees with the config, or the camera is degenerate;
    /// the buffer is untouched in that case. Otherwise every pixel of every
    /// plane is rewritten (color is blended instead when accumulating).
    pub fn render_one_pass(
        &self,
        buffer: &mut RenderBuffer,
        orientation: Quat,
        config: &RenderConfig,
    ) -> RenderResult<DispatchReport> {
        let (Some(oracle), Some(mesh)) = (self.accelerator.as_deref(), self.mesh.as_deref()) else {
            return Err(RenderError::NotBuilt);
        };

        if buffer.dimensions() != (config.width, config.height) {
            return Err(RenderError::BufferSizeMismatch {
                config: (config.width, config.height),
                buffer: buffer.dimensions(),
            });
        }

        let frame = CameraFrame::from_config(config, orientation)?;
        let shader = GBufferShader::new(oracle, mesh, &self.texture, config.uv_offset);

        let pass = config.pass as u64;
        let color_weight = if config.accumulate && config.pass > 0 {
            1.0 / (config.pass as f32 + 1.0)
        } else {
            1.0
        };

        let start = Instant::now();

        // Each row sits in its own slot; the worker that claims a row takes it
        let rows: Vec<Mutex<Option<_>>> = buffer
            .rows_mut()
            .into_iter()
            .map(|row| Mutex::new(Some(row)))
            .collect();

        let report = self.dispatcher.dispatch(
            rows.len(),
            |worker| SampleStream::new(pass, worker as u64),
            |worker_rng, y| {
                let Some(mut row) = rows[y].lock().take() else {
                    return;
                };
                match config.jitter {
                    JitterSeeding::PerWorker => {
                        shader.shade_row(&frame, &mut row, worker_rng, color_weight)
                    }
                    JitterSeeding::PerRow => {
                        let mut row_rng = SampleStream::new(pass, y as u64);
                        shader.shade_row(&frame, &mut row, &mut row_rng, color_weight)
                    }
                }
            },
        );

        log::debug!(
            "Pass {} rendered {}x{} in {:.2} ms across {} workers",
            config.pass,
            config.width,
            config.height,
            start.elapsed().as_secs_f64() * 1000.0,
            report.rows_per_worker.len()
        );

        Ok(report)
    }
}
