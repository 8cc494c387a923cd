//! Error types for render setup.
//!
//! Only setup can fail. Once workers are running, a ray either hits or
//! misses.

use facetrace_core::{MeshError, TextureError};
use thiserror::Error;

/// Errors raised while building the accelerator.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no mesh has been set")]
    NoMesh,

    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] MeshError),
}

/// Errors returned by render calls and their surrounding I/O.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("intersection accelerator has not been built")]
    NotBuilt,

    #[error("invalid camera geometry: {0}")]
    InvalidCameraGeometry(String),

    #[error("config is {config:?} but buffer planes are {buffer:?}")]
    BufferSizeMismatch {
        config: (u32, u32),
        buffer: (u32, u32),
    },

    #[error("accelerator build failed: {0}")]
    Build(#[from] BuildError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type RenderResult<T> = Result<T, RenderError>;
