//! facetrace core - scene inputs for the G-buffer renderer.
//!
//! This crate provides:
//!
//! - **Mesh**: triangle geometry with optional per-vertex UVs, built from
//!   flat arrays or loaded from OBJ
//! - **Texture**: float image with nearest-neighbour lookup, used as the
//!   albedo source
//!
//! # Example
//!
//! ```ignore
//! use facetrace_core::{load_texture, Mesh};
//!
//! let mesh = Mesh::load_obj("face.obj")?;
//! let texture = load_texture("face.png")?;
//! println!("{} triangles, {}x{} texture",
//!     mesh.triangle_count(), texture.width(), texture.height());
//! ```

pub mod mesh;
pub mod texture;

// Re-export commonly used types
pub use mesh::{Mesh, MeshError, MeshResult};
pub use texture::{load_texture, Texture, TextureError, TextureResult};
