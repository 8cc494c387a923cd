//! Math primitives shared by the facetrace crates.
//!
//! glam provides the vector/matrix/quaternion types; this crate adds the
//! ray-tracing specific pieces on top.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
