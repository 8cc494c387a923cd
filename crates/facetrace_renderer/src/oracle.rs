//! Intersection oracle interface.
//!
//! The renderer never walks a spatial index itself; it asks an oracle for
//! the nearest triangle hit along a ray. [`crate::MeshBvh`] is the built-in
//! implementation, and any other index can be installed through
//! [`crate::Renderer::set_accelerator`].

use facetrace_math::{Interval, Ray};

/// Nearest hit reported by an oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Index of the hit triangle in the mesh index buffer (triangle, not index)
    pub prim_id: u32,
    /// Barycentric weight of the triangle's second vertex
    pub u: f32,
    /// Barycentric weight of the triangle's third vertex
    pub v: f32,
    /// Distance along the (normalized) ray
    pub t: f32,
}

/// Answers nearest-hit queries against a triangle mesh.
pub trait IntersectionOracle: Send + Sync {
    /// Nearest hit with `t` inside `ray_t`, or `None` on a miss.
    fn traverse(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit>;
}
