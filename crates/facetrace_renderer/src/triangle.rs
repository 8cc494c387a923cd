//! Ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm. The returned barycentrics follow the
//! `p = (1 - u - v) * v0 + u * v1 + v * v2` convention used for UV
//! interpolation during shading.

use facetrace_math::{Interval, Ray, Vec3};

/// Determinant threshold below which the ray is treated as parallel.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Barycentric coordinates and distance of a ray-triangle hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barycentric {
    pub u: f32,
    pub v: f32,
    pub t: f32,
}

/// Intersect `ray` with triangle `tri`, accepting only hits with `t` in `ray_t`.
#[inline]
pub fn intersect_triangle(ray: &Ray, tri: &[Vec3; 3], ray_t: Interval) -> Option<Barycentric> {
    let [v0, v1, v2] = *tri;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < PARALLEL_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.contains(t) {
        return None;
    }

    Some(Barycentric { u, v, t })
}
