//! Per-pixel G-buffer shading.
//!
//! One primary ray per pixel, one oracle query, no bounces. A miss leaves
//! the cleared pixel; a hit fills all six planes from the triangle.

use facetrace_core::{Mesh, Texture};
use facetrace_math::{Interval, Ray, Vec2, Vec3};
use rand::RngCore;

use crate::buffer::{GBufferRow, PixelSample};
use crate::camera::CameraFrame;
use crate::sampler;
use crate::{IntersectionOracle, TriangleHit};

/// Parametric range of every primary ray.
const RAY_RANGE: Interval = Interval::new(0.0, f32::MAX);

/// Everything a worker needs to shade pixels, borrowed for one pass.
pub struct GBufferShader<'a> {
    oracle: &'a dyn IntersectionOracle,
    mesh: &'a Mesh,
    texture: &'a Texture,
    uv_offset: Vec2,
}

impl<'a> GBufferShader<'a> {
    pub fn new(
        oracle: &'a dyn IntersectionOracle,
        mesh: &'a Mesh,
        texture: &'a Texture,
        uv_offset: [f32; 2],
    ) -> Self {
        Self {
            oracle,
            mesh,
            texture,
            uv_offset: Vec2::from(uv_offset),
        }
    }

    /// Shade one ray.
    pub fn shade(&self, ray: &Ray) -> PixelSample {
        let mut sample = PixelSample::default();
        let Some(hit) = self.oracle.traverse(ray, RAY_RANGE) else {
            return sample;
        };

        let position = ray.at(hit.t);
        sample.position = position.extend(1.0).to_array();

        let normal = self.face_normal(hit.prim_id);
        sample.normal = (normal * 0.5 + Vec3::splat(0.5)).extend(1.0).to_array();

        sample.depth = [hit.t, hit.t, hit.t, 1.0];

        let uv = match self.interpolate_uv(&hit) {
            Some(uv) => {
                sample.texcoord = [uv.x, uv.y, 0.0, 1.0];
                uv
            }
            None => Vec2::ZERO,
        };

        // Diffuse is opaque on every hit; RGB stays black without a texture
        sample.diffuse[3] = 1.0;
        let lookup = uv + self.uv_offset;
        if let Some(albedo) = self.texture.sample_nearest(lookup.x, lookup.y) {
            sample.diffuse = albedo.extend(1.0).to_array();
        }

        let albedo = Vec3::from_slice(&sample.diffuse[..3]);
        sample.color = (albedo * normal.dot(ray.direction).abs())
            .extend(1.0)
            .to_array();

        sample
    }

    /// Shade every pixel of a row, drawing two jitter values per pixel.
    pub fn shade_row(
        &self,
        frame: &CameraFrame,
        row: &mut GBufferRow<'_>,
        rng: &mut dyn RngCore,
        color_weight: f32,
    ) {
        let y = row.y() as f32;
        for x in 0..row.width() {
            let (u0, u1) = sampler::jitter(rng);
            let ray = frame.ray_through(x as f32 + u0, y + u1);
            let sample = self.shade(&ray);
            row.store(x, &sample, color_weight);
        }
    }

    /// Flat face normal, `(v2 - v0) x (v1 - v0)`. Zero for degenerate faces.
    fn face_normal(&self, prim_id: u32) -> Vec3 {
        let [v0, v1, v2] = self.mesh.triangle(prim_id as usize);
        (v2 - v0).cross(v1 - v0).normalize_or_zero()
    }

    fn interpolate_uv(&self, hit: &TriangleHit) -> Option<Vec2> {
        let [t0, t1, t2] = self.mesh.triangle_uvs(hit.prim_id as usize)?;
        let w = 1.0 - hit.u - hit.v;
        Some(Vec2::from(t0) * w + Vec2::from(t1) * hit.u + Vec2::from(t2) * hit.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferKind, RenderBuffer, DEPTH_MISS};
    use crate::sampler::SampleStream;
    use crate::MeshBvh;
    use std::sync::Arc;

    fn triangle_mesh(uvs: Option<Vec<[f32; 2]>>) -> Arc<Mesh> {
        Arc::new(Mesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
            uvs,
        ))
    }

    #[test]
    fn test_miss_is_cleared_sample() {
        let mesh = triangle_mesh(None);
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let texture = Texture::solid_color(Vec3::ONE);
        let shader = GBufferShader::new(&bvh, &mesh, &texture, [0.0, 0.0]);

        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::NEG_Z);
        assert_eq!(shader.shade(&ray), PixelSample::default());
    }

    #[test]
    fn test_hit_fills_planes() {
        let mesh = triangle_mesh(Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let texture = Texture::solid_color(Vec3::new(0.2, 0.4, 0.6));
        let shader = GBufferShader::new(&bvh, &mesh, &texture, [0.0, 0.0]);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let sample = shader.shade(&ray);

        assert!((sample.depth[0] - 3.0).abs() < 1e-5);
        assert_eq!(sample.depth[3], 1.0);
        assert!(sample.position[0].abs() < 1e-5 && sample.position[2].abs() < 1e-5);
        // (v2 - v0) x (v1 - v0) faces -Z for this winding
        assert_eq!(sample.normal, [0.5, 0.5, 0.0, 1.0]);
        // Hit point (0, 0) has barycentrics u = 0.25, v = 0.5
        assert!((sample.texcoord[0] - 0.25).abs() < 1e-5);
        assert!((sample.texcoord[1] - 0.5).abs() < 1e-5);
        assert_eq!(sample.texcoord[3], 1.0);
        assert_eq!(sample.diffuse, [0.2, 0.4, 0.6, 1.0]);
        // Head-on ray, so |N.d| = 1
        for c in 0..3 {
            assert!((sample.color[c] - sample.diffuse[c]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_color_scales_with_incidence() {
        let mesh = triangle_mesh(None);
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let texture = Texture::solid_color(Vec3::ONE);
        let shader = GBufferShader::new(&bvh, &mesh, &texture, [0.0, 0.0]);

        let ray = Ray::towards(Vec3::new(3.0, 0.0, 3.0), Vec3::ZERO).unwrap();
        let sample = shader.shade(&ray);

        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((sample.color[0] - expected).abs() < 1e-4);
        assert_eq!(sample.color[3], 1.0);
    }

    #[test]
    fn test_no_uvs_and_no_texture() {
        let mesh = triangle_mesh(None);
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let texture = Texture::empty();
        let shader = GBufferShader::new(&bvh, &mesh, &texture, [0.3, 0.3]);

        let sample = shader.shade(&Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z));

        assert_eq!(sample.texcoord, [0.0; 4]);
        // Black but opaque, so the hit still shows in the diffuse plane
        assert_eq!(sample.diffuse, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(sample.color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(sample.normal[3], 1.0);
    }

    #[test]
    fn test_uv_offset_shifts_lookup() {
        let mesh = triangle_mesh(None);
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        // 2x1 texture: left texel red, right texel green
        let texture = Texture::new(2, 1, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z);

        let plain = GBufferShader::new(&bvh, &mesh, &texture, [0.0, 0.0]).shade(&ray);
        let shifted = GBufferShader::new(&bvh, &mesh, &texture, [0.75, 0.0]).shade(&ray);

        assert_eq!(plain.diffuse, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(shifted.diffuse, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_shade_row_writes_whole_row() {
        let mesh = triangle_mesh(None);
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let texture = Texture::solid_color(Vec3::ONE);
        let shader = GBufferShader::new(&bvh, &mesh, &texture, [0.0, 0.0]);
        let frame = CameraFrame::build(
            facetrace_math::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            30.0,
            8,
            8,
        )
        .unwrap();

        let mut buffer = RenderBuffer::new(8, 8);
        {
            let mut rows = buffer.rows_mut();
            let mut rng = SampleStream::new(0, 4);
            shader.shade_row(&frame, &mut rows[4], &mut rng, 1.0);
        }

        // Row through the image center crosses the triangle
        let hits = (0..8)
            .filter(|&x| buffer.pixel(BufferKind::Depth, x, 4)[3] == 1.0)
            .count();
        assert!(hits > 0);
        // Other rows untouched
        assert_eq!(buffer.pixel(BufferKind::Depth, 4, 0), [DEPTH_MISS; 4]);
    }
}
