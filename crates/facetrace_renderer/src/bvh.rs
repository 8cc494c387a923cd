//! Bounding Volume Hierarchy over the triangles of one mesh.
//!
//! The reference [`IntersectionOracle`]: a binary tree built by sorting
//! triangle centroids along the longest axis and splitting at the median.

use std::sync::Arc;
use std::time::Instant;

use facetrace_core::Mesh;
use facetrace_math::{Aabb, Interval, Ray, Vec3};

use crate::triangle::intersect_triangle;
use crate::{BuildError, IntersectionOracle, TriangleHit};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangle ids.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        prims: Vec<u32>,
        bbox: Aabb,
    },
    /// Mesh without triangles; every ray misses.
    Empty,
}

/// Shape of a built tree, reported after construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BvhStats {
    pub num_triangles: usize,
    pub num_leaf_nodes: usize,
    pub num_branch_nodes: usize,
    pub max_tree_depth: usize,
}

/// Per-triangle data used only during construction.
#[derive(Clone, Copy)]
struct BuildPrim {
    id: u32,
    bbox: Aabb,
    centroid: Vec3,
}

/// BVH accelerator holding a shared reference to its mesh.
pub struct MeshBvh {
    mesh: Arc<Mesh>,
    root: BvhNode,
    stats: BvhStats,
}

impl MeshBvh {
    /// Build the hierarchy. Fails if the mesh references missing vertices.
    pub fn build(mesh: Arc<Mesh>) -> Result<Self, BuildError> {
        mesh.validate()?;

        let start = Instant::now();
        let mut prims: Vec<BuildPrim> = (0..mesh.triangle_count())
            .map(|i| {
                let [v0, v1, v2] = mesh.triangle(i);
                let bbox = Aabb::from_triangle(v0, v1, v2);
                BuildPrim {
                    id: i as u32,
                    bbox,
                    centroid: bbox.centroid(),
                }
            })
            .collect();

        let mut stats = BvhStats {
            num_triangles: prims.len(),
            ..Default::default()
        };
        let root = if prims.is_empty() {
            BvhNode::Empty
        } else {
            Self::build_node(&mut prims, 1, &mut stats)
        };

        log::info!(
            "BVH build time: {:.2} ms ({} triangles)",
            start.elapsed().as_secs_f64() * 1000.0,
            stats.num_triangles
        );
        log::info!(
            "  leaf nodes: {}, branch nodes: {}, max depth: {}",
            stats.num_leaf_nodes,
            stats.num_branch_nodes,
            stats.max_tree_depth
        );

        let bvh = Self { mesh, root, stats };
        let bounds = bvh.bounding_box();
        if !bounds.is_empty() {
            log::info!("  bmin: {}, bmax: {}", bounds.min(), bounds.max());
        }
        Ok(bvh)
    }

    fn build_node(prims: &mut [BuildPrim], depth: usize, stats: &mut BvhStats) -> BvhNode {
        stats.max_tree_depth = stats.max_tree_depth.max(depth);

        let bbox = prims
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bbox));

        if prims.len() <= LEAF_MAX_SIZE {
            stats.num_leaf_nodes += 1;
            return BvhNode::Leaf {
                prims: prims.iter().map(|p| p.id).collect(),
                bbox,
            };
        }

        // Split axis follows the centroid spread, not the full bounds
        let centroid_bounds = prims.iter().fold(Aabb::EMPTY, |acc, p| {
            Aabb::surrounding(&acc, &Aabb::from_points(p.centroid, p.centroid))
        });
        let axis = centroid_bounds.longest_axis();

        prims.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        let mid = prims.len() / 2;
        let (left, right) = prims.split_at_mut(mid);

        stats.num_branch_nodes += 1;
        BvhNode::Branch {
            left: Box::new(Self::build_node(left, depth + 1, stats)),
            right: Box::new(Self::build_node(right, depth + 1, stats)),
            bbox,
        }
    }

    /// Tree statistics from the last build.
    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    /// Bounds of the whole mesh.
    pub fn bounding_box(&self) -> Aabb {
        match &self.root {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// The mesh this tree indexes.
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn hit_node(&self, node: &BvhNode, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        match node {
            BvhNode::Empty => None,

            BvhNode::Leaf { prims, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let mut closest: Option<TriangleHit> = None;
                let mut range = ray_t;
                for &prim in prims {
                    let tri = self.mesh.triangle(prim as usize);
                    if let Some(b) = intersect_triangle(ray, &tri, range) {
                        range = range.with_max(b.t);
                        closest = Some(TriangleHit {
                            prim_id: prim,
                            u: b.u,
                            v: b.v,
                            t: b.t,
                        });
                    }
                }
                closest
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let hit_left = self.hit_node(left, ray, ray_t);

                // Only check right up to closest hit
                let right_t = hit_left.map_or(ray_t, |h| ray_t.with_max(h.t));
                let hit_right = self.hit_node(right, ray, right_t);

                hit_right.or(hit_left)
            }
        }
    }
}

impl IntersectionOracle for MeshBvh {
    fn traverse(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        self.hit_node(&self.root, ray, ray_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Grid of `n x n` quads (two triangles each) in the z = 0 plane.
    fn grid_mesh(n: usize) -> Mesh {
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Vec3::new(i as f32, j as f32, (i * j) as f32 * 0.01));
            }
        }
        let stride = (n + 1) as u32;
        let mut indices = Vec::new();
        for j in 0..n as u32 {
            for i in 0..n as u32 {
                let a = j * stride + i;
                indices.extend_from_slice(&[a, a + 1, a + stride, a + 1, a + stride + 1, a + stride]);
            }
        }
        Mesh::new(positions, indices, None)
    }

    fn brute_force(mesh: &Mesh, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let mut closest = None;
        let mut range = ray_t;
        for prim in 0..mesh.triangle_count() {
            if let Some(b) = intersect_triangle(ray, &mesh.triangle(prim), range) {
                range = range.with_max(b.t);
                closest = Some(TriangleHit {
                    prim_id: prim as u32,
                    u: b.u,
                    v: b.v,
                    t: b.t,
                });
            }
        }
        closest
    }

    #[test]
    fn test_bvh_empty_mesh() {
        let bvh = MeshBvh::build(Arc::new(Mesh::new(vec![], vec![], None))).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        assert!(matches!(bvh.root, BvhNode::Empty));
        assert!(bvh.traverse(&ray, Interval::new(0.0, f32::MAX)).is_none());
    }

    #[test]
    fn test_bvh_single_triangle() {
        let mesh = Mesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
        );
        let bvh = MeshBvh::build(Arc::new(mesh)).unwrap();
        assert!(matches!(bvh.root, BvhNode::Leaf { .. }));

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = bvh.traverse(&ray, Interval::new(0.0, f32::MAX)).unwrap();
        assert_eq!(hit.prim_id, 0);
        assert!((hit.t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_bvh_rejects_invalid_mesh() {
        let mesh = Mesh::new(vec![Vec3::ZERO], vec![0, 1, 2], None);
        assert!(matches!(
            MeshBvh::build(Arc::new(mesh)),
            Err(BuildError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_bvh_stats() {
        let bvh = MeshBvh::build(Arc::new(grid_mesh(8))).unwrap();
        let stats = bvh.stats();

        assert_eq!(stats.num_triangles, 128);
        assert_eq!(stats.num_leaf_nodes, stats.num_branch_nodes + 1);
        assert!(stats.max_tree_depth > 1);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mesh = Arc::new(grid_mesh(10));
        let bvh = MeshBvh::build(mesh.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let range = Interval::new(0.0, 1.0e30);

        for _ in 0..500 {
            let origin = Vec3::new(rng.gen_range(-2.0..12.0), rng.gen_range(-2.0..12.0), 5.0);
            let target = Vec3::new(rng.gen_range(-1.0..11.0), rng.gen_range(-1.0..11.0), 0.0);
            let ray = Ray::towards(origin, target).unwrap();

            let expected = brute_force(&mesh, &ray, range);
            let actual = bvh.traverse(&ray, range);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => assert!((e.t - a.t).abs() < 1e-4, "{e:?} vs {a:?}"),
                other => panic!("bvh disagrees with brute force: {other:?}"),
            }
        }
    }
}
