//! Triangle mesh input for the renderer.
//!
//! The mesh is immutable once it has been handed to the renderer: the
//! intersection oracle is built against it and shading reads its vertex and
//! UV data by triangle index.

use std::path::Path;

use facetrace_math::{Aabb, Vec3};
use thiserror::Error;

/// Errors produced while building or validating a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),

    #[error("flat vertex buffer length {0} is not a multiple of 3")]
    RaggedVertices(usize),

    #[error("flat uv buffer length {0} is not a multiple of 2")]
    RaggedUvs(usize),

    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh has {uv_count} uvs for {vertex_count} vertices")]
    UvCountMismatch { uv_count: usize, vertex_count: usize },

    #[error("failed to load OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// A triangle mesh with optional per-vertex UV coordinates.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with UVs.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, uvs: Option<Vec<[f32; 2]>>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            uvs,
            indices,
            bounds,
        }
    }

    /// Create a mesh from flat arrays: 3 floats per vertex, 3 indices per
    /// triangle and, when non-empty, 2 floats of UV per vertex.
    pub fn from_flat(vertices: &[f32], faces: &[u32], uvs: &[f32]) -> MeshResult<Self> {
        if vertices.len() % 3 != 0 {
            return Err(MeshError::RaggedVertices(vertices.len()));
        }
        if uvs.len() % 2 != 0 {
            return Err(MeshError::RaggedUvs(uvs.len()));
        }

        let positions: Vec<Vec3> = vertices.chunks_exact(3).map(Vec3::from_slice).collect();
        let uvs = if uvs.is_empty() {
            None
        } else {
            Some(uvs.chunks_exact(2).map(|uv| [uv[0], uv[1]]).collect())
        };

        let mesh = Self::new(positions, faces.to_vec(), uvs);
        mesh.validate()?;
        Ok(mesh)
    }

    /// Load every model in an OBJ file into a single mesh.
    ///
    /// Faces are triangulated and vertices are single-indexed so that UVs
    /// line up with positions.
    pub fn load_obj(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|source| MeshError::Obj {
            path: path.display().to_string(),
            source,
        })?;

        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let mut uvs = Vec::new();
        let mut all_have_uvs = true;

        for model in &models {
            let mesh = &model.mesh;
            let base = positions.len() as u32;
            let vertex_count = mesh.positions.len() / 3;

            positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));
            indices.extend(mesh.indices.iter().map(|i| i + base));

            if mesh.texcoords.len() == vertex_count * 2 {
                uvs.extend(mesh.texcoords.chunks_exact(2).map(|uv| [uv[0], uv[1]]));
            } else {
                all_have_uvs = false;
            }
        }

        log::info!(
            "Loaded {}: {} models, {} vertices, {} triangles, uvs: {}",
            path.display(),
            models.len(),
            positions.len(),
            indices.len() / 3,
            all_have_uvs && !uvs.is_empty()
        );

        let uvs = (all_have_uvs && !uvs.is_empty()).then_some(uvs);
        let mesh = Self::new(positions, indices, uvs);
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check that every triangle references existing vertices and that the
    /// UV array, when present, has one entry per vertex.
    pub fn validate(&self) -> MeshResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(self.indices.len()));
        }

        let vertex_count = self.positions.len();
        for (i, &index) in self.indices.iter().enumerate() {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    triangle: i / 3,
                    index,
                    vertex_count,
                });
            }
        }

        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count {
                return Err(MeshError::UvCountMismatch {
                    uv_count: uvs.len(),
                    vertex_count,
                });
            }
        }

        Ok(())
    }

    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        Aabb::from_points(min, max)
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `prim`.
    #[inline]
    pub fn triangle_indices(&self, prim: usize) -> [usize; 3] {
        let base = 3 * prim;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Vertex positions of triangle `prim`.
    #[inline]
    pub fn triangle(&self, prim: usize) -> [Vec3; 3] {
        let [i0, i1, i2] = self.triangle_indices(prim);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// UVs of triangle `prim`, if the mesh carries UVs.
    #[inline]
    pub fn triangle_uvs(&self, prim: usize) -> Option<[[f32; 2]; 3]> {
        let uvs = self.uvs.as_ref()?;
        let [i0, i1, i2] = self.triangle_indices(prim);
        Some([uvs[i0], uvs[i1], uvs[i2]])
    }
}
