//! Indexed triangle meshes (spec.md §3 "Shape::Mesh" and the two 3D
//! companion meshes a `Punched` shape carries).

use crate::error::{Result, SolveError};
use crate::geometry::{Float, Normal3f, Point3f};

#[derive(Debug, Clone, Copy)]
pub struct Texcoord {
    pub u: Float,
    pub v: Float,
}

/// Per-vertex attributes. Position is required; normal and texcoord are
/// optional (spec.md §3: "per-vertex attributes (position required; normal
/// and texcoord optional)").
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Normal3f>>,
    pub texcoords: Option<Vec<Texcoord>>,
    /// Three indices per triangle.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(
        positions: Vec<Point3f>,
        normals: Option<Vec<Normal3f>>,
        texcoords: Option<Vec<Texcoord>>,
        indices: Vec<[u32; 3]>,
    ) -> Result<Self> {
        let n = positions.len();
        if let Some(ref normals) = normals {
            if normals.len() != n {
                return Err(SolveError::BadArgument(
                    "mesh normal count must match position count".into(),
                ));
            }
        }
        if let Some(ref tc) = texcoords {
            if tc.len() != n {
                return Err(SolveError::BadArgument(
                    "mesh texcoord count must match position count".into(),
                ));
            }
        }
        for tri in &indices {
            for &idx in tri {
                if idx as usize >= n {
                    return Err(SolveError::BadArgument(
                        "mesh triangle index out of range".into(),
                    ));
                }
            }
        }
        Ok(TriangleMesh { positions, normals, texcoords, indices })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_vertices(&self, tri_index: usize) -> [Point3f; 3] {
        let [a, b, c] = self.indices[tri_index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    pub fn triangle_area(&self, tri_index: usize) -> Float {
        let [a, b, c] = self.triangle_vertices(tri_index);
        (b - a).cross(&(c - a)).length() * 0.5
    }

    /// Total surface area, accumulated from each triangle's cross-product
    /// (spec.md §4.1: "Store both proxy areas (accumulated from the
    /// triangle cross-products)").
    pub fn total_area(&self) -> Float {
        (0..self.triangle_count()).map(|i| self.triangle_area(i)).sum()
    }

    pub fn geometric_normal(&self, tri_index: usize) -> Normal3f {
        let [a, b, c] = self.triangle_vertices(tri_index);
        (b - a).cross(&(c - a)).normalize()
    }
}
