//! `Shape` (spec.md §3): either a plain indexed mesh, or a punched quadric
//! with its two proxy meshes. Every shape exposes its tracing-proxy area
//! and sampling-proxy area (spec.md §3: "Every shape exposes its
//! tracing-proxy area and sampling-proxy area").

use crate::geometry::{Float, Normal3f, Point3f, Ray};
use crate::mesh::TriangleMesh;
use crate::punched::PunchedSurface;

pub enum Shape {
    Mesh(TriangleMesh),
    Punched(PunchedSurface),
}

impl Shape {
    pub fn rt_mesh(&self) -> &TriangleMesh {
        match self {
            Shape::Mesh(m) => m,
            Shape::Punched(p) => &p.rt_mesh,
        }
    }

    pub fn sampling_mesh(&self) -> &TriangleMesh {
        match self {
            Shape::Mesh(m) => m,
            Shape::Punched(p) => &p.sampling_mesh,
        }
    }

    pub fn rt_area(&self) -> Float {
        self.rt_mesh().total_area()
    }

    pub fn sampling_area(&self) -> Float {
        self.sampling_mesh().total_area()
    }

    pub fn is_punched(&self) -> bool {
        matches!(self, Shape::Punched(_))
    }

    /// Analytic refinement of a broad-phase triangle hit on a punched
    /// surface: substitute `ray_local` (in the quadric's own local space)
    /// into the quadric's implicit equation and solve exactly (spec.md
    /// §4.1). Returns `None` for a plain mesh (the broad-phase hit is
    /// already exact) or when the analytic root falls outside the ray's
    /// interval.
    pub fn refine_hit(
        &self,
        ray_local: &Ray,
        hint_t: Float,
    ) -> Option<(Float, Point3f, Normal3f)> {
        match self {
            Shape::Mesh(_) => None,
            Shape::Punched(p) => p.quadric.intersect_local(ray_local, hint_t),
        }
    }

    /// Snaps an area-sampled point from the sampling proxy onto the
    /// analytic quadric and recomputes its normal (spec.md §4.4 step 1:
    /// "If the primitive belongs to a punched shape, snap pos onto the
    /// analytic quadric and recompute the normal analytically"). `local`
    /// is the point in the quadric's own local (pre-placement) space.
    pub fn snap_to_quadric(&self, local_xy: (Float, Float)) -> Option<(Point3f, Normal3f)> {
        match self {
            Shape::Mesh(_) => None,
            Shape::Punched(p) => {
                let (x, y) = local_xy;
                let z = p.quadric.height(x, y);
                let local_p = Point3f::new(x, y, z);
                let n_local = p.quadric.gradient(local_p);
                Some((p.placement.transform_point(&local_p), p.placement.transform_normal(&n_local)))
            }
        }
    }

    pub fn placement(&self) -> Option<&crate::geometry::Transform3> {
        match self {
            Shape::Mesh(_) => None,
            Shape::Punched(p) => Some(&p.placement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carving::{Carving, ClipOp};
    use crate::geometry::Transform3;
    use crate::punched::PunchedSurface;
    use crate::quadric::{DiscretisationHint, Quadric};

    #[test]
    fn mesh_refine_hit_is_always_none() {
        let mesh = TriangleMesh::new(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            None,
            None,
            vec![[0, 1, 2]],
        )
        .unwrap();
        let shape = Shape::Mesh(mesh);
        let ray = Ray::new(Point3f::new(0.1, 0.1, 5.0), crate::geometry::Vector3f::new(0.0, 0.0, -1.0), 1e6);
        assert!(shape.refine_hit(&ray, 5.0).is_none());
    }

    #[test]
    fn punched_surface_snaps_onto_quadric() {
        let quadric = Quadric::hemisphere(2.0).unwrap();
        let surface =
            PunchedSurface::build(quadric, &[], Transform3::identity(), DiscretisationHint::Explicit(16)).unwrap();
        let shape = Shape::Punched(surface);
        let (p, n) = shape.snap_to_quadric((0.5, 0.0)).unwrap();
        assert!((p.z - (2.0 - (4.0f32 - 0.25).sqrt())).abs() < 1e-4);
        assert!(n.length() > 0.99 && n.length() < 1.01);
    }
}
