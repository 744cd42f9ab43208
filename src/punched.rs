//! Punched-surface construction: a quadric restricted to a 2D contour by
//! polygon-mesh boolean operations (spec.md §4.1).
//!
//! The exact "Star-CliPpeR"-style polygon-mesh booleans spec.md references
//! are replaced here by a Sutherland-Hodgman convex clip for `AND` and an
//! adaptively-subdivided centroid classification for `SUB` (see
//! `carving.rs`'s module doc and DESIGN.md). Everything downstream of the
//! clipped 2D mesh — area accounting, RT/sampling proxy construction —
//! follows spec.md exactly.

use crate::carving::{clip_convex, polygon_area, Carving, ClipOp, Point2};
use crate::error::{Result, SolveError};
use crate::geometry::{Point3f, Transform3};
use crate::mesh::TriangleMesh;
use crate::quadric::{DiscretisationHint, Quadric};

const MAX_DISCRETISATION_STEPS: u32 = 50;
const SUB_SUBDIVISION_DEPTH: u32 = 4;

struct Mesh2D {
    vertices: Vec<Point2>,
    indices: Vec<[u32; 3]>,
}

impl Mesh2D {
    fn push_triangle(&mut self, a: Point2, b: Point2, c: Point2) {
        let base = self.vertices.len() as u32;
        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);
        self.indices.push([base, base + 1, base + 2]);
    }
}

/// The two 3D companion meshes a punched shape carries (spec.md §3
/// "Shape::Punched"), plus their cached areas.
pub struct PunchedSurface {
    pub quadric: Quadric,
    pub placement: Transform3,
    pub rt_mesh: TriangleMesh,
    pub sampling_mesh: TriangleMesh,
}

impl PunchedSurface {
    pub fn build(
        quadric: Quadric,
        carvings: &[Carving],
        placement: Transform3,
        hint: DiscretisationHint,
    ) -> Result<Self> {
        let (min, max) = aperture_bounds(&quadric, carvings)?;
        let nsteps = discretisation_steps(&quadric, min, max, hint);

        let mut mesh2d = match quadric {
            Quadric::Hemisphere { radius } => seed_disk(radius, nsteps),
            _ => seed_grid(min, max, nsteps),
        };

        for carving in carvings {
            mesh2d = apply_carving(&mesh2d, carving);
        }
        if mesh2d.indices.is_empty() {
            return Err(SolveError::BadArgument(
                "punched surface carvings left an empty contour".into(),
            ));
        }

        let rt_positions: Vec<Point3f> = mesh2d
            .vertices
            .iter()
            .map(|p| placement.transform_point(&Point3f::new(p.x, p.y, quadric.height(p.x, p.y))))
            .collect();
        let sampling_positions: Vec<Point3f> = mesh2d
            .vertices
            .iter()
            .map(|p| placement.transform_point(&Point3f::new(p.x, p.y, 0.0)))
            .collect();

        let rt_mesh = TriangleMesh::new(rt_positions, None, None, mesh2d.indices.clone())?;
        let sampling_mesh = TriangleMesh::new(sampling_positions, None, None, mesh2d.indices)?;

        Ok(PunchedSurface { quadric, placement, rt_mesh, sampling_mesh })
    }

    pub fn rt_area(&self) -> crate::geometry::Float {
        self.rt_mesh.total_area()
    }

    pub fn sampling_area(&self) -> crate::geometry::Float {
        self.sampling_mesh.total_area()
    }
}

fn aperture_bounds(quadric: &Quadric, carvings: &[Carving]) -> Result<(Point2, Point2)> {
    if let Quadric::Hemisphere { radius } = quadric {
        return Ok((Point2::new(-radius, -radius), Point2::new(*radius, *radius)));
    }
    let and_carvings: Vec<&Carving> = carvings.iter().filter(|c| c.op == ClipOp::And).collect();
    if and_carvings.is_empty() {
        return Err(SolveError::BadArgument(
            "a non-hemisphere punched surface needs at least one AND carving to bound its aperture"
                .into(),
        ));
    }
    let mut min = and_carvings[0].aabb().0;
    let mut max = and_carvings[0].aabb().1;
    for c in &and_carvings[1..] {
        let (cmin, cmax) = c.aabb();
        min.x = min.x.min(cmin.x);
        min.y = min.y.min(cmin.y);
        max.x = max.x.max(cmax.x);
        max.y = max.y.max(cmax.y);
    }
    Ok((min, max))
}

fn discretisation_steps(
    quadric: &Quadric,
    min: Point2,
    max: Point2,
    hint: DiscretisationHint,
) -> u32 {
    if let DiscretisationHint::Explicit(n) = hint {
        return n.max(1);
    }
    let corners = [
        (min.x, min.y),
        (max.x, min.y),
        (min.x, max.y),
        (max.x, max.y),
    ];
    let max_z = corners
        .iter()
        .map(|&(x, y)| quadric.height(x, y).abs())
        .fold(0.0f32, f32::max);
    let n = 3.0 + 6.0 * max_z.sqrt();
    (n.round() as u32).clamp(1, MAX_DISCRETISATION_STEPS)
}

fn seed_grid(min: Point2, max: Point2, nsteps: u32) -> Mesh2D {
    let n = nsteps.max(1);
    let mut mesh = Mesh2D { vertices: Vec::new(), indices: Vec::new() };
    for j in 0..n {
        for i in 0..n {
            let x0 = lerp(min.x, max.x, i as f32 / n as f32);
            let x1 = lerp(min.x, max.x, (i + 1) as f32 / n as f32);
            let y0 = lerp(min.y, max.y, j as f32 / n as f32);
            let y1 = lerp(min.y, max.y, (j + 1) as f32 / n as f32);
            let p00 = Point2::new(x0, y0);
            let p10 = Point2::new(x1, y0);
            let p01 = Point2::new(x0, y1);
            let p11 = Point2::new(x1, y1);
            mesh.push_triangle(p00, p10, p11);
            mesh.push_triangle(p00, p11, p01);
        }
    }
    mesh
}

fn seed_disk(radius: f32, nsteps: u32) -> Mesh2D {
    let n = nsteps.max(3);
    let center = Point2::new(0.0, 0.0);
    let mut mesh = Mesh2D { vertices: Vec::new(), indices: Vec::new() };
    for i in 0..n {
        let t0 = 2.0 * std::f32::consts::PI * (i as f32) / (n as f32);
        let t1 = 2.0 * std::f32::consts::PI * ((i + 1) as f32) / (n as f32);
        let p0 = Point2::new(radius * t0.cos(), radius * t0.sin());
        let p1 = Point2::new(radius * t1.cos(), radius * t1.sin());
        mesh.push_triangle(center, p0, p1);
    }
    mesh
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

fn apply_carving(mesh: &Mesh2D, carving: &Carving) -> Mesh2D {
    match carving.op {
        ClipOp::And => apply_and(mesh, carving),
        ClipOp::Sub => apply_sub(mesh, carving),
    }
}

fn apply_and(mesh: &Mesh2D, carving: &Carving) -> Mesh2D {
    let mut out = Mesh2D { vertices: Vec::new(), indices: Vec::new() };
    for tri in &mesh.indices {
        let triangle = [
            mesh.vertices[tri[0] as usize],
            mesh.vertices[tri[1] as usize],
            mesh.vertices[tri[2] as usize],
        ];
        let clipped = clip_convex(&triangle, &carving.vertices);
        if clipped.len() < 3 || polygon_area(&clipped) < 1e-12 {
            continue;
        }
        for i in 1..clipped.len() - 1 {
            out.push_triangle(clipped[0], clipped[i], clipped[i + 1]);
        }
    }
    out
}

fn apply_sub(mesh: &Mesh2D, carving: &Carving) -> Mesh2D {
    let mut out = Mesh2D { vertices: Vec::new(), indices: Vec::new() };
    for tri in &mesh.indices {
        let triangle = [
            mesh.vertices[tri[0] as usize],
            mesh.vertices[tri[1] as usize],
            mesh.vertices[tri[2] as usize],
        ];
        subdivide_outside(triangle, carving, SUB_SUBDIVISION_DEPTH, &mut out);
    }
    out
}

fn subdivide_outside(tri: [Point2; 3], carving: &Carving, depth: u32, out: &mut Mesh2D) {
    let inside_flags = [
        carving.contains_point(tri[0]),
        carving.contains_point(tri[1]),
        carving.contains_point(tri[2]),
    ];
    if inside_flags.iter().all(|&v| !v) {
        out.push_triangle(tri[0], tri[1], tri[2]);
        return;
    }
    if inside_flags.iter().all(|&v| v) {
        return;
    }
    if depth == 0 {
        let centroid = Point2::new(
            (tri[0].x + tri[1].x + tri[2].x) / 3.0,
            (tri[0].y + tri[1].y + tri[2].y) / 3.0,
        );
        if !carving.contains_point(centroid) {
            out.push_triangle(tri[0], tri[1], tri[2]);
        }
        return;
    }
    let m01 = midpoint(tri[0], tri[1]);
    let m12 = midpoint(tri[1], tri[2]);
    let m20 = midpoint(tri[2], tri[0]);
    subdivide_outside([tri[0], m01, m20], carving, depth - 1, out);
    subdivide_outside([m01, tri[1], m12], carving, depth - 1, out);
    subdivide_outside([m20, m12, tri[2]], carving, depth - 1, out);
    subdivide_outside([m01, m12, m20], carving, depth - 1, out);
}

fn midpoint(a: Point2, b: Point2) -> Point2 {
    Point2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}
