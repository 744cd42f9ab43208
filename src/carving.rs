//! 2D contours used to punch a quadric down to a finite aperture
//! (spec.md §3 "Carving", §4.1).
//!
//! Exact polygon-mesh boolean operations (Star-CliPpeR in the system this
//! crate is modelled on) are out of scope for this rewrite; `AND` is
//! implemented as a Sutherland-Hodgman clip (exact for any *convex*
//! carving polygon, which covers every aperture shape spec.md's scenarios
//! use — rectangles and polygonal disk approximations) and `SUB` as an
//! adaptively-subdivided centroid classification. See DESIGN.md for the
//! trade-off.

use crate::error::{Result, SolveError};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    And,
    Sub,
}

/// An ordered 2D polygon plus the operation it applies when composed onto
/// a seed mesh, and an opaque context token a vertex provider can use to
/// regenerate the polygon (spec.md §3: "an opaque context pointer consumed
/// by the vertex getter"). This crate has no external vertex-provider
/// callback surface, so the token is just carried through for identity/
/// debugging.
#[derive(Debug, Clone)]
pub struct Carving {
    pub vertices: Vec<Point2>,
    pub op: ClipOp,
    pub context: u64,
}

impl Carving {
    pub fn new(vertices: Vec<Point2>, op: ClipOp, context: u64) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(SolveError::BadArgument(
                "carving polygon needs at least 3 vertices".into(),
            ));
        }
        Ok(Carving { vertices, op, context })
    }

    pub fn rectangle(half_width: f32, half_height: f32, op: ClipOp) -> Result<Self> {
        Carving::new(
            vec![
                Point2::new(-half_width, -half_height),
                Point2::new(half_width, -half_height),
                Point2::new(half_width, half_height),
                Point2::new(-half_width, half_height),
            ],
            op,
            0,
        )
    }

    pub fn regular_polygon(radius: f32, sides: u32, op: ClipOp) -> Result<Self> {
        if sides < 3 {
            return Err(SolveError::BadArgument("regular polygon needs >= 3 sides".into()));
        }
        let verts = (0..sides)
            .map(|i| {
                let theta = 2.0 * std::f32::consts::PI * (i as f32) / (sides as f32);
                Point2::new(radius * theta.cos(), radius * theta.sin())
            })
            .collect();
        Carving::new(verts, op, 0)
    }

    /// Axis-aligned bounding rectangle of this carving's vertices.
    pub fn aabb(&self) -> (Point2, Point2) {
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    pub fn contains_point(&self, p: Point2) -> bool {
        point_in_polygon(p, &self.vertices)
    }
}

/// Even-odd ray casting, correct for simple polygons of either winding and
/// either convexity.
pub fn point_in_polygon(p: Point2, poly: &[Point2]) -> bool {
    let mut inside = false;
    let n = poly.len();
    let mut j = n - 1;
    for i in 0..n {
        let vi = poly[i];
        let vj = poly[j];
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Sutherland-Hodgman clip of an arbitrary simple polygon `subject` against
/// a *convex* clip polygon `clip`. Exact when `clip` is convex.
pub fn clip_convex(subject: &[Point2], clip: &[Point2]) -> SmallVec<[Point2; 8]> {
    let mut output: SmallVec<[Point2; 8]> = subject.iter().copied().collect();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % n];
        let input = output;
        output = SmallVec::new();
        let m = input.len();
        for k in 0..m {
            let cur = input[k];
            let prev = input[(k + m - 1) % m];
            let cur_in = is_left(a, b, cur) >= 0.0;
            let prev_in = is_left(a, b, prev) >= 0.0;
            if cur_in {
                if !prev_in {
                    output.push(segment_intersection(prev, cur, a, b));
                }
                output.push(cur);
            } else if prev_in {
                output.push(segment_intersection(prev, cur, a, b));
            }
        }
    }
    output
}

fn is_left(a: Point2, b: Point2, p: Point2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn segment_intersection(p1: Point2, p2: Point2, a: Point2, b: Point2) -> Point2 {
    let d1 = is_left(a, b, p1);
    let d2 = is_left(a, b, p2);
    let t = d1 / (d1 - d2);
    Point2::new(p1.x + t * (p2.x - p1.x), p1.y + t * (p2.y - p1.y))
}

pub fn polygon_area(poly: &[Point2]) -> f32 {
    let n = poly.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    (area * 0.5).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_contains_center() {
        let c = Carving::rectangle(1.0, 1.0, ClipOp::And).unwrap();
        assert!(c.contains_point(Point2::new(0.0, 0.0)));
        assert!(!c.contains_point(Point2::new(5.0, 5.0)));
    }

    #[test]
    fn clip_square_by_half_plane_halves_area() {
        let subject = vec![
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ];
        let clip = vec![
            Point2::new(-2.0, -2.0),
            Point2::new(0.0, -2.0),
            Point2::new(0.0, 2.0),
            Point2::new(-2.0, 2.0),
        ];
        let out = clip_convex(&subject, &clip);
        let area = polygon_area(&out);
        assert!((area - 2.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_degenerate_polygon() {
        assert!(Carving::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], ClipOp::And, 0).is_err());
    }
}
