//! Axis-aligned bounding-box tree over the scene's triangles, grounded on
//! the teacher's `accelerators::bvh` (`BVHPrimitiveInfo`, `BVHBuildNode`,
//! the bounds-union helpers and the `EqualCounts` split method). Rebuilt
//! here as an owned, index-based tree instead of an arena of borrowed
//! nodes — the teacher's `typed_arena::Arena<'a, BVHBuildNode<'a>>`
//! construction needs a self-referential lifetime that has no natural home
//! in a `Scene` built once and then shared read-only across worker
//! threads.

use crate::geometry::{Float, Point3f};

#[derive(Debug, Clone, Copy)]
pub struct Bounds3 {
    pub min: Point3f,
    pub max: Point3f,
}

impl Bounds3 {
    pub fn empty() -> Self {
        Bounds3 {
            min: Point3f::new(Float::INFINITY, Float::INFINITY, Float::INFINITY),
            max: Point3f::new(Float::NEG_INFINITY, Float::NEG_INFINITY, Float::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3f]) -> Self {
        let mut b = Bounds3::empty();
        for p in points {
            b = b.union_point(p);
        }
        b
    }

    pub fn union_point(&self, p: &Point3f) -> Self {
        Bounds3 {
            min: Point3f::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3f::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn union(&self, other: &Bounds3) -> Self {
        self.union_point(&other.min).union_point(&other.max)
    }

    pub fn centroid(&self) -> Point3f {
        (self.min + self.max) * 0.5
    }

    pub fn max_extent_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    fn axis(&self, p: &Point3f, axis: usize) -> Float {
        match axis {
            0 => p.x,
            1 => p.y,
            _ => p.z,
        }
    }

    /// Slab-method ray/box test; `inv_d` is `1/ray.d` per component (callers
    /// precompute once per ray to avoid repeated division).
    pub fn hit(&self, o: &Point3f, inv_d: &Point3f, t_max: Float) -> bool {
        let mut t0 = 0.0f32;
        let mut t1 = t_max;
        for axis in 0..3 {
            let (omin, omax, inv, orig) = match axis {
                0 => (self.min.x, self.max.x, inv_d.x, o.x),
                1 => (self.min.y, self.max.y, inv_d.y, o.y),
                _ => (self.min.z, self.max.z, inv_d.z, o.z),
            };
            let mut near = (omin - orig) * inv;
            let mut far = (omax - orig) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = if near > t0 { near } else { t0 };
            t1 = if far < t1 { far } else { t1 };
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

enum Node {
    Leaf { bounds: Bounds3, primitives: Vec<u32> },
    Interior { bounds: Bounds3, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn bounds(&self) -> &Bounds3 {
        match self {
            Node::Leaf { bounds, .. } => bounds,
            Node::Interior { bounds, .. } => bounds,
        }
    }
}

/// A primitive is any flat index the caller wants bounded and traced — the
/// scene module hands in `(instance_index, triangle_index)` pairs packed
/// into a `u32` pair, keeping this module shape-agnostic.
pub struct Bvh {
    root: Option<Node>,
}

const MAX_LEAF_SIZE: usize = 4;

impl Bvh {
    /// Builds by median split along the bounds' longest axis (the
    /// teacher's `SplitMethod::EqualCounts`), recursing until a leaf holds
    /// at most `MAX_LEAF_SIZE` primitives.
    pub fn build(bounds: &[Bounds3]) -> Self {
        let mut indices: Vec<u32> = (0..bounds.len() as u32).collect();
        let root = if indices.is_empty() {
            None
        } else {
            Some(Self::build_node(bounds, &mut indices))
        };
        Bvh { root }
    }

    fn build_node(bounds: &[Bounds3], indices: &mut [u32]) -> Node {
        let node_bounds = indices
            .iter()
            .fold(Bounds3::empty(), |acc, &i| acc.union(&bounds[i as usize]));

        if indices.len() <= MAX_LEAF_SIZE {
            return Node::Leaf { bounds: node_bounds, primitives: indices.to_vec() };
        }

        let centroid_bounds = indices.iter().fold(Bounds3::empty(), |acc, &i| {
            acc.union_point(&bounds[i as usize].centroid())
        });
        let axis = centroid_bounds.max_extent_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            let ca = centroid_bounds.axis(&bounds[a as usize].centroid(), axis);
            let cb = centroid_bounds.axis(&bounds[b as usize].centroid(), axis);
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = Self::build_node(bounds, left_idx);
        let right = Self::build_node(bounds, right_idx);
        Node::Interior { bounds: node_bounds, left: Box::new(left), right: Box::new(right) }
    }

    /// Visits every primitive index whose leaf bounds the ray might hit;
    /// `visit` does the exact primitive test and narrows `t_max` itself via
    /// the ray's `Cell`.
    pub fn traverse(&self, o: &Point3f, inv_d: &Point3f, t_max: Float, mut visit: impl FnMut(u32)) {
        if let Some(root) = &self.root {
            Self::traverse_node(root, o, inv_d, t_max, &mut visit);
        }
    }

    fn traverse_node(node: &Node, o: &Point3f, inv_d: &Point3f, t_max: Float, visit: &mut impl FnMut(u32)) {
        if !node.bounds().hit(o, inv_d, t_max) {
            return;
        }
        match node {
            Node::Leaf { primitives, .. } => {
                for &p in primitives {
                    visit(p);
                }
            }
            Node::Interior { left, right, .. } => {
                Self::traverse_node(left, o, inv_d, t_max, visit);
                Self::traverse_node(right, o, inv_d, t_max, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_box_is_found() {
        let bounds = vec![Bounds3::from_points(&[Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 1.0, 1.0)])];
        let bvh = Bvh::build(&bounds);
        let o = Point3f::new(0.5, 0.5, 5.0);
        let d = crate::geometry::Vector3f::new(0.0, 0.0, -1.0);
        let inv_d = Point3f::new(1.0 / d.x, 1.0 / d.y, 1.0 / d.z);
        let mut hits = vec![];
        bvh.traverse(&o, &inv_d, 1e6, |p| hits.push(p));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn ray_missing_every_box_finds_nothing() {
        let bounds = vec![Bounds3::from_points(&[Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 1.0, 1.0)])];
        let bvh = Bvh::build(&bounds);
        let o = Point3f::new(10.0, 10.0, 5.0);
        let d = crate::geometry::Vector3f::new(0.0, 0.0, -1.0);
        let inv_d = Point3f::new(1.0 / d.x, 1.0 / d.y, 1.0 / d.z);
        let mut hits = vec![];
        bvh.traverse(&o, &inv_d, 1e6, |p| hits.push(p));
        assert!(hits.is_empty());
    }

    #[test]
    fn many_boxes_build_a_balanced_tree_and_all_are_reachable() {
        let bounds: Vec<Bounds3> = (0..40)
            .map(|i| {
                let x = i as f32;
                Bounds3::from_points(&[Point3f::new(x, 0.0, 0.0), Point3f::new(x + 0.5, 1.0, 1.0)])
            })
            .collect();
        let bvh = Bvh::build(&bounds);
        let mut total = 0;
        for i in 0..40 {
            let o = Point3f::new(i as f32 + 0.25, 0.5, 5.0);
            let d = crate::geometry::Vector3f::new(0.0, 0.0, -1.0);
            let inv_d = Point3f::new(1.0 / d.x, 1.0 / d.y, 1.0 / d.z);
            let mut hits = vec![];
            bvh.traverse(&o, &inv_d, 1e6, |p| hits.push(p));
            if hits.contains(&i) {
                total += 1;
            }
        }
        assert_eq!(total, 40);
    }
}
