//! Vectors, points, rays and the 3x4 affine transform used to place every
//! quadric, mesh and instance into world space.

use impl_ops::*;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::ops;

pub type Float = f32;

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Vector3f { x, y, z }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    pub fn normalize(&self) -> Vector3f {
        let len = self.length();
        if len == 0.0 {
            *self
        } else {
            *self / len
        }
    }
    pub fn dot(&self, other: &Vector3f) -> Float {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    pub fn cross(&self, other: &Vector3f) -> Vector3f {
        Vector3f::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

pub type Point3f = Vector3f;
pub type Normal3f = Vector3f;

/// Builds an orthonormal basis `(t1, t2)` such that `(t1, t2, v)` is
/// right-handed, for rotating a direction sampled about +Z into the frame
/// of a given main direction (sun sampling, disk sampling).
pub fn coordinate_system(v: &Vector3f) -> (Vector3f, Vector3f) {
    let t1 = if v.x.abs() > v.y.abs() {
        Vector3f::new(-v.z, 0.0, v.x).normalize()
    } else {
        Vector3f::new(0.0, v.z, -v.y).normalize()
    };
    let t2 = v.cross(&t1);
    (t1, t2)
}

impl_op_ex!(+ |a: &Vector3f, b: &Vector3f| -> Vector3f { Vector3f::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f::new(a.x - b.x, a.y - b.y, a.z - b.z)
});
impl_op_ex!(-|a: &Vector3f| -> Vector3f { Vector3f::new(-a.x, -a.y, -a.z) });
impl_op_ex!(*|a: &Vector3f, s: Float| -> Vector3f { Vector3f::new(a.x * s, a.y * s, a.z * s) });
impl_op_ex!(*|s: Float, a: &Vector3f| -> Vector3f { a * s });
impl_op_ex!(/|a: &Vector3f, s: Float| -> Vector3f { Vector3f::new(a.x / s, a.y / s, a.z / s) });
impl_op_ex!(+= |a: &mut Vector3f, b: &Vector3f| { a.x += b.x; a.y += b.y; a.z += b.z; });

/// A ray in either object- or world-space, with a mutable far bound so the
/// hit filter can tighten the search interval as candidate hits are
/// rejected (self-intersection, virtual-material discard) without
/// reallocating.
#[derive(Debug, Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub t_max: Cell<Float>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Ray { o, d, t_max: Cell::new(t_max) }
    }
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

/// A 3x4 affine transform (rotation+scale in `m`, translation in `t`) and
/// its inverse, used both to place quadrics/meshes in world space and to
/// transform normals via the inverse-transpose of `m`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform3 {
    pub m: [[Float; 3]; 3],
    pub t: Vector3f,
    pub m_inv: [[Float; 3]; 3],
    pub t_inv: Vector3f,
}

impl Default for Transform3 {
    fn default() -> Self {
        Transform3::identity()
    }
}

impl Transform3 {
    pub fn identity() -> Self {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        Transform3 {
            m: id,
            t: Vector3f::default(),
            m_inv: id,
            t_inv: Vector3f::default(),
        }
    }

    /// Builds a transform from a 3x3 linear part and a translation,
    /// computing its inverse. `BadArgument` if `m` is singular.
    pub fn new(m: [[Float; 3]; 3], t: Vector3f) -> crate::error::Result<Self> {
        let m_inv = invert3x3(&m)
            .ok_or_else(|| crate::error::SolveError::BadArgument("singular transform".into()))?;
        let t_inv = apply_linear(&m_inv, &(-t));
        Ok(Transform3 { m, t, m_inv, t_inv })
    }

    pub fn translation(t: Vector3f) -> Self {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        Transform3 { m: id, t, m_inv: id, t_inv: -t }
    }

    /// Uniform Jacobian scale factor: `det(m)^(1/3)` for an isotropic
    /// scale, used to scale a sampling-proxy area from object space into
    /// world space (spec.md §4.5).
    pub fn jacobian_scale(&self) -> Float {
        det3(&self.m).abs().cbrt()
    }

    pub fn transform_point(&self, p: &Point3f) -> Point3f {
        apply_linear(&self.m, p) + self.t
    }

    pub fn transform_vector(&self, v: &Vector3f) -> Vector3f {
        apply_linear(&self.m, v)
    }

    /// Normals transform by the inverse-transpose of the linear part.
    pub fn transform_normal(&self, n: &Normal3f) -> Normal3f {
        apply_linear_transpose(&self.m_inv, n)
    }

    pub fn inverse_transform_point(&self, p: &Point3f) -> Point3f {
        apply_linear(&self.m_inv, p) + self.t_inv
    }

    pub fn inverse_transform_vector(&self, v: &Vector3f) -> Vector3f {
        apply_linear(&self.m_inv, v)
    }

    pub fn transform_ray_to_object(&self, r: &Ray) -> Ray {
        Ray::new(
            self.inverse_transform_point(&r.o),
            self.inverse_transform_vector(&r.d),
            r.t_max.get(),
        )
    }
}

fn apply_linear(m: &[[Float; 3]; 3], v: &Vector3f) -> Vector3f {
    Vector3f::new(
        m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
        m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
        m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
    )
}

fn apply_linear_transpose(m: &[[Float; 3]; 3], v: &Vector3f) -> Vector3f {
    Vector3f::new(
        m[0][0] * v.x + m[1][0] * v.y + m[2][0] * v.z,
        m[0][1] * v.x + m[1][1] * v.y + m[2][1] * v.z,
        m[0][2] * v.x + m[1][2] * v.y + m[2][2] * v.z,
    )
}

fn det3(m: &[[Float; 3]; 3]) -> Float {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn invert3x3(m: &[[Float; 3]; 3]) -> Option<[[Float; 3]; 3]> {
    let det = det3(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut r = [[0.0; 3]; 3];
    r[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    r[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    r[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    r[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    r[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    r[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    r[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    r[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    r[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_length() {
        let v = Vector3f::new(3.0, 4.0, 0.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn identity_roundtrips() {
        let t = Transform3::identity();
        let p = Point3f::new(1.0, 2.0, 3.0);
        assert_eq!(t.transform_point(&p), p);
    }

    #[test]
    fn translation_inverse_roundtrips() {
        let t = Transform3::translation(Vector3f::new(1.0, -2.0, 5.0));
        let p = Point3f::new(0.5, 0.5, 0.5);
        let moved = t.transform_point(&p);
        let back = t.inverse_transform_point(&moved);
        assert!((back - p).length() < 1e-6);
    }
}
