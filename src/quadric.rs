//! Local-space analytic quadrics (spec.md §3 "Quadric", §4.1).
//!
//! Each variant precomputes whatever its implicit form needs, exposes a
//! height function `h(x, y)` used to lift the punched surface's 2D
//! triangulation into 3D, and an exact ray/quadric intersection used to
//! refine the triangle-proxy's broad-phase hit (spec.md §4.1: "the kernel
//! refines each hit by substituting the ray into the quadric's implicit
//! equation and solving the resulting degree-2 polynomial").
//!
//! Grounded on the teacher's `shapes::sphere` (the per-shape direct
//! derivation of ray/quadric coefficients rather than a generic conic
//! solver) and on `hackmad-pbrt-rust`'s `shapes/paraboloid.rs` for the
//! truncated-paraboloid intersection shape.

use crate::error::{Result, SolveError};
use crate::geometry::{Float, Normal3f, Point3f, Ray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DiscretisationHint {
    Auto,
    Explicit(u32),
}

#[derive(Debug, Clone, Copy)]
pub enum Quadric {
    Plane,
    Parabol {
        focal: Float,
    },
    Hyperbol {
        real_focal: Float,
        img_focal: Float,
        /// `a^2` of the published form.
        a2: Float,
        /// `b` of the published form; the vertex at the local origin sits
        /// at `z=0`, so the implicit equation in the form this crate
        /// evaluates is `(x^2+y^2)/a2 - (z+b)^2/b^2 + 1 = 0`.
        b: Float,
    },
    ParabolicCylinder {
        focal: Float,
    },
    Hemisphere {
        radius: Float,
    },
}

impl Quadric {
    pub fn plane() -> Self {
        Quadric::Plane
    }

    pub fn parabol(focal: Float) -> Result<Self> {
        if focal <= 0.0 {
            return Err(SolveError::BadArgument("parabol focal must be positive".into()));
        }
        Ok(Quadric::Parabol { focal })
    }

    pub fn parabolic_cylinder(focal: Float) -> Result<Self> {
        if focal <= 0.0 {
            return Err(SolveError::BadArgument(
                "parabolic cylinder focal must be positive".into(),
            ));
        }
        Ok(Quadric::ParabolicCylinder { focal })
    }

    pub fn hemisphere(radius: Float) -> Result<Self> {
        if radius <= 0.0 {
            return Err(SolveError::BadArgument("hemisphere radius must be positive".into()));
        }
        Ok(Quadric::Hemisphere { radius })
    }

    pub fn hyperbol(real_focal: Float, img_focal: Float) -> Result<Self> {
        if real_focal <= 0.0 || img_focal <= 0.0 {
            return Err(SolveError::BadArgument(
                "hyperbol real/img focal must be positive".into(),
            ));
        }
        let g = real_focal + img_focal;
        let f = real_focal / g;
        let a2 = g * g * (f - f * f);
        let b = g * (f - 0.5).abs();
        Ok(Quadric::Hyperbol { real_focal, img_focal, a2, b })
    }

    /// Height of the surface above the z=0 plane at local `(x, y)`.
    pub fn height(&self, x: Float, y: Float) -> Float {
        match self {
            Quadric::Plane => 0.0,
            Quadric::Parabol { focal } => (x * x + y * y) / (4.0 * focal),
            Quadric::ParabolicCylinder { focal } => (y * y) / (4.0 * focal),
            Quadric::Hemisphere { radius } => radius - (radius * radius - x * x - y * y).max(0.0).sqrt(),
            Quadric::Hyperbol { a2, b, .. } => {
                let u = (x * x + y * y) / a2 + 1.0;
                b * (u.max(0.0).sqrt() - 1.0)
            }
        }
    }

    /// Outward-facing analytic normal at a local-space point assumed to
    /// lie on the quadric.
    pub fn gradient(&self, p: Point3f) -> Normal3f {
        let n = match self {
            Quadric::Plane => Normal3f::new(0.0, 0.0, 1.0),
            Quadric::Parabol { focal } => Normal3f::new(2.0 * p.x, 2.0 * p.y, -4.0 * focal),
            Quadric::ParabolicCylinder { focal } => Normal3f::new(0.0, 2.0 * p.y, -4.0 * focal),
            Quadric::Hemisphere { radius } => Normal3f::new(-p.x, -p.y, radius - p.z),
            Quadric::Hyperbol { a2, b, .. } => {
                Normal3f::new(2.0 * p.x / a2, 2.0 * p.y / a2, -2.0 * (p.z + b) / (b * b))
            }
        };
        n.normalize()
    }

    /// Ray/quadric coefficients `(a, b, c)` for `a*t^2 + b*t + c = 0` in the
    /// quadric's own local space.
    fn ray_coefficients(&self, ray: &Ray) -> (Float, Float, Float) {
        let (ox, oy, oz) = (ray.o.x, ray.o.y, ray.o.z);
        let (dx, dy, dz) = (ray.d.x, ray.d.y, ray.d.z);
        match self {
            Quadric::Plane => (0.0, dz, oz),
            Quadric::Parabol { focal } => {
                let a = dx * dx + dy * dy;
                let b = 2.0 * (ox * dx + oy * dy) - 4.0 * focal * dz;
                let c = ox * ox + oy * oy - 4.0 * focal * oz;
                (a, b, c)
            }
            Quadric::ParabolicCylinder { focal } => {
                let a = dy * dy;
                let b = 2.0 * oy * dy - 4.0 * focal * dz;
                let c = oy * oy - 4.0 * focal * oz;
                (a, b, c)
            }
            Quadric::Hemisphere { radius } => {
                let a = dx * dx + dy * dy + dz * dz;
                let b = 2.0 * (ox * dx + oy * dy + oz * dz) - 2.0 * radius * dz;
                let c = ox * ox + oy * oy + oz * oz - 2.0 * radius * oz;
                (a, b, c)
            }
            Quadric::Hyperbol { a2, b: bv, .. } => {
                let b2 = bv * bv;
                let zb = oz + bv;
                let a = (dx * dx + dy * dy) / a2 - dz * dz / b2;
                let b = 2.0 * (ox * dx + oy * dy) / a2 - 2.0 * zb * dz / b2;
                let c = (ox * ox + oy * oy) / a2 - zb * zb / b2 + 1.0;
                (a, b, c)
            }
        }
    }

    /// Exact ray/quadric intersection in local space: solve the degree-2
    /// polynomial with the numerically stable formulation of spec.md §4.1
    /// and return the root closest to `hint_t` that lies within `(eps,
    /// t_max]`.
    pub fn intersect_local(&self, ray: &Ray, hint_t: Float) -> Option<(Float, Point3f, Normal3f)> {
        let (a, b, c) = self.ray_coefficients(ray);
        let roots = solve_stable(a, b, c)?;
        let eps = 1e-5;
        let t_max = ray.t_max.get();
        let mut best: Option<Float> = None;
        for t in [roots.0, roots.1] {
            if t > eps && t <= t_max {
                best = Some(match best {
                    None => t,
                    Some(prev) => {
                        if (t - hint_t).abs() < (prev - hint_t).abs() {
                            t
                        } else {
                            prev
                        }
                    }
                });
            }
        }
        let t = best?;
        let p = ray.at(t);
        let n = self.gradient(p);
        Some((t, p, n))
    }
}

/// Stable quadratic solve: `t1 = (-b - sign(b)*sqrt(delta)) / (2a)`, `t2 =
/// c / (a*t1)` (spec.md §4.1). Falls back to the linear solve when `a` is
/// negligible (the `Plane` quadric, or a ray parallel to a cylinder axis).
fn solve_stable(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    if a.abs() < 1e-10 {
        if b.abs() < 1e-10 {
            return None;
        }
        let t = -c / b;
        return Some((t, t));
    }
    let delta = b * b - 4.0 * a * c;
    if delta < 0.0 {
        return None;
    }
    let sqrt_delta = delta.sqrt();
    let sign = if b >= 0.0 { 1.0 } else { -1.0 };
    let t1 = (-b - sign * sqrt_delta) / (2.0 * a);
    if t1.abs() < 1e-12 {
        return None;
    }
    let t2 = c / (a * t1);
    Some((t1, t2))
}
