//! Fresnel reflectance and the specular reflect/refract geometry shared by
//! the dielectric, mirror and thin-dielectric materials.
//!
//! Grounded on the teacher's `core::reflection` (`Fresnel`,
//! `SpecularReflection`, `SpecularTransmission` in `materials::mirror`'s
//! imports), generalised to a plain free-function form since this crate
//! dispatches materials through an enum rather than trait objects.

use crate::geometry::{Float, Normal3f, Vector3f};

/// Unpolarised Fresnel reflectance at a dielectric/dielectric boundary.
/// `cos_theta_i` is the cosine between the incident ray and the normal
/// (can be negative; the function handles entering/exiting automatically).
pub fn fresnel_dielectric(cos_theta_i: Float, eta_i: Float, eta_t: Float) -> Float {
    let mut cos_i = cos_theta_i.clamp(-1.0, 1.0);
    let (eta_i, eta_t) = if cos_i > 0.0 {
        (eta_i, eta_t)
    } else {
        cos_i = -cos_i;
        (eta_t, eta_i)
    };
    let sin_t2 = (eta_i / eta_t).powi(2) * (1.0 - cos_i * cos_i).max(0.0);
    if sin_t2 >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_t = (1.0 - sin_t2).max(0.0).sqrt();
    let r_parallel = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    0.5 * (r_parallel * r_parallel + r_perp * r_perp)
}

/// Mirror reflection of `wi` (pointing away from the surface, as produced
/// by `-incoming_direction`) about `n`.
pub fn reflect(wi: &Vector3f, n: &Normal3f) -> Vector3f {
    *n * (2.0 * wi.dot(n)) - *wi
}

/// Snell refraction of `wi` (pointing away from the surface) through a
/// boundary of relative index `eta = eta_i / eta_t`. `None` on total
/// internal reflection.
pub fn refract(wi: &Vector3f, n: &Normal3f, eta: Float) -> Option<Vector3f> {
    let cos_i = wi.dot(n);
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = eta * eta * sin2_i;
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(*n * (eta * cos_i - cos_t) - *wi * eta)
}

/// Beckmann microfacet normal distribution function.
pub fn beckmann_d(cos_theta_h: Float, alpha: Float) -> Float {
    if cos_theta_h <= 0.0 {
        return 0.0;
    }
    let cos2 = cos_theta_h * cos_theta_h;
    let tan2 = (1.0 - cos2) / cos2;
    let alpha2 = (alpha * alpha).max(1e-6);
    (-tan2 / alpha2).exp() / (std::f32::consts::PI * alpha2 * cos2 * cos2)
}

/// Smith masking-shadowing term (separable, one direction).
fn smith_g1(cos_theta: Float, alpha: Float) -> Float {
    if cos_theta <= 0.0 {
        return 0.0;
    }
    let tan_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt() / cos_theta;
    if tan_theta == 0.0 {
        return 1.0;
    }
    let a = 1.0 / (alpha * tan_theta);
    if a >= 1.6 {
        1.0
    } else {
        (3.535 * a + 2.181 * a * a) / (1.0 + 2.276 * a + 2.577 * a * a)
    }
}

pub fn smith_g(cos_wo: Float, cos_wi: Float, alpha: Float) -> Float {
    smith_g1(cos_wo, alpha) * smith_g1(cos_wi, alpha)
}

/// Sample a Beckmann half-vector about the shading normal, in the local
/// frame where `n = (0, 0, 1)` — callers rotate into world space.
pub fn sample_beckmann_half_vector(u1: Float, u2: Float, alpha: Float) -> (Float, Float) {
    let tan2_theta = -(alpha * alpha) * (1.0 - u1).max(1e-7).ln();
    let cos_theta = 1.0 / (1.0 + tan2_theta).sqrt();
    let phi = 2.0 * std::f32::consts::PI * u2;
    (cos_theta, phi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_matches_classic_formula() {
        let r = fresnel_dielectric(1.0, 1.0, 1.5);
        let expected = ((1.5 as crate::geometry::Float - 1.0) / (1.5 + 1.0)).powi(2);
        assert!((r - expected).abs() < 1e-5);
    }

    #[test]
    fn grazing_incidence_approaches_total_reflection() {
        let r = fresnel_dielectric(0.001, 1.0, 1.5);
        assert!(r > 0.9);
    }

    #[test]
    fn reflect_preserves_angle_to_normal() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wi = Vector3f::new(1.0, 0.0, 1.0).normalize();
        let wo = reflect(&wi, &n);
        assert!((wo.dot(&n) - wi.dot(&n)).abs() < 1e-6);
    }
}
