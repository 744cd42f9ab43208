//! Lambertian matte material (spec.md §4.2 "Matte").

use super::{Shader, SurfaceFragment};
use crate::geometry::{coordinate_system, Float, Vector3f};
use crate::rng::CounterRng;
use std::f32::consts::PI;

pub struct MatteMaterial {
    pub shader: Shader,
}

impl MatteMaterial {
    pub fn new(shader: Shader) -> Self {
        MatteMaterial { shader }
    }

    /// Cosine-weighted hemisphere sampling about the shading normal. The
    /// cosine term in the Lambertian BRDF (`rho/pi`) cancels exactly
    /// against the `cos(theta)/pi` sampling density, so the returned
    /// reflectance is the shader's reflectivity unmodified.
    pub fn sample(&self, rng: &mut CounterRng, frag: &SurfaceFragment, wavelength: Float) -> (Vector3f, Float) {
        let n = frag.shading_basis();
        let (t1, t2) = coordinate_system(&n);
        let (u1, u2) = rng.uniform_f32x2();
        let r = u1.sqrt();
        let phi = 2.0 * PI * u2;
        let local = Vector3f::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt());
        let wo = (t1 * local.x + t2 * local.y + n * local.z).normalize();
        let reflectivity = (self.shader.reflectivity)(frag, wavelength);
        (wo, reflectivity.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Normal3f, Point3f};

    #[test]
    fn sampled_direction_stays_in_upper_hemisphere() {
        let material = MatteMaterial::new(Shader::constant(0.8));
        let frag = SurfaceFragment {
            p: Point3f::default(),
            wi: Vector3f::new(0.0, 0.0, -1.0),
            geometric_normal: Normal3f::new(0.0, 0.0, 1.0),
            shading_normal: None,
            uv: None,
        };
        let mut rng = CounterRng::from_seed(9);
        for _ in 0..200 {
            let (wo, r) = material.sample(&mut rng, &frag, 1.0);
            assert!(wo.dot(&frag.geometric_normal) > -1e-4);
            assert!((r - 0.8).abs() < 1e-6);
        }
    }
}
