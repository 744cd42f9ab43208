//! Mirror material: perfect specular or Beckmann-microfacet reflection
//! (spec.md §4.2 "Mirror"). Grounded on the teacher's
//! `materials::mirror::MirrorMaterial`, generalised from always-specular to
//! the roughness-gated specular/microfacet split spec.md asks for.

use super::fresnel::{beckmann_d, reflect, sample_beckmann_half_vector, smith_g};
use super::{Shader, SurfaceFragment};
use crate::geometry::{coordinate_system, Float, Vector3f};
use crate::rng::CounterRng;

pub struct MirrorMaterial {
    pub shader: Shader,
}

impl MirrorMaterial {
    pub fn new(shader: Shader) -> Self {
        MirrorMaterial { shader }
    }

    pub fn sample(&self, rng: &mut CounterRng, frag: &SurfaceFragment, wavelength: Float) -> (Vector3f, Float) {
        let n = frag.shading_basis();
        let reflectivity = (self.shader.reflectivity)(frag, wavelength).clamp(0.0, 1.0);
        let roughness = (self.shader.roughness)(frag, wavelength).max(0.0);
        let wi_out = -frag.wi;

        if roughness <= 0.0 {
            // Pure specular reflection, constant-reflectivity Fresnel term
            // (spec.md: "use pure specular reflection with a
            // constant-reflectivity Fresnel term").
            let wo = reflect(&wi_out, &n);
            return (wo, reflectivity);
        }

        // Solving variant of the Beckmann microfacet term: sample a half
        // vector, reflect about it, and weight by reflectivity times a
        // Smith masking-shadowing factor. This is the "non-evaluable
        // microfacet2" form spec.md describes — it has no density to
        // report for next-event estimation, which the solver never needs.
        let (t1, t2) = coordinate_system(&n);
        let (u1, u2) = rng.uniform_f32x2();
        let (cos_h, phi) = sample_beckmann_half_vector(u1, u2, roughness);
        let sin_h = (1.0 - cos_h * cos_h).max(0.0).sqrt();
        let h_local = Vector3f::new(sin_h * phi.cos(), sin_h * phi.sin(), cos_h);
        let h = (t1 * h_local.x + t2 * h_local.y + n * h_local.z).normalize();
        let wo = reflect(&wi_out, &h);

        if wo.dot(&n) <= 0.0 {
            return (Vector3f::default(), 0.0);
        }
        let _ = beckmann_d(cos_h, roughness); // density cancels in the sampling estimator
        let g = smith_g(wo.dot(&n), wi_out.dot(&n), roughness);
        (wo, reflectivity * g.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Normal3f, Point3f};

    fn frag() -> SurfaceFragment {
        SurfaceFragment {
            p: Point3f::default(),
            wi: Vector3f::new(0.0, 0.0, -1.0),
            geometric_normal: Normal3f::new(0.0, 0.0, 1.0),
            shading_normal: None,
            uv: None,
        }
    }

    #[test]
    fn specular_reflection_flips_z_component() {
        let material = MirrorMaterial::new(Shader::constant(1.0));
        let mut rng = CounterRng::from_seed(1);
        let (wo, r) = material.sample(&mut rng, &frag(), 1.0);
        assert!((wo.z - 1.0).abs() < 1e-5);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rough_mirror_stays_in_upper_hemisphere() {
        let material = MirrorMaterial::new(Shader::constant_rough(0.9, 0.3));
        let mut rng = CounterRng::from_seed(2);
        for _ in 0..200 {
            let (wo, r) = material.sample(&mut rng, &frag(), 1.0);
            assert!(r >= 0.0 && r <= 1.0);
            if wo.length_squared() > 0.0 {
                assert!(wo.z >= -1e-4);
            }
        }
    }
}
