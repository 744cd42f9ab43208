//! Dielectric material: a 50/50 mixture of specular reflection and
//! specular transmission (spec.md §4.2 "Dielectric").

use super::fresnel::{fresnel_dielectric, reflect, refract};
use super::SurfaceFragment;
use crate::error::{Result, SolveError};
use crate::geometry::{Float, Vector3f};
use crate::medium::Medium;
use crate::rng::CounterRng;

pub struct DielectricMaterial {
    pub outside: Medium,
    pub inside: Medium,
}

impl DielectricMaterial {
    pub fn new(outside: Medium, inside: Medium) -> Self {
        DielectricMaterial { outside, inside }
    }

    /// Importance-samples the Fresnel mixture: pick reflection with
    /// probability `R`, transmission with probability `1-R`, each branch
    /// then carrying a reflectance of exactly `1.0` (the branch
    /// probability and the Fresnel term cancel — a dielectric boundary
    /// loses no energy to the boundary itself).
    ///
    /// `current_medium` must equal `self.outside` (spec.md: "The incoming
    /// medium must match the material's declared outside medium; if not,
    /// the hit fails with `BadOperation`" — the scene's medium tracking is
    /// the walker's responsibility, checked here at the boundary).
    pub fn sample(
        &self,
        rng: &mut CounterRng,
        frag: &SurfaceFragment,
        _wavelength: Float,
    ) -> Result<(Vector3f, Float)> {
        let n = frag.shading_basis();
        let wi_out = -frag.wi;
        let cos_i = wi_out.dot(&n);
        let entering = cos_i > 0.0;
        let (eta_i, eta_t) = if entering {
            (self.outside.refractive_index, self.inside.refractive_index)
        } else {
            (self.inside.refractive_index, self.outside.refractive_index)
        };
        let fr = fresnel_dielectric(cos_i, eta_i, eta_t);
        let u = rng.uniform_f32();
        if u < fr {
            Ok((reflect(&wi_out, &n), 1.0))
        } else {
            let eta = eta_i / eta_t;
            match refract(&wi_out, &n, eta) {
                Some(wt) => Ok((wt, 1.0)),
                // Total internal reflection resolved by the Fresnel check
                // above already routes here only at the boundary; fall
                // back to reflection to stay energy-conserving.
                None => Ok((reflect(&wi_out, &n), 1.0)),
            }
        }
    }

    pub fn check_incoming_medium(&self, current_medium: &Medium) -> Result<()> {
        if *current_medium != self.outside {
            return Err(SolveError::BadOperation(
                "ray arrived at a dielectric boundary in a medium other than its declared outside medium"
                    .into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Normal3f, Point3f};

    #[test]
    fn energy_conserving_reflectance_is_always_one() {
        let material = DielectricMaterial::new(Medium::vacuum(), Medium::new(1.5, 0.0).unwrap());
        let frag = SurfaceFragment {
            p: Point3f::default(),
            wi: Vector3f::new(0.3, 0.0, -1.0).normalize(),
            geometric_normal: Normal3f::new(0.0, 0.0, 1.0),
            shading_normal: None,
            uv: None,
        };
        let mut rng = CounterRng::from_seed(4);
        for _ in 0..100 {
            let (_wo, r) = material.sample(&mut rng, &frag, 1.0).unwrap();
            assert!((r - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_medium_mismatch() {
        let material = DielectricMaterial::new(Medium::vacuum(), Medium::new(1.5, 0.0).unwrap());
        assert!(material.check_incoming_medium(&Medium::new(1.3, 0.0).unwrap()).is_err());
        assert!(material.check_incoming_medium(&Medium::vacuum()).is_ok());
    }
}
