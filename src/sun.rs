//! Sun direction and wavelength sampling (spec.md §4.3, §3 "Sun").
//!
//! Grounded on the teacher's `lights::distant::DistantLight` (a single
//! dominant direction plus the bookkeeping a directional source needs) and
//! on `core::sampling`'s disk/interval-inversion idioms for `PillBox` and
//! `Buie`.

use crate::error::{Result, SolveError};
use crate::geometry::{coordinate_system, Float, Vector3f};
use crate::rng::CounterRng;
use crate::spectrum::{Spectrum, WavelengthDistribution};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const BUIE_THETA_SD: Float = 4.65e-3;
const BUIE_THETA_CS: Float = 4.36e-2;
const BUIE_NORMALISATION_A: Float = 9.224_724_7e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SunDistribution {
    Dirac,
    PillBox { half_angle: Float },
    Buie { csr: Float },
}

/// Circumsolar-ratio fit (spec.md §4.3: "via a piecewise-polynomial fit of
/// the circumsolar ratio in (0, 0.849]"). CSR values are clamped into that
/// domain before evaluation.
fn chi_of_csr(csr: Float) -> Float {
    let csr = csr.clamp(1e-4, 0.849);
    if csr > 0.145 {
        -0.044_199_1
            + csr
                * (1.401_244_5
                    + csr * (-0.363_974_67 + csr * (-0.957_976_86 + csr * 1.904_910_5)))
    } else if csr > 0.035 {
        0.000_089_7 + csr * (0.015_72 - 0.002_718 * csr + 0.001_008 * csr * csr)
    } else {
        0.041_66 + csr * (0.319_70 - 0.632_7 * csr)
    }
}

fn buie_phi(theta: Float, gamma: Float, k: Float) -> Float {
    if theta < BUIE_THETA_SD {
        (326.0 * theta).cos() / (308.0 * theta).cos()
    } else {
        k.exp() * (1000.0 * theta).powf(gamma)
    }
}

struct BuieParams {
    gamma: Float,
    k: Float,
}

impl BuieParams {
    fn for_csr(csr: Float) -> Self {
        let chi = chi_of_csr(csr);
        let gamma = 2.2 * (0.52 * chi).ln() * chi.powf(0.43) - 0.1;
        let k = 0.9 * (13.5 * chi).ln() * chi.powf(-0.3);
        BuieParams { gamma, k }
    }

    fn normalisation_b(&self) -> Float {
        let p = self.gamma + 2.0;
        self.k.exp() * 1000f32.powf(self.gamma) / p
            * (BUIE_THETA_CS.powf(p) - BUIE_THETA_SD.powf(p))
    }
}

/// Sun direction and wavelength sampling (spec.md §3 "Sun"): a variant
/// distribution rotationally symmetric about `main_direction`, a DNI, and
/// the spectrum its wavelengths are drawn from.
#[derive(Debug, Clone)]
pub struct Sun {
    pub distribution: SunDistribution,
    pub main_direction: Vector3f,
    pub dni: Float,
    pub spectrum: Spectrum,
    wavelength_dist: WavelengthDistribution,
}

impl Sun {
    pub fn new(
        distribution: SunDistribution,
        main_direction: Vector3f,
        dni: Float,
        spectrum: Spectrum,
    ) -> Result<Self> {
        if dni <= 0.0 {
            return Err(SolveError::BadArgument("DNI must be positive".into()));
        }
        if main_direction.length_squared() < 1e-12 {
            return Err(SolveError::BadArgument(
                "sun main direction must be non-zero".into(),
            ));
        }
        match &distribution {
            SunDistribution::PillBox { half_angle } if *half_angle <= 0.0 => {
                return Err(SolveError::BadArgument(
                    "pill-box half angle must be positive".into(),
                ));
            }
            SunDistribution::Buie { csr } if !(0.0..=0.849).contains(csr) => {
                return Err(SolveError::BadArgument(
                    "Buie CSR must lie in (0, 0.849]".into(),
                ));
            }
            _ => {}
        }
        let wavelength_dist = WavelengthDistribution::from_spectrum(&spectrum);
        Ok(Sun {
            distribution,
            main_direction: main_direction.normalize(),
            dni,
            spectrum,
            wavelength_dist,
        })
    }

    pub fn sample_wavelength(&self, u: Float) -> Float {
        self.wavelength_dist.sample(u)
    }

    /// Draws a direction from the sun toward the scene.
    pub fn sample_direction(&self, rng: &mut CounterRng) -> Vector3f {
        match &self.distribution {
            SunDistribution::Dirac => self.main_direction,
            SunDistribution::PillBox { half_angle } => {
                self.sample_pillbox(rng, *half_angle)
            }
            SunDistribution::Buie { csr } => self.sample_buie(rng, *csr),
        }
    }

    fn rotate_to_main(&self, local: Vector3f) -> Vector3f {
        let (t1, t2) = coordinate_system(&self.main_direction);
        (t1 * local.x + t2 * local.y + self.main_direction * local.z).normalize()
    }

    fn sample_pillbox(&self, rng: &mut CounterRng, half_angle: Float) -> Vector3f {
        let (u1, u2) = rng.uniform_f32x2();
        let radius = (half_angle * 0.5).tan();
        // uniform point in a disk of the given radius, via concentric
        // mapping (same idiom as the teacher's concentric_sample_disk).
        let r = radius * u1.sqrt();
        let phi = 2.0 * PI * u2;
        let local = Vector3f::new(r * phi.cos(), r * phi.sin(), 1.0).normalize();
        self.rotate_to_main(local)
    }

    fn sample_buie(&self, rng: &mut CounterRng, csr: Float) -> Vector3f {
        let params = BuieParams::for_csr(csr);
        let b = params.normalisation_b();
        let alpha = 1.0 / (BUIE_NORMALISATION_A + b);

        // Envelope heights are built from the normalized pdf f = alpha*phi,
        // not phi itself, so the envelope still dominates f when alpha > 1.
        let height1 = alpha * 1.001 * buie_phi(0.003_891_569_6, params.gamma, params.k);
        let height2 = alpha * buie_phi(BUIE_THETA_SD, params.gamma, params.k);
        let area1 = height1 * BUIE_THETA_SD;
        let area2 = height2 * (BUIE_THETA_CS - BUIE_THETA_SD);
        let total_area = area1 + area2;

        let theta = loop {
            let (u1, u2) = rng.uniform_f32x2();
            let (theta_candidate, height) = if u1 * total_area < area1 {
                (u2 * BUIE_THETA_SD, height1)
            } else {
                (
                    BUIE_THETA_SD + u2 * (BUIE_THETA_CS - BUIE_THETA_SD),
                    height2,
                )
            };
            let (_u3, accept_u) = rng.uniform_f32x2();
            let f = alpha * buie_phi(theta_candidate, params.gamma, params.k);
            if accept_u * height <= f {
                break theta_candidate;
            }
        };

        let phi = 2.0 * PI * rng.uniform_f32();
        let sin_t = theta.sin();
        let local = Vector3f::new(sin_t * phi.cos(), sin_t * phi.sin(), theta.cos());
        self.rotate_to_main(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SpectrumSample;

    fn flat_spectrum() -> Spectrum {
        Spectrum::new(vec![
            SpectrumSample { wavelength: 1.0, intensity: 1.0 },
            SpectrumSample { wavelength: 3.0, intensity: 1.0 },
        ])
        .unwrap()
    }

    #[test]
    fn dirac_always_returns_main_direction() {
        let sun = Sun::new(
            SunDistribution::Dirac,
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
            flat_spectrum(),
        )
        .unwrap();
        let mut rng = CounterRng::from_seed(1);
        for _ in 0..10 {
            let d = sun.sample_direction(&mut rng);
            assert!((d - sun.main_direction).length() < 1e-6);
        }
    }

    #[test]
    fn pillbox_stays_within_half_angle() {
        let sun = Sun::new(
            SunDistribution::PillBox { half_angle: 0.1 },
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
            flat_spectrum(),
        )
        .unwrap();
        let mut rng = CounterRng::from_seed(2);
        for _ in 0..500 {
            let d = sun.sample_direction(&mut rng);
            let cos_angle = d.dot(&sun.main_direction);
            assert!(cos_angle > (0.1f32).cos() - 1e-3);
        }
    }

    #[test]
    fn buie_samples_stay_within_circumsolar_cap() {
        let sun = Sun::new(
            SunDistribution::Buie { csr: 0.1 },
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
            flat_spectrum(),
        )
        .unwrap();
        let mut rng = CounterRng::from_seed(3);
        for _ in 0..200 {
            let d = sun.sample_direction(&mut rng);
            let cos_angle = d.dot(&sun.main_direction);
            assert!(cos_angle > BUIE_THETA_CS.cos() - 1e-3);
        }
    }

    #[test]
    fn rejects_bad_dni() {
        assert!(Sun::new(
            SunDistribution::Dirac,
            Vector3f::new(0.0, 0.0, -1.0),
            0.0,
            flat_spectrum(),
        )
        .is_err());
    }
}
