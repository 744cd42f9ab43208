//! Atmospheric extinction (spec.md §3, §4.4 step 6): currently only a
//! spatially uniform Beer's-law absorber whose extinction coefficient is a
//! function of wavelength.

use crate::geometry::Float;
use crate::spectrum::Spectrum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Atmosphere {
    Uniform { extinction: Spectrum },
}

impl Atmosphere {
    /// Extinction coefficient `k(lambda)`.
    pub fn extinction_coefficient(&self, wavelength: Float) -> Float {
        match self {
            Atmosphere::Uniform { extinction } => extinction.intensity_at(wavelength),
        }
    }

    /// Transmittance over a path of length `distance`: `exp(-k(lambda) *
    /// distance)`.
    pub fn transmittance(&self, wavelength: Float, distance: Float) -> Float {
        (-self.extinction_coefficient(wavelength) * distance).exp()
    }
}
