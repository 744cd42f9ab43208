//! Wavelength spectra: ordered (wavelength, intensity) samples with linear
//! interpolation, plus the piecewise-linear `Distribution1D` used to draw a
//! wavelength from a sun's spectrum (spec.md §4.3, §3 "Wavelength
//! spectrum").

use crate::error::{Result, SolveError};
use crate::geometry::Float;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSample {
    pub wavelength: Float,
    pub intensity: Float,
}

/// Strictly increasing in wavelength, non-negative intensities, at least
/// one sample (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    samples: Vec<SpectrumSample>,
}

impl Spectrum {
    pub fn new(samples: Vec<SpectrumSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(SolveError::BadArgument(
                "spectrum must have at least one sample".into(),
            ));
        }
        for s in &samples {
            if s.intensity < 0.0 {
                return Err(SolveError::BadArgument(
                    "spectrum intensities must be non-negative".into(),
                ));
            }
        }
        for pair in samples.windows(2) {
            if pair[1].wavelength <= pair[0].wavelength {
                return Err(SolveError::BadArgument(
                    "spectrum wavelengths must be strictly increasing".into(),
                ));
            }
        }
        Ok(Spectrum { samples })
    }

    pub fn constant(wavelength: Float, intensity: Float) -> Result<Self> {
        Spectrum::new(vec![SpectrumSample { wavelength, intensity }])
    }

    pub fn samples(&self) -> &[SpectrumSample] {
        &self.samples
    }

    pub fn min_wavelength(&self) -> Float {
        self.samples[0].wavelength
    }

    pub fn max_wavelength(&self) -> Float {
        self.samples[self.samples.len() - 1].wavelength
    }

    /// Linear interpolation; clamped to the bounding endpoint outside the
    /// spectrum's range (spec.md §3: "query outside the range is clamped
    /// to the bounding endpoint").
    pub fn intensity_at(&self, wavelength: Float) -> Float {
        if wavelength <= self.samples[0].wavelength {
            return self.samples[0].intensity;
        }
        let last = self.samples.len() - 1;
        if wavelength >= self.samples[last].wavelength {
            return self.samples[last].intensity;
        }
        let idx = match self
            .samples
            .binary_search_by(|s| s.wavelength.partial_cmp(&wavelength).unwrap())
        {
            Ok(i) => return self.samples[i].intensity,
            Err(i) => i,
        };
        let a = self.samples[idx - 1];
        let b = self.samples[idx];
        let t = (wavelength - a.wavelength) / (b.wavelength - a.wavelength);
        a.intensity + t * (b.intensity - a.intensity)
    }
}

/// A piecewise-linear CDF over a spectrum's samples, used to sample a
/// wavelength proportionally to intensity. Degenerates to a single point
/// (always returns that wavelength) when built from a single-sample
/// spectrum, matching spec.md §4.3's "For a single-wavelength spectrum,
/// degenerates to a Dirac." Grounded on the teacher's `Distribution1D`
/// (core/sampling.rs): the step-function/trapezoid bookkeeping is the same
/// idea, adapted here to a piecewise-*linear* density instead of a
/// piecewise-constant one.
#[derive(Debug, Clone)]
pub struct WavelengthDistribution {
    wavelengths: Vec<Float>,
    cdf: Vec<Float>,
}

impl WavelengthDistribution {
    pub fn from_spectrum(spectrum: &Spectrum) -> Self {
        let samples = spectrum.samples();
        if samples.len() == 1 {
            return WavelengthDistribution {
                wavelengths: vec![samples[0].wavelength],
                cdf: vec![1.0],
            };
        }
        let mut cdf = Vec::with_capacity(samples.len());
        let mut acc = 0.0;
        cdf.push(0.0);
        for pair in samples.windows(2) {
            let dx = pair[1].wavelength - pair[0].wavelength;
            acc += 0.5 * (pair[0].intensity + pair[1].intensity) * dx;
            cdf.push(acc);
        }
        let total = acc.max(Float::MIN_POSITIVE);
        for c in cdf.iter_mut() {
            *c /= total;
        }
        WavelengthDistribution {
            wavelengths: samples.iter().map(|s| s.wavelength).collect(),
            cdf,
        }
    }

    /// Draw a wavelength for `u` uniform in `[0, 1)` via binary search plus
    /// linear interpolation inside the located segment.
    pub fn sample(&self, u: Float) -> Float {
        if self.wavelengths.len() == 1 {
            return self.wavelengths[0];
        }
        let idx = match self
            .cdf
            .binary_search_by(|c| c.partial_cmp(&u).unwrap())
        {
            Ok(i) => i.min(self.cdf.len() - 2),
            Err(i) => (i.max(1) - 1).min(self.cdf.len() - 2),
        };
        let c0 = self.cdf[idx];
        let c1 = self.cdf[idx + 1];
        let t = if c1 > c0 { (u - c0) / (c1 - c0) } else { 0.0 };
        self.wavelengths[idx] + t * (self.wavelengths[idx + 1] - self.wavelengths[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(w: Float, i: Float) -> SpectrumSample {
        SpectrumSample { wavelength: w, intensity: i }
    }

    #[test]
    fn clamps_outside_range() {
        let s = Spectrum::new(vec![sample(1.0, 0.2), sample(3.0, 0.8)]).unwrap();
        assert_eq!(s.intensity_at(0.0), 0.2);
        assert_eq!(s.intensity_at(10.0), 0.8);
    }

    #[test]
    fn interpolates_linearly() {
        let s = Spectrum::new(vec![sample(0.0, 0.0), sample(2.0, 2.0)]).unwrap();
        assert!((s.intensity_at(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_monotone_wavelengths() {
        let r = Spectrum::new(vec![sample(2.0, 1.0), sample(1.0, 1.0)]);
        assert!(r.is_err());
    }

    #[test]
    fn single_sample_degenerates_to_dirac() {
        let s = Spectrum::constant(2.0, 1.0).unwrap();
        let dist = WavelengthDistribution::from_spectrum(&s);
        assert_eq!(dist.sample(0.0), 2.0);
        assert_eq!(dist.sample(0.9), 2.0);
    }

    #[test]
    fn wavelength_samples_stay_in_range() {
        let s = Spectrum::new(vec![sample(1.0, 1.0), sample(2.0, 0.8), sample(3.0, 1.0)]).unwrap();
        let dist = WavelengthDistribution::from_spectrum(&s);
        for i in 0..100 {
            let u = i as Float / 100.0;
            let w = dist.sample(u);
            assert!((1.0..=3.0).contains(&w));
        }
    }
}
