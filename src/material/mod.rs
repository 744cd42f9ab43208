//! Material / BSDF model (spec.md §4.2, §3 "Material").
//!
//! Materials are a tagged enum dispatched by match, per spec.md §9 ("Sum
//! types over function pointers"), mirroring how the teacher dispatches
//! `Bxdf`/`Fresnel` variants in `core::reflection` rather than using trait
//! objects.

pub mod dielectric;
pub mod fresnel;
pub mod matte;
pub mod mirror;
pub mod thin_dielectric;

use crate::error::Result;
use crate::geometry::{Float, Normal3f, Point3f, Vector3f};
use crate::rng::CounterRng;

pub use dielectric::DielectricMaterial;
pub use matte::MatteMaterial;
pub use mirror::MirrorMaterial;
pub use thin_dielectric::ThinDielectricMaterial;

/// Built at each hit (spec.md §4.2 "Surface fragment"). `shading_normal`
/// is the fetched per-vertex normal (if any), already transformed by the
/// primitive's inverse-transpose, renormalised, and flipped to face the
/// incoming ray's reverse — the walker doesn't need to redo that here.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceFragment {
    pub p: Point3f,
    /// Incoming direction, pointing into the surface (same convention the
    /// solver's ray direction uses).
    pub wi: Vector3f,
    /// Geometric normal, oriented toward the incoming ray.
    pub geometric_normal: Normal3f,
    pub shading_normal: Option<Normal3f>,
    pub uv: Option<(Float, Float)>,
}

impl SurfaceFragment {
    /// The normal actually used for shading: the shading normal if one was
    /// fetched, otherwise the geometric normal.
    pub fn shading_basis(&self) -> Normal3f {
        self.shading_normal.unwrap_or(self.geometric_normal)
    }
}

/// The callbacks a non-virtual material's appearance is built from
/// (spec.md §4.2: "a set of callbacks producing, at a world-space surface
/// fragment and wavelength, the shading normal, the reflectivity, and (for
/// mirror) the Beckmann roughness").
pub struct Shader {
    pub reflectivity: Box<dyn Fn(&SurfaceFragment, Float) -> Float + Send + Sync>,
    pub roughness: Box<dyn Fn(&SurfaceFragment, Float) -> Float + Send + Sync>,
}

impl Shader {
    pub fn constant(reflectivity: Float) -> Self {
        Shader {
            reflectivity: Box::new(move |_frag, _wavelength| reflectivity),
            roughness: Box::new(|_frag, _wavelength| 0.0),
        }
    }

    pub fn constant_rough(reflectivity: Float, roughness: Float) -> Self {
        Shader {
            reflectivity: Box::new(move |_frag, _wavelength| reflectivity),
            roughness: Box::new(move |_frag, _wavelength| roughness),
        }
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader").finish_non_exhaustive()
    }
}

pub enum Material {
    Dielectric(DielectricMaterial),
    Mirror(MirrorMaterial),
    Matte(MatteMaterial),
    ThinDielectric(ThinDielectricMaterial),
    /// Not shaded; rays pass through untouched. Hits still participate in
    /// receiver scoring and in virtual-discarding ray filtering (spec.md
    /// §4.2 "Virtual").
    Virtual,
}

impl Material {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Material::Virtual)
    }

    /// `sample(rng, frag, wavelength) -> (wo, reflectance)`: `reflectance`
    /// is the total energy factor to multiply the walker weight by,
    /// already divided by pdf where applicable (spec.md §4.2 "Sampling
    /// contract"). Must not be called on `Material::Virtual` — the solver
    /// special-cases virtual hits before reaching shading (spec.md §4.4
    /// step 6).
    pub fn sample(
        &self,
        rng: &mut CounterRng,
        frag: &SurfaceFragment,
        wavelength: Float,
    ) -> Result<(Vector3f, Float)> {
        match self {
            Material::Dielectric(m) => m.sample(rng, frag, wavelength),
            Material::Mirror(m) => Ok(m.sample(rng, frag, wavelength)),
            Material::Matte(m) => Ok(m.sample(rng, frag, wavelength)),
            Material::ThinDielectric(m) => Ok(m.sample(rng, frag, wavelength)),
            Material::Virtual => {
                unreachable!("Material::sample must not be called on a virtual material")
            }
        }
    }
}
