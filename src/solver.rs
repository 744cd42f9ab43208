//! The path-trace realisation loop (spec.md §4.4) and its thread-pool
//! concurrency (spec.md §5). Grounded on the teacher's sampler-driven
//! per-pixel loop in spirit (one independent unit of work per thread, no
//! shared mutable state beyond an error latch) but restructured around
//! realisations instead of pixels, and `std::thread::scope` instead of
//! the teacher's `crossbeam::scope`, since every worker's lifetime is
//! bounded by this single function call.

use crate::atmosphere::Atmosphere;
use crate::error::{Result, SolveError};
use crate::estimator::{Estimator, PartialEstimator, ReceiverKey};
use crate::geometry::{Float, Normal3f, Point3f, Ray, Vector3f};
use crate::material::{Material, SurfaceFragment};
use crate::medium::Medium;
use crate::rng::CounterRng;
use crate::scene::{Scene, SelfExclusion, Side};
use crate::sink::ReceiverSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const SELF_INTERSECTION_EPSILON: Float = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct PathVertex {
    pub p: Point3f,
    pub weight: Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTermination {
    Missing,
    Shadow,
    Success,
}

#[derive(Debug, Clone)]
pub struct PathRecord {
    pub vertices: Vec<PathVertex>,
    pub termination: PathTermination,
}

/// Sink for visualisation paths (spec.md §4.4 "Path recording", §3 "Path
/// record"): a boundary feature, kept minimal (no rasteriser) per
/// spec.md's out-of-scope list.
pub trait PathTracker: Send {
    fn record(&mut self, path: PathRecord);
}

pub struct SolverConfig {
    pub n_realisations: u64,
    pub n_threads: usize,
    pub seed: u64,
    /// D in spec.md §4.4 step 6; virtual-material passes do not count.
    pub max_depth: u32,
    pub sun_ray_length: Float,
    pub infinite_ray_length: Float,
    pub receiver_sink: Option<Mutex<Box<dyn ReceiverSink>>>,
    pub path_tracker: Option<Mutex<Box<dyn PathTracker>>>,
}

impl SolverConfig {
    pub fn new(n_realisations: u64, seed: u64) -> Self {
        SolverConfig {
            n_realisations,
            n_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            seed,
            max_depth: 4,
            sun_ray_length: 1.0e4,
            infinite_ray_length: 1.0e6,
            receiver_sink: None,
            path_tracker: None,
        }
    }
}

/// Runs the solve (spec.md §4.4, §5): statically partitions
/// `n_realisations` across `n_threads`, each with its own RNG substream
/// and partial estimator, merging after the barrier. The first error
/// raised on any thread is latched; every thread observes it at the top
/// of its next realisation and discards its partial table (spec.md §7).
pub fn solve(scene: &Scene, config: &SolverConfig) -> Result<Estimator> {
    let n_threads = config.n_threads.max(1);
    log::debug!(
        "starting solve: {} realisations across {} threads, seed {}",
        config.n_realisations,
        n_threads,
        config.seed
    );
    let root_rng = CounterRng::from_seed(config.seed);
    let error_latch: AtomicBool = AtomicBool::new(false);
    let error_message: Mutex<Option<SolveError>> = Mutex::new(None);

    let partials: Vec<Option<PartialEstimator>> = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(n_threads);
        for thread_index in 0..n_threads as u64 {
            let mut rng = root_rng.substream(thread_index, n_threads as u64);
            let share = config.n_realisations / n_threads as u64;
            let remainder = config.n_realisations % n_threads as u64;
            let count = share + if thread_index < remainder { 1 } else { 0 };
            let error_latch = &error_latch;
            let error_message = &error_message;
            let scene = &*scene;
            let config = &*config;
            handles.push(scope.spawn(move || -> Option<PartialEstimator> {
                let mut partial = PartialEstimator::new();
                for _ in 0..count {
                    if error_latch.load(Ordering::Acquire) {
                        return None;
                    }
                    if let Err(e) = run_realisation(scene, &mut rng, config, &mut partial) {
                        log::error!("realisation failed on thread {}: {}", thread_index, e);
                        if !error_latch.swap(true, Ordering::AcqRel) {
                            *error_message.lock().unwrap() = Some(e);
                        }
                        return None;
                    }
                }
                Some(partial)
            }));
        }
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    if error_latch.load(Ordering::Acquire) {
        let message = error_message.into_inner().unwrap();
        return Err(message.unwrap_or_else(|| SolveError::Unreachable("error latched with no message".into())));
    }

    let mut estimator = Estimator::new();
    for partial in partials.into_iter().flatten() {
        estimator.merge(partial);
    }
    log::debug!("solve finished: {} realisations merged", estimator.realisation_count());
    Ok(estimator)
}

struct WalkState {
    instance_index: usize,
    shape_index: usize,
    triangle_index: usize,
    instance_id: u64,
    p: Point3f,
    normal: Normal3f,
    shading_normal: Option<Normal3f>,
    uv: Option<(Float, Float)>,
    side: Side,
}

fn run_realisation(
    scene: &Scene,
    rng: &mut CounterRng,
    config: &SolverConfig,
    partial: &mut PartialEstimator,
) -> Result<()> {
    partial.record_realisation();
    let sun = scene
        .sun
        .as_ref()
        .ok_or_else(|| SolveError::BadOperation("solve requires a scene with a sun attached".into()))?;

    let origin = scene.sample_origin(rng)?;
    let wavelength = sun.sample_wavelength(rng.uniform_f32());
    let d_sun = sun.sample_direction(rng);

    let cos_theta = d_sun.dot(&origin.geometric_normal);
    let side = if cos_theta < 0.0 { Side::Front } else { Side::Back };
    let normal = if side == Side::Back { -origin.geometric_normal } else { origin.geometric_normal };

    let area_sampled = scene.total_sampling_area();
    let mut w = sun.dni * area_sampled * cos_theta.abs();
    let cosine_loss_total = sun.dni * area_sampled * (1.0 - cos_theta.abs());

    let origin_instance = scene.instance(origin.instance_index);
    let self_excl = SelfExclusion {
        instance_index: origin.instance_index,
        shape_index: origin.shape_index,
        triangle_index: origin.triangle_index,
    };

    let mut path = config
        .path_tracker
        .is_some()
        .then(|| vec![PathVertex { p: origin.p, weight: w }]);

    let shadow_origin = origin.p + normal * SELF_INTERSECTION_EPSILON;
    let shadow_ray = Ray::new(shadow_origin, -d_sun, config.sun_ray_length);
    if scene.intersect(&shadow_ray, Some(self_excl), true).is_some() {
        partial.record_shadow(w);
        partial.record_primary_totals(origin.instance_id, w, cosine_loss_total);
        finish_path(config, path, PathTermination::Shadow);
        return Ok(());
    }
    partial.record_primary_totals(origin.instance_id, 0.0, cosine_loss_total);

    let mut state = WalkState {
        instance_index: origin.instance_index,
        shape_index: origin.shape_index,
        triangle_index: origin.triangle_index,
        instance_id: origin.instance_id,
        p: origin.p,
        normal,
        shading_normal: None,
        uv: origin.uv,
        side,
    };
    let mut wi = d_sun;
    let mut current_medium = Medium::vacuum();
    let mut reflectivity_loss_total = 0.0f32;
    let mut absorptivity_loss_total = 0.0f32;
    let mut visited_any_receiver = false;
    let mut scatter_count = 0u32;

    let termination = 'walk: loop {
        let instance = scene.instance(state.instance_index);
        let shaded = scene.shaded_shape(state.instance_index, state.shape_index);

        if instance.receiver_mask.is_receiver(state.side) {
            visited_any_receiver = true;
            partial.record_receiver_hit(
                state.instance_id,
                state.side,
                instance.score_per_primitive,
                state.triangle_index as u32,
                w,
                absorptivity_loss_total,
                reflectivity_loss_total,
                cosine_loss_total,
            );
            partial.record_primary_receiver(
                origin.instance_id,
                ReceiverKey { instance_id: state.instance_id, side: state.side.into() },
                w,
                absorptivity_loss_total,
                reflectivity_loss_total,
                cosine_loss_total,
            );
            if let Some(path) = path.as_mut() {
                path.push(PathVertex { p: state.p, weight: w });
            }
            emit_receiver_hit(config, scatter_count, state.instance_id, state.side, wavelength, &state, wi, w)?;
        }

        if scatter_count >= config.max_depth {
            break 'walk PathTermination::Missing;
        }

        let material = shaded.material(state.side);
        if material.is_virtual() {
            let advance_ray = Ray::new(state.p + wi * SELF_INTERSECTION_EPSILON, wi, config.infinite_ray_length);
            let excl = SelfExclusion {
                instance_index: state.instance_index,
                shape_index: state.shape_index,
                triangle_index: state.triangle_index,
            };
            match scene.intersect(&advance_ray, Some(excl), false) {
                Some(hit) => {
                    apply_atmosphere(scene.atmosphere.as_ref(), wavelength, hit.t, &mut w, &mut absorptivity_loss_total);
                    state = advance_state(&hit);
                    continue 'walk;
                }
                None => break 'walk PathTermination::Missing,
            }
        }

        if let Material::Dielectric(d) = material {
            d.check_incoming_medium(&current_medium)?;
        }

        let frag = SurfaceFragment {
            p: state.p,
            wi,
            geometric_normal: state.normal,
            shading_normal: state.shading_normal,
            uv: state.uv,
        };
        let (wo, reflectance) = material.sample(rng, &frag, wavelength)?;
        reflectivity_loss_total += (1.0 - reflectance) * w;
        w *= reflectance;
        if let Some(path) = path.as_mut() {
            path.push(PathVertex { p: state.p, weight: w });
        }
        if w <= 0.0 {
            break 'walk PathTermination::Missing;
        }

        if let Material::Dielectric(d) = material {
            let crossed = wo.dot(&state.normal) * wi.dot(&state.normal) > 0.0;
            if crossed {
                current_medium = if current_medium == d.outside { d.inside } else { d.outside };
            }
        }

        let next_ray = Ray::new(state.p + wo * SELF_INTERSECTION_EPSILON, wo, config.infinite_ray_length);
        let excl = SelfExclusion {
            instance_index: state.instance_index,
            shape_index: state.shape_index,
            triangle_index: state.triangle_index,
        };
        match scene.intersect(&next_ray, Some(excl), false) {
            Some(hit) => {
                apply_atmosphere(scene.atmosphere.as_ref(), wavelength, hit.t, &mut w, &mut absorptivity_loss_total);
                state = advance_state(&hit);
                wi = wo;
                scatter_count += 1;
            }
            None => break 'walk PathTermination::Missing,
        }
    };

    if !visited_any_receiver {
        partial.record_missing(w);
    }
    let termination = if visited_any_receiver { PathTermination::Success } else { termination };
    finish_path(config, path, termination);
    Ok(())
}

fn advance_state(hit: &crate::scene::Hit) -> WalkState {
    WalkState {
        instance_index: hit.instance_index,
        shape_index: hit.shape_index,
        triangle_index: hit.triangle_index,
        instance_id: hit.instance_id,
        p: hit.p,
        normal: hit.geometric_normal,
        shading_normal: hit.shading_normal,
        uv: hit.uv,
        side: hit.side,
    }
}

fn apply_atmosphere(
    atmosphere: Option<&Atmosphere>,
    wavelength: Float,
    distance: Float,
    w: &mut Float,
    absorptivity_loss_total: &mut Float,
) {
    if let Some(atmosphere) = atmosphere {
        let tau = atmosphere.transmittance(wavelength, distance);
        *absorptivity_loss_total += (1.0 - tau) * *w;
        *w *= tau;
    }
}

fn finish_path(config: &SolverConfig, path: Option<Vec<PathVertex>>, termination: PathTermination) {
    if let (Some(vertices), Some(tracker)) = (path, config.path_tracker.as_ref()) {
        tracker.lock().unwrap().record(PathRecord { vertices, termination });
    }
}

fn emit_receiver_hit(
    config: &SolverConfig,
    segment_id: u32,
    instance_id: u64,
    side: Side,
    wavelength: Float,
    state: &WalkState,
    wi: Vector3f,
    weight: Float,
) -> Result<()> {
    let sink = match config.receiver_sink.as_ref() {
        Some(sink) => sink,
        None => return Ok(()),
    };
    let receiver_id = match side {
        Side::Front => instance_id as i32,
        Side::Back => -(instance_id as i32),
    };
    let record = crate::sink::ReceiverHitRecord {
        realisation_id: 0,
        date: 0,
        segment_id,
        receiver_id,
        wavelength,
        pos: [state.p.x, state.p.y, state.p.z],
        in_dir: [wi.x, wi.y, wi.z],
        normal: [state.normal.x, state.normal.y, state.normal.z],
        weight: weight as f64,
        uv: state.uv.map(|(u, v)| [u, v]).unwrap_or([0.0, 0.0]),
    };
    sink.lock().unwrap().write_record(&record)
}
