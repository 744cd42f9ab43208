//! Scene graph and area bookkeeping (spec.md §4.5, §3 "Instance"/"Scene").
//! Grounded on the teacher's `core::primitive`/`core::scene` ownership
//! pattern (objects hold shaded shapes, instances hold a transform onto a
//! shared object) generalised to this crate's tagged-enum `Shape`/
//! `Material`, with the BVH itself adapted in [`accel`].

pub mod accel;

use crate::atmosphere::Atmosphere;
use crate::error::{Result, SolveError};
use crate::geometry::{Float, Normal3f, Point3f, Ray, Transform3, Vector3f};
use crate::material::Material;
use crate::rng::CounterRng;
use crate::shape::Shape;
use crate::sun::Sun;
use accel::{Bounds3, Bvh};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

/// Which side(s) of an instance are receiver-tagged (spec.md §3
/// "Instance": "a receiver mask (bit set for FRONT and/or BACK)").
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverMask {
    pub front: bool,
    pub back: bool,
}

impl ReceiverMask {
    pub fn none() -> Self {
        ReceiverMask { front: false, back: false }
    }

    pub fn both() -> Self {
        ReceiverMask { front: true, back: true }
    }

    pub fn front() -> Self {
        ReceiverMask { front: true, back: false }
    }

    pub fn back() -> Self {
        ReceiverMask { front: false, back: true }
    }

    pub fn is_receiver(&self, side: Side) -> bool {
        match side {
            Side::Front => self.front,
            Side::Back => self.back,
        }
    }
}

/// A shaded shape: geometry plus the material shown to rays hitting its
/// front and back sides (spec.md §3 "Instance": "an object (which bundles
/// shaded-shapes = (shape, front-material, back-material) triples)").
pub struct ShadedShape {
    pub shape: Shape,
    pub front_material: Material,
    pub back_material: Material,
}

impl ShadedShape {
    pub fn new(shape: Shape, front_material: Material, back_material: Material) -> Self {
        ShadedShape { shape, front_material, back_material }
    }

    pub fn material(&self, side: Side) -> &Material {
        match side {
            Side::Front => &self.front_material,
            Side::Back => &self.back_material,
        }
    }

    fn has_non_virtual_material(&self) -> bool {
        !self.front_material.is_virtual() || !self.back_material.is_virtual()
    }
}

pub struct Object {
    pub shapes: Vec<ShadedShape>,
}

impl Object {
    pub fn new(shapes: Vec<ShadedShape>) -> Self {
        Object { shapes }
    }
}

pub struct Instance {
    pub object: usize,
    pub transform: Transform3,
    pub receiver_mask: ReceiverMask,
    pub score_per_primitive: bool,
    pub sample: bool,
    pub id: u64,
}

impl Instance {
    pub fn new(
        object: usize,
        transform: Transform3,
        receiver_mask: ReceiverMask,
        score_per_primitive: bool,
        sample: bool,
        id: u64,
    ) -> Self {
        Instance { object, transform, receiver_mask, score_per_primitive, sample, id }
    }
}

#[derive(Debug, Clone, Copy)]
struct PrimitiveRef {
    instance: u32,
    shape: u32,
    triangle: u32,
}

/// The outcome of a successful origin draw or a successful ray hit, enough
/// for the solver to build a `SurfaceFragment` and do receiver bookkeeping
/// without reaching back into the scene.
pub struct Hit {
    pub instance_id: u64,
    pub instance_index: usize,
    pub shape_index: usize,
    pub triangle_index: usize,
    pub t: Float,
    pub p: Point3f,
    pub geometric_normal: Normal3f,
    pub shading_normal: Option<Normal3f>,
    pub side: Side,
    pub uv: Option<(Float, Float)>,
}

/// Excludes the primitive a ray originated from, so the hit filter can
/// reject the self-intersection spec.md §4.1 describes.
#[derive(Debug, Clone, Copy)]
pub struct SelfExclusion {
    pub instance_index: usize,
    pub shape_index: usize,
    pub triangle_index: usize,
}

pub struct Scene {
    objects: Vec<Object>,
    instances: Vec<Instance>,
    pub sun: Option<Sun>,
    pub atmosphere: Option<Atmosphere>,
    trace_accel: Bvh,
    trace_primitives: Vec<PrimitiveRef>,
    sample_accel: Bvh,
    sample_primitives: Vec<PrimitiveRef>,
    sample_cdf: Vec<Float>,
    total_sampling_area: Float,
}

impl Scene {
    /// Builds the two accelerators (spec.md §4.5): the tracing scene
    /// indexes every instance's RT proxy; the sampling scene indexes only
    /// `sample=true` instances with at least one non-virtual shaded shape,
    /// over their sampling proxy.
    pub fn build(
        objects: Vec<Object>,
        instances: Vec<Instance>,
        sun: Option<Sun>,
        atmosphere: Option<Atmosphere>,
    ) -> Result<Self> {
        let mut trace_primitives = Vec::new();
        let mut trace_bounds = Vec::new();
        let mut sample_primitives = Vec::new();
        let mut sample_bounds = Vec::new();
        let mut sample_cdf = Vec::new();
        let mut total_sampling_area = 0.0;

        for (inst_idx, instance) in instances.iter().enumerate() {
            let object = objects.get(instance.object).ok_or_else(|| {
                SolveError::BadArgument("instance references an unknown object".into())
            })?;
            let eligible_for_sampling =
                instance.sample && object.shapes.iter().any(|s| s.has_non_virtual_material());

            for (shape_idx, shaded) in object.shapes.iter().enumerate() {
                let rt_mesh = shaded.shape.rt_mesh();
                for tri in 0..rt_mesh.triangle_count() {
                    let [a, b, c] = rt_mesh.triangle_vertices(tri);
                    let world = [
                        instance.transform.transform_point(&a),
                        instance.transform.transform_point(&b),
                        instance.transform.transform_point(&c),
                    ];
                    trace_bounds.push(Bounds3::from_points(&world));
                    trace_primitives.push(PrimitiveRef {
                        instance: inst_idx as u32,
                        shape: shape_idx as u32,
                        triangle: tri as u32,
                    });
                }

                if eligible_for_sampling {
                    let sampling_mesh = shaded.shape.sampling_mesh();
                    let jac = instance.transform.jacobian_scale();
                    for tri in 0..sampling_mesh.triangle_count() {
                        let [a, b, c] = sampling_mesh.triangle_vertices(tri);
                        let world = [
                            instance.transform.transform_point(&a),
                            instance.transform.transform_point(&b),
                            instance.transform.transform_point(&c),
                        ];
                        sample_bounds.push(Bounds3::from_points(&world));
                        let area = sampling_mesh.triangle_area(tri) * jac;
                        total_sampling_area += area;
                        sample_cdf.push(total_sampling_area);
                        sample_primitives.push(PrimitiveRef {
                            instance: inst_idx as u32,
                            shape: shape_idx as u32,
                            triangle: tri as u32,
                        });
                    }
                }
            }
        }

        log::debug!(
            "building scene accelerators: {} trace primitives, {} sampling primitives over {} instances",
            trace_primitives.len(),
            sample_primitives.len(),
            instances.len(),
        );
        let trace_accel = Bvh::build(&trace_bounds);
        let sample_accel = Bvh::build(&sample_bounds);
        if sample_primitives.is_empty() {
            log::warn!("scene has no sample-enabled instances; sample_origin will fail");
        }

        Ok(Scene {
            objects,
            instances,
            sun,
            atmosphere,
            trace_accel,
            trace_primitives,
            sample_accel,
            sample_primitives,
            sample_cdf,
            total_sampling_area,
        })
    }

    pub fn total_sampling_area(&self) -> Float {
        self.total_sampling_area
    }

    pub fn instance(&self, index: usize) -> &Instance {
        &self.instances[index]
    }

    pub fn shaded_shape(&self, instance_index: usize, shape_index: usize) -> &ShadedShape {
        &self.objects[self.instances[instance_index].object].shapes[shape_index]
    }

    /// Draws a starting surface point with probability proportional to its
    /// sampling-proxy area (spec.md invariant: "Sampling probability of a
    /// starting surface point is proportional to its sampling-proxy area
    /// in the sampling scene"). `u` selects the primitive, `(u1, u2)`
    /// selects the barycentric coordinates within it.
    pub fn sample_origin(&self, rng: &mut CounterRng) -> Result<Hit> {
        if self.sample_primitives.is_empty() || self.total_sampling_area <= 0.0 {
            return Err(SolveError::BadOperation("sampling scene is empty".into()));
        }
        let u = rng.uniform_f32() * self.total_sampling_area;
        let idx = match self
            .sample_cdf
            .binary_search_by(|probe| probe.partial_cmp(&u).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => i,
            Err(i) => i.min(self.sample_primitives.len() - 1),
        };
        let prim = self.sample_primitives[idx];
        let instance = &self.instances[prim.instance as usize];
        let shaded = self.shaded_shape(prim.instance as usize, prim.shape as usize);
        let sampling_mesh = shaded.shape.sampling_mesh();
        let [a, b, c] = sampling_mesh.triangle_vertices(prim.triangle as usize);

        let (u1, u2) = rng.uniform_f32x2();
        let su1 = u1.sqrt();
        let bary_a = 1.0 - su1;
        let bary_b = (1.0 - u2) * su1;
        let bary_c = u2 * su1;
        let local_p = a * bary_a + b * bary_b + c * bary_c;

        let (local_p, local_n) = if let Some((snapped_p, snapped_n)) =
            shaded.shape.snap_to_quadric((local_p.x, local_p.y))
        {
            (snapped_p, snapped_n)
        } else {
            (local_p, sampling_mesh.geometric_normal(prim.triangle as usize))
        };

        let world_p = instance.transform.transform_point(&local_p);
        let world_n = instance.transform.transform_normal(&local_n).normalize();

        Ok(Hit {
            instance_id: instance.id,
            instance_index: prim.instance as usize,
            shape_index: prim.shape as usize,
            triangle_index: prim.triangle as usize,
            t: 0.0,
            p: world_p,
            geometric_normal: world_n,
            shading_normal: None,
            side: Side::Front,
            uv: None,
        })
    }

    /// Traces `ray` (in world space) against the RT accelerator, applying
    /// the hit filter of spec.md §4.1: self-intersection exclusion,
    /// virtual-material discard, and analytic refinement of punched
    /// surfaces. Returns the nearest surviving hit.
    pub fn intersect(
        &self,
        ray: &Ray,
        exclude: Option<SelfExclusion>,
        discard_virtual_materials: bool,
    ) -> Option<Hit> {
        let inv_d = Point3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let mut best: Option<Hit> = None;

        self.trace_accel.traverse(&ray.o, &inv_d, ray.t_max.get(), |packed| {
            let prim = self.trace_primitives[packed as usize];
            if let Some(excl) = exclude {
                if excl.instance_index == prim.instance as usize
                    && excl.shape_index == prim.shape as usize
                    && excl.triangle_index == prim.triangle as usize
                {
                    return;
                }
            }

            let instance = &self.instances[prim.instance as usize];
            let shaded = self.shaded_shape(prim.instance as usize, prim.shape as usize);
            let ray_local = instance.transform.transform_ray_to_object(ray);
            let rt_mesh = shaded.shape.rt_mesh();
            let [a, b, c] = rt_mesh.triangle_vertices(prim.triangle as usize);

            let (hit_t, bary) = match intersect_triangle(&ray_local, a, b, c) {
                Some(v) => v,
                None => return,
            };
            if hit_t <= 1e-5 || hit_t > ray.t_max.get() {
                return;
            }

            let (local_p, local_n, refined_t) = if let Some(placement) = shaded.shape.placement() {
                let quadric_ray = placement.transform_ray_to_object(&ray_local);
                match shaded.shape.refine_hit(&quadric_ray, hit_t) {
                    Some((t, p, n)) => {
                        if t <= 1e-5 || t > ray.t_max.get() {
                            return;
                        }
                        (placement.transform_point(&p), placement.transform_normal(&n), t)
                    }
                    None => return,
                }
            } else {
                let geo_n = rt_mesh.geometric_normal(prim.triangle as usize);
                (ray_local.at(hit_t), geo_n, hit_t)
            };

            let incoming_local = ray_local.d;
            let hit_from_back = local_n.dot(&incoming_local) > 0.0;
            let oriented_n = if hit_from_back { -local_n } else { local_n };
            let side = if hit_from_back { Side::Back } else { Side::Front };

            let material = shaded.material(side);
            if discard_virtual_materials && material.is_virtual() {
                return;
            }

            if best.as_ref().map_or(true, |h| refined_t < h.t) {
                ray.t_max.set(refined_t);
                let shading_normal = rt_mesh.normals.as_ref().map(|normals| {
                    let [ia, ib, ic] = rt_mesh.indices[prim.triangle as usize];
                    let interp = normals[ia as usize] * bary.0
                        + normals[ib as usize] * bary.1
                        + normals[ic as usize] * bary.2;
                    let world_n = instance.transform.transform_normal(&interp).normalize();
                    if world_n.dot(&incoming_local) > 0.0 {
                        -world_n
                    } else {
                        world_n
                    }
                });
                best = Some(Hit {
                    instance_id: instance.id,
                    instance_index: prim.instance as usize,
                    shape_index: prim.shape as usize,
                    triangle_index: prim.triangle as usize,
                    t: refined_t,
                    p: instance.transform.transform_point(&local_p),
                    geometric_normal: instance.transform.transform_normal(&oriented_n).normalize(),
                    shading_normal,
                    side,
                    uv: None,
                });
            }
        });

        best
    }
}

/// Moller-Trumbore ray/triangle intersection in whatever space `ray` and
/// the vertices already share; returns `(t, barycentrics)`.
fn intersect_triangle(
    ray: &Ray,
    a: Point3f,
    b: Point3f,
    c: Point3f,
) -> Option<(Float, (Float, Float, Float))> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = ray.d.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.o - a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = ray.d.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    if t <= 0.0 {
        return None;
    }
    Some((t, (1.0 - u - v, u, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MatteMaterial, Shader};
    use crate::mesh::TriangleMesh;

    fn unit_square() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3f::new(-1.0, -1.0, 0.0),
                Point3f::new(1.0, -1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(-1.0, 1.0, 0.0),
            ],
            None,
            None,
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn single_plane_accumulates_its_full_area() {
        let shaded = ShadedShape::new(
            Shape::Mesh(unit_square()),
            Material::Matte(MatteMaterial::new(Shader::constant(0.9))),
            Material::Virtual,
        );
        let object = Object::new(vec![shaded]);
        let instance = Instance::new(0, Transform3::identity(), ReceiverMask::both(), false, true, 1);
        let scene = Scene::build(vec![object], vec![instance], None, None).unwrap();
        assert!((scene.total_sampling_area() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn ray_hits_the_plane_from_above() {
        let shaded = ShadedShape::new(
            Shape::Mesh(unit_square()),
            Material::Matte(MatteMaterial::new(Shader::constant(0.9))),
            Material::Virtual,
        );
        let object = Object::new(vec![shaded]);
        let instance = Instance::new(0, Transform3::identity(), ReceiverMask::both(), false, true, 1);
        let scene = Scene::build(vec![object], vec![instance], None, None).unwrap();
        let ray = Ray::new(Point3f::new(0.0, 0.0, 5.0), Vector3f::new(0.0, 0.0, -1.0), 1e6);
        let hit = scene.intersect(&ray, None, false).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert_eq!(hit.side, Side::Front);
    }

    #[test]
    fn virtual_backing_material_is_discarded_when_requested() {
        let shaded = ShadedShape::new(
            Shape::Mesh(unit_square()),
            Material::Virtual,
            Material::Virtual,
        );
        let object = Object::new(vec![shaded]);
        let instance = Instance::new(0, Transform3::identity(), ReceiverMask::both(), false, false, 2);
        let scene = Scene::build(vec![object], vec![instance], None, None).unwrap();
        let ray = Ray::new(Point3f::new(0.0, 0.0, 5.0), Vector3f::new(0.0, 0.0, -1.0), 1e6);
        assert!(scene.intersect(&ray, None, true).is_none());
    }

    #[test]
    fn empty_sampling_scene_is_rejected() {
        let shaded = ShadedShape::new(
            Shape::Mesh(unit_square()),
            Material::Virtual,
            Material::Virtual,
        );
        let object = Object::new(vec![shaded]);
        let instance = Instance::new(0, Transform3::identity(), ReceiverMask::both(), false, true, 1);
        let scene = Scene::build(vec![object], vec![instance], None, None).unwrap();
        let mut rng = CounterRng::from_seed(1);
        assert!(scene.sample_origin(&mut rng).is_err());
    }
}
