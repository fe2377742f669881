//! Visibility queries through partially transparent occluders.
//!
//! A [`Tracer`] walks a ray through the scene hit by hit. Each hit whose
//! surface shader reports an alpha below 1.0 scales the running
//! transmission by `1 - alpha` and the walk continues from the hit
//! point; the walk ends on a miss, on a fully opaque hit, or on geometry
//! without a material or surface shader (which does not occlude).

use lumo_math::DVec3;

use crate::{
    Intersector, SamplingContext, ShadingPoint, ShadingRay, TextureCache, VisibilityFlags,
};

/// Subtracted from the parametric length of bounded rays so the target
/// surface itself is not hit again.
// TODO: replace with an offset scaled to the target's magnitude
const TARGET_EPSILON: f64 = 1.0e-6;
const SAFE_MAX_DISTANCE: f64 = 1.0 - TARGET_EPSILON;

/// Stateful visibility query over an [`Intersector`].
///
/// A tracer owns two shading point slots and alternates between them, so
/// each intersection can refer to the previous one without allocating.
/// It is meant to be owned by a single worker; concurrent renders use one
/// tracer each over the same shared intersector.
pub struct Tracer<'a> {
    intersector: &'a dyn Intersector,
    texture_cache: TextureCache,
    ray_flags: VisibilityFlags,
    shading_points: [ShadingPoint<'a>; 2],
}

impl<'a> Tracer<'a> {
    pub fn new(intersector: &'a dyn Intersector, texture_cache: TextureCache) -> Self {
        Self {
            intersector,
            texture_cache,
            ray_flags: VisibilityFlags::ALL,
            shading_points: [ShadingPoint::default(), ShadingPoint::default()],
        }
    }

    /// Restrict the walk to objects visible to `flags`.
    pub fn set_ray_flags(&mut self, flags: VisibilityFlags) {
        self.ray_flags = flags;
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.texture_cache
    }

    pub fn texture_cache_mut(&mut self) -> &mut TextureCache {
        &mut self.texture_cache
    }

    pub fn into_texture_cache(self) -> TextureCache {
        self.texture_cache
    }

    /// Walk an unbounded ray from `origin` along `direction`.
    ///
    /// Returns the shading point that ended the walk (a miss if the ray
    /// escaped) and the transmission accumulated before it.
    pub fn trace(
        &mut self,
        sampling_context: &mut SamplingContext,
        origin: DVec3,
        direction: DVec3,
        parent: Option<&ShadingPoint<'_>>,
    ) -> (&ShadingPoint<'a>, f64) {
        let flags = self.ray_flags;
        self.walk(sampling_context, origin, parent, |point| {
            ShadingRay::new(point, direction, 0.0, flags)
        })
    }

    /// Walk from `origin` to `target`, stopping just short of it.
    ///
    /// A miss in the returned shading point means the target was reached.
    pub fn trace_between(
        &mut self,
        sampling_context: &mut SamplingContext,
        origin: DVec3,
        target: DVec3,
        parent: Option<&ShadingPoint<'_>>,
    ) -> (&ShadingPoint<'a>, f64) {
        let flags = self.ray_flags;
        self.walk(sampling_context, origin, parent, |point| {
            ShadingRay::segment(point, target - point, 0.0, SAFE_MAX_DISTANCE, 0.0, flags)
        })
    }

    fn walk(
        &mut self,
        sampling_context: &mut SamplingContext,
        origin: DVec3,
        parent: Option<&ShadingPoint<'_>>,
        make_ray: impl Fn(DVec3) -> ShadingRay,
    ) -> (&ShadingPoint<'a>, f64) {
        let mut transmission = 1.0_f64;
        let mut point = origin;
        let mut odd = false;
        let mut first = true;

        let last = loop {
            let ray = make_ray(point);

            let [even_slot, odd_slot] = &mut self.shading_points;
            let (current, previous) = if odd {
                (odd_slot, &*even_slot)
            } else {
                (even_slot, &*odd_slot)
            };
            let parent = if first { parent } else { Some(previous) };

            current.clear();
            self.intersector.trace(&ray, current, parent);

            let index = usize::from(odd);
            let current = &*current;

            if !current.hit() {
                break index;
            }

            let Some(surface_shader) = current.surface_shader() else {
                break index;
            };

            let alpha = surface_shader.evaluate_alpha_mask(
                sampling_context,
                &mut self.texture_cache,
                current,
            );

            // Stop as soon as we reach a fully opaque occluder.
            if alpha == 1.0 {
                break index;
            }

            transmission *= 1.0 - f64::from(alpha);

            point = current.point();
            odd = !odd;
            first = false;
        };

        (&self.shading_points[last], transmission)
    }
}

/// Fraction of light that passes along a walk's path.
///
/// A walk that ended on a shaded surface ended on an opaque occluder, so
/// nothing gets through; otherwise the accumulated transmission applies.
pub fn visibility(shading_point: &ShadingPoint<'_>, transmission: f64) -> f64 {
    if shading_point.hit() && shading_point.surface_shader().is_some() {
        0.0
    } else {
        transmission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, ConstantSurfaceShader, GenericMaterial, Material, TextureStore};
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// What the scripted intersector reports on successive calls.
    enum Scripted {
        /// Hit at a point, with an index into the material list
        Surface(DVec3, Option<usize>),
        Miss,
    }

    /// Intersector replaying a fixed chain of hits, then misses.
    struct ScriptedIntersector {
        script: Vec<Scripted>,
        materials: Vec<GenericMaterial>,
        calls: Mutex<Vec<(ShadingRay, Option<DVec3>)>>,
    }

    impl ScriptedIntersector {
        fn new(script: Vec<Scripted>, materials: Vec<GenericMaterial>) -> Self {
            Self {
                script,
                materials,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// (ray, parent point) for every call so far.
        fn calls(&self) -> Vec<(ShadingRay, Option<DVec3>)> {
            self.calls.lock().clone()
        }
    }

    impl Intersector for ScriptedIntersector {
        fn trace<'a>(
            &'a self,
            ray: &ShadingRay,
            shading_point: &mut ShadingPoint<'a>,
            parent: Option<&ShadingPoint<'_>>,
        ) -> bool {
            let mut calls = self.calls.lock();
            let step = calls.len();
            calls.push((*ray, parent.map(|p| p.point)));

            shading_point.ray = *ray;
            match self.script.get(step) {
                Some(Scripted::Surface(point, material)) => {
                    shading_point.hit = true;
                    shading_point.point = *point;
                    shading_point.primitive = Some(step);
                    shading_point.material =
                        material.map(|index| &self.materials[index] as &dyn Material);
                    true
                }
                Some(Scripted::Miss) | None => false,
            }
        }
    }

    fn alpha_material(alpha: f32) -> GenericMaterial {
        GenericMaterial::new(ConstantSurfaceShader::new(Color::ONE).with_alpha(alpha))
    }

    fn cache() -> TextureCache {
        TextureCache::new(Arc::new(TextureStore::new()))
    }

    #[test]
    fn test_trace_between_without_occluders_reaches_target() {
        let intersector = ScriptedIntersector::new(vec![Scripted::Miss], vec![]);
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let origin = DVec3::new(0.0, 1.0, 0.0);
        let target = DVec3::new(4.0, 1.0, 3.0);
        let (shading_point, transmission) = tracer.trace_between(&mut ctx, origin, target, None);

        assert!(!shading_point.hit());
        assert_eq!(transmission, 1.0);

        let calls = intersector.calls();
        assert_eq!(calls.len(), 1);
        let (ray, parent) = &calls[0];
        assert_eq!(ray.origin(), origin);
        assert_eq!(ray.direction(), target - origin);
        assert_eq!(ray.tmin(), 0.0);
        assert_eq!(ray.tmax(), 1.0 - 1.0e-6);
        assert!(parent.is_none());
    }

    #[test]
    fn test_two_partial_occluders_multiply() {
        let first = DVec3::new(0.0, 0.0, -1.0);
        let second = DVec3::new(0.0, 0.0, -2.0);
        let intersector = ScriptedIntersector::new(
            vec![Scripted::Surface(first, Some(0)), Scripted::Surface(second, Some(1))],
            vec![alpha_material(0.5), alpha_material(0.3)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (shading_point, transmission) =
            tracer.trace(&mut ctx, DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0), None);

        assert_relative_eq!(transmission, 0.35, epsilon = 1e-6);
        // The walk left from the second occluder and escaped.
        assert!(!shading_point.hit());
        assert_eq!(shading_point.ray.origin(), second);

        let calls = intersector.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].0.origin(), first);
        assert_eq!(calls[2].0.origin(), second);
        assert!(calls.iter().all(|(ray, _)| ray.tmax() == f64::INFINITY));
        assert!(calls.iter().all(|(ray, _)| ray.direction() == DVec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_opaque_occluder_ends_walk_without_folding_in() {
        let partial = DVec3::new(1.0, 0.0, 0.0);
        let opaque = DVec3::new(2.0, 0.0, 0.0);
        let intersector = ScriptedIntersector::new(
            vec![
                Scripted::Surface(partial, Some(0)),
                Scripted::Surface(opaque, Some(1)),
                Scripted::Surface(DVec3::new(3.0, 0.0, 0.0), Some(0)),
            ],
            vec![alpha_material(0.4), alpha_material(1.0)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (shading_point, transmission) =
            tracer.trace_between(&mut ctx, DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0), None);

        assert!(shading_point.hit());
        assert_eq!(shading_point.point(), opaque);
        assert_relative_eq!(transmission, 0.6, epsilon = 1e-6);
        assert_eq!(visibility(shading_point, transmission), 0.0);
        assert_eq!(intersector.calls().len(), 2);
    }

    #[test]
    fn test_missing_material_does_not_occlude() {
        let partial = DVec3::new(0.0, 1.0, 0.0);
        let unshaded = DVec3::new(0.0, 2.0, 0.0);
        let intersector = ScriptedIntersector::new(
            vec![
                Scripted::Surface(partial, Some(0)),
                Scripted::Surface(unshaded, None),
                Scripted::Surface(DVec3::new(0.0, 3.0, 0.0), Some(0)),
            ],
            vec![alpha_material(0.25)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (shading_point, transmission) = tracer.trace(&mut ctx, DVec3::ZERO, DVec3::Y, None);

        assert!(shading_point.hit());
        assert_eq!(shading_point.point(), unshaded);
        assert!(shading_point.material().is_none());
        assert_relative_eq!(transmission, 0.75, epsilon = 1e-6);
        assert_relative_eq!(visibility(shading_point, transmission), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_surface_shader_does_not_occlude() {
        let unshaded = DVec3::new(0.0, 0.0, 1.0);
        let intersector = ScriptedIntersector::new(
            vec![Scripted::Surface(unshaded, Some(0))],
            vec![GenericMaterial::unshaded()],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (shading_point, transmission) = tracer.trace(&mut ctx, DVec3::ZERO, DVec3::Z, None);

        assert!(shading_point.hit());
        assert_eq!(shading_point.point(), unshaded);
        assert_eq!(transmission, 1.0);
        assert_eq!(intersector.calls().len(), 1);
    }

    #[test]
    fn test_nearly_opaque_is_still_partial() {
        let intersector = ScriptedIntersector::new(
            vec![Scripted::Surface(DVec3::X, Some(0))],
            vec![alpha_material(0.999_999)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (shading_point, transmission) = tracer.trace(&mut ctx, DVec3::ZERO, DVec3::X, None);

        assert!(!shading_point.hit());
        assert!(transmission > 0.0);
        assert!(transmission < 1e-5);
        assert_eq!(intersector.calls().len(), 2);
    }

    #[test]
    fn test_parent_chain_follows_previous_hit() {
        let caller = ShadingPoint {
            hit: true,
            point: DVec3::new(-1.0, 0.0, 0.0),
            ..Default::default()
        };
        let a = DVec3::new(1.0, 0.0, 0.0);
        let b = DVec3::new(2.0, 0.0, 0.0);
        let c = DVec3::new(3.0, 0.0, 0.0);
        let intersector = ScriptedIntersector::new(
            vec![
                Scripted::Surface(a, Some(0)),
                Scripted::Surface(b, Some(0)),
                Scripted::Surface(c, Some(0)),
            ],
            vec![alpha_material(0.5)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (_, transmission) = tracer.trace(&mut ctx, caller.point, DVec3::X, Some(&caller));
        assert_relative_eq!(transmission, 0.125, epsilon = 1e-9);

        let parents: Vec<_> = intersector.calls().into_iter().map(|(_, parent)| parent).collect();
        assert_eq!(parents, vec![Some(caller.point), Some(a), Some(b), Some(c)]);
    }

    #[test]
    fn test_tracer_is_reusable() {
        let intersector = ScriptedIntersector::new(
            vec![Scripted::Surface(DVec3::X, Some(0)), Scripted::Miss, Scripted::Miss],
            vec![alpha_material(0.5)],
        );
        let mut tracer = Tracer::new(&intersector, cache());
        let mut ctx = SamplingContext::new(0);

        let (_, first) = tracer.trace(&mut ctx, DVec3::ZERO, DVec3::X, None);
        assert_relative_eq!(first, 0.5, epsilon = 1e-9);

        // Transmission restarts at 1.0 for every walk.
        let (shading_point, second) = tracer.trace(&mut ctx, DVec3::ZERO, DVec3::X, None);
        assert_eq!(second, 1.0);
        assert!(!shading_point.hit());
    }
}
