//! Visibility walks over a real scene with partially transparent panes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use lumo_math::DVec3;
use lumo_renderer::{
    visibility, Camera, Color, ConstantSurfaceShader, GenericMaterial, Intersector, Material,
    Quad, SamplingContext, Scene, ShadingPoint, ShadingRay, Texture, TextureCache, TextureStore,
    TexturedSurfaceShader, Tracer,
};

fn pane(z: f64) -> Quad {
    Quad::new(
        DVec3::new(-1.0, -1.0, z),
        DVec3::new(2.0, 0.0, 0.0),
        DVec3::new(0.0, 2.0, 0.0),
    )
}

fn constant(alpha: f32) -> Option<Arc<dyn Material>> {
    Some(Arc::new(GenericMaterial::new(
        ConstantSurfaceShader::new(Color::ONE).with_alpha(alpha),
    )))
}

fn walk_to(scene: &Scene, target: DVec3) -> (bool, f64, f64) {
    let mut tracer = Tracer::new(scene, TextureCache::new(Arc::clone(scene.texture_store())));
    let mut ctx = SamplingContext::new(0);
    let (end, transmission) = tracer.trace_between(&mut ctx, DVec3::new(0.1, 0.2, 0.0), target, None);
    (end.hit(), transmission, visibility(end, transmission))
}

#[test]
fn two_partial_panes_multiply() {
    let mut scene = Scene::new(Camera::new());
    scene.add_object(pane(-1.0), constant(0.5));
    scene.add_object(pane(-2.0), constant(0.3));

    let (hit, transmission, visible) = walk_to(&scene, DVec3::new(0.1, 0.2, -5.0));
    assert!(!hit);
    assert_relative_eq!(transmission, 0.35, epsilon = 1e-6);
    assert_relative_eq!(visible, 0.35, epsilon = 1e-6);
}

#[test]
fn opaque_pane_blocks_after_partial() {
    let mut scene = Scene::new(Camera::new());
    scene.add_object(pane(-1.0), constant(0.4));
    scene.add_object(pane(-2.0), constant(1.0));
    scene.add_object(pane(-3.0), constant(0.5));

    let (hit, transmission, visible) = walk_to(&scene, DVec3::new(0.1, 0.2, -5.0));
    assert!(hit);
    assert_relative_eq!(transmission, 0.6, epsilon = 1e-6);
    assert_eq!(visible, 0.0);
}

#[test]
fn target_surface_is_not_an_occluder() {
    let mut scene = Scene::new(Camera::new());
    scene.add_object(pane(-1.0), constant(0.5));
    scene.add_object(pane(-2.0), constant(1.0));

    // The walk stops just short of the opaque pane it is aimed at
    let (hit, transmission, _) = walk_to(&scene, DVec3::new(0.1, 0.2, -2.0));
    assert!(!hit);
    assert_relative_eq!(transmission, 0.5, epsilon = 1e-6);
}

#[test]
fn unshaded_geometry_ends_walk_without_occluding() {
    let mut scene = Scene::new(Camera::new());
    scene.add_object(pane(-1.0), constant(0.5));
    scene.add_object(pane(-2.0), Some(Arc::new(GenericMaterial::unshaded())));
    scene.add_object(pane(-3.0), constant(1.0));

    let (hit, transmission, visible) = walk_to(&scene, DVec3::new(0.1, 0.2, -5.0));
    assert!(hit);
    assert_relative_eq!(transmission, 0.5, epsilon = 1e-6);
    assert_relative_eq!(visible, 0.5, epsilon = 1e-6);
}

#[test]
fn texture_alpha_cuts_out_holes() {
    // Left half transparent, right half opaque
    let texture = Texture::new(
        2,
        1,
        vec![[1.0, 1.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0]],
        "cutout",
    );
    let store = Arc::new(TextureStore::new());
    store.insert("cutout", texture);

    let mut scene = Scene::new(Camera::new()).with_texture_store(Arc::clone(&store));
    scene.add_object(
        pane(-1.0),
        Some(Arc::new(GenericMaterial::new(TexturedSurfaceShader::new("cutout")))),
    );

    let mut tracer = Tracer::new(&scene, TextureCache::new(store));
    let mut ctx = SamplingContext::new(0);

    let (end, through_hole) =
        tracer.trace(&mut ctx, DVec3::new(-0.5, 0.0, 0.0), -DVec3::Z, None);
    assert!(!end.hit());
    assert_relative_eq!(through_hole, 1.0);

    let (end, blocked) = tracer.trace(&mut ctx, DVec3::new(0.5, 0.0, 0.0), -DVec3::Z, None);
    assert!(end.hit());
    assert_relative_eq!(blocked, 1.0);
    assert!(tracer.texture_cache().hits() >= 1);
}

/// Forwards to a scene, counting calls and giving up after `limit`.
struct CountingIntersector {
    scene: Scene,
    calls: AtomicUsize,
    limit: usize,
}

impl Intersector for CountingIntersector {
    fn trace<'a>(
        &'a self,
        ray: &ShadingRay,
        shading_point: &mut ShadingPoint<'a>,
        parent: Option<&ShadingPoint<'_>>,
    ) -> bool {
        if self.calls.fetch_add(1, Ordering::Relaxed) >= self.limit {
            shading_point.hit = false;
            return false;
        }
        self.scene.trace(ray, shading_point, parent)
    }
}

#[test]
fn coincident_partial_panes_do_not_ping_pong() {
    let tilted = || {
        Quad::new(
            DVec3::new(-1.0, -1.0, -2.0),
            DVec3::new(2.0, 0.0, 1.0),
            DVec3::new(0.0, 2.0, 0.5),
        )
    };

    let mut scene = Scene::new(Camera::new());
    scene.add_object(tilted(), constant(0.5));
    scene.add_object(tilted(), constant(0.5));
    let store = Arc::clone(scene.texture_store());

    let intersector = CountingIntersector {
        scene,
        calls: AtomicUsize::new(0),
        limit: 1000,
    };
    let mut tracer = Tracer::new(&intersector, TextureCache::new(store));
    let mut ctx = SamplingContext::new(0);

    for _ in 0..4 {
        intersector.calls.store(0, Ordering::Relaxed);
        let (end, transmission) =
            tracer.trace(&mut ctx, DVec3::new(0.1, 0.2, 0.0), -DVec3::Z, None);

        assert!(!end.hit());
        assert!(intersector.calls.load(Ordering::Relaxed) <= 4);
        assert_relative_eq!(transmission, 0.5, epsilon = 1e-6);
    }
}
