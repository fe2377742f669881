//! Sample generators: per-worker objects that splat light paths into a
//! frame's accumulation buffer.

use std::f64::consts::PI;
use std::sync::Arc;

use lumo_foundation::{AbortSwitch, JobError};

use crate::{visibility, Frame, SamplingContext, Scene, TextureCache, Tracer, VisibilityFlags};

/// Paths traced between two abort checks.
const ABORT_POLL_INTERVAL: usize = 256;

pub trait SampleGenerator: Send {
    /// Trace `count` paths and splat their contributions into `frame`.
    fn generate_samples(
        &mut self,
        count: usize,
        frame: &Frame,
        abort_switch: &AbortSwitch,
    ) -> Result<(), JobError>;
}

pub trait SampleGeneratorFactory: Send + Sync {
    fn create(&self, generator_index: usize, generator_count: usize) -> Box<dyn SampleGenerator>;
}

/// Particle tracing from the scene's point lights.
///
/// Each particle leaves a light in a uniform direction, walks through
/// partial occluders to the first opaque surface and is connected to the
/// camera through [`Tracer::trace_between`].
pub struct LightTracingSampleGenerator {
    scene: Arc<Scene>,
    sampling_context: SamplingContext,
    texture_cache: Option<TextureCache>,
}

impl LightTracingSampleGenerator {
    pub fn new(scene: Arc<Scene>, sampling_context: SamplingContext) -> Self {
        Self {
            scene,
            sampling_context,
            texture_cache: None,
        }
    }
}

impl SampleGenerator for LightTracingSampleGenerator {
    fn generate_samples(
        &mut self,
        count: usize,
        frame: &Frame,
        abort_switch: &AbortSwitch,
    ) -> Result<(), JobError> {
        let camera = self.scene.camera();
        if camera.image_width != frame.width() || camera.image_height != frame.height() {
            return Err(JobError::descriptive(
                "camera/frame mismatch",
                format!(
                    "camera is {}x{}, frame is {}x{}",
                    camera.image_width,
                    camera.image_height,
                    frame.width(),
                    frame.height()
                ),
            ));
        }

        let scene = Arc::clone(&self.scene);
        let lights = scene.lights();
        if lights.is_empty() {
            frame.accumulation().add_paths(count as u64);
            return Ok(());
        }

        let texture_cache = self
            .texture_cache
            .take()
            .unwrap_or_else(|| TextureCache::new(Arc::clone(scene.texture_store())));
        let mut tracer = Tracer::new(&*scene, texture_cache);

        let camera = scene.camera();
        let camera_center = camera.center();
        let image_plane_area = camera.image_plane_area();
        let ctx = &mut self.sampling_context;

        let mut traced = 0;
        while traced < count {
            if traced % ABORT_POLL_INTERVAL == 0 && abort_switch.is_aborted() {
                break;
            }
            traced += 1;

            let light = &lights[ctx.next_index(lights.len())];
            let power = light.intensity * (4.0 * PI * lights.len() as f64) as f32;
            let direction = ctx.next_direction();

            tracer.set_ray_flags(VisibilityFlags::LIGHT);
            let (hit, transmission) = tracer.trace(ctx, light.position, direction, None);
            let hit = hit.clone();

            let Some(surface_shader) = hit.surface_shader() else {
                continue;
            };
            if !hit.hit() {
                continue;
            }

            let Some(raster) = camera.project(hit.point()) else {
                continue;
            };

            let to_camera = camera_center - hit.point();
            let distance_squared = to_camera.length_squared();
            let distance = distance_squared.sqrt();
            let cos_surface = hit.normal.dot(to_camera / distance);
            if cos_surface <= 0.0 {
                continue;
            }
            let cos_camera = camera.forward().dot(-to_camera / distance);

            tracer.set_ray_flags(VisibilityFlags::CAMERA);
            let (end, camera_transmission) =
                tracer.trace_between(ctx, hit.point(), camera_center, Some(&hit));
            let camera_visibility = visibility(end, camera_transmission);
            if camera_visibility <= 0.0 {
                continue;
            }

            let albedo = surface_shader.albedo(tracer.texture_cache_mut(), &hit);
            let weight = transmission * camera_visibility * cos_surface
                / (distance_squared * image_plane_area * cos_camera.powi(3));
            let contribution = power * albedo / std::f32::consts::PI * weight as f32;

            frame
                .accumulation()
                .splat(raster.x as u32, raster.y as u32, contribution);
        }

        frame.accumulation().add_paths(traced as u64);
        self.texture_cache = Some(tracer.into_texture_cache());

        if traced < count {
            log::debug!("light tracing stopped on abort after {} of {} paths", traced, count);
        }
        Ok(())
    }
}

pub struct LightTracingSampleGeneratorFactory {
    scene: Arc<Scene>,
    seed: u64,
}

impl LightTracingSampleGeneratorFactory {
    pub fn new(scene: Arc<Scene>, seed: u64) -> Self {
        Self { scene, seed }
    }
}

impl SampleGeneratorFactory for LightTracingSampleGeneratorFactory {
    fn create(&self, generator_index: usize, generator_count: usize) -> Box<dyn SampleGenerator> {
        log::trace!("creating light tracing generator {}/{}", generator_index + 1, generator_count);
        Box::new(LightTracingSampleGenerator::new(
            Arc::clone(&self.scene),
            SamplingContext::for_stream(self.seed, generator_index),
        ))
    }
}
