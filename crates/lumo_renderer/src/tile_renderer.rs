//! Tile renderers: per-worker objects that fill one tile of a frame.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lumo_foundation::{AbortSwitch, JobError};
use lumo_math::Vec4;

use crate::{
    visibility, Color, Frame, SamplingContext, Scene, ShadingPoint, TextureCache, Tracer,
    VisibilityFlags,
};

/// Renders whole tiles of a [`Frame`].
///
/// Each worker owns one renderer, so implementations may keep mutable
/// per-worker state (random streams, caches) without locking.
pub trait TileRenderer: Send {
    fn render_tile(
        &mut self,
        frame: &Frame,
        tile_x: u32,
        tile_y: u32,
        abort_switch: &AbortSwitch,
    ) -> Result<(), JobError>;
}

pub trait TileRendererFactory: Send + Sync {
    fn create(&self) -> Box<dyn TileRenderer>;
}

fn invalid_tile(frame: &Frame, tile_x: u32, tile_y: u32) -> JobError {
    JobError::descriptive(
        "invalid tile",
        format!(
            "({}, {}) is outside the {}x{} tile grid",
            tile_x,
            tile_y,
            frame.tile_count_x(),
            frame.tile_count_y()
        ),
    )
}

/// Fills tiles with opaque black.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankTileRenderer;

impl TileRenderer for BlankTileRenderer {
    fn render_tile(
        &mut self,
        frame: &Frame,
        tile_x: u32,
        tile_y: u32,
        _abort_switch: &AbortSwitch,
    ) -> Result<(), JobError> {
        let mut tile = frame
            .tile(tile_x, tile_y)
            .ok_or_else(|| invalid_tile(frame, tile_x, tile_y))?;
        tile.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlankTileRendererFactory;

impl TileRendererFactory for BlankTileRendererFactory {
    fn create(&self) -> Box<dyn TileRenderer> {
        Box::new(BlankTileRenderer)
    }
}

/// Direct lighting through partially transparent occluders.
///
/// Camera rays walk through partial occluders to the first opaque
/// surface, which is lit by every point light whose shadow ray reaches
/// it; the result is composited over the background by the transmission
/// accumulated along the camera ray.
pub struct GenericTileRenderer {
    scene: Arc<Scene>,
    sampling_context: SamplingContext,
    texture_cache: Option<TextureCache>,
    samples_per_pixel: u32,
    background: Color,
}

impl GenericTileRenderer {
    pub fn new(
        scene: Arc<Scene>,
        sampling_context: SamplingContext,
        samples_per_pixel: u32,
        background: Color,
    ) -> Self {
        Self {
            scene,
            sampling_context,
            texture_cache: None,
            samples_per_pixel: samples_per_pixel.max(1),
            background,
        }
    }

    /// Texture cache kept between tiles, if a tile has been rendered.
    pub fn texture_cache(&self) -> Option<&TextureCache> {
        self.texture_cache.as_ref()
    }
}

impl TileRenderer for GenericTileRenderer {
    fn render_tile(
        &mut self,
        frame: &Frame,
        tile_x: u32,
        tile_y: u32,
        abort_switch: &AbortSwitch,
    ) -> Result<(), JobError> {
        let (x0, y0, width, height) = {
            let tile = frame
                .tile(tile_x, tile_y)
                .ok_or_else(|| invalid_tile(frame, tile_x, tile_y))?;
            (tile.x, tile.y, tile.width, tile.height)
        };

        let mut pixels = Vec::new();
        pixels.try_reserve_exact((width * height) as usize)?;

        let scene = Arc::clone(&self.scene);
        let texture_cache = self
            .texture_cache
            .take()
            .unwrap_or_else(|| TextureCache::new(Arc::clone(scene.texture_store())));
        let mut tracer = Tracer::new(&*scene, texture_cache);

        let mut aborted = false;
        'rows: for y in y0..y0 + height {
            if abort_switch.is_aborted() {
                aborted = true;
                break 'rows;
            }
            for x in x0..x0 + width {
                let mut color = Color::ZERO;
                for _ in 0..self.samples_per_pixel {
                    color += shade_camera_sample(
                        &mut self.sampling_context,
                        &mut tracer,
                        &scene,
                        x,
                        y,
                        self.background,
                    );
                }
                pixels.push((color / self.samples_per_pixel as f32).extend(1.0));
            }
        }

        self.texture_cache = Some(tracer.into_texture_cache());

        if aborted {
            log::debug!("tile ({}, {}) abandoned on abort", tile_x, tile_y);
            return Ok(());
        }

        let mut tile = frame
            .tile(tile_x, tile_y)
            .ok_or_else(|| invalid_tile(frame, tile_x, tile_y))?;
        for (i, color) in pixels.into_iter().enumerate() {
            let i = i as u32;
            tile.set(i % width, i / width, color);
        }

        Ok(())
    }
}

fn shade_camera_sample(
    sampling_context: &mut SamplingContext,
    tracer: &mut Tracer<'_>,
    scene: &Scene,
    x: u32,
    y: u32,
    background: Color,
) -> Color {
    let jitter = sampling_context.next_pixel_jitter();
    let ray = scene.camera().generate_ray(x, y, jitter);

    tracer.set_ray_flags(VisibilityFlags::CAMERA);
    let (hit, transmission) = tracer.trace(sampling_context, ray.origin(), ray.direction(), None);
    let hit = hit.clone();

    let radiance = match hit.surface_shader() {
        Some(surface_shader) if hit.hit() => {
            let albedo = surface_shader.albedo(tracer.texture_cache_mut(), &hit);
            albedo / PI * direct_irradiance(sampling_context, tracer, scene, &hit)
        }
        _ => background,
    };

    radiance * transmission as f32
}

/// Irradiance from all point lights at `hit`, attenuated by the
/// transmission of each shadow ray.
fn direct_irradiance(
    sampling_context: &mut SamplingContext,
    tracer: &mut Tracer<'_>,
    scene: &Scene,
    hit: &ShadingPoint<'_>,
) -> Color {
    tracer.set_ray_flags(VisibilityFlags::SHADOW);

    let mut irradiance = Color::ZERO;
    for light in scene.lights() {
        let to_light = light.position - hit.point();
        let distance_squared = to_light.length_squared();
        if distance_squared == 0.0 {
            continue;
        }

        let cos_theta = hit.normal.dot(to_light / distance_squared.sqrt());
        if cos_theta <= 0.0 {
            continue;
        }

        let (end, transmission) =
            tracer.trace_between(sampling_context, hit.point(), light.position, Some(hit));
        let visibility = visibility(end, transmission);
        if visibility > 0.0 {
            irradiance += light.intensity * (cos_theta * visibility / distance_squared) as f32;
        }
    }
    irradiance
}

/// Creates [`GenericTileRenderer`]s, each with its own random stream.
pub struct GenericTileRendererFactory {
    scene: Arc<Scene>,
    seed: u64,
    samples_per_pixel: u32,
    background: Color,
    next_stream: AtomicUsize,
}

impl GenericTileRendererFactory {
    pub fn new(scene: Arc<Scene>, seed: u64, samples_per_pixel: u32, background: Color) -> Self {
        Self {
            scene,
            seed,
            samples_per_pixel,
            background,
            next_stream: AtomicUsize::new(0),
        }
    }
}

impl TileRendererFactory for GenericTileRendererFactory {
    fn create(&self) -> Box<dyn TileRenderer> {
        let stream = self.next_stream.fetch_add(1, Ordering::Relaxed);
        Box::new(GenericTileRenderer::new(
            Arc::clone(&self.scene),
            SamplingContext::for_stream(self.seed, stream),
            self.samples_per_pixel,
            self.background,
        ))
    }
}
