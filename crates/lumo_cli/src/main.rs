//! `lumo [config.json] [output.png] [threads]`
//!
//! Renders a small demo scene with the tile-parallel renderer and writes
//! it as a PNG.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use lumo_math::DVec3;
use lumo_renderer::{
    Camera, Color, ConstantSurfaceShader, FrameRenderer, GenericMaterial, Material, PointLight,
    Quad, RenderConfig, Scene, Sphere,
};

const DEFAULT_OUTPUT: &str = "lumo.png";

struct Args {
    config: Option<PathBuf>,
    output: PathBuf,
    threads: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let config = args.next().filter(|arg| arg != "-").map(PathBuf::from);
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let threads = args
        .next()
        .map(|arg| arg.parse::<usize>())
        .transpose()
        .context("thread count must be a non-negative integer")?;

    Ok(Args {
        config,
        output,
        threads,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.thread_count = threads;
    }

    let start = Instant::now();
    let scene = Arc::new(build_scene(&config));
    log::info!(
        "scene built in {:.2?} ({} objects, {} lights)",
        start.elapsed(),
        scene.objects().len(),
        scene.lights().len()
    );

    let renderer = FrameRenderer::new(config).context("invalid render config")?;
    let start = Instant::now();
    let frame = renderer.render(scene).context("render failed")?;
    let render_time = start.elapsed();

    frame
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    log::info!("rendered in {:.2?}, saved to {}", render_time, args.output.display());
    Ok(())
}

fn shaded(color: Color, alpha: f32) -> Option<Arc<dyn Material>> {
    Some(Arc::new(GenericMaterial::new(
        ConstantSurfaceShader::new(color).with_alpha(alpha),
    )))
}

/// Ground plane, three opaque spheres, a half transparent red pane, a
/// faint blue pane and two point lights.
fn build_scene(config: &RenderConfig) -> Scene {
    let mut camera = Camera::new()
        .with_resolution(config.width, config.height)
        .with_position(
            DVec3::new(0.0, 2.0, 6.0), // look_from
            DVec3::new(0.0, 0.8, 0.0), // look_at
            DVec3::Y,                  // vup
        )
        .with_fov(45.0);
    camera.initialize();

    let mut scene = Scene::new(camera);

    // Ground
    scene.add_object(
        Quad::new(
            DVec3::new(-20.0, 0.0, 20.0),
            DVec3::new(40.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, -40.0),
        ),
        shaded(Color::new(0.6, 0.6, 0.6), 1.0),
    );

    scene.add_object(
        Sphere::new(DVec3::new(-1.6, 0.7, -0.5), 0.7),
        shaded(Color::new(0.8, 0.3, 0.2), 1.0),
    );
    scene.add_object(
        Sphere::new(DVec3::new(0.0, 1.0, -1.5), 1.0),
        shaded(Color::new(0.9, 0.9, 0.85), 1.0),
    );
    scene.add_object(
        Sphere::new(DVec3::new(1.7, 0.5, 0.2), 0.5),
        shaded(Color::new(0.2, 0.4, 0.8), 1.0),
    );

    // Partially transparent panes
    scene.add_object(
        Quad::new(
            DVec3::new(-0.6, 0.0, 1.2),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.4, 0.0),
        ),
        shaded(Color::new(0.9, 0.1, 0.1), 0.5),
    );
    scene.add_object(
        Quad::new(
            DVec3::new(0.8, 0.0, 0.8),
            DVec3::new(1.0, 0.0, -0.4),
            DVec3::new(0.0, 1.2, 0.0),
        ),
        shaded(Color::new(0.1, 0.2, 0.9), 0.3),
    );

    scene.add_light(PointLight::new(DVec3::new(2.0, 5.0, 4.0), Color::new(30.0, 28.0, 25.0)));
    scene.add_light(PointLight::new(DVec3::new(-4.0, 3.0, 1.0), Color::new(6.0, 7.0, 10.0)));

    scene
}
