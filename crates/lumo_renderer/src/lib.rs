//! Lumo Renderer - tile-parallel CPU rendering kernel.
//!
//! Frames are split into jobs (one per tile, or batches of light paths)
//! and drained by a [`lumo_foundation::JobManager`]. Visibility between
//! points is resolved by a [`Tracer`], which walks rays through partially
//! transparent occluders and accumulates their transmission.

mod camera;
mod config;
mod error;
mod frame;
mod frame_renderer;
mod intersector;
mod jobs;
mod material;
mod sample_generator;
mod sampling;
mod scene;
mod shading_point;
mod shading_ray;
mod shape;
mod sphere;
mod texture;
mod tile_renderer;
mod tracer;
mod triangle;

pub use camera::Camera;
pub use config::{RenderConfig, RenderMode, MAX_DIMENSION};
pub use error::{ConfigError, RenderError, Result};
pub use frame::{color_to_rgba, AccumulationBuffer, Frame, Tile, DEFAULT_TILE_SIZE};
pub use frame_renderer::FrameRenderer;
pub use intersector::Intersector;
pub use jobs::{SampleGeneratorJob, SampleGeneratorVec, TileJob, TileRendererVec};
pub use material::{Color, ConstantSurfaceShader, GenericMaterial, Material, SurfaceShader, TexturedSurfaceShader};
pub use sample_generator::{
    LightTracingSampleGenerator, LightTracingSampleGeneratorFactory, SampleGenerator,
    SampleGeneratorFactory,
};
pub use sampling::SamplingContext;
pub use scene::{PointLight, Scene, SceneObject};
pub use shading_point::ShadingPoint;
pub use shading_ray::{ShadingRay, VisibilityFlags};
pub use shape::{Shape, SurfaceHit};
pub use sphere::Sphere;
pub use texture::{Texture, TextureCache, TextureError, TextureResult, TextureStore};
pub use tile_renderer::{
    BlankTileRenderer, BlankTileRendererFactory, GenericTileRenderer, GenericTileRendererFactory,
    TileRenderer, TileRendererFactory,
};
pub use tracer::{visibility, Tracer};
pub use triangle::{Quad, Triangle};
