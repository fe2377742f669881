//! Render settings, loadable from JSON.

use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::{Color, ConfigError, DEFAULT_TILE_SIZE};

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// How a frame is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One job per tile, each rendered by a [`crate::TileRenderer`].
    #[default]
    Tiled,
    /// Batches of light paths splatted into the accumulation buffer.
    LightTracing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    /// Worker threads; 0 uses every logical core
    pub thread_count: usize,
    pub mode: RenderMode,
    /// Camera samples per pixel (tiled mode)
    pub samples_per_pixel: u32,
    /// Total light paths (light tracing mode)
    pub light_samples: usize,
    /// Linear RGB seen by rays that escape the scene
    pub background: [f32; 3],
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            tile_size: DEFAULT_TILE_SIZE,
            thread_count: 0,
            mode: RenderMode::Tiled,
            samples_per_pixel: 4,
            light_samples: 2_000_000,
            background: [0.0, 0.0, 0.0],
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "resolution {}x{} exceeds the {MAX_DIMENSION} pixel limit",
                self.width, self.height
            )));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size must be non-zero".into()));
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::Invalid("samples_per_pixel must be non-zero".into()));
        }
        Ok(())
    }

    /// Thread count with 0 resolved to the number of logical cores.
    pub fn resolved_thread_count(&self) -> usize {
        if self.thread_count > 0 {
            return self.thread_count;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    pub fn background_color(&self) -> Color {
        Color::from_array(self.background)
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_samples_per_pixel(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_light_samples(mut self, light_samples: usize) -> Self {
        self.light_samples = light_samples;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background.to_array();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
