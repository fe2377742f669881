//! Textures, the shared texture store and per-thread texture caches.
//!
//! The [`TextureStore`] is shared by the whole render and guarded by a
//! read-write lock. Each tracer owns a [`TextureCache`] that memoizes the
//! store lookups it makes, so hot alpha-mask evaluations never touch the
//! lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::Color;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture with pixel data.
///
/// Stores pixels in linear RGBA float format, row-major, top row first.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
    /// Where the texture came from (for debugging)
    pub path: String,
}

impl Texture {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, path: impl Into<String>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Color, alpha: f32) -> Self {
        Self::new(1, 1, vec![[color.x, color.y, color.z, alpha]], "<solid>")
    }

    /// Convert an 8-bit sRGB image; alpha is kept linear.
    pub fn from_rgba_image(image: &image::RgbaImage, path: impl Into<String>) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self::new(width, height, pixels, path)
    }

    /// Sample the color at UV coordinates (bilinear filtering).
    ///
    /// UV coordinates wrap, with (0, 0) at bottom-left.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0); // Flip V for image coordinates

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let texel = |x, y| {
            let p = self.get_pixel(x, y);
            Color::new(p[0], p[1], p[2])
        };

        let top = texel(x0, y0) * (1.0 - fx) + texel(x1, y0) * fx;
        let bottom = texel(x0, y1) * (1.0 - fx) + texel(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Sample a single channel (nearest texel).
    pub fn sample_channel(&self, u: f32, v: f32, channel: usize) -> f32 {
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = (((1.0 - v) * self.height as f32) as u32).min(self.height - 1);

        self.get_pixel(x, y)[channel.min(3)]
    }

    fn get_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Named textures shared by every thread of a render.
#[derive(Default)]
pub struct TextureStore {
    textures: RwLock<HashMap<String, Arc<Texture>>>,
    base_dir: Option<PathBuf>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that resolves relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: RwLock::default(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Register a texture under `name`, replacing any previous one.
    pub fn insert(&self, name: impl Into<String>, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.textures.write().insert(name.into(), Arc::clone(&texture));
        texture
    }

    /// Load an image file and register it under `name`.
    pub fn load(&self, name: impl Into<String>, path: impl AsRef<Path>) -> TextureResult<Arc<Texture>> {
        let full_path = self.resolve_path(path.as_ref());
        let path_string = full_path.to_string_lossy().to_string();

        let bytes = std::fs::read(&full_path)?;
        let image = image::load_from_memory(&bytes).map_err(|source| TextureError::Decode {
            path: path_string.clone(),
            source,
        })?;
        let texture = Texture::from_rgba_image(&image.to_rgba8(), path_string);

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            texture.path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(self.insert(name, texture))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Texture>> {
        self.textures.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.read().is_empty()
    }

    /// Get total memory usage of stored textures.
    pub fn total_size_bytes(&self) -> usize {
        self.textures.read().values().map(|t| t.size_bytes()).sum()
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if !path.is_absolute() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Per-thread memo of texture store lookups.
///
/// Misses (including names the store does not know) are remembered too,
/// so a missing texture is only reported once per cache.
pub struct TextureCache {
    store: Arc<TextureStore>,
    local: HashMap<String, Option<Arc<Texture>>>,
    hits: u64,
    misses: u64,
}

impl TextureCache {
    pub fn new(store: Arc<TextureStore>) -> Self {
        Self {
            store,
            local: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, name: &str) -> Option<&Texture> {
        if self.local.contains_key(name) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let texture = self.store.get(name);
            if texture.is_none() {
                log::warn!("texture \"{}\" not found in texture store", name);
            }
            self.local.insert(name.to_string(), texture);
        }

        self.local.get(name).and_then(|texture| texture.as_deref())
    }

    pub fn store(&self) -> &Arc<TextureStore> {
        &self.store
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Forget memoized lookups, e.g. after the store changed.
    pub fn clear(&mut self) {
        self.local.clear();
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
