//! Frame buffer split into independently lockable tiles.
//!
//! Tiles are the unit of work of tiled rendering: each tile job locks one
//! tile, so workers never contend on pixels. Light tracing splats into a
//! frame-wide [`AccumulationBuffer`] instead, which is developed into the
//! tiles once all samples are in.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use lumo_math::Vec4;
use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;

use crate::{Color, Result};

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// A rectangular region of the frame and its RGBA pixels.
#[derive(Debug, Clone)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Linear RGBA, row-major within the tile
    pixels: Vec<Vec4>,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Fill every pixel with `color`.
    pub fn clear(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    /// Set the pixel at tile-local coordinates.
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        if x < self.width && y < self.height {
            self.pixels[pixel_index(x, y, self.width)] = color;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Vec4> {
        if x < self.width && y < self.height {
            Some(self.pixels[pixel_index(x, y, self.width)])
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }
}

/// Per-pixel radiance sums for splatting renderers.
#[derive(Debug)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    sums: Mutex<Vec<Color>>,
    path_count: AtomicU64,
}

impl AccumulationBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sums: Mutex::new(vec![Color::ZERO; width as usize * height as usize]),
            path_count: AtomicU64::new(0),
        }
    }

    /// Add `value` to the pixel at raster coordinates. Out of bounds
    /// splats are dropped.
    pub fn splat(&self, x: u32, y: u32, value: Color) {
        if x < self.width && y < self.height {
            self.sums.lock()[pixel_index(x, y, self.width)] += value;
        }
    }

    /// Record that `count` more paths were traced, whether or not they
    /// splatted anything.
    pub fn add_paths(&self, count: u64) {
        self.path_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn path_count(&self) -> u64 {
        self.path_count.load(Ordering::Relaxed)
    }

    pub fn sum(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.sums.lock()[pixel_index(x, y, self.width)])
        } else {
            None
        }
    }

    pub fn clear(&self) {
        self.sums.lock().fill(Color::ZERO);
        self.path_count.store(0, Ordering::Relaxed);
    }
}

/// The image being rendered.
#[derive(Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    tile_size: u32,
    tile_count_x: u32,
    tile_count_y: u32,
    tiles: Vec<Mutex<Tile>>,
    accumulation: AccumulationBuffer,
}

impl Frame {
    /// Create a frame covered by `tile_size` square tiles; edge tiles are
    /// cropped to the image.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let tile_size = tile_size.max(1);
        let tile_count_x = width.div_ceil(tile_size);
        let tile_count_y = height.div_ceil(tile_size);

        let mut tiles = Vec::with_capacity(tile_count_x as usize * tile_count_y as usize);
        for ty in 0..tile_count_y {
            for tx in 0..tile_count_x {
                let x = tx * tile_size;
                let y = ty * tile_size;
                let tw = tile_size.min(width - x);
                let th = tile_size.min(height - y);
                tiles.push(Mutex::new(Tile::new(x, y, tw, th)));
            }
        }

        Self {
            width,
            height,
            tile_size,
            tile_count_x,
            tile_count_y,
            tiles,
            accumulation: AccumulationBuffer::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile_count_x(&self) -> u32 {
        self.tile_count_x
    }

    pub fn tile_count_y(&self) -> u32 {
        self.tile_count_y
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Lock tile `(tile_x, tile_y)`, or `None` if it is outside the grid.
    pub fn tile(&self, tile_x: u32, tile_y: u32) -> Option<MutexGuard<'_, Tile>> {
        if tile_x < self.tile_count_x && tile_y < self.tile_count_y {
            Some(self.tiles[pixel_index(tile_x, tile_y, self.tile_count_x)].lock())
        } else {
            None
        }
    }

    pub fn accumulation(&self) -> &AccumulationBuffer {
        &self.accumulation
    }

    /// Tile coordinates sorted center-out, so the middle of the image
    /// finishes first.
    pub fn tile_order(&self) -> Vec<(u32, u32)> {
        let center_x = self.width as f32 / 2.0;
        let center_y = self.height as f32 / 2.0;

        let mut order: Vec<(u32, u32, f32)> = self
            .tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| {
                let tile = tile.lock();
                let tile_center_x = tile.x as f32 + tile.width as f32 / 2.0;
                let tile_center_y = tile.y as f32 + tile.height as f32 / 2.0;
                let dist = (tile_center_x - center_x).powi(2) + (tile_center_y - center_y).powi(2);
                let index = index as u32;
                (index % self.tile_count_x, index / self.tile_count_x, dist)
            })
            .collect();

        // Stable, so equidistant tiles keep scanline order
        order.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        order.into_iter().map(|(tx, ty, _)| (tx, ty)).collect()
    }

    /// Fill every tile with `color`.
    pub fn clear(&self, color: Vec4) {
        for tile in &self.tiles {
            tile.lock().clear(color);
        }
        self.accumulation.clear();
    }

    /// Resolve the accumulation buffer into the tiles.
    ///
    /// Each pixel becomes its splat sum scaled by pixel count over traced
    /// paths, the light tracing estimator for a pinhole camera.
    pub fn develop_accumulation(&self) {
        let paths = self.accumulation.path_count();
        let scale = if paths == 0 {
            0.0
        } else {
            (self.pixel_count() as f64 / paths as f64) as f32
        };

        let sums = self.accumulation.sums.lock();
        for tile in &self.tiles {
            let mut tile = tile.lock();
            for ly in 0..tile.height {
                for lx in 0..tile.width {
                    let sum = sums[pixel_index(tile.x + lx, tile.y + ly, self.width)];
                    tile.set(lx, ly, (sum * scale).extend(1.0));
                }
            }
        }
    }

    /// Linear color of the pixel at raster coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tile = self.tile(x / self.tile_size, y / self.tile_size)?;
        tile.get(x - tile.x, y - tile.y)
    }

    /// Convert to an 8-bit image with gamma 2.0.
    pub fn to_image(&self) -> image::RgbaImage {
        let mut image = image::RgbaImage::new(self.width, self.height);
        let row_bytes = self.width as usize * 4;
        let bytes: &mut [u8] = &mut image;

        bytes
            .par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as u32;
                let ty = y / self.tile_size;
                for tx in 0..self.tile_count_x {
                    let Some(tile) = self.tile(tx, ty) else {
                        continue;
                    };
                    let ly = y - tile.y;
                    for lx in 0..tile.width {
                        let offset = (tile.x + lx) as usize * 4;
                        let color = tile.pixels[pixel_index(lx, ly, tile.width)];
                        row[offset..offset + 4].copy_from_slice(&color_to_rgba(color));
                    }
                }
            });

        image
    }

    /// Write the frame as an 8-bit image; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }
}

/// Row-major index, widened before multiplying so large frames don't wrap.
#[inline]
fn pixel_index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}

#[inline]
fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Gamma-correct a linear RGBA color to 8 bits. Alpha stays linear.
pub fn color_to_rgba(color: Vec4) -> [u8; 4] {
    let r = (255.0 * linear_to_gamma(color.x).clamp(0.0, 1.0)) as u8;
    let g = (255.0 * linear_to_gamma(color.y).clamp(0.0, 1.0)) as u8;
    let b = (255.0 * linear_to_gamma(color.z).clamp(0.0, 1.0)) as u8;
    let a = (255.0 * color.w.clamp(0.0, 1.0)) as u8;
    [r, g, b, a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_exact_fit() {
        let frame = Frame::new(128, 128, 64);
        assert_eq!(frame.tile_count(), 4);
        assert_eq!(frame.tile_count_x(), 2);
        assert_eq!(frame.tile_count_y(), 2);
    }

    #[test]
    fn test_tiles_partial_fit() {
        let frame = Frame::new(100, 70, 64);
        assert_eq!(frame.tile_count(), 4);

        let corner = frame.tile(1, 1).unwrap();
        assert_eq!((corner.x, corner.y), (64, 64));
        assert_eq!((corner.width, corner.height), (36, 6));
        drop(corner);

        let total: u64 = frame
            .tile_order()
            .into_iter()
            .map(|(tx, ty)| frame.tile(tx, ty).unwrap().pixel_count())
            .sum();
        assert_eq!(total, 100 * 70);
    }

    #[test]
    fn test_tile_out_of_range() {
        let frame = Frame::new(64, 64, 32);
        assert!(frame.tile(2, 0).is_none());
        assert!(frame.tile(0, 2).is_none());
    }

    #[test]
    fn test_tile_order_center_first() {
        let frame = Frame::new(320, 320, 64);
        let order = frame.tile_order();
        assert_eq!(order.len(), 25);
        // 5x5 grid: the middle tile comes first, a corner comes last
        assert_eq!(order[0], (2, 2));
        assert!([(0, 0), (4, 0), (0, 4), (4, 4)].contains(&order[24]));
    }

    #[test]
    fn test_tile_order_visits_every_tile_once() {
        let frame = Frame::new(200, 130, 32);
        let mut order = frame.tile_order();
        order.sort();
        order.dedup();
        assert_eq!(order.len(), frame.tile_count());
    }

    #[test]
    fn test_pixel_lookup_crosses_tiles() {
        let frame = Frame::new(10, 10, 4);
        frame.tile(2, 1).unwrap().set(1, 3, Vec4::new(1.0, 0.5, 0.25, 1.0));
        assert_eq!(frame.pixel(9, 7), Some(Vec4::new(1.0, 0.5, 0.25, 1.0)));
        assert_eq!(frame.pixel(10, 0), None);
    }

    #[test]
    fn test_develop_accumulation_scales_by_paths() {
        let frame = Frame::new(4, 2, 2);
        frame.accumulation().splat(3, 1, Color::splat(2.0));
        frame.accumulation().splat(3, 1, Color::splat(2.0));
        frame.accumulation().splat(99, 1, Color::splat(100.0));
        frame.accumulation().add_paths(16);
        frame.develop_accumulation();

        // 4.0 * 8 pixels / 16 paths
        assert_eq!(frame.pixel(3, 1), Some(Vec4::new(2.0, 2.0, 2.0, 1.0)));
        assert_eq!(frame.pixel(0, 0), Some(Vec4::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_to_image_gamma() {
        let frame = Frame::new(3, 2, 2);
        frame.clear(Vec4::new(0.25, 1.0, 0.0, 1.0));
        frame.tile(1, 0).unwrap().set(0, 1, Vec4::new(4.0, -1.0, 0.0, 0.5));

        let image = frame.to_image();
        assert_eq!(image.get_pixel(0, 0).0, [127, 255, 0, 255]);
        assert_eq!(image.get_pixel(2, 1).0, [255, 0, 0, 127]);
    }

    #[test]
    fn test_pixel_index_does_not_wrap_u32() {
        // 70000 * 70000 overflows u32
        assert_eq!(pixel_index(69_999, 69_999, 70_000), 4_899_999_999);
        assert_eq!(Tile::new(0, 0, 70_000, 0).pixel_count(), 0);
        assert_eq!(Tile::new(0, 0, 70_000, 1).pixel_count(), 70_000);
    }

    #[test]
    fn test_save_writes_png() {
        let frame = Frame::new(3, 2, 2);
        frame.clear(Vec4::new(1.0, 0.0, 0.0, 1.0));
        let path = std::env::temp_dir().join(format!("lumo_frame_save_{}.png", std::process::id()));

        frame.save(&path).unwrap();
        let image = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).ok();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_save_reports_image_error() {
        let frame = Frame::new(2, 2, 2);
        let path = std::env::temp_dir().join("lumo_missing_dir").join("nested").join("frame.png");

        let err = frame.save(&path).unwrap_err();
        assert!(matches!(err, crate::RenderError::Image(_)));
    }
}
