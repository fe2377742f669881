//! Pinhole camera for primary ray generation and point projection.

use lumo_math::{DVec2, DVec3, Vec2};

use crate::{ShadingRay, VisibilityFlags};

/// Pinhole camera.
///
/// Configure with the `with_*` builders, then call [`initialize`] before
/// generating rays.
///
/// [`initialize`]: Camera::initialize
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: DVec3,
    look_at: DVec3,
    vup: DVec3,

    /// Vertical field of view in degrees
    vfov: f64,

    // Cached computed values (set by initialize())
    center: DVec3,
    pixel00_loc: DVec3,
    pixel_delta_u: DVec3,
    pixel_delta_v: DVec3,
    w: DVec3,
    /// Area of the image plane at unit distance
    image_plane_area: f64,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 640,
            image_height: 360,
            look_from: DVec3::ZERO,
            look_at: DVec3::new(0.0, 0.0, -1.0),
            vup: DVec3::Y,
            vfov: 90.0,
            center: DVec3::ZERO,
            pixel00_loc: DVec3::ZERO,
            pixel_delta_u: DVec3::ZERO,
            pixel_delta_v: DVec3::ZERO,
            w: DVec3::Z,
            image_plane_area: 0.0,
        };
        camera.initialize();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: DVec3, look_at: DVec3, vup: DVec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_fov(mut self, vfov: f64) -> Self {
        self.vfov = vfov;
        self
    }

    /// Recompute the cached basis after changing settings.
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        // Viewport at unit distance
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (self.image_width as f64 / self.image_height as f64);

        self.w = (self.look_from - self.look_at).normalize();
        let u = self.vup.cross(self.w).normalize();
        let v = self.w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width as f64;
        self.pixel_delta_v = viewport_v / self.image_height as f64;

        let viewport_upper_left = self.center - self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
        self.image_plane_area = viewport_width * viewport_height;
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Unit view direction.
    pub fn forward(&self) -> DVec3 {
        -self.w
    }

    pub fn image_plane_area(&self) -> f64 {
        self.image_plane_area
    }

    /// Primary ray through pixel (x, y), offset by `jitter` pixels from
    /// the pixel center.
    pub fn generate_ray(&self, x: u32, y: u32, jitter: Vec2) -> ShadingRay {
        let pixel_sample = self.pixel00_loc
            + (x as f64 + jitter.x as f64) * self.pixel_delta_u
            + (y as f64 + jitter.y as f64) * self.pixel_delta_v;

        ShadingRay::new(
            self.center,
            pixel_sample - self.center,
            0.0,
            VisibilityFlags::CAMERA,
        )
    }

    /// Raster position of a world point, or `None` if it is behind the
    /// camera or outside the image.
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        let d = point - self.center;
        let depth = -d.dot(self.w);
        if depth <= 0.0 {
            return None;
        }

        // Point on the unit-distance image plane, relative to pixel (0, 0)
        let on_plane = self.center + d / depth;
        let offset = on_plane - self.pixel00_loc;
        let x = offset.dot(self.pixel_delta_u) / self.pixel_delta_u.length_squared() + 0.5;
        let y = offset.dot(self.pixel_delta_v) / self.pixel_delta_v.length_squared() + 0.5;

        let inside = (0.0..self.image_width as f64).contains(&x)
            && (0.0..self.image_height as f64).contains(&y);
        inside.then_some(DVec2::new(x, y))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
