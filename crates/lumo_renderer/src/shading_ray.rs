//! Rays as seen by the intersector: a ray, a parametric range and
//! visibility flags.

use bitflags::bitflags;
use lumo_math::{DVec3, Interval, Ray};

bitflags! {
    /// Kinds of rays an object can be visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisibilityFlags: u32 {
        const CAMERA = 1 << 0;
        const LIGHT = 1 << 1;
        const SHADOW = 1 << 2;
        const PROBE = 1 << 3;
        const ALL = Self::CAMERA.bits() | Self::LIGHT.bits() | Self::SHADOW.bits() | Self::PROBE.bits();
    }
}

impl Default for VisibilityFlags {
    fn default() -> Self {
        VisibilityFlags::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingRay {
    pub ray: Ray,
    /// Accepted hit distances, in units of `ray.direction`.
    pub range: Interval,
    pub flags: VisibilityFlags,
}

impl ShadingRay {
    /// Unbounded ray: any hit beyond the origin counts.
    pub fn new(origin: DVec3, direction: DVec3, time: f32, flags: VisibilityFlags) -> Self {
        Self {
            ray: Ray::new(origin, direction, time),
            range: Interval::from_min(0.0),
            flags,
        }
    }

    /// Ray restricted to `[tmin, tmax]`.
    pub fn segment(
        origin: DVec3,
        direction: DVec3,
        tmin: f64,
        tmax: f64,
        time: f32,
        flags: VisibilityFlags,
    ) -> Self {
        Self {
            ray: Ray::new(origin, direction, time),
            range: Interval::new(tmin, tmax),
            flags,
        }
    }

    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.ray.origin
    }

    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.ray.direction
    }

    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.ray.at(t)
    }

    pub fn tmin(&self) -> f64 {
        self.range.min
    }

    pub fn tmax(&self) -> f64 {
        self.range.max
    }
}

impl Default for ShadingRay {
    fn default() -> Self {
        Self {
            ray: Ray::default(),
            range: Interval::from_min(0.0),
            flags: VisibilityFlags::ALL,
        }
    }
}
