//! Geometric shapes that scene objects are made of.

use lumo_math::{DVec3, Interval, Ray, Vec2};

/// Geometric part of an intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub t: f64,
    /// Unit outward normal
    pub normal: DVec3,
    pub uv: Vec2,
}

/// Trait for shapes that can be hit by rays.
pub trait Shape: Send + Sync {
    /// Nearest intersection with `t` strictly inside `range`.
    fn intersect(&self, ray: &Ray, range: Interval) -> Option<SurfaceHit>;
}
