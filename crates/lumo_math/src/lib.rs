//! Lumo math - vector types, rays and parametric intervals.
//!
//! Geometry is carried in double precision (`DVec3`) so that long
//! visibility walks through many occluders do not drift; colors stay in
//! single precision (`Vec3`).

// Re-export glam for convenience
pub use glam::*;

mod interval;
mod ray;

pub use interval::Interval;
pub use ray::Ray;
