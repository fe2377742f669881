//! Triangle primitive and a quad convenience built from two triangles.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumo_math::{DVec3, Interval, Ray, Vec2};

use crate::{Shape, SurfaceHit};

pub struct Triangle {
    v0: DVec3,
    v1: DVec3,
    v2: DVec3,
    /// Pre-computed face normal (unit length)
    normal: DVec3,
    /// Texture coordinates of the three vertices
    uvs: [Vec2; 3],
}

impl Triangle {
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> Self {
        Self::with_uvs(v0, v1, v2, [Vec2::ZERO, Vec2::X, Vec2::Y])
    }

    pub fn with_uvs(v0: DVec3, v1: DVec3, v2: DVec3, uvs: [Vec2; 3]) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            v0,
            v1,
            v2,
            normal,
            uvs,
        }
    }
}

impl Shape for Triangle {
    fn intersect(&self, ray: &Ray, range: Interval) -> Option<SurfaceHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-12 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !range.surrounds(t) {
            return None;
        }

        let (u, v) = (u as f32, v as f32);
        let uv = self.uvs[0] * (1.0 - u - v) + self.uvs[1] * u + self.uvs[2] * v;
        Some(SurfaceHit {
            t,
            normal: self.normal,
            uv,
        })
    }
}

/// Planar parallelogram spanned by `edge_u` and `edge_v` from `corner`.
///
/// UVs run from (0, 0) at `corner` to (1, 1) at the opposite corner.
pub struct Quad {
    halves: [Triangle; 2],
}

impl Quad {
    pub fn new(corner: DVec3, edge_u: DVec3, edge_v: DVec3) -> Self {
        let p00 = corner;
        let p10 = corner + edge_u;
        let p01 = corner + edge_v;
        let p11 = corner + edge_u + edge_v;
        Self {
            halves: [
                Triangle::with_uvs(p00, p10, p11, [Vec2::ZERO, Vec2::X, Vec2::ONE]),
                Triangle::with_uvs(p00, p11, p01, [Vec2::ZERO, Vec2::ONE, Vec2::Y]),
            ],
        }
    }
}

impl Shape for Quad {
    fn intersect(&self, ray: &Ray, range: Interval) -> Option<SurfaceHit> {
        self.halves[0]
            .intersect(ray, range)
            .or_else(|| self.halves[1].intersect(ray, range))
    }
}
