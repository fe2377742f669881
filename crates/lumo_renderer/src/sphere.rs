//! Sphere primitive.

use std::f64::consts::PI;

use lumo_math::{DVec3, Interval, Ray, Vec2};

use crate::{Shape, SurfaceHit};

pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn get_sphere_uv(p: DVec3) -> Vec2 {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        Vec2::new((phi / (2.0 * PI)) as f32, (theta / PI) as f32)
    }
}

impl Shape for Sphere {
    fn intersect(&self, ray: &Ray, range: Interval) -> Option<SurfaceHit> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !range.surrounds(root) {
            root = (h + sqrtd) / a;
            if !range.surrounds(root) {
                return None;
            }
        }

        let normal = (ray.at(root) - self.center) / self.radius;
        Some(SurfaceHit {
            t: root,
            normal,
            uv: Self::get_sphere_uv(normal),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0), 0.0);

        let hit = sphere.intersect(&ray, Interval::from_min(0.0)).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-9);
        assert!((hit.normal - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_sphere_far_root_when_near_root_excluded() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0), 0.0);

        let hit = sphere.intersect(&ray, Interval::from_min(0.6)).unwrap();
        assert!((hit.t - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(DVec3::ZERO, DVec3::Y, 0.0);
        assert!(sphere.intersect(&ray, Interval::from_min(0.0)).is_none());
    }
}
