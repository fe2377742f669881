//! Scene description and its brute-force intersector.

use std::sync::Arc;

use lumo_math::{DVec3, Interval};

use crate::{
    Camera, Color, Intersector, Material, ShadingPoint, ShadingRay, Shape, TextureStore,
    VisibilityFlags,
};

/// Hits closer than this to the parent point (relative to the parent's
/// position magnitude) are treated as self-intersections.
const SELF_INTERSECTION_EPSILON: f64 = 1.0e-6;

pub struct SceneObject {
    shape: Box<dyn Shape>,
    material: Option<Arc<dyn Material>>,
    visibility: VisibilityFlags,
}

impl SceneObject {
    pub fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }

    pub fn visibility(&self) -> VisibilityFlags {
        self.visibility
    }
}

/// An isotropic point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: DVec3,
    /// Radiant intensity (power per steradian)
    pub intensity: Color,
}

impl PointLight {
    pub fn new(position: DVec3, intensity: Color) -> Self {
        Self {
            position,
            intensity,
        }
    }
}

/// Objects, lights, camera and textures of one render.
///
/// The scene is immutable while rendering and shared between workers by
/// `Arc`; it implements [`Intersector`] with a linear nearest-hit search.
pub struct Scene {
    camera: Camera,
    objects: Vec<SceneObject>,
    lights: Vec<PointLight>,
    texture_store: Arc<TextureStore>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            objects: Vec::new(),
            lights: Vec::new(),
            texture_store: Arc::new(TextureStore::new()),
        }
    }

    pub fn with_texture_store(mut self, texture_store: Arc<TextureStore>) -> Self {
        self.texture_store = texture_store;
        self
    }

    /// Add an object visible to every kind of ray. Returns its primitive
    /// index.
    pub fn add_object(
        &mut self,
        shape: impl Shape + 'static,
        material: Option<Arc<dyn Material>>,
    ) -> usize {
        self.add_object_with_visibility(shape, material, VisibilityFlags::ALL)
    }

    pub fn add_object_with_visibility(
        &mut self,
        shape: impl Shape + 'static,
        material: Option<Arc<dyn Material>>,
        visibility: VisibilityFlags,
    ) -> usize {
        self.objects.push(SceneObject {
            shape: Box::new(shape),
            material,
            visibility,
        });
        self.objects.len() - 1
    }

    pub fn add_light(&mut self, light: PointLight) {
        self.lights.push(light);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn texture_store(&self) -> &Arc<TextureStore> {
        &self.texture_store
    }

    /// Ray range tightened past the parent hit, so a walk leaving a surface
    /// cannot hit that surface, or anything coincident with it, again.
    fn leaving_range(ray: &ShadingRay, parent: Option<&ShadingPoint<'_>>) -> Interval {
        match parent {
            Some(parent) if parent.hit() => {
                let scale = 1.0 + parent.point().abs().max_element();
                let length = ray.direction().length();
                if length == 0.0 {
                    return Interval::EMPTY;
                }
                let min_t = SELF_INTERSECTION_EPSILON * scale / length;
                Interval::new(ray.range.min.max(min_t), ray.range.max)
            }
            _ => ray.range,
        }
    }
}

impl Intersector for Scene {
    fn trace<'a>(
        &'a self,
        ray: &ShadingRay,
        shading_point: &mut ShadingPoint<'a>,
        parent: Option<&ShadingPoint<'_>>,
    ) -> bool {
        shading_point.ray = *ray;

        let mut closest = Self::leaving_range(ray, parent);
        if closest.is_empty() {
            shading_point.hit = false;
            return false;
        }
        let mut nearest = None;

        for (index, object) in self.objects.iter().enumerate() {
            if !object.visibility.intersects(ray.flags) {
                continue;
            }

            if let Some(hit) = object.shape.intersect(&ray.ray, closest) {
                closest = closest.with_max(hit.t);
                nearest = Some((index, hit));
            }
        }

        let Some((index, hit)) = nearest else {
            shading_point.hit = false;
            return false;
        };

        // Normal always points against the ray
        let normal = if ray.direction().dot(hit.normal) < 0.0 {
            hit.normal
        } else {
            -hit.normal
        };

        shading_point.hit = true;
        shading_point.t = hit.t;
        shading_point.point = ray.at(hit.t);
        shading_point.normal = normal;
        shading_point.uv = hit.uv;
        shading_point.primitive = Some(index);
        shading_point.material = self.objects[index].material.as_deref();
        true
    }
}
