//! Result of a single ray/scene intersection query.

use std::fmt;

use lumo_math::{DVec3, Vec2};

use crate::{Material, ShadingRay, SurfaceShader};

/// What one intersection query found.
///
/// `'a` is the lifetime of the scene the intersector borrows materials
/// from. A cleared shading point records "no hit".
#[derive(Clone, Default)]
pub struct ShadingPoint<'a> {
    /// The ray that produced this result
    pub ray: ShadingRay,
    pub hit: bool,
    /// Ray parameter of the hit
    pub t: f64,
    /// World-space hit position
    pub point: DVec3,
    /// Unit geometric normal, facing against the incoming ray
    pub normal: DVec3,
    /// Surface parameterization at the hit
    pub uv: Vec2,
    /// Index of the primitive that was hit
    pub primitive: Option<usize>,
    pub material: Option<&'a dyn Material>,
}

impl<'a> ShadingPoint<'a> {
    /// Reset to the "no hit" state.
    pub fn clear(&mut self) {
        *self = ShadingPoint::default();
    }

    #[inline]
    pub fn hit(&self) -> bool {
        self.hit
    }

    #[inline]
    pub fn point(&self) -> DVec3 {
        self.point
    }

    #[inline]
    pub fn material(&self) -> Option<&'a dyn Material> {
        self.material
    }

    /// Surface shader of the hit material, if both exist.
    pub fn surface_shader(&self) -> Option<&'a dyn SurfaceShader> {
        self.material.and_then(|material| material.surface_shader())
    }
}

impl fmt::Debug for ShadingPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadingPoint")
            .field("hit", &self.hit)
            .field("t", &self.t)
            .field("point", &self.point)
            .field("normal", &self.normal)
            .field("uv", &self.uv)
            .field("primitive", &self.primitive)
            .field("has_material", &self.material.is_some())
            .finish()
    }
}
