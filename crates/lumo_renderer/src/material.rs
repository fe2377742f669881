//! Materials and the surface shaders they expose.
//!
//! Only the parts of shading the visibility walk and the simple direct
//! lighting integrators need are modeled: an alpha mask and an albedo.

use lumo_math::Vec3;

use crate::{SamplingContext, ShadingPoint, TextureCache};

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// A surface material. Materials without a surface shader are treated as
/// unshaded geometry that does not occlude.
pub trait Material: Send + Sync {
    fn surface_shader(&self) -> Option<&dyn SurfaceShader>;
}

pub trait SurfaceShader: Send + Sync {
    /// Opacity at the shading point, in [0, 1]. Exactly 1.0 means fully
    /// opaque.
    fn evaluate_alpha_mask(
        &self,
        sampling_context: &mut SamplingContext,
        texture_cache: &mut TextureCache,
        shading_point: &ShadingPoint<'_>,
    ) -> f32;

    /// Diffuse reflectance at the shading point.
    fn albedo(&self, texture_cache: &mut TextureCache, shading_point: &ShadingPoint<'_>) -> Color;
}

/// Material holding an optional surface shader.
#[derive(Default)]
pub struct GenericMaterial {
    surface_shader: Option<Box<dyn SurfaceShader>>,
}

impl GenericMaterial {
    pub fn new(surface_shader: impl SurfaceShader + 'static) -> Self {
        Self {
            surface_shader: Some(Box::new(surface_shader)),
        }
    }

    /// A material with no surface shader.
    pub fn unshaded() -> Self {
        Self::default()
    }
}

impl Material for GenericMaterial {
    fn surface_shader(&self) -> Option<&dyn SurfaceShader> {
        self.surface_shader.as_deref()
    }
}

/// Uniform color and opacity.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSurfaceShader {
    color: Color,
    alpha: f32,
}

impl ConstantSurfaceShader {
    /// An opaque shader of the given color.
    pub fn new(color: Color) -> Self {
        Self { color, alpha: 1.0 }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }
}

impl SurfaceShader for ConstantSurfaceShader {
    fn evaluate_alpha_mask(
        &self,
        _sampling_context: &mut SamplingContext,
        _texture_cache: &mut TextureCache,
        _shading_point: &ShadingPoint<'_>,
    ) -> f32 {
        self.alpha
    }

    fn albedo(&self, _texture_cache: &mut TextureCache, _shading_point: &ShadingPoint<'_>) -> Color {
        self.color
    }
}

/// Albedo from a texture's RGB channels, alpha mask from its alpha
/// channel, both looked up by UV.
///
/// A texture missing from the store shades as an opaque `tint`.
#[derive(Debug, Clone)]
pub struct TexturedSurfaceShader {
    texture: String,
    tint: Color,
}

impl TexturedSurfaceShader {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            tint: Color::ONE,
        }
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }
}

impl SurfaceShader for TexturedSurfaceShader {
    fn evaluate_alpha_mask(
        &self,
        _sampling_context: &mut SamplingContext,
        texture_cache: &mut TextureCache,
        shading_point: &ShadingPoint<'_>,
    ) -> f32 {
        match texture_cache.get(&self.texture) {
            Some(texture) => texture
                .sample_channel(shading_point.uv.x, shading_point.uv.y, 3)
                .clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    fn albedo(&self, texture_cache: &mut TextureCache, shading_point: &ShadingPoint<'_>) -> Color {
        match texture_cache.get(&self.texture) {
            Some(texture) => texture.sample(shading_point.uv.x, shading_point.uv.y) * self.tint,
            None => self.tint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Texture, TextureStore};
    use lumo_math::Vec2;
    use std::sync::Arc;

    #[test]
    fn test_unshaded_material_has_no_shader() {
        assert!(GenericMaterial::unshaded().surface_shader().is_none());
        assert!(GenericMaterial::new(ConstantSurfaceShader::new(Color::ONE))
            .surface_shader()
            .is_some());
    }

    #[test]
    fn test_constant_shader_alpha_is_clamped() {
        let shader = ConstantSurfaceShader::new(Color::ONE).with_alpha(1.5);
        let mut ctx = SamplingContext::new(0);
        let mut cache = TextureCache::new(Arc::new(TextureStore::new()));
        let alpha = shader.evaluate_alpha_mask(&mut ctx, &mut cache, &ShadingPoint::default());
        assert_eq!(alpha, 1.0);
    }

    #[test]
    fn test_textured_shader_reads_alpha_channel() {
        let store = Arc::new(TextureStore::new());
        // Left half transparent, right half opaque red
        store.insert(
            "cutout",
            Texture::new(2, 1, vec![[0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]], "cutout"),
        );
        let mut cache = TextureCache::new(store);
        let mut ctx = SamplingContext::new(0);
        let shader = TexturedSurfaceShader::new("cutout");

        let left = ShadingPoint {
            uv: Vec2::new(0.1, 0.5),
            ..Default::default()
        };
        let right = ShadingPoint {
            uv: Vec2::new(0.9, 0.5),
            ..Default::default()
        };

        assert_eq!(shader.evaluate_alpha_mask(&mut ctx, &mut cache, &left), 0.0);
        assert_eq!(shader.evaluate_alpha_mask(&mut ctx, &mut cache, &right), 1.0);
        assert!(shader.albedo(&mut cache, &right).x > 0.8);
    }

    #[test]
    fn test_textured_shader_without_texture_is_opaque_tint() {
        let mut cache = TextureCache::new(Arc::new(TextureStore::new()));
        let mut ctx = SamplingContext::new(0);
        let shader = TexturedSurfaceShader::new("missing").with_tint(Color::new(0.2, 0.4, 0.6));

        let shading_point = ShadingPoint::default();
        assert_eq!(shader.evaluate_alpha_mask(&mut ctx, &mut cache, &shading_point), 1.0);
        assert_eq!(shader.albedo(&mut cache, &shading_point), Color::new(0.2, 0.4, 0.6));
    }
}
