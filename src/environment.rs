use glam::Vec3;

use crate::renderer::gpu::{GpuBackend, TextureId, UniformValue};
use crate::renderer::ShadingVariant;

/// Describes what is behind the scene geometry.
///
/// A flat colour is applied as the clear colour. Sky variants are drawn as a
/// background after the opaque pass so only uncovered pixels are shaded, and
/// a skybox doubles as the reflection fallback for reflective drawables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Environment {
    Color([f32; 4]),
    SkySimulation { sun_direction: Vec3, turbidity: f32 },
    SkyBox { cubemap: TextureId },
}

impl Environment {
    /// Colour the target should be cleared to, if the environment is a flat
    /// colour.
    pub fn clear_color(&self) -> Option<[f32; 4]> {
        match self {
            Environment::Color(color) => Some(*color),
            Environment::SkySimulation { .. } | Environment::SkyBox { .. } => None,
        }
    }

    /// Whether the environment is drawn as geometry behind the scene.
    pub fn needs_background(&self) -> bool {
        match self {
            Environment::Color(_) => false,
            Environment::SkySimulation { .. } | Environment::SkyBox { .. } => true,
        }
    }

    /// Cubemap usable as a reflection fallback.
    pub fn reflection_cubemap(&self) -> Option<TextureId> {
        match self {
            Environment::SkyBox { cubemap } => Some(*cubemap),
            Environment::Color(_) | Environment::SkySimulation { .. } => None,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Color([0.231, 0.269, 0.338, 1.0])
    }
}

/// Distance fog applied by fog-receiving shader variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fog {
    Exponential { color: Vec3, density: f32 },
    Linear { color: Vec3, start: f32, end: f32 },
}

impl Fog {
    pub(crate) fn apply(&self, gpu: &mut dyn GpuBackend, variant: ShadingVariant) {
        match *self {
            Fog::Exponential { color, density } => {
                gpu.set_uniform("fog_mode", UniformValue::Int(1), Some(variant));
                gpu.set_uniform("fog_color", UniformValue::Vec3(color), Some(variant));
                gpu.set_uniform("fog_density", UniformValue::Float(density), Some(variant));
            }
            Fog::Linear { color, start, end } => {
                gpu.set_uniform("fog_mode", UniformValue::Int(2), Some(variant));
                gpu.set_uniform("fog_color", UniformValue::Vec3(color), Some(variant));
                gpu.set_uniform("fog_start", UniformValue::Float(start), Some(variant));
                gpu.set_uniform("fog_end", UniformValue::Float(end.max(start)), Some(variant));
            }
        }
    }
}
