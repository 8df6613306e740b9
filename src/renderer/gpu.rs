use glam::{Mat4, Vec3, Vec4};

use crate::asset::{Geometry, Handle, Shader};
use crate::environment::Environment;
use crate::renderer::material::{PipelineState, ShadingVariant};
use crate::renderer::RenderError;
use crate::scene::{Camera, CubeFace, PostEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetKind {
    Color,
    Depth,
    Cube,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub label: String,
    pub kind: RenderTargetKind,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuCapabilities {
    /// Floating-point textures can be sampled in vertex shaders; enables the
    /// bone-matrix texture path for skinning.
    pub float_textures: bool,
}

impl Default for GpuCapabilities {
    fn default() -> Self {
        Self {
            float_textures: true,
        }
    }
}

/// Environment map a reflective drawable samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionSource {
    Probe(RenderTargetId),
    SkyBox(TextureId),
    None,
}

/// A uniform value borrowed for the duration of one `set_uniform` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Mat4Array(&'a [Mat4]),
    /// Bone palette uploaded as a float texture.
    BoneTexture(&'a [Mat4]),
    Texture(TextureId),
    Reflection(ReflectionSource),
    /// Raw `#[repr(C)]` uniform block.
    Block(&'a [u8]),
}

/// The graphics layer the render graph submits to. Commands are executed in
/// submission order on a single queue.
pub trait GpuBackend {
    fn capabilities(&self) -> GpuCapabilities;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> RenderTargetId;

    /// `None` binds the default framebuffer.
    fn bind_render_target(
        &mut self,
        target: Option<RenderTargetId>,
        face: Option<CubeFace>,
    ) -> Result<(), RenderError>;

    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>);

    fn set_pipeline_state(&mut self, state: PipelineState);

    fn bind_program(
        &mut self,
        shader: Handle<Shader>,
        variant: ShadingVariant,
    ) -> Result<(), RenderError>;

    fn set_uniform(&mut self, name: &str, value: UniformValue<'_>, variant: Option<ShadingVariant>);

    fn bind_vertex_source(&mut self, source: Handle<Geometry>);

    fn draw(&mut self);

    /// Draws a sky or skybox behind already rendered geometry.
    fn draw_background(&mut self, environment: &Environment, camera: &Camera);

    fn apply_post_effect(&mut self, effect: &PostEffect, target: Option<RenderTargetId>);
}
