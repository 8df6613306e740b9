use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec3, Vec4};

use crate::asset::{Geometry, Handle, Shader};
use crate::environment::Environment;
use crate::renderer::gpu::{
    GpuBackend, GpuCapabilities, ReflectionSource, RenderTargetDesc, RenderTargetId, TextureId,
    UniformValue,
};
use crate::renderer::material::{PipelineState, ShadingVariant};
use crate::renderer::RenderError;
use crate::scene::{Camera, CubeFace, PostEffect};

/// Owned copy of a [`UniformValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Mat4Array(Vec<Mat4>),
    BoneTexture(Vec<Mat4>),
    Texture(TextureId),
    Reflection(ReflectionSource),
    Block(Vec<u8>),
}

impl From<UniformValue<'_>> for RecordedUniform {
    fn from(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Int(v) => RecordedUniform::Int(v),
            UniformValue::Float(v) => RecordedUniform::Float(v),
            UniformValue::Vec3(v) => RecordedUniform::Vec3(v),
            UniformValue::Vec4(v) => RecordedUniform::Vec4(v),
            UniformValue::Mat4(v) => RecordedUniform::Mat4(v),
            UniformValue::Mat4Array(v) => RecordedUniform::Mat4Array(v.to_vec()),
            UniformValue::BoneTexture(v) => RecordedUniform::BoneTexture(v.to_vec()),
            UniformValue::Texture(v) => RecordedUniform::Texture(v),
            UniformValue::Reflection(v) => RecordedUniform::Reflection(v),
            UniformValue::Block(v) => RecordedUniform::Block(v.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateTarget {
        id: RenderTargetId,
        desc: RenderTargetDesc,
    },
    BindTarget {
        target: Option<RenderTargetId>,
        face: Option<CubeFace>,
    },
    Clear {
        color: Option<[f32; 4]>,
        depth: Option<f32>,
    },
    PipelineState(PipelineState),
    BindProgram {
        shader: Handle<Shader>,
        variant: ShadingVariant,
    },
    Uniform {
        name: String,
        value: RecordedUniform,
        variant: Option<ShadingVariant>,
    },
    BindSource(Handle<Geometry>),
    Draw,
    Background,
    PostEffect {
        effect: PostEffect,
        target: Option<RenderTargetId>,
    },
}

/// Headless backend that records every command it receives.
///
/// Targets and shaders can be marked as failing to exercise the renderer's
/// error paths.
pub struct RecordingBackend {
    capabilities: GpuCapabilities,
    commands: Vec<GpuCommand>,
    next_target: u32,
    targets: HashSet<RenderTargetId>,
    failing_targets: HashSet<RenderTargetId>,
    failing_shaders: HashMap<Handle<Shader>, String>,
    link_attempts: HashMap<Handle<Shader>, usize>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::with_capabilities(GpuCapabilities::default())
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: GpuCapabilities) -> Self {
        Self {
            capabilities,
            commands: Vec::new(),
            next_target: 1,
            targets: HashSet::new(),
            failing_targets: HashSet::new(),
            failing_shaders: HashMap::new(),
            link_attempts: HashMap::new(),
        }
    }

    /// Makes every later bind of `target` report it as not ready.
    pub fn fail_target(&mut self, target: RenderTargetId) {
        self.failing_targets.insert(target);
    }

    pub fn fail_shader(&mut self, shader: Handle<Shader>, reason: impl Into<String>) {
        self.failing_shaders.insert(shader, reason.into());
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, GpuCommand::Draw))
            .count()
    }

    /// Most recent value set for uniform `name`.
    pub fn uniform(&self, name: &str) -> Option<&RecordedUniform> {
        self.commands.iter().rev().find_map(|command| match command {
            GpuCommand::Uniform {
                name: uniform,
                value,
                ..
            } if uniform == name => Some(value),
            _ => None,
        })
    }

    pub fn link_attempts(&self, shader: Handle<Shader>) -> usize {
        self.link_attempts.get(&shader).copied().unwrap_or(0)
    }
}

impl GpuBackend for RecordingBackend {
    fn capabilities(&self) -> GpuCapabilities {
        self.capabilities
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> RenderTargetId {
        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id);
        self.commands.push(GpuCommand::CreateTarget {
            id,
            desc: desc.clone(),
        });
        id
    }

    fn bind_render_target(
        &mut self,
        target: Option<RenderTargetId>,
        face: Option<CubeFace>,
    ) -> Result<(), RenderError> {
        if let Some(target) = target {
            if self.failing_targets.contains(&target) {
                return Err(RenderError::TargetNotReady { target });
            }
            if !self.targets.contains(&target) {
                return Err(RenderError::InvalidTarget { target });
            }
        }
        self.commands.push(GpuCommand::BindTarget { target, face });
        Ok(())
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>) {
        self.commands.push(GpuCommand::Clear { color, depth });
    }

    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.commands.push(GpuCommand::PipelineState(state));
    }

    fn bind_program(
        &mut self,
        shader: Handle<Shader>,
        variant: ShadingVariant,
    ) -> Result<(), RenderError> {
        *self.link_attempts.entry(shader).or_insert(0) += 1;
        if let Some(reason) = self.failing_shaders.get(&shader) {
            return Err(RenderError::ProgramLink {
                shader,
                reason: reason.clone(),
            });
        }
        self.commands.push(GpuCommand::BindProgram { shader, variant });
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue<'_>, variant: Option<ShadingVariant>) {
        self.commands.push(GpuCommand::Uniform {
            name: name.to_string(),
            value: value.into(),
            variant,
        });
    }

    fn bind_vertex_source(&mut self, source: Handle<Geometry>) {
        self.commands.push(GpuCommand::BindSource(source));
    }

    fn draw(&mut self) {
        self.commands.push(GpuCommand::Draw);
    }

    fn draw_background(&mut self, _environment: &Environment, _camera: &Camera) {
        self.commands.push(GpuCommand::Background);
    }

    fn apply_post_effect(&mut self, effect: &PostEffect, target: Option<RenderTargetId>) {
        self.commands.push(GpuCommand::PostEffect {
            effect: *effect,
            target,
        });
    }
}
