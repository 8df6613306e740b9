// renderer/material.rs

use std::cell::Cell;
use std::collections::BTreeMap;

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

use crate::asset::{Handle, Shader};
use crate::renderer::gpu::{TextureId, UniformValue};

/// Blend equation. The discriminant is packed into the high bits of the
/// state-bucket id, so the declaration order is also the draw order of
/// state buckets: additive blending always lands after linear blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendMode {
    None = 0,
    Multiply = 1,
    Linear = 2,
    Additive = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CullMode {
    None = 0,
    Back = 1,
    Front = 2,
}

/// Logical pass a material draws in. Opaque is emitted before transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPassKind {
    Opaque,
    Transparent,
}

impl RenderPassKind {
    pub const ALL: [RenderPassKind; 2] = [RenderPassKind::Opaque, RenderPassKind::Transparent];
}

/// Packed `(blend, cull, depth_test)` triple: `blend << 3 | cull << 1 | depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StateBucketId(u8);

impl StateBucketId {
    pub const fn pack(blend: BlendMode, cull: CullMode, depth_test: bool) -> Self {
        Self(((blend as u8) << 3) | ((cull as u8) << 1) | depth_test as u8)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn pipeline_state(self) -> PipelineState {
        let blend = match self.0 >> 3 {
            0 => BlendMode::None,
            1 => BlendMode::Multiply,
            2 => BlendMode::Linear,
            _ => BlendMode::Additive,
        };
        let cull = match (self.0 >> 1) & 0b11 {
            0 => CullMode::None,
            1 => CullMode::Back,
            _ => CullMode::Front,
        };
        PipelineState {
            blend,
            cull,
            depth_test: self.0 & 1 == 1,
        }
    }
}

/// Fixed-function state applied once per state bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub cull: CullMode,
    pub depth_test: bool,
}

bitflags! {
    /// Shader permutation selector. Drawables that share a shader, a state
    /// bucket, and this mask bind the same compiled program.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ShadingVariant: u32 {
        const RECEIVE_SHADOWS = 1 << 0;
        const RECEIVE_FOG = 1 << 1;
        const SKINNED = 1 << 2;
        const VERTEX_COLOR = 1 << 3;
        const REFLECTIVE = 1 << 4;
        const NORMAL_MAP = 1 << 5;
        /// Depth-only permutation used while rendering shadow cascades.
        const SHADOW_CASTER = 1 << 6;
    }
}

impl Default for ShadingVariant {
    fn default() -> Self {
        ShadingVariant::empty()
    }
}

/// A named shader parameter stored on a material.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Texture(TextureId),
}

impl ParamValue {
    pub fn as_uniform(&self) -> UniformValue<'_> {
        match *self {
            ParamValue::Float(v) => UniformValue::Float(v),
            ParamValue::Vec3(v) => UniformValue::Vec3(v),
            ParamValue::Vec4(v) => UniformValue::Vec4(v),
            ParamValue::Mat4(v) => UniformValue::Mat4(v),
            ParamValue::Texture(id) => UniformValue::Texture(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    blend: BlendMode,
    cull: CullMode,
    depth_test: bool,
    pass: RenderPassKind,
    shader: Option<Handle<Shader>>,
    params: BTreeMap<String, ParamValue>,
    state_bucket: Cell<Option<StateBucketId>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blend: BlendMode::None,
            cull: CullMode::Back,
            depth_test: true,
            pass: RenderPassKind::Opaque,
            shader: None,
            params: BTreeMap::new(),
            state_bucket: Cell::new(None),
        }
    }

    /// Opaque material drawn with `shader`.
    pub fn opaque(name: impl Into<String>, shader: Handle<Shader>) -> Self {
        Self::new(name).with_shader(shader)
    }

    /// Transparent material with linear alpha blending and no back-face culling.
    pub fn transparent(name: impl Into<String>, shader: Handle<Shader>) -> Self {
        Self::new(name)
            .with_shader(shader)
            .with_blend(BlendMode::Linear)
            .with_cull(CullMode::None)
            .with_pass(RenderPassKind::Transparent)
    }

    pub fn with_shader(mut self, shader: Handle<Shader>) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.set_blend(blend);
        self
    }

    pub fn with_cull(mut self, cull: CullMode) -> Self {
        self.set_cull(cull);
        self
    }

    pub fn with_depth_test(mut self, depth_test: bool) -> Self {
        self.set_depth_test(depth_test);
        self
    }

    pub fn with_pass(mut self, pass: RenderPassKind) -> Self {
        self.pass = pass;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn cull(&self) -> CullMode {
        self.cull
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn render_pass(&self) -> RenderPassKind {
        self.pass
    }

    pub fn shader(&self) -> Option<Handle<Shader>> {
        self.shader
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn set_blend(&mut self, blend: BlendMode) {
        if self.blend != blend {
            self.blend = blend;
            self.state_bucket.set(None);
        }
    }

    pub fn set_cull(&mut self, cull: CullMode) {
        if self.cull != cull {
            self.cull = cull;
            self.state_bucket.set(None);
        }
    }

    pub fn set_depth_test(&mut self, depth_test: bool) {
        if self.depth_test != depth_test {
            self.depth_test = depth_test;
            self.state_bucket.set(None);
        }
    }

    pub fn set_pass(&mut self, pass: RenderPassKind) {
        self.pass = pass;
    }

    pub fn set_shader(&mut self, shader: Option<Handle<Shader>>) {
        self.shader = shader;
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.insert(name.into(), value);
    }

    pub fn state_bucket_id(&self) -> StateBucketId {
        if let Some(id) = self.state_bucket.get() {
            return id;
        }
        let id = StateBucketId::pack(self.blend, self.cull, self.depth_test);
        self.state_bucket.set(Some(id));
        id
    }

    pub(crate) fn state_bucket_cached(&self) -> bool {
        self.state_bucket.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_sorts_after_linear_whatever_the_other_state() {
        let linear = StateBucketId::pack(BlendMode::Linear, CullMode::Front, true);
        let additive = StateBucketId::pack(BlendMode::Additive, CullMode::None, false);
        assert!(additive > linear);
        assert!(StateBucketId::pack(BlendMode::Linear, CullMode::None, false)
            > StateBucketId::pack(BlendMode::None, CullMode::Front, true));
    }

    #[test]
    fn pipeline_state_round_trips_through_the_packed_id() {
        for blend in [
            BlendMode::None,
            BlendMode::Multiply,
            BlendMode::Linear,
            BlendMode::Additive,
        ] {
            for cull in [CullMode::None, CullMode::Back, CullMode::Front] {
                for depth_test in [false, true] {
                    let state = StateBucketId::pack(blend, cull, depth_test).pipeline_state();
                    assert_eq!(
                        state,
                        PipelineState {
                            blend,
                            cull,
                            depth_test
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn state_bucket_cache_is_invalidated_only_by_state_changes() {
        let mut material = Material::new("m");
        let first = material.state_bucket_id();
        assert!(material.state_bucket_cached());

        material.set_blend(BlendMode::None);
        material.set_param("tint", ParamValue::Float(1.0));
        material.set_pass(RenderPassKind::Transparent);
        assert!(material.state_bucket_cached());

        material.set_blend(BlendMode::Additive);
        assert!(!material.state_bucket_cached());
        assert_ne!(material.state_bucket_id(), first);
    }
}
