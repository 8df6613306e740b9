use std::collections::{HashMap, HashSet};

use glam::Mat4;

use crate::asset::Skin;
use crate::renderer::gpu::{GpuBackend, UniformValue};
use crate::renderer::lights::MAX_UNIFORM_BONES;
use crate::renderer::ShadingVariant;

/// Bone palettes of the current frame, keyed by drawable index. A palette
/// depends on the mesh's world transform, so drawables sharing a skin asset
/// each get their own. Each drawable is evaluated at most once per frame
/// however many passes draw it.
#[derive(Default)]
pub struct SkinningCache {
    updated: HashSet<usize>,
    palettes: HashMap<usize, Vec<Mat4>>,
    updates: usize,
    truncation_warned: bool,
}

impl SkinningCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush(&mut self) {
        self.updated.clear();
        self.updates = 0;
    }

    /// Palette evaluations performed since the last flush.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn palette(&mut self, drawable: usize, skin: &Skin, mesh_world: Mat4) -> &[Mat4] {
        let palette = self.palettes.entry(drawable).or_default();
        if self.updated.insert(drawable) {
            skin.compute_palette(mesh_world, palette);
            self.updates += 1;
        }
        palette
    }

    /// Uploads the palette as a float texture when the device can sample
    /// one, otherwise as a uniform array capped at `MAX_UNIFORM_BONES`.
    pub fn upload(
        &mut self,
        gpu: &mut dyn GpuBackend,
        drawable: usize,
        skin: &Skin,
        mesh_world: Mat4,
        variant: ShadingVariant,
    ) {
        let float_textures = gpu.capabilities().float_textures;
        if !float_textures && skin.joint_count() > MAX_UNIFORM_BONES && !self.truncation_warned {
            log::warn!(
                "Float textures unavailable; skins are limited to {} bones ({} requested)",
                MAX_UNIFORM_BONES,
                skin.joint_count()
            );
            self.truncation_warned = true;
        }

        let palette = self.palette(drawable, skin, mesh_world);
        if float_textures {
            gpu.set_uniform("bones", UniformValue::BoneTexture(palette), Some(variant));
        } else {
            let count = palette.len().min(MAX_UNIFORM_BONES);
            gpu.set_uniform("bones", UniformValue::Mat4Array(&palette[..count]), Some(variant));
        }
    }
}
