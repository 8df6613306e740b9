use std::collections::HashSet;

use glam::{Mat4, Vec3};

use crate::asset::{Assets, Handle, Shader};
use crate::environment::{Environment, Fog};
use crate::renderer::buckets::{BucketPools, RenderPassDefinition};
use crate::renderer::gpu::{GpuBackend, ReflectionSource, RenderTargetId, UniformValue};
use crate::renderer::lights::{CascadeMatrices, LightsUniform};
use crate::renderer::probes::resolve_reflection;
use crate::renderer::skinning::SkinningCache;
use crate::renderer::{RenderError, RenderPassKind, RendererStats, ShadingVariant};
use crate::scene::Visual;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitMode {
    Color,
    Shadow,
}

/// Per-view inputs shared by every variant bucket of a pass.
pub(crate) struct ViewParams<'a> {
    pub mode: SubmitMode,
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub lights: Option<&'a LightsUniform>,
    pub cascades: Option<&'a CascadeMatrices>,
    pub fog: Option<&'a Fog>,
    pub environment: Option<&'a Environment>,
    /// Probe target being rendered; drawables reflecting it sample the
    /// environment fallback instead.
    pub capturing: Option<RenderTargetId>,
}

/// Walks a bucket graph and issues GPU commands in bucket order.
pub(crate) struct Submitter<'a> {
    pub buckets: &'a BucketPools,
    pub skinning: &'a mut SkinningCache,
    pub failed_shaders: &'a mut HashSet<Handle<Shader>>,
    pub reflections: &'a [ReflectionSource],
    pub drawables: &'a [Visual],
    pub assets: &'a Assets,
    pub stats: &'a mut RendererStats,
    pub errors: &'a mut Vec<RenderError>,
}

impl Submitter<'_> {
    pub fn submit(
        &mut self,
        gpu: &mut dyn GpuBackend,
        definition: RenderPassDefinition,
        kind: RenderPassKind,
        view: &ViewParams<'_>,
    ) {
        let buckets = self.buckets;
        for state in buckets.state_buckets(definition, kind) {
            gpu.set_pipeline_state(state.id().pipeline_state());

            for shader_bucket in buckets.shader_buckets(state) {
                let shader = shader_bucket.shader();
                if self.failed_shaders.contains(&shader) {
                    continue;
                }

                for variant_bucket in buckets.variant_buckets(shader_bucket) {
                    let variant = variant_bucket.variant();
                    if let Err(err) = gpu.bind_program(shader, variant) {
                        log::error!("{}", err);
                        self.failed_shaders.insert(shader);
                        self.errors.push(err);
                        break;
                    }
                    self.set_view_uniforms(gpu, variant, view);

                    for source in buckets.source_buckets(variant_bucket) {
                        gpu.bind_vertex_source(source.source());
                        for &index in source.drawables() {
                            self.draw(gpu, index, variant, view);
                        }
                    }
                }
            }
        }
    }

    fn set_view_uniforms(
        &self,
        gpu: &mut dyn GpuBackend,
        variant: ShadingVariant,
        view: &ViewParams<'_>,
    ) {
        gpu.set_uniform(
            "view_projection",
            UniformValue::Mat4(view.view_proj),
            Some(variant),
        );
        if view.mode == SubmitMode::Shadow {
            return;
        }

        gpu.set_uniform(
            "camera_position",
            UniformValue::Vec3(view.camera_position),
            Some(variant),
        );
        if let Some(lights) = view.lights {
            gpu.set_uniform(
                "lights",
                UniformValue::Block(bytemuck::bytes_of(lights)),
                Some(variant),
            );
        }
        if variant.contains(ShadingVariant::RECEIVE_SHADOWS) {
            if let Some(cascades) = view.cascades {
                let counts = cascades.cascade_counts();
                gpu.set_uniform(
                    "shadow_matrices",
                    UniformValue::Mat4Array(cascades.matrices()),
                    Some(variant),
                );
                gpu.set_uniform(
                    "shadow_cascade_counts",
                    UniformValue::Block(bytemuck::bytes_of(&counts)),
                    Some(variant),
                );
            }
        }
        if variant.contains(ShadingVariant::RECEIVE_FOG) {
            match view.fog {
                Some(fog) => fog.apply(gpu, variant),
                None => gpu.set_uniform("fog_mode", UniformValue::Int(0), Some(variant)),
            }
        }
    }

    fn draw(
        &mut self,
        gpu: &mut dyn GpuBackend,
        index: usize,
        variant: ShadingVariant,
        view: &ViewParams<'_>,
    ) {
        let (drawables, assets) = (self.drawables, self.assets);
        let visual = &drawables[index];
        let world = visual.world_matrix();
        gpu.set_uniform("model", UniformValue::Mat4(world), Some(variant));

        if view.mode == SubmitMode::Color {
            if let Some(material) = visual.material.and_then(|m| assets.materials.get(m)) {
                for (name, value) in material.params() {
                    gpu.set_uniform(name, value.as_uniform(), Some(variant));
                }
            }
        }

        if variant.contains(ShadingVariant::SKINNED) {
            if let Some(skin) = visual.skin.and_then(|handle| assets.skins.get(handle)) {
                self.skinning.upload(gpu, index, skin, world, variant);
            }
        }

        if view.mode == SubmitMode::Color && variant.contains(ShadingVariant::REFLECTIVE) {
            let source = match self.reflections.get(index).copied() {
                Some(ReflectionSource::Probe(target)) if Some(target) == view.capturing => {
                    resolve_reflection(None, view.environment)
                }
                Some(source) => source,
                None => ReflectionSource::None,
            };
            gpu.set_uniform("environment_map", UniformValue::Reflection(source), Some(variant));
        }

        gpu.draw();
        match view.mode {
            SubmitMode::Color => self.stats.draw_calls += 1,
            SubmitMode::Shadow => self.stats.shadow_draw_calls += 1,
        }
    }
}
