use std::collections::HashSet;

use glam::Quat;

use crate::asset::{Handle, Shader};
use crate::renderer::buckets::{BucketPools, RenderPassDefinition};
use crate::renderer::culling::ShadowReach;
use crate::renderer::gpu::{
    GpuBackend, ReflectionSource, RenderTargetDesc, RenderTargetId, RenderTargetKind,
};
use crate::renderer::lights::{
    cascade_map_size, CascadeMatrices, LightsData, LightsUniform, MAX_DIRECTIONAL_LIGHTS,
    MAX_SHADOW_CASCADES,
};
use crate::renderer::skinning::SkinningCache;
use crate::renderer::{Aabb, Frustum};
use crate::scene::{Camera, CubeFace};
use crate::settings::RenderSettings;

/// Per-camera graphs of the current frame.
pub struct CameraGraph {
    pub frustum: Frustum,
    pub definition: RenderPassDefinition,
    pub shadow: RenderPassDefinition,
    /// Drawables whose bounds feed cascade fitting.
    pub casters: Vec<usize>,
    pub reach: ShadowReach,
}

/// State threaded through one frame of graph building and submission.
///
/// Everything in here is rebuilt by `begin_frame`; only pool storage, skin
/// palettes, shadow targets and the sticky shader failures survive between
/// frames.
pub struct RenderContext {
    pub(crate) buckets: BucketPools,
    pub(crate) bounds: Vec<Option<Aabb>>,
    pub(crate) reflections: Vec<ReflectionSource>,
    pub(crate) cameras: Vec<CameraGraph>,
    pub(crate) active_cameras: usize,
    pub(crate) probe_graphs: Vec<Option<RenderPassDefinition>>,
    pub(crate) probe_active: Vec<bool>,
    pub(crate) skinning: SkinningCache,
    pub(crate) failed_shaders: HashSet<Handle<Shader>>,
    shadow_targets: [[Option<(RenderTargetId, u32)>; MAX_SHADOW_CASCADES]; MAX_DIRECTIONAL_LIGHTS],
    pub(crate) cascades: CascadeMatrices,
    pub(crate) lights: LightsData,
    pub(crate) lights_uniform: LightsUniform,
    pub(crate) shadow_rotations: Vec<Quat>,
    pub(crate) faces: Vec<CubeFace>,
    frame: u64,
}

impl RenderContext {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            buckets: BucketPools::new(&settings.pools),
            bounds: Vec::new(),
            reflections: Vec::new(),
            cameras: Vec::new(),
            active_cameras: 0,
            probe_graphs: Vec::new(),
            probe_active: Vec::new(),
            skinning: SkinningCache::new(),
            failed_shaders: HashSet::new(),
            shadow_targets: [[None; MAX_SHADOW_CASCADES]; MAX_DIRECTIONAL_LIGHTS],
            cascades: CascadeMatrices::default(),
            lights: LightsData::new(),
            lights_uniform: bytemuck::Zeroable::zeroed(),
            shadow_rotations: Vec::new(),
            faces: Vec::with_capacity(CubeFace::ALL.len()),
            frame: 0,
        }
    }

    /// Returns every per-frame container to empty and advances the frame
    /// counter.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.buckets.flush();
        self.skinning.flush();
        self.cascades.reset();
        self.bounds.clear();
        self.reflections.clear();
        self.active_cameras = 0;
        self.probe_graphs.clear();
        self.probe_active.clear();
        self.shadow_rotations.clear();
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Allocates the graphs of the next camera, reusing last frame's records.
    pub(crate) fn push_camera(&mut self, camera: &Camera, settings: &RenderSettings) -> usize {
        let definition = self.buckets.allocate_definition();
        let shadow = self.buckets.allocate_definition();
        let frustum = camera.frustum();

        let index = self.active_cameras;
        if index == self.cameras.len() {
            self.cameras.push(CameraGraph {
                frustum,
                definition,
                shadow,
                casters: Vec::new(),
                reach: ShadowReach::default(),
            });
        } else {
            let graph = &mut self.cameras[index];
            graph.frustum = frustum;
            graph.definition = definition;
            graph.shadow = shadow;
            graph.casters.clear();
        }
        self.cameras[index].reach.rebuild(
            camera,
            self.shadow_rotations.iter().copied(),
            settings.cascade_count,
            settings.shadow_distance,
        );
        self.active_cameras += 1;
        index
    }

    pub fn camera_graphs(&self) -> &[CameraGraph] {
        &self.cameras[..self.active_cameras]
    }

    pub fn buckets(&self) -> &BucketPools {
        &self.buckets
    }

    pub fn bounds(&self, drawable: usize) -> Option<&Aabb> {
        self.bounds.get(drawable).and_then(Option::as_ref)
    }

    pub fn reflection(&self, drawable: usize) -> ReflectionSource {
        self.reflections
            .get(drawable)
            .copied()
            .unwrap_or(ReflectionSource::None)
    }

    pub fn probe_graph(&self, probe: usize) -> Option<RenderPassDefinition> {
        self.probe_graphs.get(probe).copied().flatten()
    }

    pub fn cascades(&self) -> &CascadeMatrices {
        &self.cascades
    }

    pub fn skinning(&self) -> &SkinningCache {
        &self.skinning
    }

    pub fn shader_failed(&self, shader: Handle<Shader>) -> bool {
        self.failed_shaders.contains(&shader)
    }

    /// Depth target of one light slot and cascade, created on first use and
    /// recreated when the configured resolution changes.
    pub(crate) fn shadow_target(
        &mut self,
        gpu: &mut dyn GpuBackend,
        light: usize,
        cascade: usize,
        base_size: u32,
    ) -> RenderTargetId {
        let size = cascade_map_size(base_size, cascade);
        match self.shadow_targets[light][cascade] {
            Some((target, existing)) if existing == size => target,
            _ => {
                let target = gpu.create_render_target(&RenderTargetDesc {
                    label: format!("shadow_map_{}_{}", light, cascade),
                    kind: RenderTargetKind::Depth,
                    size,
                });
                log::debug!(
                    "Created {}x{} shadow map for light {} cascade {}",
                    size,
                    size,
                    light,
                    cascade
                );
                self.shadow_targets[light][cascade] = Some((target, size));
                target
            }
        }
    }
}
