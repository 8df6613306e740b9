use crate::asset::Assets;
use crate::environment::{Environment, Fog};
use crate::renderer::buckets::{resolve, RenderPassDefinition};
use crate::renderer::cascades::fit_cascade;
use crate::renderer::context::RenderContext;
use crate::renderer::culling::{is_visible, world_bounds};
use crate::renderer::gpu::{GpuBackend, ReflectionSource, RenderTargetId};
use crate::renderer::lights::LightsUniform;
use crate::renderer::probes::{
    probe_accepts, probe_in_range, resolve_reflection, select_probe, traverse_cameras,
};
use crate::renderer::submit::{SubmitMode, Submitter, ViewParams};
use crate::renderer::{RenderError, RenderPassKind, ShadingVariant};
use crate::scene::{Camera, CubeFace, Hierarchy, Light, ReflectionProbe, Visual};
use crate::settings::RenderSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Waiting for the host to report that default assets are resident.
    Loading,
    Ready,
    Rendering,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub cameras: usize,
    pub state_buckets: usize,
    pub draw_calls: usize,
    pub shadow_draw_calls: usize,
    /// Camera/drawable pairs rejected by the frustum test.
    pub culled: usize,
    pub probe_faces: usize,
    pub bone_updates: usize,
    pub pool_growths: usize,
    pub skipped_drawables: usize,
}

/// Everything one frame renders. All transforms are already resolved.
pub struct FrameInput<'a> {
    pub cameras: &'a [Camera],
    pub environment: Option<&'a Environment>,
    pub fog: Option<&'a Fog>,
    pub lights: &'a [Light],
    pub probes: &'a mut [ReflectionProbe],
    pub drawables: &'a [Visual],
    pub assets: &'a Assets,
    pub hierarchy: &'a dyn Hierarchy,
}

impl<'a> FrameInput<'a> {
    pub fn new(assets: &'a Assets, hierarchy: &'a dyn Hierarchy) -> Self {
        Self {
            cameras: &[],
            environment: None,
            fog: None,
            lights: &[],
            probes: &mut [],
            drawables: &[],
            assets,
            hierarchy,
        }
    }

    pub fn with_cameras(mut self, cameras: &'a [Camera]) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn with_environment(mut self, environment: &'a Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_fog(mut self, fog: &'a Fog) -> Self {
        self.fog = Some(fog);
        self
    }

    pub fn with_lights(mut self, lights: &'a [Light]) -> Self {
        self.lights = lights;
        self
    }

    pub fn with_probes(mut self, probes: &'a mut [ReflectionProbe]) -> Self {
        self.probes = probes;
        self
    }

    pub fn with_drawables(mut self, drawables: &'a [Visual]) -> Self {
        self.drawables = drawables;
        self
    }
}

/// Host callbacks around a frame.
pub trait FrameHooks {
    /// Called once per frame before any pass, with the first camera if any.
    fn pre_render(&mut self, _camera: Option<&Camera>) {}

    /// Called once per frame after every pass.
    fn post_render(&mut self, _camera: Option<&Camera>) {}

    /// Draws UI on top of a camera's output after its post effects.
    fn render_ui(&mut self, _gpu: &mut dyn GpuBackend, _camera: &Camera) {}
}

pub struct NoHooks;

impl FrameHooks for NoHooks {}

#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub stats: RendererStats,
    /// Fatal conditions hit this frame. Each aborted one camera, probe or
    /// shader; the rest of the frame still ran.
    pub errors: Vec<RenderError>,
}

impl FrameReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read-only scene data shared by the passes of a frame.
#[derive(Clone, Copy)]
struct SceneRefs<'a> {
    environment: Option<&'a Environment>,
    fog: Option<&'a Fog>,
    drawables: &'a [Visual],
    assets: &'a Assets,
}

/// Where a view renders to.
#[derive(Clone, Copy)]
struct ViewTarget {
    target: Option<RenderTargetId>,
    face: Option<CubeFace>,
    /// Set while capturing a probe.
    capturing: Option<RenderTargetId>,
}

/// Per-frame scratch the passes write into.
#[derive(Default)]
struct FrameScratch {
    stats: RendererStats,
    errors: Vec<RenderError>,
}

pub struct Renderer {
    context: RenderContext,
    settings: RenderSettings,
    stats: RendererStats,
    state: FrameState,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        let settings = settings.validate();
        Self {
            context: RenderContext::new(&settings),
            settings,
            stats: RendererStats::default(),
            state: FrameState::Loading,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Statistics of the last rendered frame.
    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Forgets sticky shader link failures so they are retried next frame.
    pub fn reset_shader_failures(&mut self) {
        if !self.context.failed_shaders.is_empty() {
            log::info!(
                "Retrying {} previously failed shaders",
                self.context.failed_shaders.len()
            );
            self.context.failed_shaders.clear();
        }
    }

    /// Advances the frame state machine. Nothing renders until `ready` has
    /// been reported once.
    pub fn tick(
        &mut self,
        ready: bool,
        gpu: &mut dyn GpuBackend,
        input: FrameInput<'_>,
        hooks: &mut dyn FrameHooks,
    ) -> Option<FrameReport> {
        match self.state {
            FrameState::Loading if !ready => return None,
            FrameState::Loading => {
                log::info!("Renderer ready; starting frame loop");
                self.state = FrameState::Ready;
            }
            FrameState::Rendering => {
                log::warn!("Frame requested while the previous one is still rendering");
                return None;
            }
            FrameState::Ready => {}
        }

        self.state = FrameState::Rendering;
        let report = self.render_frame(gpu, input, hooks);
        self.state = FrameState::Ready;
        Some(report)
    }

    pub fn render_frame(
        &mut self,
        gpu: &mut dyn GpuBackend,
        input: FrameInput<'_>,
        hooks: &mut dyn FrameHooks,
    ) -> FrameReport {
        let FrameInput {
            cameras,
            environment,
            fog,
            lights,
            probes,
            drawables,
            assets,
            hierarchy,
        } = input;
        let scene = SceneRefs {
            environment,
            fog,
            drawables,
            assets,
        };

        let frame = self.context.begin_frame();
        let growths_before = self.context.buckets.growths();
        let mut scratch = FrameScratch::default();
        scratch.stats.cameras = cameras.len();

        hooks.pre_render(cameras.first());

        self.collect_lights(lights);
        for camera in cameras {
            self.context.push_camera(camera, &self.settings);
        }
        self.context
            .probe_active
            .extend(probes.iter().map(|probe| probe.can_capture(frame)));
        self.context.probe_graphs.resize(probes.len(), None);

        self.build_graphs(scene, probes, hierarchy, &mut scratch);

        for (index, probe) in probes.iter_mut().enumerate() {
            if !self.context.probe_active[index] {
                continue;
            }
            if let Err(err) = self.render_probe(gpu, index, probe, frame, scene, &mut scratch) {
                log::error!("Reflection probe {:?} skipped this frame: {}", probe.node, err);
                scratch.errors.push(err);
            }
        }

        for (index, camera) in cameras.iter().enumerate() {
            if let Err(err) = self.render_camera(gpu, index, camera, scene, hooks, &mut scratch) {
                log::error!("Camera {} aborted: {}", index, err);
                scratch.errors.push(err);
            }
        }

        hooks.post_render(cameras.first());

        let mut stats = scratch.stats;
        stats.state_buckets = self.context.buckets.state_bucket_count();
        stats.bone_updates = self.context.skinning.updates();
        stats.pool_growths = self.context.buckets.growths() - growths_before;
        self.stats = stats;

        FrameReport {
            frame,
            stats,
            errors: scratch.errors,
        }
    }

    fn collect_lights(&mut self, lights: &[Light]) {
        let ctx = &mut self.context;
        ctx.lights.collect(lights);
        ctx.lights_uniform = LightsUniform::from_data(&ctx.lights);
        ctx.shadow_rotations.extend(
            ctx.lights
                .directional_lights()
                .iter()
                .filter(|light| light.cast_shadows)
                .map(|light| light.rotation),
        );
    }

    /// Single pass over the drawables filling every camera, shadow and probe
    /// graph of the frame.
    fn build_graphs(
        &mut self,
        scene: SceneRefs<'_>,
        probes: &[ReflectionProbe],
        hierarchy: &dyn Hierarchy,
        scratch: &mut FrameScratch,
    ) {
        let ctx = &mut self.context;
        let cameras = ctx.active_cameras;
        let shadows_enabled = !ctx.shadow_rotations.is_empty();
        ctx.reflections
            .resize(scene.drawables.len(), ReflectionSource::None);

        for (index, visual) in scene.drawables.iter().enumerate() {
            let bounds = world_bounds(visual, scene.assets);

            let renderable = match resolve(visual, scene.assets) {
                Ok(renderable) => renderable,
                Err(reason) => {
                    log::debug!("Drawable {} not renderable yet: {:?}", index, reason);
                    scratch.stats.skipped_drawables += 1;
                    ctx.bounds.push(bounds);
                    continue;
                }
            };

            let variant = visual.shading_variant();
            let shadow_variant = ShadingVariant::SHADOW_CASTER | (variant & ShadingVariant::SKINNED);
            let casts_shadows = shadows_enabled
                && visual.casts_shadows()
                && renderable.material.render_pass() == RenderPassKind::Opaque;

            for graph in &mut ctx.cameras[..cameras] {
                if is_visible(&graph.frustum, bounds.as_ref()) {
                    ctx.buckets
                        .insert(graph.definition, index, &renderable, variant);
                } else {
                    scratch.stats.culled += 1;
                }

                if casts_shadows
                    && bounds
                        .as_ref()
                        .map_or(true, |aabb| graph.reach.reaches(aabb))
                {
                    ctx.buckets
                        .insert(graph.shadow, index, &renderable, shadow_variant);
                    if bounds.is_some() {
                        graph.casters.push(index);
                    }
                }
            }

            if visual.is_reflective() {
                let probe =
                    select_probe(visual, bounds.as_ref(), probes, hierarchy).map(|p| &probes[p]);
                ctx.reflections[index] = resolve_reflection(probe, scene.environment);
            }

            for (p, probe) in probes.iter().enumerate() {
                if !ctx.probe_active[p]
                    || !probe_accepts(probe, visual, hierarchy)
                    || !probe_in_range(probe, bounds.as_ref())
                {
                    continue;
                }
                let definition = match ctx.probe_graphs[p] {
                    Some(definition) => definition,
                    None => {
                        let definition = ctx.buckets.allocate_definition();
                        ctx.probe_graphs[p] = Some(definition);
                        definition
                    }
                };
                ctx.buckets.insert(definition, index, &renderable, variant);
            }

            ctx.bounds.push(bounds);
        }
    }

    fn render_probe(
        &mut self,
        gpu: &mut dyn GpuBackend,
        index: usize,
        probe: &mut ReflectionProbe,
        frame: u64,
        scene: SceneRefs<'_>,
        scratch: &mut FrameScratch,
    ) -> Result<(), RenderError> {
        let definition = self.context.probe_graph(index);
        let target = probe.target;
        let mut faces = std::mem::take(&mut self.context.faces);
        let mut outcome = Ok(());

        traverse_cameras(
            probe,
            frame,
            self.settings.probe_faces_per_frame,
            &mut faces,
            |face, camera| {
                if outcome.is_err() {
                    return;
                }
                let view = ViewTarget {
                    target: Some(target),
                    face: Some(face),
                    capturing: Some(target),
                };
                outcome = self.render_view(gpu, camera, view, definition, scene, scratch);
                scratch.stats.probe_faces += 1;
            },
        );

        self.context.faces = faces;
        outcome
    }

    fn render_camera(
        &mut self,
        gpu: &mut dyn GpuBackend,
        index: usize,
        camera: &Camera,
        scene: SceneRefs<'_>,
        hooks: &mut dyn FrameHooks,
        scratch: &mut FrameScratch,
    ) -> Result<(), RenderError> {
        self.render_shadows(gpu, index, camera, scene, scratch)?;

        let definition = self.context.cameras[index].definition;
        let view = ViewTarget {
            target: camera.render_target,
            face: None,
            capturing: None,
        };
        self.render_view(gpu, camera, view, Some(definition), scene, scratch)?;

        for effect in &camera.post_effects {
            gpu.apply_post_effect(effect, camera.render_target);
        }
        hooks.render_ui(gpu, camera);
        Ok(())
    }

    /// Fits and renders every cascade of every shadow-casting directional
    /// light for one camera. Targets of empty cascades are still cleared.
    fn render_shadows(
        &mut self,
        gpu: &mut dyn GpuBackend,
        camera_index: usize,
        camera: &Camera,
        scene: SceneRefs<'_>,
        scratch: &mut FrameScratch,
    ) -> Result<(), RenderError> {
        let settings = &self.settings;
        let ctx = &mut self.context;
        let cascade_count = settings.cascade_count;
        let shadow_definition = ctx.cameras[camera_index].shadow;
        ctx.cascades.reset();

        for slot in 0..ctx.lights.directional_lights().len() {
            let light = ctx.lights.directional_lights()[slot];
            if !light.cast_shadows {
                continue;
            }
            ctx.cascades.set_cascade_count(slot, cascade_count);

            for cascade in 0..cascade_count {
                let target = ctx.shadow_target(gpu, slot, cascade, settings.shadow_map_size);
                gpu.bind_render_target(Some(target), None)?;
                gpu.clear(None, Some(1.0));

                let fitted = {
                    let bounds = &ctx.bounds;
                    let casters = ctx.cameras[camera_index]
                        .casters
                        .iter()
                        .filter_map(|&caster| bounds[caster].as_ref());
                    fit_cascade(
                        camera,
                        light.rotation,
                        cascade,
                        cascade_count,
                        settings.shadow_distance,
                        casters,
                        settings.max_cascade_extension,
                    )
                };
                let transform = match fitted {
                    Some(transform) => transform,
                    None => {
                        log::debug!("Light {} cascade {} has no casters", slot, cascade);
                        continue;
                    }
                };

                let view_proj = transform.view_proj();
                ctx.cascades.set(slot, cascade, view_proj);

                let view = ViewParams {
                    mode: SubmitMode::Shadow,
                    view_proj,
                    camera_position: camera.position(),
                    lights: None,
                    cascades: None,
                    fog: None,
                    environment: None,
                    capturing: None,
                };
                Submitter {
                    buckets: &ctx.buckets,
                    skinning: &mut ctx.skinning,
                    failed_shaders: &mut ctx.failed_shaders,
                    reflections: &ctx.reflections,
                    drawables: scene.drawables,
                    assets: scene.assets,
                    stats: &mut scratch.stats,
                    errors: &mut scratch.errors,
                }
                .submit(gpu, shadow_definition, RenderPassKind::Opaque, &view);
            }
        }
        Ok(())
    }

    /// Clears a view per its camera's policy, then draws opaque, the
    /// environment background, and transparent.
    fn render_view(
        &mut self,
        gpu: &mut dyn GpuBackend,
        camera: &Camera,
        view_target: ViewTarget,
        definition: Option<RenderPassDefinition>,
        scene: SceneRefs<'_>,
        scratch: &mut FrameScratch,
    ) -> Result<(), RenderError> {
        gpu.bind_render_target(view_target.target, view_target.face)?;

        let clear_color = camera
            .clear
            .color
            .then(|| clear_color_for(scene.environment));
        let clear_depth = camera.clear.depth.then_some(1.0);
        if clear_color.is_some() || clear_depth.is_some() {
            gpu.clear(clear_color, clear_depth);
        }

        let ctx = &mut self.context;
        let view = ViewParams {
            mode: SubmitMode::Color,
            view_proj: camera.view_proj(),
            camera_position: camera.position(),
            lights: Some(&ctx.lights_uniform),
            cascades: Some(&ctx.cascades),
            fog: scene.fog,
            environment: scene.environment,
            capturing: view_target.capturing,
        };
        let mut submitter = Submitter {
            buckets: &ctx.buckets,
            skinning: &mut ctx.skinning,
            failed_shaders: &mut ctx.failed_shaders,
            reflections: &ctx.reflections,
            drawables: scene.drawables,
            assets: scene.assets,
            stats: &mut scratch.stats,
            errors: &mut scratch.errors,
        };

        if let Some(definition) = definition {
            submitter.submit(gpu, definition, RenderPassKind::Opaque, &view);
        }
        if let Some(environment) = scene.environment.filter(|env| env.needs_background()) {
            gpu.draw_background(environment, camera);
        }
        if let Some(definition) = definition {
            submitter.submit(gpu, definition, RenderPassKind::Transparent, &view);
        }
        Ok(())
    }
}

fn clear_color_for(environment: Option<&Environment>) -> [f32; 4] {
    environment
        .copied()
        .unwrap_or_default()
        .clear_color()
        .unwrap_or([0.0, 0.0, 0.0, 1.0])
}
