use glam::{Mat4, Vec3};
use scene_render::asset::{Assets, Geometry, Handle, Shader, Skin};
use scene_render::environment::Environment;
use scene_render::renderer::{
    BlendMode, FrameHooks, FrameInput, FrameState, GpuBackend, GpuCommand, Material, NoHooks,
    RecordedUniform, RecordingBackend, ReflectionSource, RenderError, RenderPassKind,
    RenderTargetDesc, RenderTargetKind, Renderer, TextureId,
};
use scene_render::scene::{
    Camera, FlatHierarchy, Light, NodeId, ReflectionProbe, Transform, Visual, VisualFlags,
};
use scene_render::settings::{PoolSettings, RenderSettings};

struct Fixture {
    assets: Assets,
    lit: Handle<Shader>,
    cube: Handle<Geometry>,
    opaque: Handle<Material>,
    linear: Handle<Material>,
    additive: Handle<Material>,
}

fn fixture() -> Fixture {
    let mut assets = Assets::new();
    let lit = assets.shaders.insert(Shader::new("lit"));
    let cube = assets
        .geometries
        .insert(Geometry::cuboid("cube", Vec3::splat(0.5)));
    let opaque = assets.materials.insert(Material::opaque("opaque", lit));
    let linear = assets.materials.insert(Material::transparent("linear", lit));
    let additive = assets
        .materials
        .insert(Material::transparent("additive", lit).with_blend(BlendMode::Additive));
    Fixture {
        assets,
        lit,
        cube,
        opaque,
        linear,
        additive,
    }
}

fn cube_at(f: &Fixture, node: u32, material: Handle<Material>, position: Vec3) -> Visual {
    Visual::new(NodeId(node))
        .with_geometry(f.cube)
        .with_material(material)
        .with_transform(Transform::from_translation(position))
}

fn camera() -> Camera {
    Camera {
        eye: Vec3::new(0.0, 0.0, 10.0),
        target: Vec3::ZERO,
        aspect: 1.0,
        ..Camera::default()
    }
}

fn sun() -> Light {
    Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0)
}

fn renderer() -> Renderer {
    Renderer::new(RenderSettings::default())
}

fn shadow_targets(gpu: &RecordingBackend) -> Vec<scene_render::renderer::RenderTargetId> {
    gpu.commands()
        .iter()
        .filter_map(|command| match command {
            GpuCommand::CreateTarget { id, desc } if desc.kind == RenderTargetKind::Depth => {
                Some(*id)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn repeated_frames_submit_identical_commands() {
    let f = fixture();
    let drawables = vec![
        cube_at(&f, 1, f.additive, Vec3::new(1.0, 0.0, 0.0)),
        cube_at(&f, 2, f.opaque, Vec3::ZERO),
        cube_at(&f, 3, f.linear, Vec3::new(-1.0, 0.0, 0.0)),
        cube_at(&f, 4, f.opaque, Vec3::new(0.0, 1.0, 0.0)),
    ];
    let cameras = vec![camera()];
    let mut gpu = RecordingBackend::new();
    let mut renderer = renderer();

    let mut frames = Vec::new();
    for _ in 0..2 {
        gpu.clear_commands();
        let input = FrameInput::new(&f.assets, &FlatHierarchy)
            .with_cameras(&cameras)
            .with_drawables(&drawables);
        let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);
        assert!(report.is_ok());
        frames.push(gpu.commands().to_vec());
    }

    assert_eq!(frames[0], frames[1]);
    assert_eq!(gpu.draw_count(), drawables.len());
}

#[test]
fn additive_state_bucket_is_drawn_after_linear() {
    let f = fixture();
    let drawables = vec![
        cube_at(&f, 1, f.additive, Vec3::ZERO),
        cube_at(&f, 2, f.linear, Vec3::ZERO),
    ];
    let cameras = vec![camera()];
    let mut gpu = RecordingBackend::new();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_drawables(&drawables);
    renderer().render_frame(&mut gpu, input, &mut NoHooks);

    let blends: Vec<BlendMode> = gpu
        .commands()
        .iter()
        .filter_map(|command| match command {
            GpuCommand::PipelineState(state) => Some(state.blend),
            _ => None,
        })
        .collect();
    assert_eq!(blends, vec![BlendMode::Linear, BlendMode::Additive]);
}

#[test]
fn culled_drawables_still_cast_shadows() {
    let f = fixture();
    let drawables = vec![
        cube_at(&f, 1, f.opaque, Vec3::ZERO),
        // Well above the view volume but between it and the sun.
        cube_at(&f, 2, f.opaque, Vec3::new(0.0, 40.0, 0.0)),
    ];
    let cameras = vec![camera()];
    let lights = vec![sun()];
    let mut gpu = RecordingBackend::new();
    let mut renderer = renderer();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_lights(&lights)
        .with_drawables(&drawables);
    let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);

    assert_eq!(report.stats.culled, 1);
    let graph = &renderer.context().camera_graphs()[0];
    let buckets = renderer.context().buckets();

    let visible: Vec<usize> = buckets
        .draw_list(graph.definition, RenderPassKind::Opaque)
        .iter()
        .map(|draw| draw.drawable)
        .collect();
    assert_eq!(visible, vec![0]);

    let casters: Vec<usize> = buckets
        .draw_list(graph.shadow, RenderPassKind::Opaque)
        .iter()
        .map(|draw| draw.drawable)
        .collect();
    assert_eq!(casters, vec![0, 1]);
    assert_eq!(graph.casters, vec![0, 1]);
}

#[test]
fn transparent_drawables_do_not_cast() {
    let f = fixture();
    let drawables = vec![cube_at(&f, 1, f.linear, Vec3::ZERO)];
    let cameras = vec![camera()];
    let lights = vec![sun()];
    let mut gpu = RecordingBackend::new();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_lights(&lights)
        .with_drawables(&drawables);
    let report = renderer().render_frame(&mut gpu, input, &mut NoHooks);

    assert_eq!(report.stats.shadow_draw_calls, 0);
    assert_eq!(report.stats.draw_calls, 1);
}

#[test]
fn skinned_mesh_is_evaluated_once_across_passes() {
    let mut f = fixture();
    let skin = f.assets.skins.insert(Skin::new(
        vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::Y)],
        vec![Mat4::IDENTITY; 2],
    ));
    let drawables = vec![cube_at(&f, 1, f.opaque, Vec3::ZERO).with_skin(skin)];
    let cameras = vec![camera()];
    let lights = vec![sun()];
    let mut gpu = RecordingBackend::new();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_lights(&lights)
        .with_drawables(&drawables);
    let report = renderer().render_frame(&mut gpu, input, &mut NoHooks);

    assert!(report.stats.shadow_draw_calls >= 1);
    assert_eq!(report.stats.draw_calls, 1);
    assert_eq!(report.stats.bone_updates, 1);

    let bone_uploads = gpu
        .commands()
        .iter()
        .filter(|command| matches!(command, GpuCommand::Uniform { name, .. } if name == "bones"))
        .count();
    assert_eq!(bone_uploads, report.stats.shadow_draw_calls + report.stats.draw_calls);
}

#[test]
fn meshes_sharing_a_skin_get_their_own_bones() {
    let mut f = fixture();
    let skin = f.assets.skins.insert(Skin::new(
        vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::Y)],
        vec![Mat4::IDENTITY; 2],
    ));
    let drawables = vec![
        cube_at(&f, 1, f.opaque, Vec3::new(-2.0, 0.0, 0.0)).with_skin(skin),
        cube_at(&f, 2, f.opaque, Vec3::new(2.0, 0.0, 0.0)).with_skin(skin),
    ];
    let cameras = vec![camera()];
    let mut gpu = RecordingBackend::new();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_drawables(&drawables);
    let report = renderer().render_frame(&mut gpu, input, &mut NoHooks);

    assert_eq!(report.stats.draw_calls, 2);
    assert_eq!(report.stats.bone_updates, 2);

    let bones: Vec<&RecordedUniform> = gpu
        .commands()
        .iter()
        .filter_map(|command| match command {
            GpuCommand::Uniform { name, value, .. } if name == "bones" => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(bones.len(), 2);
    assert_ne!(bones[0], bones[1]);
    for (uploaded, x) in bones.iter().zip([-2.0_f32, 2.0]) {
        match uploaded {
            RecordedUniform::BoneTexture(palette) => assert!(palette[0]
                .w_axis
                .truncate()
                .abs_diff_eq(Vec3::new(-x, 0.0, 0.0), 1e-5)),
            other => panic!("unexpected bone upload {:?}", other),
        }
    }
}

#[test]
fn reflective_drawables_fall_back_to_the_skybox() {
    let f = fixture();
    let drawables =
        vec![cube_at(&f, 1, f.opaque, Vec3::ZERO).with_flags(VisualFlags::REFLECTIVE)];
    let cameras = vec![camera()];

    let skybox = Environment::SkyBox {
        cubemap: TextureId(9),
    };
    let mut gpu = RecordingBackend::new();
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_environment(&skybox)
        .with_drawables(&drawables);
    renderer().render_frame(&mut gpu, input, &mut NoHooks);
    assert_eq!(
        gpu.uniform("environment_map"),
        Some(&RecordedUniform::Reflection(ReflectionSource::SkyBox(
            TextureId(9)
        )))
    );
    assert!(gpu.commands().contains(&GpuCommand::Background));

    let flat = Environment::default();
    let mut gpu = RecordingBackend::new();
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_environment(&flat)
        .with_drawables(&drawables);
    renderer().render_frame(&mut gpu, input, &mut NoHooks);
    assert_eq!(
        gpu.uniform("environment_map"),
        Some(&RecordedUniform::Reflection(ReflectionSource::None))
    );
}

#[test]
fn probes_are_captured_before_cameras_and_sampled() {
    let f = fixture();
    let drawables = vec![
        cube_at(&f, 1, f.opaque, Vec3::ZERO).with_flags(VisualFlags::REFLECTIVE),
        cube_at(&f, 2, f.opaque, Vec3::new(3.0, 0.0, 0.0)),
    ];
    let cameras = vec![camera()];
    let mut gpu = RecordingBackend::new();
    let target = gpu.create_render_target(&RenderTargetDesc {
        label: "probe".to_string(),
        kind: RenderTargetKind::Cube,
        size: 128,
    });
    let mut probes = vec![
        ReflectionProbe::new(NodeId(50), Vec3::new(0.0, 2.0, 0.0), target).with_capture_interval(3),
    ];
    let mut renderer = renderer();

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_probes(&mut probes)
        .with_drawables(&drawables);
    let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);
    assert!(report.is_ok());
    assert_eq!(report.stats.probe_faces, 6);

    let binds: Vec<&GpuCommand> = gpu
        .commands()
        .iter()
        .filter(|command| matches!(command, GpuCommand::BindTarget { .. }))
        .collect();
    assert_eq!(binds.len(), 7);
    assert!(matches!(
        binds.last(),
        Some(GpuCommand::BindTarget {
            target: None,
            face: None
        })
    ));
    assert_eq!(
        gpu.uniform("environment_map"),
        Some(&RecordedUniform::Reflection(ReflectionSource::Probe(target)))
    );

    // Throttled on the next frame.
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_probes(&mut probes)
        .with_drawables(&drawables);
    let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);
    assert_eq!(report.stats.probe_faces, 0);
}

#[test]
fn unusable_probes_leave_reflections_on_the_skybox() {
    let f = fixture();
    let drawables =
        vec![cube_at(&f, 1, f.opaque, Vec3::ZERO).with_flags(VisualFlags::REFLECTIVE)];
    let cameras = vec![camera()];
    let skybox = Environment::SkyBox {
        cubemap: TextureId(9),
    };
    let mut gpu = RecordingBackend::new();
    let faceless = gpu.create_render_target(&RenderTargetDesc {
        label: "faceless".to_string(),
        kind: RenderTargetKind::Cube,
        size: 64,
    });
    let distant = gpu.create_render_target(&RenderTargetDesc {
        label: "distant".to_string(),
        kind: RenderTargetKind::Cube,
        size: 64,
    });
    let mut short_sighted = ReflectionProbe::new(NodeId(51), Vec3::new(40.0, 0.0, 0.0), distant);
    short_sighted.far = 10.0;
    let mut probes = vec![
        ReflectionProbe::new(NodeId(50), Vec3::new(0.0, 1.0, 0.0), faceless).with_faces(&[]),
        short_sighted,
    ];

    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_environment(&skybox)
        .with_probes(&mut probes)
        .with_drawables(&drawables);
    let report = renderer().render_frame(&mut gpu, input, &mut NoHooks);
    assert!(report.is_ok());
    assert_eq!(
        gpu.uniform("environment_map"),
        Some(&RecordedUniform::Reflection(ReflectionSource::SkyBox(
            TextureId(9)
        )))
    );
}

#[test]
fn failing_target_does_not_block_other_cameras() {
    let f = fixture();
    let drawables = vec![cube_at(&f, 1, f.opaque, Vec3::ZERO)];
    let mut gpu = RecordingBackend::new();
    let offscreen = gpu.create_render_target(&RenderTargetDesc {
        label: "offscreen".to_string(),
        kind: RenderTargetKind::Color,
        size: 512,
    });
    gpu.fail_target(offscreen);

    let cameras = vec![
        Camera {
            render_target: Some(offscreen),
            ..camera()
        },
        camera(),
    ];
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_drawables(&drawables);
    let report = renderer().render_frame(&mut gpu, input, &mut NoHooks);

    assert_eq!(
        report.errors,
        vec![RenderError::TargetNotReady { target: offscreen }]
    );
    assert_eq!(report.stats.draw_calls, 1);
    assert_eq!(gpu.draw_count(), 1);
}

#[test]
fn shader_link_failures_are_sticky_until_reset() {
    let f = fixture();
    let drawables = vec![cube_at(&f, 1, f.opaque, Vec3::ZERO)];
    let cameras = vec![camera()];
    let mut gpu = RecordingBackend::new();
    gpu.fail_shader(f.lit, "missing entry point");
    let mut renderer = renderer();

    let render = |renderer: &mut Renderer, gpu: &mut RecordingBackend| {
        let input = FrameInput::new(&f.assets, &FlatHierarchy)
            .with_cameras(&cameras)
            .with_drawables(&drawables);
        renderer.render_frame(gpu, input, &mut NoHooks)
    };

    let first = render(&mut renderer, &mut gpu);
    assert!(matches!(
        first.errors.as_slice(),
        [RenderError::ProgramLink { .. }]
    ));
    assert!(renderer.context().shader_failed(f.lit));

    let second = render(&mut renderer, &mut gpu);
    assert!(second.is_ok());
    assert_eq!(gpu.link_attempts(f.lit), 1);
    assert_eq!(gpu.draw_count(), 0);

    renderer.reset_shader_failures();
    render(&mut renderer, &mut gpu);
    assert_eq!(gpu.link_attempts(f.lit), 2);
}

#[test]
fn empty_cascades_clear_their_targets_without_drawing() {
    let f = fixture();
    let cameras = vec![camera()];
    let lights = vec![sun()];
    let mut gpu = RecordingBackend::new();
    let mut renderer = renderer();

    let near = vec![cube_at(&f, 1, f.opaque, Vec3::ZERO)];
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_lights(&lights)
        .with_drawables(&near);
    let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);
    assert!(report.stats.shadow_draw_calls > 0);
    let targets = shadow_targets(&gpu);
    assert_eq!(targets.len(), 3);

    // The caster moves out of reach: targets are still cleared.
    gpu.clear_commands();
    let gone = vec![cube_at(&f, 1, f.opaque, Vec3::new(500.0, 0.0, 0.0))];
    let input = FrameInput::new(&f.assets, &FlatHierarchy)
        .with_cameras(&cameras)
        .with_lights(&lights)
        .with_drawables(&gone);
    let report = renderer.render_frame(&mut gpu, input, &mut NoHooks);
    assert_eq!(report.stats.shadow_draw_calls, 0);

    let commands = gpu.commands();
    for target in targets {
        let bind = commands
            .iter()
            .position(|command| {
                *command
                    == GpuCommand::BindTarget {
                        target: Some(target),
                        face: None,
                    }
            })
            .expect("shadow target bound");
        assert_eq!(
            commands[bind + 1],
            GpuCommand::Clear {
                color: None,
                depth: Some(1.0)
            }
        );
    }
    assert_eq!(
        renderer.context().cascades().cascade_counts()[0] as usize,
        renderer.settings().cascade_count
    );
}

#[derive(Default)]
struct CountingHooks {
    pre: usize,
    post: usize,
    ui: usize,
    first_camera: Option<Vec3>,
}

impl FrameHooks for CountingHooks {
    fn pre_render(&mut self, camera: Option<&Camera>) {
        self.pre += 1;
        self.first_camera = camera.map(|camera| camera.eye);
    }

    fn post_render(&mut self, _camera: Option<&Camera>) {
        self.post += 1;
    }

    fn render_ui(&mut self, _gpu: &mut dyn GpuBackend, _camera: &Camera) {
        self.ui += 1;
    }
}

#[test]
fn empty_frames_still_run_hooks() {
    let assets = Assets::new();
    let mut gpu = RecordingBackend::new();
    let mut hooks = CountingHooks::default();
    let mut renderer = renderer();

    let report = renderer.render_frame(
        &mut gpu,
        FrameInput::new(&assets, &FlatHierarchy),
        &mut hooks,
    );
    assert!(report.is_ok());
    assert_eq!((hooks.pre, hooks.post, hooks.ui), (1, 1, 0));
    assert_eq!(hooks.first_camera, None);
    assert!(gpu.commands().is_empty());

    let cameras = vec![camera(), Camera::default()];
    renderer.render_frame(
        &mut gpu,
        FrameInput::new(&assets, &FlatHierarchy).with_cameras(&cameras),
        &mut hooks,
    );
    assert_eq!((hooks.pre, hooks.post, hooks.ui), (2, 2, 2));
    assert_eq!(hooks.first_camera, Some(cameras[0].eye));
}

#[test]
fn tick_waits_for_readiness() {
    let assets = Assets::new();
    let mut gpu = RecordingBackend::new();
    let mut renderer = renderer();

    let report = renderer.tick(
        false,
        &mut gpu,
        FrameInput::new(&assets, &FlatHierarchy),
        &mut NoHooks,
    );
    assert!(report.is_none());
    assert_eq!(renderer.state(), FrameState::Loading);

    let report = renderer.tick(
        true,
        &mut gpu,
        FrameInput::new(&assets, &FlatHierarchy),
        &mut NoHooks,
    );
    assert_eq!(report.map(|report| report.frame), Some(1));
    assert_eq!(renderer.state(), FrameState::Ready);
}

#[test]
fn undersized_pools_grow_once() {
    let f = fixture();
    let drawables: Vec<Visual> = (0..8)
        .map(|i| {
            let material = [f.opaque, f.linear, f.additive][i % 3];
            cube_at(&f, i as u32, material, Vec3::new(i as f32 * 0.2, 0.0, 0.0))
                .with_flags(if i % 2 == 0 {
                    VisualFlags::default()
                } else {
                    VisualFlags::VERTEX_COLOR
                })
        })
        .collect();
    let cameras = vec![camera()];
    let settings = RenderSettings {
        pools: PoolSettings {
            pass_definitions: 1,
            state_buckets: 1,
            shader_buckets: 1,
            variant_buckets: 1,
            source_buckets: 1,
        },
        ..RenderSettings::default()
    };
    let mut renderer = Renderer::new(settings);
    let mut gpu = RecordingBackend::new();

    let mut growths = Vec::new();
    for _ in 0..2 {
        let input = FrameInput::new(&f.assets, &FlatHierarchy)
            .with_cameras(&cameras)
            .with_drawables(&drawables);
        growths.push(renderer.render_frame(&mut gpu, input, &mut NoHooks).stats.pool_growths);
    }
    assert!(growths[0] > 0);
    assert_eq!(growths[1], 0);
}
