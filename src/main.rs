use glam::{Quat, Vec3};
use scene_render::asset::{Assets, Geometry, Shader};
use scene_render::environment::{Environment, Fog};
use scene_render::renderer::{
    BlendMode, FrameInput, GpuBackend, Material, NoHooks, ParamValue, RecordingBackend,
    RenderTargetDesc, RenderTargetKind, Renderer,
};
use scene_render::scene::{
    Camera, Light, NodeId, PostEffect, ReflectionProbe, SceneTree, Transform, Visual, VisualFlags,
};
use scene_render::settings::RenderSettings;

const FRAMES: usize = 3;

fn main() {
    scene_render::init_logging();
    log::info!("Starting headless scene render");

    let settings = RenderSettings::load();
    let mut gpu = RecordingBackend::new();

    let mut assets = Assets::new();
    let lit = assets.shaders.insert(Shader::new("lit"));
    let cube = assets
        .geometries
        .insert(Geometry::cuboid("cube", Vec3::splat(0.5)));
    let ground = assets
        .geometries
        .insert(Geometry::cuboid("ground", Vec3::new(20.0, 0.05, 20.0)));
    let stone = assets.materials.insert(
        Material::opaque("stone", lit).with_param("albedo", ParamValue::Vec3(Vec3::splat(0.6))),
    );
    let glass = assets.materials.insert(Material::transparent("glass", lit));
    let glow = assets
        .materials
        .insert(Material::transparent("glow", lit).with_blend(BlendMode::Additive));
    for (handle, material) in assets.materials.iter() {
        log::debug!("Material {:?}: {}", handle, material.name());
    }

    let mut tree = SceneTree::new();
    let mut drawables = vec![Visual::new(NodeId(0))
        .with_geometry(ground)
        .with_material(stone)
        .with_transform(Transform::from_translation(Vec3::new(0.0, -0.05, 0.0)))];
    for i in 0..9u32 {
        let node = NodeId(i + 1);
        tree.set_parent(node, NodeId(0));
        let x = (i % 3) as f32 * 2.0 - 2.0;
        let z = (i / 3) as f32 * 2.0 - 2.0;
        let material = match i % 3 {
            0 => stone,
            1 => glass,
            _ => glow,
        };
        let mut flags = VisualFlags::default();
        if i == 4 {
            flags |= VisualFlags::REFLECTIVE;
        }
        drawables.push(
            Visual::new(node)
                .with_geometry(cube)
                .with_material(material)
                .with_flags(flags)
                .with_transform(Transform::from_trs(
                    Vec3::new(x, 0.5, z),
                    Quat::from_rotation_y(i as f32 * 0.3),
                    Vec3::ONE,
                )),
        );
    }

    let probe_target = gpu.create_render_target(&RenderTargetDesc {
        label: "probe".to_string(),
        kind: RenderTargetKind::Cube,
        size: 256,
    });
    let mut probes =
        vec![ReflectionProbe::new(NodeId(100), Vec3::new(0.0, 2.0, 0.0), probe_target)
            .with_capture_interval(2)];

    let cameras = vec![Camera {
        eye: Vec3::new(6.0, 5.0, 8.0),
        target: Vec3::ZERO,
        post_effects: vec![PostEffect::ToneMap { exposure: 1.0 }, PostEffect::Fxaa],
        ..Camera::default()
    }];
    let lights = vec![Light::directional(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::ONE,
        3.0,
    )];
    let environment = Environment::default();
    let fog = Fog::Exponential {
        color: Vec3::splat(0.7),
        density: 0.02,
    };

    let mut renderer = Renderer::new(settings);
    for frame in 0..FRAMES {
        gpu.clear_commands();
        let input = FrameInput::new(&assets, &tree)
            .with_cameras(&cameras)
            .with_environment(&environment)
            .with_fog(&fog)
            .with_lights(&lights)
            .with_probes(&mut probes)
            .with_drawables(&drawables);

        match renderer.tick(true, &mut gpu, input, &mut NoHooks) {
            Some(report) => {
                log::info!(
                    "frame {}: {} draws, {} shadow draws, {} culled, {} probe faces, {} commands",
                    frame,
                    report.stats.draw_calls,
                    report.stats.shadow_draw_calls,
                    report.stats.culled,
                    report.stats.probe_faces,
                    gpu.commands().len()
                );
                for err in &report.errors {
                    log::error!("{}", err);
                }
            }
            None => log::warn!("frame {} not rendered", frame),
        }
    }
}
