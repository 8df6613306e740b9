use glam::Vec3;

use crate::environment::Environment;
use crate::renderer::gpu::ReflectionSource;
use crate::renderer::Aabb;
use crate::scene::{Camera, CubeFace, Hierarchy, ReflectionProbe, Visual};

/// Whether `probe` may capture or be sampled by `visual`: the groups must
/// overlap and the probe must not be mounted on the drawable or above it.
pub fn probe_accepts(probe: &ReflectionProbe, visual: &Visual, hierarchy: &dyn Hierarchy) -> bool {
    probe.visible_groups & visual.groups != 0
        && probe.node != visual.node
        && !hierarchy.is_ancestor(probe.node, visual.node)
}

/// Position used for probe distance checks: the bounds centre when known.
pub fn reference_point(visual: &Visual, bounds: Option<&Aabb>) -> Vec3 {
    bounds.map_or(visual.transform.translation, Aabb::center)
}

/// Whether a drawable lies within the probe's far plane. Unbounded drawables
/// are always in range.
pub fn probe_in_range(probe: &ReflectionProbe, bounds: Option<&Aabb>) -> bool {
    bounds.map_or(true, |aabb| {
        aabb.distance_squared_to(probe.position) <= probe.far * probe.far
    })
}

/// Index of the nearest probe that can capture `visual`, compared by squared
/// distance. Probes with no faces to capture or whose far plane stops short
/// of the drawable are never picked.
pub fn select_probe(
    visual: &Visual,
    bounds: Option<&Aabb>,
    probes: &[ReflectionProbe],
    hierarchy: &dyn Hierarchy,
) -> Option<usize> {
    let point = reference_point(visual, bounds);
    probes
        .iter()
        .enumerate()
        .filter(|(_, probe)| {
            probe.has_faces()
                && probe_in_range(probe, bounds)
                && probe_accepts(probe, visual, hierarchy)
        })
        .map(|(index, probe)| (index, probe.position.distance_squared(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// Environment map for a reflective drawable: its probe, else the scene
/// skybox, else nothing.
pub fn resolve_reflection(
    probe: Option<&ReflectionProbe>,
    environment: Option<&Environment>,
) -> ReflectionSource {
    if let Some(probe) = probe {
        return ReflectionSource::Probe(probe.target);
    }
    match environment.and_then(Environment::reflection_cubemap) {
        Some(cubemap) => ReflectionSource::SkyBox(cubemap),
        None => ReflectionSource::None,
    }
}

/// Invokes `f` for each face `probe` renders on `frame`, at most
/// `faces_per_frame` of them. Throttled probes render nothing.
pub fn traverse_cameras(
    probe: &mut ReflectionProbe,
    frame: u64,
    faces_per_frame: usize,
    scratch: &mut Vec<CubeFace>,
    mut f: impl FnMut(CubeFace, &Camera),
) {
    probe.take_faces(frame, faces_per_frame, scratch);
    for &face in scratch.iter() {
        let camera = probe.face_camera(face);
        f(face, &camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::gpu::{RenderTargetId, TextureId};
    use crate::scene::{CubeFace, FlatHierarchy, NodeId, SceneTree};

    fn probe(node: u32, x: f32) -> ReflectionProbe {
        ReflectionProbe::new(NodeId(node), Vec3::new(x, 0.0, 0.0), RenderTargetId(node))
    }

    #[test]
    fn nearest_eligible_probe_wins() {
        let probes = [probe(10, 5.0), probe(11, 1.0), probe(12, -3.0)];
        let visual = Visual::new(NodeId(1));
        assert_eq!(select_probe(&visual, None, &probes, &FlatHierarchy), Some(1));
    }

    #[test]
    fn probes_mounted_above_the_drawable_are_excluded() {
        let probes = [probe(10, 1.0), probe(11, 5.0)];
        let mut tree = SceneTree::new();
        tree.set_parent(NodeId(1), NodeId(10));
        let visual = Visual::new(NodeId(1));
        assert_eq!(select_probe(&visual, None, &probes, &tree), Some(1));
    }

    #[test]
    fn group_mask_filters_probes() {
        let probes = [probe(10, 1.0).with_visible_groups(0b10)];
        let visual = Visual::new(NodeId(1)).with_groups(0b01);
        assert_eq!(select_probe(&visual, None, &probes, &FlatHierarchy), None);
    }

    #[test]
    fn probes_without_faces_are_never_selected() {
        let probes = [probe(10, 1.0).with_faces(&[]), probe(11, 5.0)];
        let visual = Visual::new(NodeId(1));
        assert_eq!(select_probe(&visual, None, &probes, &FlatHierarchy), Some(1));

        let only = [probe(10, 1.0).with_faces(&[])];
        assert_eq!(select_probe(&visual, None, &only, &FlatHierarchy), None);
    }

    #[test]
    fn probes_out_of_range_are_not_selected() {
        let mut near = probe(10, 0.0);
        near.far = 5.0;
        let distant = probe(11, 30.0);
        let visual = Visual::new(NodeId(1));
        let bounds = Aabb::new(Vec3::new(19.0, -1.0, -1.0), Vec3::new(21.0, 1.0, 1.0));

        assert!(!probe_in_range(&near, Some(&bounds)));
        assert!(probe_in_range(&near, None));
        assert_eq!(
            select_probe(&visual, Some(&bounds), &[near.clone(), distant], &FlatHierarchy),
            Some(1)
        );
        assert_eq!(select_probe(&visual, Some(&bounds), &[near], &FlatHierarchy), None);
    }

    #[test]
    fn partial_face_sets_still_count() {
        let probes = [probe(10, 1.0).with_faces(&[CubeFace::PositiveY])];
        let visual = Visual::new(NodeId(1));
        assert_eq!(select_probe(&visual, None, &probes, &FlatHierarchy), Some(0));
    }

    #[test]
    fn fallback_prefers_skybox_then_nothing() {
        let skybox = Environment::SkyBox {
            cubemap: TextureId(3),
        };
        assert_eq!(
            resolve_reflection(None, Some(&skybox)),
            ReflectionSource::SkyBox(TextureId(3))
        );
        assert_eq!(
            resolve_reflection(None, Some(&Environment::default())),
            ReflectionSource::None
        );
        assert_eq!(resolve_reflection(None, None), ReflectionSource::None);

        let p = probe(10, 0.0);
        assert_eq!(
            resolve_reflection(Some(&p), Some(&skybox)),
            ReflectionSource::Probe(RenderTargetId(10))
        );
    }

    #[test]
    fn throttled_probes_render_no_faces() {
        let mut p = probe(10, 0.0).with_capture_interval(5);
        let mut scratch = Vec::new();
        let mut faces = 0;
        traverse_cameras(&mut p, 0, 6, &mut scratch, |_, _| faces += 1);
        traverse_cameras(&mut p, 1, 6, &mut scratch, |_, _| faces += 1);
        assert_eq!(faces, 6);
    }
}
