use glam::Quat;

use crate::asset::Assets;
use crate::renderer::cascades::{caster_overlaps, LightSpace};
use crate::renderer::{Aabb, Containment, Frustum};
use crate::scene::{Camera, Visual};

pub fn test_visible(frustum: &Frustum, aabb: &Aabb) -> Containment {
    frustum.test_aabb(aabb)
}

/// World-space bounds of a drawable, or `None` when its geometry has no
/// bounds (never culled).
pub fn world_bounds(visual: &Visual, assets: &Assets) -> Option<Aabb> {
    let geometry = assets.geometries.get(visual.geometry?)?;
    let local = geometry.local_bounds()?;
    Some(local.transformed(&visual.world_matrix()))
}

/// Visible unless the bounds are provably outside.
pub fn is_visible(frustum: &Frustum, bounds: Option<&Aabb>) -> bool {
    bounds.map_or(true, |aabb| test_visible(frustum, aabb) != Containment::Out)
}

/// Light-space extent of a camera's shadowed range for each shadow-casting
/// directional light. A drawable outside the camera frustum is still a
/// shadow caster when it reaches one of these volumes.
#[derive(Default)]
pub struct ShadowReach {
    volumes: Vec<(LightSpace, Aabb)>,
}

impl ShadowReach {
    pub fn rebuild(
        &mut self,
        camera: &Camera,
        light_rotations: impl IntoIterator<Item = Quat>,
        cascade_count: usize,
        shadow_distance: f32,
    ) {
        self.volumes.clear();
        let (near, _) = camera.cascade_range(0, cascade_count, shadow_distance);
        let (_, far) = camera.cascade_range(
            cascade_count.saturating_sub(1),
            cascade_count,
            shadow_distance,
        );
        let corners = camera.slice_corners(near, far);

        for rotation in light_rotations {
            let space = LightSpace::new(rotation, camera.position());
            if let Some(bounds) = space.bounds_of_points(&corners) {
                self.volumes.push((space, bounds));
            }
        }
    }

    pub fn reaches(&self, world: &Aabb) -> bool {
        self.volumes
            .iter()
            .any(|(space, slice)| caster_overlaps(slice, &space.bounds_of(world)))
    }
}
