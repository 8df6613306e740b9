use glam::{Mat4, Quat, Vec3};

use crate::renderer::Aabb;
use crate::scene::Camera;

/// Padding in world units kept around the casters on the light's x/y axes.
pub const CASTER_PADDING: f32 = 1.0;

/// Smallest half-extent of a fitted volume; keeps the projection invertible
/// for flat casters.
const MIN_HALF_EXTENT: f32 = 1e-3;

/// Frame aligned to a directional light with its origin at a camera.
///
/// Light-space coordinates are `inverse(rotation) * (p - origin)`. The light
/// shines along its local -Z, so larger z is nearer to the light.
#[derive(Clone, Copy, Debug)]
pub struct LightSpace {
    rotation: Quat,
    inverse_rotation: Quat,
    origin: Vec3,
}

impl LightSpace {
    pub fn new(rotation: Quat, origin: Vec3) -> Self {
        let rotation = rotation.normalize();
        Self {
            rotation,
            inverse_rotation: rotation.inverse(),
            origin,
        }
    }

    pub fn to_light(&self, point: Vec3) -> Vec3 {
        self.inverse_rotation * (point - self.origin)
    }

    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.origin + self.rotation * point
    }

    pub fn bounds_of_points(&self, points: &[Vec3]) -> Option<Aabb> {
        Aabb::from_points(points.iter().map(|p| self.to_light(*p)))
    }

    pub fn bounds_of(&self, world: &Aabb) -> Aabb {
        let corners = world.corners().map(|c| self.to_light(c));
        let first = corners[0];
        let (min, max) = corners[1..]
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Aabb::new(min, max)
    }
}

/// Whether a caster's light-space bounds can throw shadow into `slice`.
///
/// x and y must overlap. Along z only the far side of the slice rejects:
/// casters between the slice and the light still shadow it.
pub fn caster_overlaps(slice: &Aabb, caster: &Aabb) -> bool {
    let (s_min, s_max) = (slice.min(), slice.max());
    let (c_min, c_max) = (caster.min(), caster.max());
    c_max.x >= s_min.x
        && c_min.x <= s_max.x
        && c_max.y >= s_min.y
        && c_min.y <= s_max.y
        && c_max.z >= s_min.z
}

/// Orthographic light transform of one cascade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeTransform {
    pub view: Mat4,
    pub projection: Mat4,
}

impl CascadeTransform {
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Fits an orthographic light volume around the part of a view slice that
/// can actually receive shadow from `casters` (world-space bounds).
///
/// Returns `None` when no caster reaches the slice.
pub fn compute_cascade_transform<'a>(
    camera_position: Vec3,
    slice_corners: &[Vec3; 8],
    light_rotation: Quat,
    casters: impl IntoIterator<Item = &'a Aabb>,
    max_extension: Option<f32>,
) -> Option<CascadeTransform> {
    let space = LightSpace::new(light_rotation, camera_position);
    let slice = space.bounds_of_points(slice_corners)?;

    let mut reach: Option<Aabb> = None;
    for caster in casters {
        let bounds = space.bounds_of(caster);
        if !caster_overlaps(&slice, &bounds) {
            continue;
        }
        match reach.as_mut() {
            Some(reach) => reach.grow(&bounds),
            None => reach = Some(bounds),
        }
    }
    let reach = reach?;

    let (s_min, s_max) = (slice.min(), slice.max());
    let (c_min, c_max) = (reach.min(), reach.max());

    let mut far_z = s_max.z.max(c_max.z);
    if let Some(limit) = max_extension {
        far_z = far_z.min(s_max.z + limit);
    }

    let min = Vec3::new(
        s_min.x.max(c_min.x - CASTER_PADDING),
        s_min.y.max(c_min.y - CASTER_PADDING),
        s_min.z.max(c_min.z).min(far_z),
    );
    let max = Vec3::new(
        s_max.x.min(c_max.x + CASTER_PADDING),
        s_max.y.min(c_max.y + CASTER_PADDING),
        far_z,
    );

    let center = (min + max) * 0.5;
    let half = ((max - min) * 0.5).max(Vec3::splat(MIN_HALF_EXTENT));

    let eye = space.to_world(center);
    let view = Mat4::from_rotation_translation(space.rotation, eye).inverse();
    let projection = Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, -half.z, half.z);

    Some(CascadeTransform { view, projection })
}

/// Fits cascade `index` of `camera` for a light with `light_rotation`.
pub fn fit_cascade<'a>(
    camera: &Camera,
    light_rotation: Quat,
    index: usize,
    cascade_count: usize,
    shadow_distance: f32,
    casters: impl IntoIterator<Item = &'a Aabb>,
    max_extension: Option<f32>,
) -> Option<CascadeTransform> {
    let corners = camera.cascade_corners(index, cascade_count, shadow_distance);
    compute_cascade_transform(
        camera.position(),
        &corners,
        light_rotation,
        casters,
        max_extension,
    )
}
