use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::scene::{Light, LightKind};

// These sizes are compiled into the shaders' uniform arrays as well; changing
// one here without the shader side corrupts shadow sampling.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 16;
pub const MAX_SPOT_LIGHTS: usize = 8;
pub const MAX_SHADOW_CASCADES: usize = 3;
pub const MAX_UNIFORM_BONES: usize = 64;

/// Cascade split points as fractions of the shadow distance.
pub const CASCADE_EDGES: [f32; MAX_SHADOW_CASCADES + 1] = [0.0, 0.1, 0.35, 1.0];

pub const MIN_SHADOW_MAP_SIZE: u32 = 128;

/// Shadow map resolution of cascade `index`: the base size halved per level.
pub fn cascade_map_size(base: u32, index: usize) -> u32 {
    base.checked_shr(index as u32)
        .unwrap_or(0)
        .max(MIN_SHADOW_MAP_SIZE)
}

#[derive(Clone, Copy, Debug)]
pub struct DirectionalLightData {
    pub rotation: Quat,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct PointLightData {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct SpotLightData {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
}

/// Enabled lights of one frame, clamped to the per-kind maxima.
#[derive(Clone, Default)]
pub struct LightsData {
    directional: Vec<DirectionalLightData>,
    point: Vec<PointLightData>,
    spot: Vec<SpotLightData>,
}

impl LightsData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
    }

    /// Refills from the frame's light list. Lights beyond a kind's maximum are
    /// dropped in list order.
    pub fn collect(&mut self, lights: &[Light]) {
        self.clear();
        let mut dropped = 0usize;

        for light in lights.iter().filter(|light| light.enabled) {
            let rotation = light.transform.rotation;
            let direction = light.forward();
            match light.kind {
                LightKind::Directional => {
                    if self.directional.len() < MAX_DIRECTIONAL_LIGHTS {
                        self.directional.push(DirectionalLightData {
                            rotation,
                            direction,
                            color: light.color,
                            intensity: light.intensity,
                            cast_shadows: light.cast_shadows,
                        });
                    } else {
                        dropped += 1;
                    }
                }
                LightKind::Point { range } => {
                    if self.point.len() < MAX_POINT_LIGHTS {
                        self.point.push(PointLightData {
                            position: light.transform.translation,
                            color: light.color,
                            intensity: light.intensity,
                            range,
                        });
                    } else {
                        dropped += 1;
                    }
                }
                LightKind::Spot {
                    range,
                    inner_angle,
                    outer_angle,
                } => {
                    if self.spot.len() < MAX_SPOT_LIGHTS {
                        self.spot.push(SpotLightData {
                            position: light.transform.translation,
                            direction,
                            color: light.color,
                            intensity: light.intensity,
                            range,
                            inner_angle,
                            outer_angle,
                        });
                    } else {
                        dropped += 1;
                    }
                }
            }
        }

        if dropped > 0 {
            log::debug!("{} lights exceeded the per-kind maxima and were ignored", dropped);
        }
    }

    pub fn directional_lights(&self) -> &[DirectionalLightData] {
        &self.directional
    }

    pub fn point_lights(&self) -> &[PointLightData] {
        &self.point
    }

    pub fn spot_lights(&self) -> &[SpotLightData] {
        &self.spot
    }
}

fn packed(v: Vec3, w: f32) -> [f32; 4] {
    v.extend(w).to_array()
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirectionalLightRaw {
    /// xyz direction, w = 1 when the light casts shadows.
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl DirectionalLightRaw {
    pub fn from_data(data: &DirectionalLightData) -> Self {
        Self {
            direction: packed(data.direction, f32::from(u8::from(data.cast_shadows))),
            color_intensity: packed(data.color, data.intensity),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PointLightRaw {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl PointLightRaw {
    pub fn from_data(data: &PointLightData) -> Self {
        Self {
            position_range: packed(data.position, data.range),
            color_intensity: packed(data.color, data.intensity),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SpotLightRaw {
    pub position_range: [f32; 4],
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
    /// Cosines of the inner and outer cone half-angles; inner >= outer.
    pub cone_params: [f32; 4],
}

impl SpotLightRaw {
    pub fn from_data(data: &SpotLightData) -> Self {
        // Angles given in the wrong order still describe the same cone.
        let inner = data.inner_angle.min(data.outer_angle);
        let outer = data.inner_angle.max(data.outer_angle);
        Self {
            position_range: packed(data.position, data.range),
            direction: packed(data.direction, 0.0),
            color_intensity: packed(data.color, data.intensity),
            cone_params: [inner.cos(), outer.cos(), 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub counts: [u32; 4],
    pub directionals: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub points: [PointLightRaw; MAX_POINT_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
}

impl LightsUniform {
    pub fn from_data(data: &LightsData) -> Self {
        let mut uniform = Self::zeroed();

        uniform.counts[0] = data.directional_lights().len() as u32;
        for (dst, src) in uniform.directionals.iter_mut().zip(data.directional_lights()) {
            *dst = DirectionalLightRaw::from_data(src);
        }

        uniform.counts[1] = data.point_lights().len() as u32;
        for (dst, src) in uniform.points.iter_mut().zip(data.point_lights()) {
            *dst = PointLightRaw::from_data(src);
        }

        uniform.counts[2] = data.spot_lights().len() as u32;
        for (dst, src) in uniform.spots.iter_mut().zip(data.spot_lights()) {
            *dst = SpotLightRaw::from_data(src);
        }

        uniform
    }
}

/// Cascade matrices of every directional light slot. The array length never
/// changes between frames; unused slots hold identity and are flagged off in
/// `cascade_counts`.
#[derive(Clone, Debug)]
pub struct CascadeMatrices {
    matrices: [Mat4; MAX_DIRECTIONAL_LIGHTS * MAX_SHADOW_CASCADES],
    cascade_counts: [u32; MAX_DIRECTIONAL_LIGHTS],
}

impl Default for CascadeMatrices {
    fn default() -> Self {
        Self {
            matrices: [Mat4::IDENTITY; MAX_DIRECTIONAL_LIGHTS * MAX_SHADOW_CASCADES],
            cascade_counts: [0; MAX_DIRECTIONAL_LIGHTS],
        }
    }
}

impl CascadeMatrices {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set(&mut self, light: usize, cascade: usize, view_proj: Mat4) {
        self.matrices[light * MAX_SHADOW_CASCADES + cascade] = view_proj;
    }

    pub fn get(&self, light: usize, cascade: usize) -> Mat4 {
        self.matrices[light * MAX_SHADOW_CASCADES + cascade]
    }

    pub fn set_cascade_count(&mut self, light: usize, count: usize) {
        self.cascade_counts[light] = count.min(MAX_SHADOW_CASCADES) as u32;
    }

    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    pub fn cascade_counts(&self) -> [u32; MAX_DIRECTIONAL_LIGHTS] {
        self.cascade_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Light;

    #[test]
    fn cascade_sizes_halve_and_bottom_out() {
        assert_eq!(cascade_map_size(2048, 0), 2048);
        assert_eq!(cascade_map_size(2048, 1), 1024);
        assert_eq!(cascade_map_size(2048, 2), 512);
        assert_eq!(cascade_map_size(256, 4), MIN_SHADOW_MAP_SIZE);
        assert_eq!(cascade_map_size(256, 64), MIN_SHADOW_MAP_SIZE);
    }

    #[test]
    fn cascade_edges_cover_the_whole_distance() {
        assert_eq!(CASCADE_EDGES[0], 0.0);
        assert_eq!(CASCADE_EDGES[MAX_SHADOW_CASCADES], 1.0);
        assert!(CASCADE_EDGES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn directional_lights_are_clamped() {
        let lights: Vec<Light> = (0..MAX_DIRECTIONAL_LIGHTS + 3)
            .map(|_| Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0))
            .collect();
        let mut data = LightsData::new();
        data.collect(&lights);
        assert_eq!(data.directional_lights().len(), MAX_DIRECTIONAL_LIGHTS);

        let uniform = LightsUniform::from_data(&data);
        assert_eq!(uniform.counts[0] as usize, MAX_DIRECTIONAL_LIGHTS);
    }

    #[test]
    fn disabled_lights_are_ignored() {
        let mut light = Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0);
        light.enabled = false;
        let mut data = LightsData::new();
        data.collect(&[light]);
        assert!(data.directional_lights().is_empty());
    }

    #[test]
    fn raw_lights_pack_the_fourth_lane() {
        let point = PointLightRaw::from_data(&PointLightData {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec3::new(0.5, 0.25, 1.0),
            intensity: 4.0,
            range: 12.0,
        });
        assert_eq!(point.position_range, [1.0, 2.0, 3.0, 12.0]);
        assert_eq!(point.color_intensity, [0.5, 0.25, 1.0, 4.0]);

        let mut data = LightsData::new();
        let mut unshadowed = Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0);
        unshadowed.cast_shadows = false;
        data.collect(&[Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0), unshadowed]);
        let uniform = LightsUniform::from_data(&data);
        assert_eq!(uniform.directionals[0].direction[3], 1.0);
        assert_eq!(uniform.directionals[1].direction[3], 0.0);
    }

    #[test]
    fn spot_cones_are_ordered_before_packing() {
        let spot = |inner_angle: f32, outer_angle: f32| SpotLightData {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 5.0,
            inner_angle,
            outer_angle,
        };
        let ordered = SpotLightRaw::from_data(&spot(0.2, 0.6));
        let reversed = SpotLightRaw::from_data(&spot(0.6, 0.2));
        assert_eq!(ordered.cone_params, reversed.cone_params);
        assert!(ordered.cone_params[0] > ordered.cone_params[1]);
        assert_eq!(ordered.direction, [0.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn cascade_matrix_array_has_a_fixed_length() {
        let mut cascades = CascadeMatrices::default();
        cascades.set(1, 2, Mat4::from_scale(Vec3::splat(2.0)));
        cascades.set_cascade_count(1, 99);
        assert_eq!(
            cascades.matrices().len(),
            MAX_DIRECTIONAL_LIGHTS * MAX_SHADOW_CASCADES
        );
        assert_eq!(cascades.cascade_counts()[1] as usize, MAX_SHADOW_CASCADES);
        cascades.reset();
        assert_eq!(cascades.get(1, 2), Mat4::IDENTITY);
    }
}
