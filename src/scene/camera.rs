use glam::{Mat4, Vec3};

use crate::renderer::gpu::RenderTargetId;
use crate::renderer::lights::{CASCADE_EDGES, MAX_SHADOW_CASCADES};
use crate::renderer::Frustum;

/// Which buffers a camera clears before drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearPolicy {
    pub color: bool,
    pub depth: bool,
}

impl Default for ClearPolicy {
    fn default() -> Self {
        Self {
            color: true,
            depth: true,
        }
    }
}

/// Full-screen effects run on a camera's output after the transparent pass,
/// in stack order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostEffect {
    Bloom { threshold: f32, intensity: f32 },
    ToneMap { exposure: f32 },
    Fxaa,
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// `None` renders to the default framebuffer.
    pub render_target: Option<RenderTargetId>,
    pub clear: ClearPolicy,
    pub post_effects: Vec<PostEffect>,
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    pub fn position(&self) -> Vec3 {
        self.eye
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_proj())
    }

    /// World-space corners of the view volume between two view depths:
    /// four near corners followed by four far corners.
    pub fn slice_corners(&self, near: f32, far: f32) -> [Vec3; 8] {
        let forward = self.forward();
        let right = forward.cross(self.up).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        let tan_half = (self.fov_y_radians * 0.5).tan();

        let mut corners = [Vec3::ZERO; 8];
        for (plane, depth) in [near, far].into_iter().enumerate() {
            let center = self.eye + forward * depth;
            let half_h = tan_half * depth;
            let half_w = half_h * self.aspect;
            for (i, (sx, sy)) in [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)]
                .into_iter()
                .enumerate()
            {
                corners[plane * 4 + i] = center + right * (sx * half_w) + up * (sy * half_h);
            }
        }
        corners
    }

    /// View-depth range of cascade `index` out of `count`. The last active
    /// cascade always reaches the full shadow distance.
    pub fn cascade_range(&self, index: usize, count: usize, shadow_distance: f32) -> (f32, f32) {
        let count = count.clamp(1, MAX_SHADOW_CASCADES);
        let distance = shadow_distance.min(self.far);
        let near = (CASCADE_EDGES[index] * distance).max(self.near);
        let far = if index + 1 >= count {
            distance
        } else {
            CASCADE_EDGES[index + 1] * distance
        };
        (near, far.max(near))
    }

    pub fn cascade_corners(&self, index: usize, count: usize, shadow_distance: f32) -> [Vec3; 8] {
        let (near, far) = self.cascade_range(index, count, shadow_distance);
        self.slice_corners(near, far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_radians: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            render_target: None,
            clear: ClearPolicy::default(),
            post_effects: Vec::new(),
        }
    }
}
