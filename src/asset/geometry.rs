use std::cell::OnceCell;

use glam::{Mat4, Vec3};

use crate::renderer::Aabb;

/// A vertex source. Only the positions are kept here, for the bounding box;
/// vertex buffers live behind the GPU backend.
#[derive(Debug)]
pub struct Geometry {
    label: String,
    positions: Vec<Vec3>,
    bounds: OnceCell<Option<Aabb>>,
}

impl Geometry {
    pub fn new(label: impl Into<String>, positions: Vec<Vec3>) -> Self {
        Self {
            label: label.into(),
            positions,
            bounds: OnceCell::new(),
        }
    }

    /// Geometry without CPU-side positions (screen-space quads, GPU-sized
    /// particles). It has no bounds and is therefore never culled.
    pub fn unbounded(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    /// Axis-aligned box geometry centred on the origin.
    pub fn cuboid(label: impl Into<String>, half_extents: Vec3) -> Self {
        let corners = Aabb::new(-half_extents, half_extents).corners();
        Self::new(label, corners.to_vec())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Object-space bounds, computed on first use.
    pub fn local_bounds(&self) -> Option<&Aabb> {
        self.bounds
            .get_or_init(|| Aabb::from_points(self.positions.iter().copied()))
            .as_ref()
    }
}

/// Joint matrices for a skinned mesh, resolved by the animation system before
/// the frame starts.
#[derive(Debug, Clone)]
pub struct Skin {
    joints: Vec<Mat4>,
    inverse_bind: Vec<Mat4>,
}

impl Skin {
    pub fn new(joints: Vec<Mat4>, inverse_bind: Vec<Mat4>) -> Self {
        if joints.len() != inverse_bind.len() {
            log::warn!(
                "Skin has {} joints but {} inverse bind matrices; extra entries are ignored",
                joints.len(),
                inverse_bind.len()
            );
        }
        Self {
            joints,
            inverse_bind,
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len().min(self.inverse_bind.len())
    }

    /// Writes the bone palette relative to the mesh's world transform into
    /// `out`, reusing its allocation.
    pub fn compute_palette(&self, mesh_world: Mat4, out: &mut Vec<Mat4>) {
        let to_mesh = mesh_world.inverse();
        out.clear();
        out.extend(
            self.joints
                .iter()
                .zip(self.inverse_bind.iter())
                .map(|(joint, inverse_bind)| to_mesh * *joint * *inverse_bind),
        );
    }
}
