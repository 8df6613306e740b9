use glam::Vec3;

use crate::renderer::gpu::RenderTargetId;
use crate::scene::{Camera, ClearPolicy, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn direction(self) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::X,
            CubeFace::NegativeX => Vec3::NEG_X,
            CubeFace::PositiveY => Vec3::Y,
            CubeFace::NegativeY => Vec3::NEG_Y,
            CubeFace::PositiveZ => Vec3::Z,
            CubeFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    pub fn up(self) -> Vec3 {
        match self {
            CubeFace::PositiveY => Vec3::Z,
            CubeFace::NegativeY => Vec3::NEG_Z,
            _ => Vec3::Y,
        }
    }
}

/// A cubemap capture point. The probe owns its capture cadence: a full
/// capture cycle starts at most every `capture_interval` frames and may be
/// spread over several frames.
#[derive(Debug, Clone)]
pub struct ReflectionProbe {
    pub node: NodeId,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
    pub visible_groups: u32,
    pub target: RenderTargetId,
    faces: Vec<CubeFace>,
    capture_interval: u64,
    pending: Vec<CubeFace>,
    last_capture: Option<u64>,
}

impl ReflectionProbe {
    pub fn new(node: NodeId, position: Vec3, target: RenderTargetId) -> Self {
        Self {
            node,
            position,
            near: 0.1,
            far: 100.0,
            visible_groups: u32::MAX,
            target,
            faces: CubeFace::ALL.to_vec(),
            capture_interval: 1,
            pending: Vec::new(),
            last_capture: None,
        }
    }

    /// Restricts capture to a subset of faces (e.g. skip the floor).
    pub fn with_faces(mut self, faces: &[CubeFace]) -> Self {
        self.faces = faces.to_vec();
        self
    }

    pub fn with_capture_interval(mut self, frames: u64) -> Self {
        self.capture_interval = frames.max(1);
        self
    }

    pub fn with_visible_groups(mut self, groups: u32) -> Self {
        self.visible_groups = groups;
        self
    }

    pub fn last_capture(&self) -> Option<u64> {
        self.last_capture
    }

    /// False for probes configured with no faces; those never write their
    /// target.
    pub fn has_faces(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Whether the probe has faces to render on `frame`: either a cycle is in
    /// progress or the interval since the last completed cycle has elapsed.
    pub fn can_capture(&self, frame: u64) -> bool {
        if !self.has_faces() {
            return false;
        }
        if !self.pending.is_empty() {
            return true;
        }
        match self.last_capture {
            None => true,
            Some(last) => frame >= last + self.capture_interval,
        }
    }

    /// Takes up to `budget` faces to render this frame, starting a new cycle
    /// when none is in progress. Marks the capture complete when the last
    /// pending face is handed out.
    pub(crate) fn take_faces(&mut self, frame: u64, budget: usize, out: &mut Vec<CubeFace>) {
        out.clear();
        if !self.can_capture(frame) {
            return;
        }
        if self.pending.is_empty() {
            self.pending.extend(self.faces.iter().rev());
        }
        for _ in 0..budget {
            match self.pending.pop() {
                Some(face) => out.push(face),
                None => break,
            }
        }
        if self.pending.is_empty() {
            self.last_capture = Some(frame);
        }
    }

    /// Camera rendering one cube face from the probe position.
    pub fn face_camera(&self, face: CubeFace) -> Camera {
        Camera {
            eye: self.position,
            target: self.position + face.direction(),
            up: face.up(),
            fov_y_radians: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
            near: self.near,
            far: self.far,
            render_target: Some(self.target),
            clear: ClearPolicy::default(),
            post_effects: Vec::new(),
        }
    }
}
