use bitflags::bitflags;
use glam::Mat4;

use crate::asset::{Geometry, Handle, Skin};
use crate::renderer::{Material, ShadingVariant};
use crate::scene::{NodeId, Transform};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisualFlags: u32 {
        const CAST_SHADOWS = 1 << 0;
        const RECEIVE_SHADOWS = 1 << 1;
        const RECEIVE_FOG = 1 << 2;
        const VERTEX_COLOR = 1 << 3;
        const REFLECTIVE = 1 << 4;
        const NORMAL_MAP = 1 << 5;
    }
}

impl Default for VisualFlags {
    fn default() -> Self {
        VisualFlags::CAST_SHADOWS | VisualFlags::RECEIVE_SHADOWS | VisualFlags::RECEIVE_FOG
    }
}

/// A drawable instance with a resolved world transform.
#[derive(Debug, Clone)]
pub struct Visual {
    pub node: NodeId,
    pub geometry: Option<Handle<Geometry>>,
    pub material: Option<Handle<Material>>,
    pub skin: Option<Handle<Skin>>,
    pub flags: VisualFlags,
    /// Visibility groups, matched against a probe's `visible_groups`.
    pub groups: u32,
    pub transform: Transform,
}

impl Visual {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            geometry: None,
            material: None,
            skin: None,
            flags: VisualFlags::default(),
            groups: 1,
            transform: Transform::IDENTITY,
        }
    }

    pub fn with_geometry(mut self, geometry: Handle<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_material(mut self, material: Handle<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_skin(mut self, skin: Handle<Skin>) -> Self {
        self.skin = Some(skin);
        self
    }

    pub fn with_flags(mut self, flags: VisualFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_groups(mut self, groups: u32) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn casts_shadows(&self) -> bool {
        self.flags.contains(VisualFlags::CAST_SHADOWS)
    }

    pub fn is_reflective(&self) -> bool {
        self.flags.contains(VisualFlags::REFLECTIVE)
    }

    pub fn shading_variant(&self) -> ShadingVariant {
        let mut variant = ShadingVariant::empty();
        variant.set(
            ShadingVariant::RECEIVE_SHADOWS,
            self.flags.contains(VisualFlags::RECEIVE_SHADOWS),
        );
        variant.set(
            ShadingVariant::RECEIVE_FOG,
            self.flags.contains(VisualFlags::RECEIVE_FOG),
        );
        variant.set(ShadingVariant::SKINNED, self.skin.is_some());
        variant.set(
            ShadingVariant::VERTEX_COLOR,
            self.flags.contains(VisualFlags::VERTEX_COLOR),
        );
        variant.set(ShadingVariant::REFLECTIVE, self.is_reflective());
        variant.set(
            ShadingVariant::NORMAL_MAP,
            self.flags.contains(VisualFlags::NORMAL_MAP),
        );
        variant
    }
}
