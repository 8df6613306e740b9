use glam::Vec3;

use crate::scene::Transform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional,
    Point {
        range: f32,
    },
    Spot {
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    },
}

/// A light with a resolved world transform. Lights shine along the
/// transform's forward (-Z) axis.
#[derive(Clone, Copy, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub transform: Transform,
    pub cast_shadows: bool,
    pub enabled: bool,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            transform: Transform::looking_to(direction),
            cast_shadows: true,
            enabled: true,
        }
    }

    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point { range },
            color,
            intensity,
            transform: Transform::from_translation(position),
            cast_shadows: false,
            enabled: true,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }
}
