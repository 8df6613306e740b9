use glam::{Mat4, Vec3, Vec4};

use super::Aabb;

/// Result of testing a volume against a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    In,
    Out,
    Intersect,
}

/// Six normalised planes pointing inwards, extracted from a view-projection
/// matrix with a 0..1 depth range.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    pub fn test_aabb(&self, aabb: &Aabb) -> Containment {
        let (min, max) = (aabb.min(), aabb.max());
        let mut result = Containment::In;
        for plane in &self.planes {
            let normal = plane.truncate();
            let positive = Vec3::select(normal.cmpge(Vec3::ZERO), max, min);
            let negative = Vec3::select(normal.cmpge(Vec3::ZERO), min, max);
            if normal.dot(positive) + plane.w < 0.0 {
                return Containment::Out;
            }
            if normal.dot(negative) + plane.w < 0.0 {
                result = Containment::Intersect;
            }
        }
        result
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > f32::EPSILON {
        plane / length
    } else {
        plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60_f32.to_radians(), 1.0, 0.1, 50.0);
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn box_at_target_is_inside() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(frustum().test_aabb(&aabb), Containment::In);
    }

    #[test]
    fn box_behind_camera_is_outside() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 12.0), Vec3::new(1.0, 1.0, 14.0));
        assert_eq!(frustum().test_aabb(&aabb), Containment::Out);
    }

    #[test]
    fn box_crossing_far_plane_intersects() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -45.0), Vec3::new(1.0, 1.0, -35.0));
        assert_eq!(frustum().test_aabb(&aabb), Containment::Intersect);
    }
}
