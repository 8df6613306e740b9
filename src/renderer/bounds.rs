use std::cell::Cell;

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box with lazily rebuilt corner cache.
///
/// The eight corners are read far more often than the box changes (frustum
/// tests, shadow fitting, probe distance), so they are cached and rebuilt only
/// after `min` or `max` actually change.
#[derive(Debug, Clone)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
    corners: Cell<[Vec3; 8]>,
    dirty: Cell<bool>,
}

impl PartialEq for Aabb {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl Aabb {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
            corners: Cell::new([Vec3::ZERO; 8]),
            dirty: Cell::new(true),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn set_min(&mut self, min: Vec3) {
        if min != self.min {
            self.min = min;
            self.dirty.set(true);
        }
    }

    pub fn set_max(&mut self, max: Vec3) {
        if max != self.max {
            self.max = max;
            self.dirty.set(true);
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        if self.dirty.get() {
            let (lo, hi) = (self.min, self.max);
            self.corners.set([
                Vec3::new(lo.x, lo.y, lo.z),
                Vec3::new(hi.x, lo.y, lo.z),
                Vec3::new(lo.x, hi.y, lo.z),
                Vec3::new(hi.x, hi.y, lo.z),
                Vec3::new(lo.x, lo.y, hi.z),
                Vec3::new(hi.x, lo.y, hi.z),
                Vec3::new(lo.x, hi.y, hi.z),
                Vec3::new(hi.x, hi.y, hi.z),
            ]);
            self.dirty.set(false);
        }
        self.corners.get()
    }

    pub(crate) fn corners_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Grows this box to also enclose `other`.
    pub fn grow(&mut self, other: &Aabb) {
        self.set_min(self.min.min(other.min));
        self.set_max(self.max.max(other.max));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Bounds of this box after `matrix`, i.e. the box enclosing the eight
    /// transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let corners = self.corners();
        let first = matrix.transform_point3(corners[0]);
        let (min, max) = corners[1..]
            .iter()
            .map(|c| matrix.transform_point3(*c))
            .fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Aabb::new(min, max)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Squared distance from `point` to the box surface, zero when inside.
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        let clamped = point.clamp(self.min, self.max);
        clamped.distance_squared(point)
    }
}
