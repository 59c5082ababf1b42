use bevy::math::DVec3;

use super::{bounds_from_extent, bounds_min_max, BoundingVolume, Intersect};
use crate::{math::Cartesian3, Ellipsoid, Extent, Plane};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}
impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }
    pub fn from_bounds(bounds: &[f64; 6]) -> Self {
        let mut me = Self::default();
        me.set_from_bounds(bounds);
        me
    }
    pub fn from_extent(ellipsoid: &Ellipsoid, extent: &Extent) -> Self {
        let mut me = Self::default();
        me.set_from_extent(ellipsoid, extent);
        me
    }
    /// Center at the midpoint of the box, radius reaching its min corner.
    pub fn set_from_bounds(&mut self, bounds: &[f64; 6]) {
        let (min, max) = bounds_min_max(bounds);
        self.center = min.midpoint(max);
        self.radius = self.center.distance(min);
    }
    pub fn set_from_extent(&mut self, ellipsoid: &Ellipsoid, extent: &Extent) {
        self.set_from_bounds(&bounds_from_extent(ellipsoid, extent));
    }
    pub fn contains_point(&self, point: &DVec3, epsilon: f64) -> bool {
        return self.center.distance(*point) <= self.radius + epsilon;
    }
    pub fn distance_to_point(&self, point: &DVec3) -> f64 {
        return (self.center.distance(*point) - self.radius).max(0.0);
    }
}
impl BoundingVolume for BoundingSphere {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance_to_plane = plane.get_point_distance(&self.center);
        if distance_to_plane < -self.radius {
            // center is on the negative side and the radius does not reach back
            return Intersect::Outside;
        } else if distance_to_plane < self.radius {
            return Intersect::Intersecting;
        }
        return Intersect::Inside;
    }
}
