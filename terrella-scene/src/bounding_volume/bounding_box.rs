use bevy::math::DVec3;

use super::{bounds_from_extent, bounds_min_max, BoundingVolume, Intersect};
use crate::{Ellipsoid, Extent, Plane};

/// Axis-aligned box kept as its eight corner vertices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub vertices: [DVec3; 8],
}
impl BoundingBox {
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
    pub fn set_from_bounds(&mut self, bounds: &[f64; 6]) {
        let (min, max) = bounds_min_max(bounds);
        self.vertices = [
            DVec3::new(min.x, min.y, min.z),
            DVec3::new(max.x, min.y, min.z),
            DVec3::new(max.x, min.y, max.z),
            DVec3::new(min.x, min.y, max.z),
            DVec3::new(min.x, max.y, min.z),
            DVec3::new(max.x, max.y, min.z),
            DVec3::new(max.x, max.y, max.z),
            DVec3::new(min.x, max.y, max.z),
        ];
    }
    pub fn set_from_extent(&mut self, ellipsoid: &Ellipsoid, extent: &Extent) {
        self.set_from_bounds(&bounds_from_extent(ellipsoid, extent));
    }
    pub fn center(&self) -> DVec3 {
        return (self.vertices[0] + self.vertices[6]) * 0.5;
    }
}
impl BoundingVolume for BoundingBox {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let mut outside = 0;
        for v in self.vertices.iter() {
            if plane.get_point_distance(v) < 0.0 {
                outside += 1;
            }
        }
        return match outside {
            0 => Intersect::Inside,
            8 => Intersect::Outside,
            _ => Intersect::Intersecting,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_from_bounds() {
        let b = BoundingBox::from_bounds(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(b.center(), DVec3::new(0.5, 1.0, 1.5));
        assert!(b.vertices.contains(&DVec3::new(1.0, 2.0, 3.0)));
        assert!(b.vertices.contains(&DVec3::ZERO));
    }
    #[test]
    fn plane_classification() {
        let b = BoundingBox::from_bounds(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
        let inside = Plane::from_point_normal(&DVec3::new(0.0, 0.0, -2.0), &DVec3::Z);
        let crossing = Plane::from_point_normal(&DVec3::ZERO, &DVec3::Z);
        let outside = Plane::from_point_normal(&DVec3::new(0.0, 0.0, 2.0), &DVec3::Z);
        assert_eq!(b.intersect_plane(&inside), Intersect::Inside);
        assert_eq!(b.intersect_plane(&crossing), Intersect::Intersecting);
        assert_eq!(b.intersect_plane(&outside), Intersect::Outside);
    }
    #[test]
    fn extent_box_encloses_corners() {
        let e = Ellipsoid::WGS84;
        let extent = Extent::from_degrees(30.0, 10.0, 40.0, 20.0);
        let b = BoundingBox::from_extent(&e, &extent);
        let min = b.vertices[0];
        let max = b.vertices[6];
        for corner in extent.corners() {
            let p = e.lon_lat_to_cartesian(&corner);
            assert!(p.cmpge(min).all() && p.cmple(max).all());
        }
    }
}
