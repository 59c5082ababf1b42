use bevy::math::{DMat4, DVec3};

use crate::{BoundingVolume, Intersect, Plane};

/// Six inward-facing planes, ordered left, right, bottom, top, near, far.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CullingVolume {
    pub planes: [Plane; 6],
}
impl CullingVolume {
    pub fn new(planes: Option<[Plane; 6]>) -> Self {
        Self {
            planes: planes.unwrap_or_default(),
        }
    }
    /// Extracts the clip planes from the rows of a projection-view matrix.
    pub fn from_projection_view(m: &DMat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        return Self {
            planes: [
                Plane::from_vec4(&(r3 + r0)),
                Plane::from_vec4(&(r3 - r0)),
                Plane::from_vec4(&(r3 + r1)),
                Plane::from_vec4(&(r3 - r1)),
                Plane::from_vec4(&(r3 + r2)),
                Plane::from_vec4(&(r3 - r2)),
            ],
        };
    }
    pub fn compute_visibility(&self, bounding_volume: &dyn BoundingVolume) -> Intersect {
        let mut intersecting = false;
        for plane in self.planes.iter() {
            let result = bounding_volume.intersect_plane(plane);
            if result == Intersect::Outside {
                return Intersect::Outside;
            } else if result == Intersect::Intersecting {
                intersecting = true;
            }
        }
        return if intersecting {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        };
    }
    pub fn contains_point(&self, point: &DVec3) -> bool {
        return self
            .planes
            .iter()
            .all(|p| p.get_point_distance(point) >= 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{math::Matrix4, BoundingSphere};

    fn unit_volume() -> CullingVolume {
        // near 1, far 10, 90 degree field of view looking down -z
        let m = DMat4::compute_perspective_field_of_view(std::f64::consts::FRAC_PI_2, 1.0, 1.0, 10.0);
        CullingVolume::from_projection_view(&m)
    }

    #[test]
    fn planes_face_inward() {
        let v = unit_volume();
        assert!(v.contains_point(&DVec3::new(0.0, 0.0, -5.0)));
        assert!(!v.contains_point(&DVec3::new(0.0, 0.0, 5.0)));
        assert!(!v.contains_point(&DVec3::new(0.0, 0.0, -20.0)));
        assert!(!v.contains_point(&DVec3::new(6.0, 0.0, -5.0)));
        // left plane normal points right
        assert!(v.planes[0].normal.x > 0.0);
        assert!(v.planes[4].normal.z < 0.0);
    }
    #[test]
    fn sphere_visibility() {
        let v = unit_volume();
        let inside = BoundingSphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0);
        let crossing = BoundingSphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);
        let outside = BoundingSphere::new(DVec3::new(0.0, 0.0, 5.0), 1.0);
        assert_eq!(v.compute_visibility(&inside), Intersect::Inside);
        assert_eq!(v.compute_visibility(&crossing), Intersect::Intersecting);
        assert_eq!(v.compute_visibility(&outside), Intersect::Outside);
    }
}
