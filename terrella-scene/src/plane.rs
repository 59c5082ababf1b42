use bevy::math::{DVec3, DVec4};

/// Plane in Hessian normal form: points `p` with `normal · p + distance == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}
impl Plane {
    pub fn from_point_normal(point: &DVec3, normal: &DVec3) -> Self {
        let distance = -normal.dot(*point);
        Self {
            normal: *normal,
            distance,
        }
    }
    /// Normalizes `(a, b, c, d)` so that `(a, b, c)` is a unit normal.
    pub fn from_vec4(coefficients: &DVec4) -> Self {
        let normal = coefficients.truncate();
        let length = normal.length();
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }
    pub fn get_point_distance(&self, point: &DVec3) -> f64 {
        return self.normal.dot(*point) + self.distance;
    }
    pub fn project_point_onto_plane(&self, point: &DVec3) -> DVec3 {
        return *point - self.normal * self.get_point_distance(point);
    }
}
