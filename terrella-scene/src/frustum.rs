use bevy::math::{DMat4, DVec3};

use crate::{
    encode_picking_color, math::Matrix4, BoundingBox, BoundingSphere, CullingVolume, Intersect,
};

/// One depth slice of the camera's viewing volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Position in the camera's cascade list.
    pub index: usize,
    /// Vertical field of view, degrees.
    pub view_angle: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub picking_color: [u8; 3],
    pub projection_matrix: DMat4,
    pub inverse_projection_matrix: DMat4,
    pub projection_view_matrix: DMat4,
    pub inverse_projection_view_matrix: DMat4,
    pub culling_volume: CullingVolume,
}
impl Frustum {
    pub fn new(index: usize, view_angle: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut me = Self {
            index,
            view_angle,
            aspect,
            near,
            far,
            picking_color: encode_picking_color(index as u32 + 1),
            projection_matrix: DMat4::IDENTITY,
            inverse_projection_matrix: DMat4::IDENTITY,
            projection_view_matrix: DMat4::IDENTITY,
            inverse_projection_view_matrix: DMat4::IDENTITY,
            culling_volume: CullingVolume::default(),
        };
        me.set_projection_matrix(view_angle, aspect, near, far);
        me.set_view_matrix(&DMat4::IDENTITY);
        return me;
    }
    pub fn set_projection_matrix(&mut self, view_angle: f64, aspect: f64, near: f64, far: f64) {
        self.view_angle = view_angle;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.projection_matrix =
            DMat4::compute_perspective_field_of_view(view_angle.to_radians(), aspect, near, far);
        self.inverse_projection_matrix = self.projection_matrix.inverse();
    }
    /// Recomputes the combined matrices and clip planes for a new view.
    pub fn set_view_matrix(&mut self, view_matrix: &DMat4) {
        self.projection_view_matrix = self.projection_matrix * *view_matrix;
        self.inverse_projection_view_matrix = self.projection_view_matrix.inverse();
        self.culling_volume = CullingVolume::from_projection_view(&self.projection_view_matrix);
    }
    pub fn contains_point(&self, point: &DVec3) -> bool {
        return self.culling_volume.contains_point(point);
    }
    pub fn contains_sphere(&self, sphere: &BoundingSphere) -> Intersect {
        return self.culling_volume.compute_visibility(sphere);
    }
    pub fn contains_box(&self, bounding_box: &BoundingBox) -> Intersect {
        return self.culling_volume.compute_visibility(bounding_box);
    }
    pub fn is_sphere_visible(&self, sphere: &BoundingSphere) -> bool {
        return self.contains_sphere(sphere) != Intersect::Outside;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picking_color_follows_index() {
        assert_eq!(Frustum::new(0, 47.0, 1.0, 1.0, 100.0).picking_color, [0, 0, 1]);
        assert_eq!(Frustum::new(2, 47.0, 1.0, 1.0, 100.0).picking_color, [0, 0, 3]);
    }
    #[test]
    fn view_matrix_moves_planes() {
        let mut f = Frustum::new(0, 90.0, 1.0, 1.0, 100.0);
        let target = DVec3::new(0.0, 0.0, -50.0);
        assert!(f.contains_point(&target));
        // camera sitting at z = -60 looking down -z sees nothing behind it
        f.set_view_matrix(&DMat4::from_translation(DVec3::new(0.0, 0.0, 60.0)));
        assert!(!f.contains_point(&target));
        let b = BoundingBox::from_bounds(&[-1.0, -1.0, -80.0, 1.0, 1.0, -70.0]);
        assert_eq!(f.contains_box(&b), Intersect::Inside);
        assert!(f.is_sphere_visible(&BoundingSphere::new(DVec3::new(0.0, 0.0, -61.0), 2.0)));
    }
}
