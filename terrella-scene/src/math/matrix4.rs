use bevy::math::{DMat4, DVec3, DVec4};

pub trait Matrix4 {
    /// View matrix whose rows are the camera basis (right, up, back) and whose
    /// translation moves `eye` to the origin.
    fn compute_view(eye: &DVec3, u: &DVec3, v: &DVec3, n: &DVec3) -> DMat4;
    /// OpenGL-style off-center perspective, clip z in [-1, 1].
    fn compute_perspective_off_center(
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    ) -> DMat4;
    fn compute_perspective_field_of_view(fovy: f64, aspect_ratio: f64, near: f64, far: f64)
        -> DMat4;
    fn rotation_around(center: &DVec3, axis: &DVec3, angle: f64) -> DMat4;
    fn multiply_by_point_homogeneous(&self, cartesian: &DVec3) -> DVec3;
}
impl Matrix4 for DMat4 {
    fn compute_view(eye: &DVec3, u: &DVec3, v: &DVec3, n: &DVec3) -> DMat4 {
        return DMat4::from_cols(
            DVec4::new(u.x, v.x, n.x, 0.0),
            DVec4::new(u.y, v.y, n.y, 0.0),
            DVec4::new(u.z, v.z, n.z, 0.0),
            DVec4::new(-eye.dot(*u), -eye.dot(*v), -eye.dot(*n), 1.0),
        );
    }
    fn compute_perspective_off_center(
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    ) -> DMat4 {
        let column0_row0 = 2.0 * near / (right - left);
        let column1_row1 = 2.0 * near / (top - bottom);
        let column2_row0 = (right + left) / (right - left);
        let column2_row1 = (top + bottom) / (top - bottom);
        let column2_row2 = -(far + near) / (far - near);
        let column3_row2 = -2.0 * far * near / (far - near);
        return DMat4::from_cols(
            DVec4::new(column0_row0, 0.0, 0.0, 0.0),
            DVec4::new(0.0, column1_row1, 0.0, 0.0),
            DVec4::new(column2_row0, column2_row1, column2_row2, -1.0),
            DVec4::new(0.0, 0.0, column3_row2, 0.0),
        );
    }
    fn compute_perspective_field_of_view(
        fovy: f64,
        aspect_ratio: f64,
        near: f64,
        far: f64,
    ) -> DMat4 {
        let top = near * (fovy * 0.5).tan();
        let right = top * aspect_ratio;
        return DMat4::compute_perspective_off_center(-right, right, -top, top, near, far);
    }
    fn rotation_around(center: &DVec3, axis: &DVec3, angle: f64) -> DMat4 {
        return DMat4::from_translation(*center)
            * DMat4::from_axis_angle(axis.normalize(), angle)
            * DMat4::from_translation(-*center);
    }
    fn multiply_by_point_homogeneous(&self, cartesian: &DVec3) -> DVec3 {
        let r = *self * cartesian.extend(1.0);
        return DVec3::new(r.x / r.w, r.y / r.w, r.z / r.w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Cartesian3, EPSILON10, EPSILON14};

    #[test]
    fn perspective_maps_near_and_far_to_clip_bounds() {
        let m = DMat4::compute_perspective_field_of_view(
            std::f64::consts::FRAC_PI_2,
            1.0,
            1.0,
            10.0,
        );
        let near = m.multiply_by_point_homogeneous(&DVec3::new(0.0, 0.0, -1.0));
        let far = m.multiply_by_point_homogeneous(&DVec3::new(0.0, 0.0, -10.0));
        assert!((near.z + 1.0).abs() < EPSILON10);
        assert!((far.z - 1.0).abs() < EPSILON10);
        let corner = m.multiply_by_point_homogeneous(&DVec3::new(1.0, 1.0, -1.0));
        assert!((corner.x - 1.0).abs() < EPSILON10);
        assert!((corner.y - 1.0).abs() < EPSILON10);
    }
    #[test]
    fn view_moves_eye_to_origin() {
        let eye = DVec3::new(10.0, -3.0, 7.0);
        let view = DMat4::compute_view(&eye, &DVec3::X, &DVec3::Y, &DVec3::Z);
        let p = view.transform_point3(eye);
        assert!(p.equals_epsilon(DVec3::ZERO, Some(EPSILON14), None));
    }
    #[test]
    fn rotation_around_keeps_center_fixed() {
        let center = DVec3::new(1.0, 2.0, 3.0);
        let m = DMat4::rotation_around(&center, &DVec3::Z, 1.0);
        assert!(m
            .transform_point3(center)
            .equals_epsilon(center, Some(EPSILON14), Some(EPSILON14)));
    }
}
