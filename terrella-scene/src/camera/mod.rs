mod options;

pub use options::*;

use bevy::{
    ecs::system::Resource,
    math::{DMat4, DVec2, DVec3},
};

use crate::{
    math::{EyePosition, Matrix4},
    BoundingVolume, ConfigError, EventBus, Frustum, Intersect,
};

/// Payload of the `viewchange` notification, sent by every [`Camera::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewChange {
    pub eye: DVec3,
    pub view_matrix: DMat4,
}

/// Payload of the `moveend` notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEnd {
    pub eye: DVec3,
}

#[derive(Debug, Default)]
pub struct CameraEvents {
    pub viewchange: EventBus<ViewChange>,
    pub moveend: EventBus<MoveEnd>,
}

/// Perspective camera with an orthonormal `(u, v, n)` basis (right, up, back)
/// and a cascade of depth-sliced frustums, index 0 being the nearest.
#[derive(Debug, Resource)]
pub struct Camera {
    pub events: CameraEvents,
    eye: DVec3,
    eye_position: EyePosition,
    u: DVec3,
    v: DVec3,
    n: DVec3,
    view_angle: f64,
    aspect: f64,
    width: u32,
    height: u32,
    frustums: Vec<Frustum>,
    current_frustum: usize,
    view_matrix: DMat4,
    inverse_view_matrix: DMat4,
    proj_size_const: f64,
    prev_pose: [DVec3; 4],
    moving: bool,
}
impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraOptions::default())
    }
}
impl Camera {
    /// Builds a camera, falling back to the default options when `options`
    /// do not validate.
    pub fn new(options: &CameraOptions) -> Self {
        match Self::try_new(options) {
            Ok(camera) => camera,
            Err(e) => {
                bevy::log::warn!("invalid camera options ({}), using defaults", e);
                Self::from_options(&CameraOptions::default())
            }
        }
    }
    pub fn try_new(options: &CameraOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self::from_options(options))
    }
    fn from_options(options: &CameraOptions) -> Self {
        let aspect = options.aspect();
        let frustums = options
            .frustums
            .iter()
            .enumerate()
            .map(|(i, [near, far])| Frustum::new(i, options.view_angle, aspect, *near, *far))
            .collect();
        let mut me = Self {
            events: CameraEvents::default(),
            eye: DVec3::ZERO,
            eye_position: EyePosition::default(),
            u: DVec3::X,
            v: DVec3::Y,
            n: DVec3::Z,
            view_angle: options.view_angle,
            aspect,
            width: options.width,
            height: options.height,
            frustums,
            current_frustum: 0,
            view_matrix: DMat4::IDENTITY,
            inverse_view_matrix: DMat4::IDENTITY,
            proj_size_const: 0.0,
            prev_pose: [DVec3::ZERO; 4],
            moving: false,
        };
        me.update_proj_size_const();
        me.set(&options.eye, &options.look, &options.up);
        me.update();
        me.prev_pose = me.pose();
        return me;
    }

    /// Places the eye and rebuilds the basis looking at `look`.
    pub fn set(&mut self, eye: &DVec3, look: &DVec3, up: &DVec3) {
        self.eye = *eye;
        self.look(look, Some(up));
    }
    /// Rebuilds the basis towards `look`, keeping the current up when `up` is
    /// `None`. A look point equal to the eye or an up hint parallel to the view
    /// direction produces a degenerate basis.
    pub fn look(&mut self, look: &DVec3, up: Option<&DVec3>) {
        let up = up.copied().unwrap_or(self.v);
        self.n = (self.eye - *look).normalize();
        self.u = up.cross(self.n).normalize();
        self.v = self.n.cross(self.u);
    }

    /// Recomputes the view matrix, the eye split and every frustum, then fires
    /// `viewchange`.
    pub fn update(&mut self) {
        self.view_matrix = DMat4::compute_view(&self.eye, &self.u, &self.v, &self.n);
        self.inverse_view_matrix = self.view_matrix.inverse();
        self.eye_position = EyePosition::from_world(self.eye);
        for frustum in self.frustums.iter_mut() {
            frustum.set_view_matrix(&self.view_matrix);
        }
        let event = ViewChange {
            eye: self.eye,
            view_matrix: self.view_matrix,
        };
        self.events.viewchange.dispatch(&event);
    }

    /// Compares the pose with the previous call's snapshot and fires
    /// `moveend` on the first stationary frame after movement. Returns whether
    /// it fired.
    pub fn check_move_end(&mut self) -> bool {
        let pose = self.pose();
        let mut fired = false;
        if pose != self.prev_pose {
            self.moving = true;
        } else if self.moving {
            self.moving = false;
            self.events.moveend.dispatch(&MoveEnd { eye: self.eye });
            fired = true;
        }
        self.prev_pose = pose;
        return fired;
    }
    pub fn is_moving(&self) -> bool {
        self.moving
    }
    fn pose(&self) -> [DVec3; 4] {
        [self.eye, self.u, self.v, self.n]
    }

    /// Moves the eye along the basis vectors.
    pub fn slide(&mut self, du: f64, dv: f64, dn: f64) {
        self.eye += self.u * du + self.v * dv + self.n * dn;
    }
    /// Rotates `u` and `v` about the view axis, degrees.
    pub fn roll(&mut self, angle: f64) {
        let (sn, cs) = angle.to_radians().sin_cos();
        let t = self.u;
        self.u = t * cs - self.v * sn;
        self.v = t * sn + self.v * cs;
    }
    /// Rotates `n` and `v` about `u`, degrees.
    pub fn pitch(&mut self, angle: f64) {
        let (sn, cs) = angle.to_radians().sin_cos();
        let t = self.n;
        self.n = t * cs + self.v * sn;
        self.v = self.v * cs - t * sn;
    }
    /// Rotates `u` and `n` about `v`, degrees.
    pub fn yaw(&mut self, angle: f64) {
        let (sn, cs) = angle.to_radians().sin_cos();
        let t = self.u;
        self.u = t * cs - self.n * sn;
        self.n = t * sn + self.n * cs;
    }
    /// Rotates the eye and basis about `center` by `angle` radians. The axis is
    /// the camera's own up vector when `is_arc`, otherwise `up`.
    pub fn rotate_around(&mut self, angle: f64, is_arc: bool, center: &DVec3, up: &DVec3) {
        let axis = if is_arc { self.v } else { *up };
        let rot = DMat4::rotation_around(center, &axis, angle);
        self.eye = rot.transform_point3(self.eye);
        self.u = rot.transform_vector3(self.u).normalize();
        self.v = rot.transform_vector3(self.v).normalize();
        self.n = rot.transform_vector3(self.n).normalize();
    }
    pub fn rotate_horizontal(&mut self, angle: f64, is_arc: bool, center: &DVec3, up: &DVec3) {
        self.rotate_around(angle, is_arc, center, up);
    }
    pub fn rotate_vertical(&mut self, angle: f64, center: &DVec3) {
        let axis = self.u;
        self.rotate_around(angle, false, center, &axis);
    }

    /// Apparent angular size of a sphere of radius `r` at `p`, scaled to
    /// pixels. Used as the level-of-detail metric.
    pub fn projected_size(&self, p: &DVec3, r: f64) -> f64 {
        return (r / self.eye.distance(*p)).atan() * self.proj_size_const;
    }

    /// Pixel coordinates of a world point through the current frustum.
    pub fn project(&self, p: &DVec3) -> DVec2 {
        return self.project_with_depth(p).truncate();
    }
    /// Pixel coordinates plus normalized device depth.
    pub fn project_with_depth(&self, p: &DVec3) -> DVec3 {
        let ndc = self
            .frustum()
            .projection_view_matrix
            .multiply_by_point_homogeneous(p);
        return DVec3::new(
            (ndc.x + 1.0) * 0.5 * self.width as f64,
            (1.0 - ndc.y) * 0.5 * self.height as f64,
            ndc.z,
        );
    }
    /// World point under pixel `(x, y)` at normalized device depth `ndc_z`.
    pub fn unproject_with_depth(&self, x: f64, y: f64, ndc_z: f64) -> DVec3 {
        let ndc = DVec3::new(
            2.0 * x / self.width as f64 - 1.0,
            1.0 - 2.0 * y / self.height as f64,
            ndc_z,
        );
        return self
            .frustum()
            .inverse_projection_view_matrix
            .multiply_by_point_homogeneous(&ndc);
    }
    /// Unit world-space direction of the ray through pixel `(x, y)`.
    pub fn unproject(&self, x: f64, y: f64) -> DVec3 {
        let near = self.unproject_with_depth(x, y, -1.0);
        let far = self.unproject_with_depth(x, y, 0.0);
        return (far - near).normalize();
    }

    /// Visibility over the whole cascade: inside if any slice fully contains
    /// the volume.
    pub fn compute_visibility(&self, bounding_volume: &dyn BoundingVolume) -> Intersect {
        let mut result = Intersect::Outside;
        for frustum in self.frustums.iter() {
            match frustum.culling_volume.compute_visibility(bounding_volume) {
                Intersect::Inside => return Intersect::Inside,
                Intersect::Intersecting => result = Intersect::Intersecting,
                Intersect::Outside => {}
            }
        }
        return result;
    }
    pub fn is_visible(&self, bounding_volume: &dyn BoundingVolume) -> bool {
        return self.compute_visibility(bounding_volume) != Intersect::Outside;
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.set_aspect(width as f64 / height as f64);
    }
    pub fn set_view_angle(&mut self, view_angle: f64) {
        self.view_angle = view_angle;
        self.refresh_projections();
    }
    pub fn set_aspect(&mut self, aspect: f64) {
        self.aspect = aspect;
        self.refresh_projections();
    }
    fn refresh_projections(&mut self) {
        for frustum in self.frustums.iter_mut() {
            let (near, far) = (frustum.near, frustum.far);
            frustum.set_projection_matrix(self.view_angle, self.aspect, near, far);
            frustum.set_view_matrix(&self.view_matrix);
        }
        self.update_proj_size_const();
    }
    fn update_proj_size_const(&mut self) {
        self.proj_size_const =
            self.width.min(self.height) as f64 / self.view_angle.to_radians();
    }

    /// Selects the cascade answering projection queries. Out of range indices
    /// are ignored.
    pub fn set_current_frustum(&mut self, index: usize) {
        if index < self.frustums.len() {
            self.current_frustum = index;
        }
    }
    pub fn current_frustum(&self) -> usize {
        self.current_frustum
    }
    pub fn frustum(&self) -> &Frustum {
        &self.frustums[self.current_frustum]
    }
    pub fn frustums(&self) -> &[Frustum] {
        &self.frustums
    }
    pub fn projection_matrix(&self) -> &DMat4 {
        &self.frustum().projection_matrix
    }
    pub fn projection_view_matrix(&self) -> &DMat4 {
        &self.frustum().projection_view_matrix
    }
    pub fn inverse_projection_view_matrix(&self) -> &DMat4 {
        &self.frustum().inverse_projection_view_matrix
    }
    pub fn view_matrix(&self) -> &DMat4 {
        &self.view_matrix
    }
    pub fn inverse_view_matrix(&self) -> &DMat4 {
        &self.inverse_view_matrix
    }
    pub fn eye_position(&self) -> &EyePosition {
        &self.eye_position
    }
    pub fn get_eye(&self) -> DVec3 {
        self.eye
    }
    pub fn get_forward(&self) -> DVec3 {
        -self.n
    }
    pub fn get_backward(&self) -> DVec3 {
        self.n
    }
    pub fn get_up(&self) -> DVec3 {
        self.v
    }
    pub fn get_right(&self) -> DVec3 {
        self.u
    }
    pub fn view_angle(&self) -> f64 {
        self.view_angle
    }
    pub fn aspect(&self) -> f64 {
        self.aspect
    }
    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    pub fn proj_size_const(&self) -> f64 {
        self.proj_size_const
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{math::Cartesian3, BoundingSphere, EPSILON10, EPSILON6};

    fn camera_at(eye: DVec3) -> Camera {
        let mut camera = Camera::new(&CameraOptions {
            width: 800,
            height: 600,
            eye,
            look: DVec3::ZERO,
            up: DVec3::Y,
            ..Default::default()
        });
        camera.update();
        camera
    }

    #[test]
    fn view_matrix_round_trip() {
        let eye = DVec3::new(7_000_000.0, -1_200_000.0, 3_500_000.0);
        let mut camera = camera_at(DVec3::Z);
        camera.set(&eye, &DVec3::ZERO, &DVec3::Z);
        camera.update();
        let origin = camera.view_matrix().transform_point3(eye);
        assert!(origin.length() < EPSILON6);
        let back = camera.inverse_view_matrix().transform_point3(DVec3::ZERO);
        assert!(back.equals_epsilon(eye, Some(EPSILON10), None));
    }
    #[test]
    fn basis_is_orthonormal() {
        let mut camera = camera_at(DVec3::new(3.0, 4.0, 5.0));
        camera.roll(13.0);
        camera.pitch(-27.0);
        camera.yaw(91.0);
        let (u, v, n) = (camera.get_right(), camera.get_up(), camera.get_backward());
        assert!((u.length() - 1.0).abs() < EPSILON10);
        assert!((v.length() - 1.0).abs() < EPSILON10);
        assert!((n.length() - 1.0).abs() < EPSILON10);
        assert!(u.dot(v).abs() < EPSILON10);
        assert!(u.dot(n).abs() < EPSILON10);
        assert!(u.cross(v).equals_epsilon(n, Some(EPSILON10), Some(EPSILON10)));
    }
    #[test]
    fn move_end_fires_once_after_motion() {
        let mut camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        camera.events.moveend.on(move |_| *c.lock().unwrap() += 1);

        // never moved
        for _ in 0..5 {
            assert!(!camera.check_move_end());
        }
        assert_eq!(*count.lock().unwrap(), 0);

        // continuously moving
        for _ in 0..3 {
            camera.slide(1.0, 0.0, 0.0);
            camera.update();
            assert!(!camera.check_move_end());
        }
        let fired: usize = (0..4).map(|_| camera.check_move_end() as usize).sum();
        assert_eq!(fired, 1);
        assert_eq!(*count.lock().unwrap(), 1);
    }
    #[test]
    fn viewchange_fires_on_every_update() {
        let mut camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        camera.events.viewchange.on(move |e| s.lock().unwrap().push(e.eye));
        camera.update();
        camera.slide(0.0, 0.0, 5.0);
        camera.update();
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![DVec3::new(0.0, 0.0, 10.0), DVec3::new(0.0, 0.0, 15.0)]);
    }
    #[test]
    fn projected_size_is_monotone() {
        let camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        let near = camera.projected_size(&DVec3::new(0.0, 0.0, 0.0), 1.0);
        let far = camera.projected_size(&DVec3::new(0.0, 0.0, -100.0), 1.0);
        let bigger = camera.projected_size(&DVec3::new(0.0, 0.0, 0.0), 2.0);
        assert!(near > far);
        assert!(bigger > near);
        assert_eq!(camera.proj_size_const(), 600.0 / 47f64.to_radians());
    }
    #[test]
    fn project_unproject_round_trip() {
        let camera = camera_at(DVec3::new(0.0, 0.0, 50.0));
        let p = DVec3::new(1.5, -2.0, 20.0);
        let screen = camera.project_with_depth(&p);
        let back = camera.unproject_with_depth(screen.x, screen.y, screen.z);
        assert!(back.equals_epsilon(p, Some(EPSILON6), Some(EPSILON6)));

        let center = camera.project(&DVec3::ZERO);
        assert!((center.x - 400.0).abs() < EPSILON6);
        assert!((center.y - 300.0).abs() < EPSILON6);
        let ray = camera.unproject(400.0, 300.0);
        assert!(ray.equals_epsilon(-DVec3::Z, Some(EPSILON10), Some(EPSILON10)));
    }
    #[test]
    fn rotate_around_orbit_and_free_axis() {
        let mut camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        camera.rotate_around(std::f64::consts::FRAC_PI_2, true, &DVec3::ZERO, &DVec3::X);
        // arc rotation uses the camera's own up (+y)
        assert!(camera
            .get_eye()
            .equals_epsilon(DVec3::new(10.0, 0.0, 0.0), Some(EPSILON10), Some(EPSILON10)));
        assert!(camera
            .get_forward()
            .equals_epsilon(-DVec3::X, Some(EPSILON10), Some(EPSILON10)));

        let mut camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        camera.rotate_around(std::f64::consts::FRAC_PI_2, false, &DVec3::ZERO, &DVec3::X);
        assert!(camera
            .get_eye()
            .equals_epsilon(DVec3::new(0.0, -10.0, 0.0), Some(EPSILON10), Some(EPSILON10)));
    }
    #[test]
    fn cascade_selection_and_visibility() {
        let mut camera = camera_at(DVec3::new(0.0, 0.0, 5000.0));
        assert_eq!(camera.frustums().len(), 4);
        camera.set_current_frustum(2);
        assert_eq!(camera.current_frustum(), 2);
        camera.set_current_frustum(9);
        assert_eq!(camera.current_frustum(), 2);
        assert_eq!(camera.projection_matrix(), &camera.frustums()[2].projection_matrix);

        let ahead = BoundingSphere::new(DVec3::ZERO, 10.0);
        let behind = BoundingSphere::new(DVec3::new(0.0, 0.0, 6000.0), 10.0);
        assert_eq!(camera.compute_visibility(&ahead), Intersect::Inside);
        assert!(!camera.is_visible(&behind));
    }
    #[test]
    fn viewport_rebuilds_projection() {
        let mut camera = camera_at(DVec3::new(0.0, 0.0, 10.0));
        let before = *camera.projection_matrix();
        camera.set_viewport_size(1000, 500);
        assert_eq!(camera.aspect(), 2.0);
        assert_ne!(*camera.projection_matrix(), before);
        assert_eq!(camera.proj_size_const(), 500.0 / 47f64.to_radians());
    }

    #[test]
    fn invalid_options_are_rejected_or_replaced() {
        let options = CameraOptions {
            frustums: vec![],
            ..Default::default()
        };
        assert!(matches!(Camera::try_new(&options), Err(ConfigError::NoFrustums)));
        let camera = Camera::new(&options);
        assert_eq!(camera.frustums().len(), DEFAULT_FRUSTUMS.len());
        let pixel = camera.project(&DVec3::ZERO);
        assert!(pixel.x.is_finite() && pixel.y.is_finite());
    }
}
