use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix4, Point2, Point3, Quaternion, Rotation, SquareMatrix,
    Vector2, Vector3, Vector4,
};

use crate::config::ViewerConfig;

use super::{coords, pick::Ray, view_point::ViewPoint, BBox};

/// Keeps orbiting away from the poles, where the up vector degenerates.
const POLE_MARGIN: f64 = 1e-3;

/// Snapshot of what the renderer needs each frame, in local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Point3<f64>,
    pub orientation: Quaternion<f64>,
    pub fov: f64,
    pub target_distance: f64,
}

impl CameraState {
    /// World to camera transform.
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::from(self.orientation.conjugate())
            * Matrix4::from_translation(-self.position.to_vec())
    }
}

/// Camera geometry in the external frame, ready to be stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraCapture {
    pub position: [f64; 3],
    pub quaternion: [f64; 4],
    pub fov: f64,
    pub distance_to_target: f64,
}

/// Orbit camera: a position, an orientation and the point it turns around.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraRig {
    position: Point3<f64>,
    orientation: Quaternion<f64>,
    target: Point3<f64>,
    fov: f64,
    aspect: f64,

    default_fov: f64,
    default_distance_to_target: f64,
    initial_distance: f64,
    near: f64,
    far: f64,
    min_distance: f64,
    max_distance: f64,
    zoom_speed: f64,
    pan_speed: f64,
    rotate_speed: f64,
    key_pan_speed: f64,
}

/// Arrow-key pan directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanKey {
    Up,
    Down,
    Left,
    Right,
}

/// JavaScript-style truthiness the stored records were written with: a
/// missing, zero or NaN value means "use the default".
#[inline]
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

impl CameraRig {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            orientation: coords::identity(),
            target: Point3::new(0.0, 0.0, 0.0),
            fov: config.default_fov,
            aspect: 1.0,
            default_fov: config.default_fov,
            default_distance_to_target: config.default_distance_to_target,
            initial_distance: config.initial_distance,
            near: config.near,
            far: config.far,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            rotate_speed: config.rotate_speed,
            key_pan_speed: config.key_pan_speed,
        }
    }

    #[inline]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    #[inline]
    pub fn orientation(&self) -> Quaternion<f64> {
        self.orientation
    }

    #[inline]
    pub fn target(&self) -> Point3<f64> {
        self.target
    }

    /// Vertical field of view in degrees.
    #[inline]
    pub fn fov(&self) -> f64 {
        self.fov
    }

    #[inline]
    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        (self.position - self.target).magnitude()
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation.rotate_vector(coords::FORWARD)
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.position,
            orientation: self.orientation,
            fov: self.fov,
            target_distance: self.distance(),
        }
    }

    /// Loads the camera part of a stored view point. The target is placed
    /// along the view direction at the stored distance. Values are applied
    /// unclamped.
    pub fn apply_view_point(&mut self, vp: &ViewPoint) {
        self.orientation =
            coords::to_local_orientation(coords::quaternion_from_array(vp.quaternion));
        self.position = coords::to_local_position(Point3::from(vp.position));
        self.set_fov(vp.fov);
        let distance =
            present(vp.distance_to_target).unwrap_or(self.default_distance_to_target);
        self.target = self.position + self.forward() * distance;
    }

    /// Frames the whole model from just beyond its far corner.
    pub fn apply_default_view(&mut self, bbox: &BBox) {
        let multiplier = 1.0 + self.initial_distance;
        self.target = bbox.center();
        self.position = bbox.min + bbox.extent() * multiplier;
        self.fov = self.default_fov;
        self.look_at_target();
    }

    /// Sets the field of view in degrees; `None` restores the default.
    pub fn set_fov(&mut self, fov: Option<f64>) {
        self.fov = present(fov).unwrap_or(self.default_fov);
    }

    pub fn set_aspect(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    /// Places the camera at `position` looking at `target`.
    pub fn look_from(&mut self, position: Point3<f64>, target: Point3<f64>) {
        self.position = position;
        self.target = target;
        self.look_at_target();
    }

    fn look_at_target(&mut self) {
        self.orientation = coords::look_rotation(self.target - self.position, &coords::LOCAL);
    }

    /// Camera geometry converted to the external frame.
    pub fn capture(&self) -> CameraCapture {
        CameraCapture {
            position: coords::to_external_position(self.position).into(),
            quaternion: coords::quaternion_to_array(coords::to_external_orientation(
                self.orientation,
            )),
            fov: self.fov,
            distance_to_target: self.distance(),
        }
    }

    /// Turns the camera around the target. Angles in radians: `azimuth`
    /// about the world up axis, `polar` towards it.
    pub fn orbit(&mut self, azimuth: f64, polar: f64) {
        let offset = self.position - self.target;
        let radius = offset.magnitude();
        if radius == 0.0 {
            return;
        }
        let theta = offset.x.atan2(offset.z) - azimuth;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() - polar)
            .clamp(POLE_MARGIN, std::f64::consts::PI - POLE_MARGIN);
        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        self.position = self.target + offset;
        self.look_at_target();
    }

    /// Pointer drag of `(dx, dy)` pixels in a viewport `height` pixels tall.
    pub fn orbit_by_pixels(&mut self, dx: f64, dy: f64, height: f64) {
        if height <= 0.0 {
            return;
        }
        let scale = 2.0 * std::f64::consts::PI / height * self.rotate_speed;
        self.orbit(dx * scale, dy * scale);
    }

    /// Slides camera and target together so the point under the pointer
    /// follows a drag of `(dx, dy)` pixels.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64, height: f64) {
        if height <= 0.0 {
            return;
        }
        let half_fov = (self.fov / 2.0).to_radians();
        let world_per_pixel = 2.0 * self.distance() * half_fov.tan() / height * self.pan_speed;
        let right = self.orientation.rotate_vector(Vector3::new(1.0, 0.0, 0.0));
        let up = self.orientation.rotate_vector(Vector3::new(0.0, 1.0, 0.0));
        let shift = -right * dx * world_per_pixel + up * dy * world_per_pixel;
        self.position += shift;
        self.target += shift;
    }

    pub fn key_pan(&mut self, key: PanKey, height: f64) {
        let step = self.key_pan_speed;
        match key {
            PanKey::Up => self.pan_by_pixels(0.0, step, height),
            PanKey::Down => self.pan_by_pixels(0.0, -step, height),
            PanKey::Left => self.pan_by_pixels(step, 0.0, height),
            PanKey::Right => self.pan_by_pixels(-step, 0.0, height),
        }
    }

    /// One wheel step; positive `delta` moves towards the target. The
    /// resulting distance stays within the configured limits.
    pub fn zoom(&mut self, delta: f64) {
        if delta == 0.0 {
            return;
        }
        let scale = 0.95f64.powf(self.zoom_speed);
        let distance = self.distance();
        let wanted = if delta > 0.0 {
            distance * scale
        } else {
            distance / scale
        };
        let distance = wanted.clamp(self.min_distance, self.max_distance);
        self.position = self.target - self.forward() * distance;
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        self.state().view_matrix()
    }

    /// OpenGL-style projection, depth in -1..1.
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        cgmath::perspective(Deg(self.fov), self.aspect, self.near, self.far)
    }

    /// Ray from the camera through a point in normalized device coordinates.
    pub fn ray(&self, ndc: Vector2<f64>) -> Option<Ray> {
        let inverse = (self.projection_matrix() * self.view_matrix()).invert()?;
        let near = Point3::from_homogeneous(inverse * Vector4::new(ndc.x, ndc.y, -1.0, 1.0));
        let far = Point3::from_homogeneous(inverse * Vector4::new(ndc.x, ndc.y, 1.0, 1.0));
        let direction = far - near;
        if direction.magnitude2() == 0.0 {
            return None;
        }
        Some(Ray {
            origin: self.position,
            direction: direction.normalize(),
        })
    }

    /// Normalized device coordinates of a local point, `None` behind the camera.
    pub fn project(&self, point: Point3<f64>) -> Option<Point2<f64>> {
        let clip = self.projection_matrix() * self.view_matrix() * point.to_homogeneous();
        if clip.w <= 0.0 {
            return None;
        }
        Some(Point2::new(clip.x / clip.w, clip.y / clip.w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rig() -> CameraRig {
        CameraRig::new(&ViewerConfig::default())
    }

    fn view_point() -> ViewPoint {
        ViewPoint {
            position: [1000.0, -500.0, 300.0],
            quaternion: [0.0, 0.0, 0.0, 1.0],
            fov: Some(60.0),
            distance_to_target: Some(2000.0),
            ..Default::default()
        }
    }

    #[test]
    fn apply_then_capture_is_identity() {
        let mut camera = rig();
        let vp = view_point();
        camera.apply_view_point(&vp);
        let captured = camera.capture();
        for i in 0..3 {
            assert_abs_diff_eq!(captured.position[i], vp.position[i], epsilon = 1e-9);
        }
        assert!(coords::same_rotation(
            coords::quaternion_from_array(captured.quaternion),
            coords::quaternion_from_array(vp.quaternion),
            1e-9
        ));
        assert_eq!(captured.fov, 60.0);
        assert_abs_diff_eq!(captured.distance_to_target, 2000.0, epsilon = 1e-6);
    }

    #[test]
    fn state_view_matrix_puts_the_target_straight_ahead() {
        let mut camera = rig();
        camera.apply_view_point(&view_point());
        let state = camera.state();
        assert_eq!(state.position, camera.position());
        assert_eq!(state.fov, 60.0);
        assert_abs_diff_eq!(state.target_distance, 2000.0, epsilon = 1e-6);

        let eye = state.view_matrix() * camera.position().to_homogeneous();
        assert_abs_diff_eq!(eye.truncate().magnitude(), 0.0, epsilon = 1e-9);
        let ahead = state.view_matrix() * camera.target().to_homogeneous();
        assert_abs_diff_eq!(ahead.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ahead.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ahead.z, -2000.0, epsilon = 1e-6);
    }

    #[test]
    fn target_lies_along_the_view_direction() {
        let mut camera = rig();
        camera.apply_view_point(&view_point());
        // identity looks down external -Z, i.e. local -Y
        assert_eq!(camera.position(), Point3::new(1000.0, 300.0, 500.0));
        assert_abs_diff_eq!(camera.target().x, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.target().y, -1700.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.target().z, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_fov_and_distance_use_defaults() {
        let mut camera = rig();
        let vp = ViewPoint {
            fov: None,
            distance_to_target: Some(0.0),
            ..view_point()
        };
        camera.apply_view_point(&vp);
        assert_eq!(camera.fov(), 60.0);
        assert_abs_diff_eq!(camera.distance(), 2000.0, epsilon = 1e-9);

        camera.set_fov(Some(35.0));
        assert_eq!(camera.fov(), 35.0);
        camera.set_fov(None);
        assert_eq!(camera.fov(), 60.0);
    }

    #[test]
    fn out_of_range_fov_is_applied_as_is() {
        let mut camera = rig();
        camera.set_fov(Some(250.0));
        assert_eq!(camera.fov(), 250.0);
    }

    #[test]
    fn default_view_frames_the_box_from_outside() {
        let mut camera = rig();
        camera.set_fov(Some(20.0));
        let bbox = BBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 20.0, 30.0));
        camera.apply_default_view(&bbox);
        assert_abs_diff_eq!(camera.position().x, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.position().y, 24.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.position().z, 36.0, epsilon = 1e-9);
        assert_eq!(camera.target(), Point3::new(5.0, 10.0, 15.0));
        assert_eq!(camera.fov(), 60.0);
        let to_target = (camera.target() - camera.position()).normalize();
        assert_abs_diff_eq!(camera.forward().dot(to_target), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn orbit_keeps_distance_and_target() {
        let mut camera = rig();
        camera.look_from(Point3::new(0.0, 0.0, 500.0), Point3::new(0.0, 0.0, 0.0));
        camera.orbit(std::f64::consts::FRAC_PI_2, 0.0);
        assert_abs_diff_eq!(camera.distance(), 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.position().x, -500.0, epsilon = 1e-9);
        assert_eq!(camera.target(), Point3::new(0.0, 0.0, 0.0));

        // cannot flip over the pole
        camera.orbit(0.0, 10.0);
        assert!(camera.position().y > 0.0);
        assert!(camera.position().y < 500.0);
        assert_abs_diff_eq!(camera.distance(), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn pan_moves_camera_and_target_together() {
        let mut camera = rig();
        camera.look_from(Point3::new(0.0, 0.0, 1000.0), Point3::new(0.0, 0.0, 0.0));
        camera.pan_by_pixels(10.0, 0.0, 500.0);
        assert!(camera.target().x < 0.0);
        assert_abs_diff_eq!(camera.position().x, camera.target().x, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.distance(), 1000.0, epsilon = 1e-9);

        let before = camera.target();
        camera.key_pan(PanKey::Up, 500.0);
        assert!(camera.target().y > before.y);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = rig();
        camera.look_from(Point3::new(0.0, 0.0, 1000.0), Point3::new(0.0, 0.0, 0.0));
        camera.zoom(1.0);
        assert!(camera.distance() < 1000.0);
        for _ in 0..500 {
            camera.zoom(1.0);
        }
        assert_abs_diff_eq!(camera.distance(), 100.0, epsilon = 1e-9);
        for _ in 0..5000 {
            camera.zoom(-1.0);
        }
        assert_abs_diff_eq!(camera.distance(), 100_000.0, epsilon = 1e-6);
    }

    #[test]
    fn projection_and_ray_agree() {
        let mut camera = rig();
        camera.set_aspect(800.0, 600.0);
        camera.look_from(Point3::new(300.0, 400.0, 5000.0), Point3::new(0.0, 0.0, 0.0));
        let ndc = camera.project(Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(ndc.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ndc.y, 0.0, epsilon = 1e-9);

        let ray = camera.ray(Vector2::new(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(ray.direction.dot(camera.forward()), 1.0, epsilon = 1e-9);
        assert!(camera.project(Point3::new(300.0, 400.0, 6000.0)).is_none());
    }
}
