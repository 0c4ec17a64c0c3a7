use glam::{Mat4, Quat, Vec3};

/// Pitch limit, 89° in radians.
pub const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// First-person camera.
///
/// `velocity` is expressed in camera-local space (-Z forward, +X right) and
/// integrated into `position` by [`update`](Self::update).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Vertical rotation about +X, radians, kept within ±[`MAX_PITCH`].
    pitch: f32,
    /// Horizontal rotation about world down (-Y), radians, unbounded.
    yaw: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Adds to yaw and pitch, clamping pitch.
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Yaw rotation composed with pitch rotation (yaw applied last).
    pub fn rotation_matrix(&self) -> Mat4 {
        let yaw = Quat::from_axis_angle(Vec3::NEG_Y, self.yaw);
        let pitch = Quat::from_axis_angle(Vec3::X, self.pitch);
        Mat4::from_quat(yaw) * Mat4::from_quat(pitch)
    }

    /// Moves the camera by its rotated velocity over `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let step = self.rotation_matrix().transform_vector3(self.velocity * dt);
        self.position += step;
    }

    pub fn view_matrix(&self) -> Mat4 {
        (Mat4::from_translation(self.position) * self.rotation_matrix()).inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn still_camera_stays_put() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        camera.rotate(1.3, -0.4);
        camera.update(0.5);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn forward_half_second() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        camera.velocity.z = -1.0;
        camera.update(0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, 2.5), EPS));
    }

    #[test]
    fn movement_follows_yaw() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.rotate(std::f32::consts::FRAC_PI_2, 0.0);
        camera.velocity.z = -1.0;
        camera.update(1.0);
        // Quarter turn about -Y takes local forward (-Z) to +X.
        assert!(camera.position.abs_diff_eq(Vec3::X, EPS));
    }

    #[test]
    fn movement_length_is_speed_times_dt() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.rotate(0.7, 0.3);
        camera.velocity = Vec3::new(1.0, 0.0, -1.0);
        camera.update(0.25);
        let expected = Vec3::new(1.0, 0.0, -1.0).length() * 0.25;
        assert!((camera.position.length() - expected).abs() < EPS);
    }

    #[test]
    fn pitch_never_leaves_limit() {
        let mut camera = Camera::new(Vec3::ZERO);
        for _ in 0..100 {
            camera.rotate(0.0, 0.5);
        }
        assert_eq!(camera.pitch(), MAX_PITCH);
        for _ in 0..200 {
            camera.rotate(0.1, -0.5);
        }
        assert_eq!(camera.pitch(), -MAX_PITCH);
        assert!((camera.yaw() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn view_inverts_camera_transform() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
        camera.rotate(0.4, 0.2);
        let world = Mat4::from_translation(camera.position) * camera.rotation_matrix();
        assert!((camera.view_matrix() * world).abs_diff_eq(Mat4::IDENTITY, EPS));
        assert!(camera
            .view_matrix()
            .transform_point3(camera.position)
            .abs_diff_eq(Vec3::ZERO, EPS));
    }
}
