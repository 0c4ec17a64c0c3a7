use glam::Vec3;

use super::Camera;
use crate::input::{InputEvent, Key, KeyState};

/// Camera/controller configuration.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Starting position.
    pub position: Vec3,
    /// Radians of yaw/pitch per pixel of cursor travel.
    pub sensitivity: f32,
    /// Cursor position deltas are measured from before the first move event.
    /// `None` means the centre of the window.
    pub initial_cursor: Option<(f64, f64)>,
    /// Step applied once by [`CameraConfig::camera`] before the first frame.
    pub warmup_dt: f32,
}

impl CameraConfig {
    /// Builds the starting camera: at `position`, at rest, advanced by `warmup_dt`.
    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new(self.position);
        camera.update(self.warmup_dt);
        camera
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            sensitivity: 0.005,
            initial_cursor: None,
            warmup_dt: 0.5,
        }
    }
}

/// Turns input events into camera velocity and orientation changes.
///
/// W/S drive local Z (-1 forward, +1 back), A/D drive local X. Releasing a key
/// zeroes its axis. Cursor motion turns the camera: horizontal travel adds to yaw,
/// vertical travel (screen-down positive) adds to pitch.
#[derive(Debug, Clone)]
pub struct CameraController {
    sensitivity: f32,
    last_cursor: (f64, f64),
}

impl CameraController {
    /// `window_size` is used to place the initial cursor at the window centre when
    /// the config does not name one.
    pub fn new(config: &CameraConfig, window_size: (u32, u32)) -> Self {
        let centre = (
            f64::from(window_size.0) / 2.0,
            f64::from(window_size.1) / 2.0,
        );
        Self {
            sensitivity: config.sensitivity,
            last_cursor: config.initial_cursor.unwrap_or(centre),
        }
    }

    pub fn last_cursor(&self) -> (f64, f64) {
        self.last_cursor
    }

    pub fn handle_event(&mut self, camera: &mut Camera, event: &InputEvent) {
        match event {
            InputEvent::Key { key, state, .. } => self.handle_key(camera, *key, *state),
            InputEvent::CursorMoved { x, y } => self.handle_cursor(camera, *x, *y),
            InputEvent::Focused(false) => camera.velocity = Vec3::ZERO,
            InputEvent::Focused(true) => {}
        }
    }

    fn handle_key(&mut self, camera: &mut Camera, key: Key, state: KeyState) {
        let pressed = state == KeyState::Pressed;
        match key {
            Key::W => camera.velocity.z = if pressed { -1.0 } else { 0.0 },
            Key::S => camera.velocity.z = if pressed { 1.0 } else { 0.0 },
            Key::A => camera.velocity.x = if pressed { -1.0 } else { 0.0 },
            Key::D => camera.velocity.x = if pressed { 1.0 } else { 0.0 },
            _ => {}
        }
    }

    fn handle_cursor(&mut self, camera: &mut Camera, x: f64, y: f64) {
        let dx = (x - self.last_cursor.0) as f32;
        let dy = (y - self.last_cursor.1) as f32;
        self.last_cursor = (x, y);

        camera.rotate(dx * self.sensitivity, dy * self.sensitivity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MAX_PITCH;

    fn setup() -> (Camera, CameraController) {
        let config = CameraConfig::default();
        (
            config.camera(),
            CameraController::new(&config, (1024, 768)),
        )
    }

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            repeat: false,
        }
    }

    #[test]
    fn warmup_leaves_a_resting_camera_in_place() {
        let camera = CameraConfig::default().camera();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(camera.velocity, Vec3::ZERO);
    }

    #[test]
    fn wasd_sets_unit_velocity() {
        let (mut camera, mut ctl) = setup();
        ctl.handle_event(&mut camera, &key(Key::W, KeyState::Pressed));
        ctl.handle_event(&mut camera, &key(Key::D, KeyState::Pressed));
        assert_eq!(camera.velocity, Vec3::new(1.0, 0.0, -1.0));

        ctl.handle_event(&mut camera, &key(Key::W, KeyState::Released));
        assert_eq!(camera.velocity, Vec3::new(1.0, 0.0, 0.0));

        ctl.handle_event(&mut camera, &key(Key::S, KeyState::Pressed));
        ctl.handle_event(&mut camera, &key(Key::A, KeyState::Pressed));
        assert_eq!(camera.velocity, Vec3::new(-1.0, 0.0, 1.0));
    }

    #[test]
    fn other_keys_do_nothing() {
        let (mut camera, mut ctl) = setup();
        ctl.handle_event(&mut camera, &key(Key::Space, KeyState::Pressed));
        assert_eq!(camera.velocity, Vec3::ZERO);
    }

    #[test]
    fn cursor_delta_is_measured_from_window_centre() {
        let (mut camera, mut ctl) = setup();
        assert_eq!(ctl.last_cursor(), (512.0, 384.0));

        ctl.handle_event(&mut camera, &InputEvent::CursorMoved { x: 612.0, y: 364.0 });
        assert!((camera.yaw() - 0.5).abs() < 1e-6);
        assert!((camera.pitch() + 0.1).abs() < 1e-6);

        ctl.handle_event(&mut camera, &InputEvent::CursorMoved { x: 612.0, y: 364.0 });
        assert!((camera.yaw() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn large_cursor_sweeps_clamp_pitch() {
        let (mut camera, mut ctl) = setup();
        for y in [10_000.0, -50_000.0, 3.0, 90_000.0] {
            ctl.handle_event(&mut camera, &InputEvent::CursorMoved { x: 0.0, y });
            assert!(camera.pitch().abs() <= MAX_PITCH);
        }
        assert_eq!(camera.pitch(), MAX_PITCH);
    }

    #[test]
    fn focus_loss_stops_the_camera() {
        let (mut camera, mut ctl) = setup();
        ctl.handle_event(&mut camera, &key(Key::W, KeyState::Pressed));
        ctl.handle_event(&mut camera, &InputEvent::Focused(false));
        assert_eq!(camera.velocity, Vec3::ZERO);
    }
}
