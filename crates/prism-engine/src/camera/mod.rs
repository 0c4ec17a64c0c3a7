//! First-person camera state and its input controller.

mod controller;
mod state;

pub use controller::{CameraConfig, CameraController};
pub use state::{Camera, MAX_PITCH};
