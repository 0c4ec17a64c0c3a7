//! Frame timing.
//!
//! One `FrameClock` per frame loop; call `tick()` once per iteration to obtain the
//! `dt` fed to the camera.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime, TimeStep};
