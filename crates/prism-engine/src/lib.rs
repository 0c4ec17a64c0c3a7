//! Prism engine crate.
//!
//! An explicit render hardware interface ([`rhi`]) with a wgpu backend
//! ([`device`]) and a CPU-only headless one, plus the pieces that draw a single
//! camera-viewed triangle through it: resource setup, upload, per-frame encoding
//! and the frame loop.

pub mod camera;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod rhi;
pub mod runtime;
pub mod time;
