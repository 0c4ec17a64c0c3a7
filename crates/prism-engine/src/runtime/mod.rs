//! Frame loop and the window it runs against.

mod driver;
mod window;

pub use driver::{FrameLoop, FramePlatform, LoopConfig, LoopState};
pub use window::{WindowConfig, WinitPlatform};
