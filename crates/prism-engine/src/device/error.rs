/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; acquiring again may succeed.
    Reconfigured,
    /// Transient error; try acquiring again.
    Retry,
    /// Fatal error (commonly OOM); the device is unusable.
    Fatal,
}
