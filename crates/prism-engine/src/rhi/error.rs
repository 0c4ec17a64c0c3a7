use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the RHI.
///
/// Everything here is a startup or device-level failure. Caller bugs (writing past
/// the end of a buffer, drawing with nothing bound, ...) are not represented; they
/// panic with a `precondition violated:` message instead.
#[derive(Error, Debug)]
pub enum RhiError {
    /// The windowing subsystem could not be brought up.
    #[error("failed to initialize windowing environment: {0}")]
    EnvironmentInit(String),

    /// No adapter, or the adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    /// The presentation surface could not be created or configured.
    #[error("failed to create presentation surface: {0}")]
    SurfaceCreation(String),

    /// A buffer, texture, shader, bind set or pipeline could not be built.
    #[error("failed to create {kind} '{label}': {reason}")]
    ResourceCreation {
        kind: &'static str,
        label: String,
        reason: String,
    },

    /// A shader bytecode file is missing, unreadable or empty.
    #[error("failed to load shader '{}': {reason}", path.display())]
    ShaderLoad { path: PathBuf, reason: String },

    /// A per-frame operation failed in a way the frame loop cannot recover from.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// A backend was handed a handle it never created.
    #[error("invalid {kind} handle #{index}")]
    InvalidHandle { kind: &'static str, index: u32 },
}

impl RhiError {
    pub(crate) fn resource(kind: &'static str, label: &str, reason: impl Into<String>) -> Self {
        Self::ResourceCreation {
            kind,
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

/// Fails fast on a caller bug.
macro_rules! precondition {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            panic!("precondition violated: {}", format_args!($($arg)+));
        }
    };
}

pub(crate) use precondition;
