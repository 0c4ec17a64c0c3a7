//! Typed object handles.
//!
//! Handles are plain indices minted by [`Device`](super::Device). They are `Copy`,
//! so sharing a buffer between the transfer and graphics queues is just passing the
//! handle around; the device keeps the backing objects alive for its whole lifetime.

use std::fmt;

/// Common surface of every handle type, for code generic over handles.
pub(crate) trait HandleKind: Copy + Eq + std::hash::Hash {
    const KIND: &'static str;

    fn index(self) -> u32;
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Raw slot index inside the owning device.
            #[inline]
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl HandleKind for $name {
            const KIND: &'static str = $kind;

            fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

handle!(
    /// GPU buffer with a fixed usage and size.
    Buffer, "buffer"
);
handle!(
    /// GPU image.
    Texture, "texture"
);
handle!(
    /// View over a texture, or the swap chain's current drawable.
    TextureView, "texture view"
);
handle!(ShaderModule, "shader module");
handle!(BindSetLayout, "bind set layout");
handle!(
    /// Concrete resources bound against a [`BindSetLayout`].
    BindSet, "bind set"
);
handle!(PipelineLayout, "pipeline layout");
handle!(RenderPipeline, "render pipeline");

/// Kind of work a queue accepts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum QueueType {
    Graphics,
    Transfer,
}

/// A logical execution lane on the device.
///
/// Graphics always exists; a device exposes at most one Transfer queue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Queue {
    pub(crate) kind: QueueType,
}

impl Queue {
    pub(crate) const fn new(kind: QueueType) -> Self {
        Self { kind }
    }

    pub fn kind(self) -> QueueType {
        self.kind
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            QueueType::Graphics => f.write_str("graphics queue"),
            QueueType::Transfer => f.write_str("transfer queue"),
        }
    }
}

/// Position in a queue's execution timeline.
///
/// Serials start at 1 and increase by one per `submit` on the same queue.
/// `SubmitSerial::NONE` means "nothing submitted yet".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct SubmitSerial(pub(crate) u64);

impl SubmitSerial {
    pub const NONE: SubmitSerial = SubmitSerial(0);

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> SubmitSerial {
        SubmitSerial(self.0 + 1)
    }
}

impl fmt::Display for SubmitSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial {}", self.0)
    }
}
