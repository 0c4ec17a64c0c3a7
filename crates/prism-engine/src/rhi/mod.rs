//! Render hardware interface.
//!
//! An explicit GPU API: typed handles, immutable pipelines, command lists recorded
//! on the CPU and submitted to queues, and per-queue submission serials for
//! cross-queue ordering. [`Device`] is the front door; a [`Backend`] does the
//! native work underneath it.

mod backend;
mod command;
mod desc;
mod device;
mod error;
mod handle;
mod headless;

pub use backend::Backend;
pub use command::{Command, CommandEncoder, CommandList, RenderPassEncoder};
pub use desc::*;
pub use device::{Device, DeviceDesc};
pub use error::{RhiError, RhiResult};
pub use handle::{
    BindSet, BindSetLayout, Buffer, PipelineLayout, Queue, QueueType, RenderPipeline,
    ShaderModule, SubmitSerial, Texture, TextureView,
};
pub use headless::{HeadlessBackend, HeadlessConfig, QueueOp, UNINITIALIZED_BYTE};

pub(crate) use error::precondition;
pub(crate) use handle::HandleKind;
