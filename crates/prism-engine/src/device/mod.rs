//! wgpu backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - turning RHI handles, descriptors and command lists into wgpu objects and calls

mod convert;
mod error;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use gpu::WgpuBackend;
pub use init::GpuInit;
