//! Triangle rendering: scene data, resource setup, upload and per-frame encoding.

mod encoder;
mod renderer;
mod resources;
mod scene;
mod upload;

pub use encoder::FrameEncoder;
pub use renderer::{Renderer, RendererConfig, UniformUpdate};
pub use resources::{
    load_shader, FrameResources, ShaderCode, DEPTH_FORMAT, PIPELINE_STATE, SHADER_ENTRY,
};
pub use scene::{projection, ShaderData, Vertex, TRIANGLE_INDICES, TRIANGLE_VERTICES};
pub use upload::{BufferWrite, UploadPath};
