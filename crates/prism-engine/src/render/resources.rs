use std::path::Path;

use crate::rhi::{
    Backend, BindSet, BindSetDesc, BindSetEntry, BindSetLayoutDesc, BindSetLayoutEntry, Buffer,
    BufferDesc, BufferUsage, CompareFunction, CullMode, DepthStencilState, Device,
    FixedFunctionState, FrontFace, PipelineLayoutDesc, PrimitiveTopology, RasterState,
    RenderPipeline, RenderPipelineDesc, RhiError, RhiResult, ShaderModuleDesc, ShaderStage,
    TextureDesc, TextureDimension, TextureFormat, TextureUsage, TextureView,
};

use super::scene::{ShaderData, Vertex, TRIANGLE_INDICES, TRIANGLE_VERTICES};

/// Fixed-function state of the triangle pipeline.
///
/// Reverse-Z depth: the attachment clears to 0 and nearer fragments win with `Greater`.
pub const PIPELINE_STATE: FixedFunctionState = FixedFunctionState {
    raster: RasterState {
        cull_mode: CullMode::None,
        front_face: FrontFace::CounterClockwise,
        topology: PrimitiveTopology::TriangleList,
    },
    depth_stencil: DepthStencilState {
        depth_test: true,
        depth_write: true,
        depth_compare: CompareFunction::Greater,
    },
};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Entry point of both shader stages.
pub const SHADER_ENTRY: &str = "main";

/// Shader bytecode for the two stages, opaque to everything but the backend.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl ShaderCode {
    /// Reads both stages from disk.
    pub fn load(vertex: &Path, fragment: &Path) -> RhiResult<Self> {
        Ok(Self {
            vertex: load_shader(vertex)?,
            fragment: load_shader(fragment)?,
        })
    }
}

/// Reads a whole shader file. A missing or empty file is an error.
pub fn load_shader(path: &Path) -> RhiResult<Vec<u8>> {
    let code = std::fs::read(path).map_err(|e| RhiError::ShaderLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if code.is_empty() {
        return Err(RhiError::ShaderLoad {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        });
    }

    log::debug!("loaded shader {} ({} bytes)", path.display(), code.len());
    Ok(code)
}

/// Every GPU object the frame path touches, created once before the first frame.
#[derive(Debug, Clone)]
pub struct FrameResources {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub uniform_buffer: Buffer,
    pub depth_view: TextureView,
    pub bind_set: BindSet,
    pub pipeline: RenderPipeline,
    pub index_count: u32,
}

impl FrameResources {
    /// Creates buffers, depth target, shaders, bindings and the pipeline.
    ///
    /// The surface must already be configured: its size sizes the depth target and
    /// its format is the pipeline's color target.
    pub fn create<B: Backend>(device: &mut Device<B>, shaders: &ShaderCode) -> RhiResult<Self> {
        let index_buffer = device.create_buffer(&BufferDesc {
            label: "Index",
            usage: BufferUsage::Index,
            size: std::mem::size_of_val(&TRIANGLE_INDICES) as u64,
        })?;
        let vertex_buffer = device.create_buffer(&BufferDesc {
            label: "Vertex",
            usage: BufferUsage::Vertex,
            size: std::mem::size_of_val(&TRIANGLE_VERTICES) as u64,
        })?;
        let uniform_buffer = device.create_buffer(&BufferDesc {
            label: "Uniform",
            usage: BufferUsage::Uniform,
            size: ShaderData::SIZE,
        })?;

        let (width, height) = device.surface_size();
        let depth_texture = device.create_texture(&TextureDesc {
            label: "DepthStencil",
            format: DEPTH_FORMAT,
            width,
            height,
            dimension: TextureDimension::D2,
            usage: TextureUsage::RenderAttachment,
        })?;
        let depth_view = device.create_texture_view(depth_texture)?;

        let vertex_shader = device.create_shader(&ShaderModuleDesc {
            label: "triangle.vert",
            stage: ShaderStage::Vertex,
            entry: SHADER_ENTRY,
            code: &shaders.vertex,
        })?;
        let fragment_shader = device.create_shader(&ShaderModuleDesc {
            label: "triangle.frag",
            stage: ShaderStage::Fragment,
            entry: SHADER_ENTRY,
            code: &shaders.fragment,
        })?;

        let bind_set_layout = device.create_bind_set_layout(&BindSetLayoutDesc {
            label: "ShaderData layout",
            entries: &[BindSetLayoutEntry::uniform_buffer(ShaderStage::Vertex, 0)],
        })?;
        let bind_set = device.create_bind_set(&BindSetDesc {
            label: "ShaderData",
            layout: bind_set_layout,
            entries: &[BindSetEntry::buffer(uniform_buffer, 0)],
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDesc {
            label: "triangle layout",
            bind_set_layouts: &[bind_set_layout],
        })?;

        let color_format = device.swap_chain_format();
        let pipeline = device.create_render_pipeline(&RenderPipelineDesc {
            label: "triangle",
            layout: pipeline_layout,
            vertex: vertex_shader,
            fragment: fragment_shader,
            vertex_buffers: &[Vertex::layout()],
            color_formats: &[color_format],
            depth_stencil_format: Some(DEPTH_FORMAT),
            state: PIPELINE_STATE,
        })?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            depth_view,
            bind_set,
            pipeline,
            index_count: TRIANGLE_INDICES.len() as u32,
        })
    }
}
