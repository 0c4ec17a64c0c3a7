//! Declarative descriptors consumed by [`Device`](super::Device).

use super::handle::{BindSetLayout, Buffer, PipelineLayout, Queue, ShaderModule, TextureView};

// ── buffers ───────────────────────────────────────────────────────────────

/// Fixed usage of a buffer. Chosen at creation, never changes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    /// Size in bytes. Must be non-zero.
    pub size: u64,
}

// ── textures ──────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    Bgra8UnormSrgb,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba8Unorm,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24PlusStencil8)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8)
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Bgra8UnormSrgb | Self::Rgba8UnormSrgb)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureDimension {
    D2,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureUsage {
    RenderAttachment,
}

#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub dimension: TextureDimension,
    pub usage: TextureUsage,
}

// ── shaders ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Opaque shader bytecode for one stage.
#[derive(Debug, Clone)]
pub struct ShaderModuleDesc<'a> {
    pub label: &'a str,
    pub stage: ShaderStage,
    pub entry: &'a str,
    pub code: &'a [u8],
}

// ── binding ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingType {
    UniformBuffer,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindSetLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStage,
    pub ty: BindingType,
}

impl BindSetLayoutEntry {
    pub const fn uniform_buffer(visibility: ShaderStage, binding: u32) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::UniformBuffer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindSetLayoutDesc<'a> {
    pub label: &'a str,
    pub entries: &'a [BindSetLayoutEntry],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindSetResource {
    /// Whole-buffer binding.
    Buffer(Buffer),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindSetEntry {
    pub binding: u32,
    pub resource: BindSetResource,
}

impl BindSetEntry {
    pub const fn buffer(buffer: Buffer, binding: u32) -> Self {
        Self {
            binding,
            resource: BindSetResource::Buffer(buffer),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindSetDesc<'a> {
    pub label: &'a str,
    pub layout: BindSetLayout,
    pub entries: &'a [BindSetEntry],
}

#[derive(Debug, Clone)]
pub struct PipelineLayoutDesc<'a> {
    pub label: &'a str,
    pub bind_set_layouts: &'a [BindSetLayout],
}

// ── vertex input ──────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub const fn size(self) -> u64 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    /// Byte offset inside one vertex record.
    pub offset: u64,
    pub format: VertexFormat,
}

#[derive(Debug, Clone)]
pub struct VertexBufferLayout<'a> {
    pub stride: u64,
    pub attributes: &'a [VertexAttribute],
}

// ── fixed-function state ──────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompareFunction {
    Never,
    Less,
    LessEqual,
    Equal,
    Greater,
    GreaterEqual,
    Always,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RasterState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
}

/// Everything about a pipeline that is not a shader, a layout or a format.
///
/// Built once as a value so a pipeline's behavior can be inspected without a device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FixedFunctionState {
    pub raster: RasterState,
    pub depth_stencil: DepthStencilState,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            raster: RasterState {
                cull_mode: CullMode::Back,
                front_face: FrontFace::CounterClockwise,
                topology: PrimitiveTopology::TriangleList,
            },
            depth_stencil: DepthStencilState {
                depth_test: false,
                depth_write: false,
                depth_compare: CompareFunction::Always,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipelineDesc<'a> {
    pub label: &'a str,
    pub layout: PipelineLayout,
    pub vertex: ShaderModule,
    pub fragment: ShaderModule,
    pub vertex_buffers: &'a [VertexBufferLayout<'a>],
    pub color_formats: &'a [TextureFormat],
    pub depth_stencil_format: Option<TextureFormat>,
    pub state: FixedFunctionState,
}

// ── render passes ─────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LoadOp<T> {
    Clear(T),
    Load,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorAttachment {
    pub view: TextureView,
    pub load: LoadOp<[f64; 4]>,
    pub store: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub view: TextureView,
    pub depth_load: LoadOp<f32>,
    /// Ignored for depth-only formats.
    pub stencil_load: LoadOp<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub label: String,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil: Option<DepthStencilAttachment>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size(self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

// ── queues & surface ──────────────────────────────────────────────────────

/// Ownership hand-off attached to a submission.
///
/// Names the queue that will consume `buffers` once the submission retires.
#[derive(Debug, Clone)]
pub struct ResourceTransfer<'a> {
    pub receiving_queue: Queue,
    pub buffers: &'a [Buffer],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentMode {
    Fifo,
    Mailbox,
    Immediate,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
}
