use super::command::CommandList;
use super::desc::{
    BindSetDesc, BindSetLayoutDesc, BufferDesc, PipelineLayoutDesc, RenderPipelineDesc,
    ResourceTransfer, ShaderModuleDesc, SurfaceConfig, TextureDesc, TextureFormat,
};
use super::error::RhiResult;
use super::handle::{
    BindSet, BindSetLayout, Buffer, PipelineLayout, Queue, RenderPipeline, ShaderModule,
    SubmitSerial, Texture, TextureView,
};

/// Driver underneath a [`Device`](super::Device).
///
/// The device mints handles, validates descriptors and enforces ordering rules;
/// a backend only builds and drives the native objects. Every call receives
/// already-validated input, so backends report native failures but never
/// re-check caller preconditions.
pub trait Backend {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Whether the hardware exposes a queue dedicated to transfers.
    fn has_transfer_queue(&self) -> bool;

    fn create_buffer(&mut self, handle: Buffer, desc: &BufferDesc<'_>) -> RhiResult<()>;

    fn create_texture(&mut self, handle: Texture, desc: &TextureDesc<'_>) -> RhiResult<()>;

    fn create_texture_view(&mut self, handle: TextureView, texture: Texture) -> RhiResult<()>;

    fn create_shader(&mut self, handle: ShaderModule, desc: &ShaderModuleDesc<'_>)
    -> RhiResult<()>;

    fn create_bind_set_layout(
        &mut self,
        handle: BindSetLayout,
        desc: &BindSetLayoutDesc<'_>,
    ) -> RhiResult<()>;

    fn create_bind_set(&mut self, handle: BindSet, desc: &BindSetDesc<'_>) -> RhiResult<()>;

    fn create_pipeline_layout(
        &mut self,
        handle: PipelineLayout,
        desc: &PipelineLayoutDesc<'_>,
    ) -> RhiResult<()>;

    fn create_render_pipeline(
        &mut self,
        handle: RenderPipeline,
        desc: &RenderPipelineDesc<'_>,
    ) -> RhiResult<()>;

    /// Configures the swap chain; `view` is the handle that will name the current
    /// drawable after each acquire. Returns the chosen swap-chain format.
    fn configure_surface(
        &mut self,
        view: TextureView,
        config: &SurfaceConfig,
    ) -> RhiResult<TextureFormat>;

    /// Enqueues a write of `data` into `buffer` at `offset` on `queue`.
    fn write_buffer(&mut self, queue: Queue, buffer: Buffer, offset: u64, data: &[u8]);

    /// Enqueues `lists` (and any ownership transfers) on `queue` under `serial`.
    fn submit(
        &mut self,
        queue: Queue,
        serial: SubmitSerial,
        lists: &[CommandList],
        transfers: &[ResourceTransfer<'_>],
    ) -> RhiResult<()>;

    /// Makes `queue` wait until `producer` has retired `serial`.
    fn wait_for(&mut self, queue: Queue, producer: Queue, serial: SubmitSerial);

    /// Blocks until the next drawable is available.
    fn acquire_next_texture(&mut self) -> RhiResult<()>;

    fn present(&mut self) -> RhiResult<()>;

    /// Per-frame housekeeping (completion callbacks, resource recycling).
    fn tick(&mut self);
}
