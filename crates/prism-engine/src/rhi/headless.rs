//! In-memory backend.
//!
//! Builds nothing on a GPU. It keeps buffer contents in host memory and appends
//! every queue-level operation to a journal, which is what tests assert against.

use std::collections::{HashMap, HashSet};

use super::backend::Backend;
use super::command::CommandList;
use super::desc::{
    BindSetDesc, BindSetLayoutDesc, BufferDesc, PipelineLayoutDesc, RenderPipelineDesc,
    ResourceTransfer, ShaderModuleDesc, SurfaceConfig, TextureDesc, TextureFormat,
};
use super::error::{RhiError, RhiResult};
use super::handle::{
    BindSet, BindSetLayout, Buffer, HandleKind, PipelineLayout, Queue, QueueType,
    RenderPipeline, ShaderModule, SubmitSerial, Texture, TextureView,
};

/// Byte pattern fresh buffers are filled with, so unwritten ranges are recognizable.
pub const UNINITIALIZED_BYTE: u8 = 0xCD;

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Expose a dedicated transfer queue.
    pub transfer_queue: bool,
    /// Format reported for the swap chain.
    pub swapchain_format: TextureFormat,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            transfer_queue: false,
            swapchain_format: TextureFormat::Bgra8UnormSrgb,
        }
    }
}

/// One queue-level operation, as observed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueOp {
    WriteBuffer {
        queue: QueueType,
        buffer: Buffer,
        offset: u64,
        len: usize,
    },
    Submit {
        queue: QueueType,
        serial: SubmitSerial,
        /// Ids of the submitted command lists.
        lists: Vec<u64>,
        render_passes: usize,
        /// Index count of every draw, across all lists.
        draws: Vec<u32>,
        transfers: Vec<(QueueType, Vec<Buffer>)>,
    },
    WaitFor {
        queue: QueueType,
        producer: QueueType,
        serial: SubmitSerial,
    },
    Acquire {
        frame: u64,
    },
    Present {
        frame: u64,
    },
    Tick,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    config: HeadlessConfig,
    buffers: HashMap<Buffer, Vec<u8>>,
    textures: HashSet<Texture>,
    journal: Vec<QueueOp>,
    acquired_frames: u64,
    pending_failure: Option<String>,
}

impl HeadlessBackend {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_transfer_queue() -> Self {
        Self::new(HeadlessConfig {
            transfer_queue: true,
            ..Default::default()
        })
    }

    pub fn journal(&self) -> &[QueueOp] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<QueueOp> {
        std::mem::take(&mut self.journal)
    }

    /// Current host-side contents of `buffer`.
    pub fn buffer_contents(&self, buffer: Buffer) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Number of drawables acquired so far.
    pub fn acquired_frames(&self) -> u64 {
        self.acquired_frames
    }

    /// Makes the next acquire report a lost device.
    pub fn fail_next_acquire(&mut self, reason: &str) {
        self.pending_failure = Some(reason.to_string());
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn has_transfer_queue(&self) -> bool {
        self.config.transfer_queue
    }

    fn create_buffer(&mut self, handle: Buffer, desc: &BufferDesc<'_>) -> RhiResult<()> {
        let size = usize::try_from(desc.size).map_err(|_| {
            RhiError::resource(Buffer::KIND, desc.label, "size exceeds host address space")
        })?;
        self.buffers.insert(handle, vec![UNINITIALIZED_BYTE; size]);
        Ok(())
    }

    fn create_texture(&mut self, handle: Texture, _: &TextureDesc<'_>) -> RhiResult<()> {
        self.textures.insert(handle);
        Ok(())
    }

    fn create_texture_view(&mut self, _: TextureView, texture: Texture) -> RhiResult<()> {
        if !self.textures.contains(&texture) {
            return Err(RhiError::InvalidHandle {
                kind: Texture::KIND,
                index: texture.index(),
            });
        }
        Ok(())
    }

    fn create_shader(&mut self, _: ShaderModule, _: &ShaderModuleDesc<'_>) -> RhiResult<()> {
        Ok(())
    }

    fn create_bind_set_layout(
        &mut self,
        _: BindSetLayout,
        _: &BindSetLayoutDesc<'_>,
    ) -> RhiResult<()> {
        Ok(())
    }

    fn create_bind_set(&mut self, _: BindSet, _: &BindSetDesc<'_>) -> RhiResult<()> {
        Ok(())
    }

    fn create_pipeline_layout(
        &mut self,
        _: PipelineLayout,
        _: &PipelineLayoutDesc<'_>,
    ) -> RhiResult<()> {
        Ok(())
    }

    fn create_render_pipeline(
        &mut self,
        _: RenderPipeline,
        _: &RenderPipelineDesc<'_>,
    ) -> RhiResult<()> {
        Ok(())
    }

    fn configure_surface(&mut self, _: TextureView, _: &SurfaceConfig) -> RhiResult<TextureFormat> {
        Ok(self.config.swapchain_format)
    }

    fn write_buffer(&mut self, queue: Queue, buffer: Buffer, offset: u64, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            contents[start..start + data.len()].copy_from_slice(data);
        }
        self.journal.push(QueueOp::WriteBuffer {
            queue: queue.kind(),
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn submit(
        &mut self,
        queue: Queue,
        serial: SubmitSerial,
        lists: &[CommandList],
        transfers: &[ResourceTransfer<'_>],
    ) -> RhiResult<()> {
        self.journal.push(QueueOp::Submit {
            queue: queue.kind(),
            serial,
            lists: lists.iter().map(CommandList::id).collect(),
            render_passes: lists.iter().map(CommandList::render_pass_count).sum(),
            draws: lists.iter().flat_map(CommandList::draw_index_counts).collect(),
            transfers: transfers
                .iter()
                .map(|t| (t.receiving_queue.kind(), t.buffers.to_vec()))
                .collect(),
        });
        Ok(())
    }

    fn wait_for(&mut self, queue: Queue, producer: Queue, serial: SubmitSerial) {
        self.journal.push(QueueOp::WaitFor {
            queue: queue.kind(),
            producer: producer.kind(),
            serial,
        });
    }

    fn acquire_next_texture(&mut self) -> RhiResult<()> {
        if let Some(reason) = self.pending_failure.take() {
            return Err(RhiError::DeviceLost(reason));
        }
        self.acquired_frames += 1;
        self.journal.push(QueueOp::Acquire {
            frame: self.acquired_frames,
        });
        Ok(())
    }

    fn present(&mut self) -> RhiResult<()> {
        self.journal.push(QueueOp::Present {
            frame: self.acquired_frames,
        });
        Ok(())
    }

    fn tick(&mut self) {
        self.journal.push(QueueOp::Tick);
    }
}
