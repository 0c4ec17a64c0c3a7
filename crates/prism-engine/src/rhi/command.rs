//! Command recording.
//!
//! Recording is backend-agnostic: encoders append [`Command`]s to a list and the
//! backend replays the finished [`CommandList`] at submit time.
//!
//! Draw calls only exist on [`RenderPassEncoder`], and a pass mutably borrows its
//! encoder until it ends, so "draw outside a render pass" and "finish with a pass
//! still open" do not type-check.

use std::sync::atomic::{AtomicU64, Ordering};

use super::desc::{IndexFormat, RenderPassDesc};
use super::error::precondition;
use super::handle::{BindSet, Buffer, RenderPipeline};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// One recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginRenderPass(RenderPassDesc),
    SetPipeline(RenderPipeline),
    SetBindSet {
        index: u32,
        bind_set: BindSet,
    },
    SetIndexBuffer {
        buffer: Buffer,
        format: IndexFormat,
    },
    SetVertexBuffers {
        first_slot: u32,
        buffers: Vec<Buffer>,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    EndRenderPass,
}

/// Finished, immutable recording produced by [`CommandEncoder::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommandList {
    id: u64,
    label: String,
    commands: Vec<Command>,
}

impl CommandList {
    /// Process-unique identity of this list.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn render_pass_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::BeginRenderPass(_)))
            .count()
    }

    /// Index counts of every draw in recording order.
    pub fn draw_index_counts(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawIndexed { index_count, .. } => Some(*index_count),
                _ => None,
            })
            .collect()
    }
}

/// Per-device recording context.
///
/// Reusable: every [`finish`](Self::finish) hands out the recorded commands as a
/// fresh list and leaves the encoder empty for the next frame.
#[derive(Debug)]
pub struct CommandEncoder {
    label: String,
    commands: Vec<Command>,
    finished_lists: u64,
}

impl CommandEncoder {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            commands: Vec::new(),
            finished_lists: 0,
        }
    }

    pub fn begin_render_pass(&mut self, desc: RenderPassDesc) -> RenderPassEncoder<'_> {
        precondition!(
            !desc.color_attachments.is_empty() || desc.depth_stencil.is_some(),
            "render pass '{}' has no attachments",
            desc.label
        );
        self.commands.push(Command::BeginRenderPass(desc));
        RenderPassEncoder {
            encoder: self,
            pipeline_bound: false,
            index_buffer_bound: false,
        }
    }

    /// Produces exactly one list holding everything recorded since the last call.
    pub fn finish(&mut self) -> CommandList {
        self.finished_lists += 1;
        CommandList {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            label: format!("{} #{}", self.label, self.finished_lists),
            commands: std::mem::take(&mut self.commands),
        }
    }

    /// Number of lists this encoder has produced.
    pub fn finished_lists(&self) -> u64 {
        self.finished_lists
    }
}

/// Scoped recording of one render pass.
///
/// Binding state starts empty for every pass; nothing carries over from a previous
/// pass or frame. The pass ends on [`end`](Self::end) or when dropped.
#[derive(Debug)]
pub struct RenderPassEncoder<'e> {
    encoder: &'e mut CommandEncoder,
    pipeline_bound: bool,
    index_buffer_bound: bool,
}

impl RenderPassEncoder<'_> {
    pub fn set_pipeline(&mut self, pipeline: RenderPipeline) {
        self.pipeline_bound = true;
        self.encoder.commands.push(Command::SetPipeline(pipeline));
    }

    pub fn set_bind_set(&mut self, bind_set: BindSet, index: u32) {
        self.encoder
            .commands
            .push(Command::SetBindSet { index, bind_set });
    }

    pub fn set_index_buffer(&mut self, buffer: Buffer, format: IndexFormat) {
        self.index_buffer_bound = true;
        self.encoder
            .commands
            .push(Command::SetIndexBuffer { buffer, format });
    }

    pub fn set_vertex_buffers(&mut self, first_slot: u32, buffers: &[Buffer]) {
        precondition!(!buffers.is_empty(), "set_vertex_buffers with no buffers");
        self.encoder.commands.push(Command::SetVertexBuffers {
            first_slot,
            buffers: buffers.to_vec(),
        });
    }

    /// Single-instance indexed draw starting at index 0.
    pub fn draw_indexed(&mut self, index_count: u32) {
        self.draw_indexed_instanced(index_count, 1, 0, 0, 0);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        precondition!(self.pipeline_bound, "draw_indexed with no pipeline bound");
        precondition!(
            self.index_buffer_bound,
            "draw_indexed with no index buffer bound"
        );
        self.encoder.commands.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        });
    }

    pub fn end(self) {}
}

impl Drop for RenderPassEncoder<'_> {
    fn drop(&mut self) {
        self.encoder.commands.push(Command::EndRenderPass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::desc::{ColorAttachment, LoadOp};
    use crate::rhi::handle::TextureView;

    fn pass_desc() -> RenderPassDesc {
        RenderPassDesc {
            label: "test pass".to_string(),
            color_attachments: vec![ColorAttachment {
                view: TextureView(0),
                load: LoadOp::Clear([0.0; 4]),
                store: true,
            }],
            depth_stencil: None,
        }
    }

    fn record_triangle(encoder: &mut CommandEncoder) -> CommandList {
        let mut pass = encoder.begin_render_pass(pass_desc());
        pass.set_pipeline(RenderPipeline(0));
        pass.set_bind_set(BindSet(0), 0);
        pass.set_index_buffer(Buffer(0), IndexFormat::Uint32);
        pass.set_vertex_buffers(0, &[Buffer(1)]);
        pass.draw_indexed(3);
        pass.end();
        encoder.finish()
    }

    #[test]
    fn pass_is_bracketed_by_begin_and_end() {
        let mut encoder = CommandEncoder::new("enc");
        let list = record_triangle(&mut encoder);
        let cmds = list.commands();
        assert!(matches!(cmds.first(), Some(Command::BeginRenderPass(_))));
        assert_eq!(cmds.last(), Some(&Command::EndRenderPass));
        assert_eq!(list.render_pass_count(), 1);
        assert_eq!(list.draw_index_counts(), vec![3]);
    }

    #[test]
    fn dropping_a_pass_closes_it() {
        let mut encoder = CommandEncoder::new("enc");
        {
            let _pass = encoder.begin_render_pass(pass_desc());
        }
        let list = encoder.finish();
        assert_eq!(list.commands().len(), 2);
        assert_eq!(list.commands()[1], Command::EndRenderPass);
    }

    #[test]
    fn encoder_is_reusable_and_lists_are_distinct() {
        let mut encoder = CommandEncoder::new("enc");
        let a = record_triangle(&mut encoder);
        let b = record_triangle(&mut encoder);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.commands(), b.commands());
        assert_eq!(encoder.finished_lists(), 2);
        assert!(encoder.finish().commands().is_empty());
    }

    #[test]
    #[should_panic(expected = "no pipeline bound")]
    fn draw_without_pipeline_panics() {
        let mut encoder = CommandEncoder::new("enc");
        let mut pass = encoder.begin_render_pass(pass_desc());
        pass.set_index_buffer(Buffer(0), IndexFormat::Uint32);
        pass.draw_indexed(3);
    }

    #[test]
    #[should_panic(expected = "no index buffer bound")]
    fn binding_state_does_not_leak_into_next_pass() {
        let mut encoder = CommandEncoder::new("enc");
        let _ = record_triangle(&mut encoder);
        let mut pass = encoder.begin_render_pass(pass_desc());
        pass.set_pipeline(RenderPipeline(0));
        pass.draw_indexed(3);
    }
}
