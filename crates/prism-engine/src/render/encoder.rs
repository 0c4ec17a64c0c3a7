use crate::rhi::{
    ColorAttachment, CommandEncoder, CommandList, DepthStencilAttachment, IndexFormat, LoadOp,
    RenderPassDesc, TextureView,
};

use super::resources::FrameResources;

/// Records the per-frame command list: one pass, one indexed draw.
///
/// Wraps a single [`CommandEncoder`] that is reused for every frame.
#[derive(Debug)]
pub struct FrameEncoder {
    encoder: CommandEncoder,
    clear_color: [f64; 4],
}

impl FrameEncoder {
    pub fn new(encoder: CommandEncoder, clear_color: [f64; 4]) -> Self {
        Self {
            encoder,
            clear_color,
        }
    }

    /// Records the frame that draws into `color_view`.
    pub fn record(&mut self, resources: &FrameResources, color_view: TextureView) -> CommandList {
        let desc = RenderPassDesc {
            label: "triangle pass".to_string(),
            color_attachments: vec![ColorAttachment {
                view: color_view,
                load: LoadOp::Clear(self.clear_color),
                store: true,
            }],
            depth_stencil: Some(DepthStencilAttachment {
                view: resources.depth_view,
                // Reverse-Z: far is 0.
                depth_load: LoadOp::Clear(0.0),
                stencil_load: LoadOp::Clear(0),
            }),
        };

        let mut pass = self.encoder.begin_render_pass(desc);
        pass.set_pipeline(resources.pipeline);
        pass.set_bind_set(resources.bind_set, 0);
        pass.set_index_buffer(resources.index_buffer, IndexFormat::Uint32);
        pass.set_vertex_buffers(0, &[resources.vertex_buffer]);
        pass.draw_indexed(resources.index_count);
        pass.end();

        self.encoder.finish()
    }

    /// Number of frames recorded so far.
    pub fn frames_recorded(&self) -> u64 {
        self.encoder.finished_lists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::{
        BindSet, Buffer, Command, DeviceDesc, Device, HeadlessBackend, RenderPipeline,
    };

    fn resources() -> FrameResources {
        FrameResources {
            vertex_buffer: Buffer(0),
            index_buffer: Buffer(1),
            uniform_buffer: Buffer(2),
            depth_view: TextureView(0),
            bind_set: BindSet(0),
            pipeline: RenderPipeline(0),
            index_count: 3,
        }
    }

    fn encoder() -> FrameEncoder {
        let mut device = Device::new(HeadlessBackend::default(), &DeviceDesc::default());
        FrameEncoder::new(device.create_command_encoder("frame"), [0.1, 0.2, 0.3, 1.0])
    }

    #[test]
    fn frame_is_one_pass_with_one_draw() {
        let mut enc = encoder();
        let list = enc.record(&resources(), TextureView(7));

        assert_eq!(list.render_pass_count(), 1);
        assert_eq!(list.draw_index_counts(), vec![3]);
        assert_eq!(
            list.commands()[1..],
            [
                Command::SetPipeline(RenderPipeline(0)),
                Command::SetBindSet {
                    index: 0,
                    bind_set: BindSet(0)
                },
                Command::SetIndexBuffer {
                    buffer: Buffer(1),
                    format: IndexFormat::Uint32
                },
                Command::SetVertexBuffers {
                    first_slot: 0,
                    buffers: vec![Buffer(0)]
                },
                Command::DrawIndexed {
                    index_count: 3,
                    instance_count: 1,
                    first_index: 0,
                    base_vertex: 0,
                    first_instance: 0
                },
                Command::EndRenderPass,
            ]
        );
    }

    #[test]
    fn pass_targets_current_view_and_clears_depth_to_zero() {
        let mut enc = encoder();
        let list = enc.record(&resources(), TextureView(7));
        let Command::BeginRenderPass(desc) = &list.commands()[0] else {
            panic!("first command is not a render pass");
        };
        assert_eq!(desc.color_attachments[0].view, TextureView(7));
        assert_eq!(
            desc.color_attachments[0].load,
            LoadOp::Clear([0.1, 0.2, 0.3, 1.0])
        );
        let ds = desc.depth_stencil.unwrap();
        assert_eq!(ds.view, TextureView(0));
        assert_eq!(ds.depth_load, LoadOp::Clear(0.0));
    }

    #[test]
    fn every_frame_gets_a_fresh_list() {
        let mut enc = encoder();
        let a = enc.record(&resources(), TextureView(7));
        let b = enc.record(&resources(), TextureView(7));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.commands(), b.commands());
        assert_eq!(enc.frames_recorded(), 2);
    }
}
