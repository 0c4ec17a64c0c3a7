use crate::camera::Camera;
use crate::rhi::{
    Backend, Device, PresentMode, Queue, RhiResult, SubmitSerial, SurfaceConfig,
};

use super::encoder::FrameEncoder;
use super::resources::{FrameResources, ShaderCode};
use super::scene::{projection, ShaderData, TRIANGLE_INDICES, TRIANGLE_VERTICES};
use super::upload::{BufferWrite, UploadPath};

/// When the uniform block is written.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformUpdate {
    /// Once, with the rest of the startup upload. Camera movement is not visible.
    OnceAtStartup,
    /// Startup, then again on the graphics queue before each frame's submission.
    EveryFrame,
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
    pub clear_color: [f64; 4],
    /// Vertical field of view.
    pub fov_y_degrees: f32,
    /// Near plane. Larger than `far` for reverse-Z.
    pub near: f32,
    pub far: f32,
    pub uniform_update: UniformUpdate,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            present_mode: PresentMode::Fifo,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            fov_y_degrees: 70.0,
            near: 10000.0,
            far: 0.1,
            uniform_update: UniformUpdate::OnceAtStartup,
        }
    }
}

/// The triangle renderer: owns the device and everything created from it.
///
/// Construction does all resource creation and the startup upload, then locks the
/// device. Afterwards the only GPU work is one command list per frame (plus the
/// uniform rewrite under [`UniformUpdate::EveryFrame`]).
pub struct Renderer<B: Backend> {
    device: Device<B>,
    resources: FrameResources,
    upload_path: UploadPath,
    encoder: FrameEncoder,
    graphics: Queue,
    projection: glam::Mat4,
    uniform_update: UniformUpdate,
}

impl<B: Backend> Renderer<B> {
    pub fn new(
        mut device: Device<B>,
        shaders: &ShaderCode,
        camera: &Camera,
        config: &RendererConfig,
    ) -> RhiResult<Self> {
        device.configure_surface(&SurfaceConfig {
            width: config.width,
            height: config.height,
            present_mode: config.present_mode,
        })?;

        let resources = FrameResources::create(&mut device, shaders)?;

        let aspect = config.width as f32 / config.height as f32;
        let projection = projection(config.fov_y_degrees, aspect, config.near, config.far);
        let shader_data = ShaderData::new(projection, camera.view_matrix());

        let upload_path = UploadPath::select(&device);
        upload_path.upload(
            &mut device,
            &[
                BufferWrite {
                    buffer: resources.index_buffer,
                    data: bytemuck::cast_slice(&TRIANGLE_INDICES),
                },
                BufferWrite {
                    buffer: resources.vertex_buffer,
                    data: bytemuck::cast_slice(&TRIANGLE_VERTICES),
                },
                BufferWrite {
                    buffer: resources.uniform_buffer,
                    data: bytemuck::bytes_of(&shader_data),
                },
            ],
        )?;

        let encoder = FrameEncoder::new(
            device.create_command_encoder("frame encoder"),
            config.clear_color,
        );
        device.lock_resources();

        let graphics = device.graphics_queue();
        log::info!(
            "renderer ready: {:?} upload, uniforms {:?}",
            upload_path,
            config.uniform_update
        );

        Ok(Self {
            device,
            resources,
            upload_path,
            encoder,
            graphics,
            projection,
            uniform_update: config.uniform_update,
        })
    }

    pub fn device(&self) -> &Device<B> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<B> {
        &mut self.device
    }

    pub fn resources(&self) -> &FrameResources {
        &self.resources
    }

    pub fn upload_path(&self) -> UploadPath {
        self.upload_path
    }

    /// Blocks until the next drawable is available.
    pub fn acquire(&mut self) -> RhiResult<()> {
        self.device.acquire_next_texture().map(|_| ())
    }

    /// Encodes and submits the frame into the acquired drawable.
    pub fn render(&mut self, camera: &Camera) -> RhiResult<SubmitSerial> {
        let Some(color_view) = self.device.current_texture_view() else {
            panic!("precondition violated: render called without an acquired drawable");
        };

        if self.uniform_update == UniformUpdate::EveryFrame {
            let data = ShaderData::new(self.projection, camera.view_matrix());
            self.device.write_buffer(
                self.graphics,
                self.resources.uniform_buffer,
                0,
                bytemuck::bytes_of(&data),
            );
        }

        let list = self.encoder.record(&self.resources, color_view);
        let serial = self.device.submit(self.graphics, &[list], &[])?;
        log::trace!("frame {} submitted as {serial}", self.encoder.frames_recorded());
        Ok(serial)
    }

    pub fn present(&mut self) -> RhiResult<()> {
        self.device.present()
    }

    pub fn tick(&mut self) {
        self.device.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::{DeviceDesc, HeadlessBackend, QueueOp, QueueType};

    fn renderer(transfer: bool, uniform_update: UniformUpdate) -> Renderer<HeadlessBackend> {
        let backend = if transfer {
            HeadlessBackend::with_transfer_queue()
        } else {
            HeadlessBackend::default()
        };
        let device = Device::new(backend, &DeviceDesc::default());
        let shaders = ShaderCode {
            vertex: b"vs".to_vec(),
            fragment: b"fs".to_vec(),
        };
        let camera = Camera::new(glam::Vec3::new(0.0, 0.0, 3.0));
        let config = RendererConfig {
            uniform_update,
            ..Default::default()
        };
        Renderer::new(device, &shaders, &camera, &config).unwrap()
    }

    #[test]
    fn startup_uploads_all_three_buffers() {
        let r = renderer(false, UniformUpdate::OnceAtStartup);
        let res = r.resources();
        let backend = r.device().backend();

        let index = backend.buffer_contents(res.index_buffer).unwrap();
        assert_eq!(index, bytemuck::cast_slice::<u32, u8>(&TRIANGLE_INDICES));
        let vertex = backend.buffer_contents(res.vertex_buffer).unwrap();
        assert_eq!(vertex, bytemuck::cast_slice::<_, u8>(&TRIANGLE_VERTICES));
        let uniform = backend.buffer_contents(res.uniform_buffer).unwrap();
        assert!(uniform.iter().any(|b| *b != crate::rhi::UNINITIALIZED_BYTE));
        assert!(r.device().is_locked());
    }

    #[test]
    fn uploads_happen_in_index_vertex_uniform_order() {
        let r = renderer(false, UniformUpdate::OnceAtStartup);
        let res = r.resources().clone();
        let targets: Vec<_> = r
            .device()
            .backend()
            .journal()
            .iter()
            .filter_map(|op| match op {
                QueueOp::WriteBuffer { buffer, .. } => Some(*buffer),
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec![res.index_buffer, res.vertex_buffer, res.uniform_buffer]
        );
    }

    #[test]
    fn every_frame_policy_rewrites_uniform_before_submit() {
        let mut r = renderer(false, UniformUpdate::EveryFrame);
        r.device_mut().backend_mut().take_journal();
        let mut camera = Camera::new(glam::Vec3::new(0.0, 0.0, 3.0));
        camera.velocity.z = -1.0;
        camera.update(0.5);

        r.acquire().unwrap();
        r.render(&camera).unwrap();

        let journal = r.device().backend().journal();
        assert!(matches!(
            journal[1],
            QueueOp::WriteBuffer { queue: QueueType::Graphics, len: 192, .. }
        ));
        assert!(matches!(journal[2], QueueOp::Submit { .. }));
    }

    #[test]
    fn startup_policy_never_rewrites() {
        let mut r = renderer(false, UniformUpdate::OnceAtStartup);
        r.device_mut().backend_mut().take_journal();
        r.acquire().unwrap();
        r.render(&Camera::new(glam::Vec3::ZERO)).unwrap();
        assert!(!r
            .device()
            .backend()
            .journal()
            .iter()
            .any(|op| matches!(op, QueueOp::WriteBuffer { .. })));
    }

    #[test]
    #[should_panic(expected = "without an acquired drawable")]
    fn render_requires_acquire() {
        let mut r = renderer(false, UniformUpdate::OnceAtStartup);
        let _ = r.render(&Camera::new(glam::Vec3::ZERO));
    }
}
