use std::collections::HashMap;
use std::sync::Arc;

use winit::window::Window;

use crate::rhi::{
    Backend, BindSet, BindSetDesc, BindSetLayout, BindSetLayoutDesc, BindSetResource,
    BindingType, Buffer, BufferDesc, Command, CommandList, HandleKind, PipelineLayout,
    PipelineLayoutDesc, Queue, RenderPassDesc, RenderPipeline, RenderPipelineDesc,
    ResourceTransfer, RhiError, RhiResult, ShaderModule, ShaderModuleDesc, SubmitSerial,
    SurfaceConfig, Texture, TextureDesc, TextureFormat, TextureView,
};

use super::{convert, surface, GpuInit, SurfaceErrorAction};

/// First word of every SPIR-V binary.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// [`Backend`] over wgpu.
///
/// Owns the wgpu device, its single queue and the window surface, plus one native
/// object per RHI handle. wgpu exposes no dedicated transfer queue, so this backend
/// reports none and every upload goes through the graphics queue.
pub struct WgpuBackend {
    /// Window the surface presents to; also notified right before each present.
    window: Arc<Window>,

    /// Surface bound to the window.
    surface: wgpu::Surface<'static>,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    init: GpuInit,

    /// Active surface configuration, once configured.
    config: Option<wgpu::SurfaceConfiguration>,

    /// RHI view handle naming the current drawable.
    swap_chain_view: Option<TextureView>,

    /// Drawable between acquire and present.
    frame: Option<wgpu::SurfaceTexture>,

    buffers: HashMap<Buffer, wgpu::Buffer>,
    textures: HashMap<Texture, wgpu::Texture>,
    views: HashMap<TextureView, wgpu::TextureView>,
    view_formats: HashMap<TextureView, wgpu::TextureFormat>,
    shaders: HashMap<ShaderModule, (wgpu::ShaderModule, String)>,
    bind_set_layouts: HashMap<BindSetLayout, wgpu::BindGroupLayout>,
    bind_sets: HashMap<BindSet, wgpu::BindGroup>,
    pipeline_layouts: HashMap<PipelineLayout, wgpu::PipelineLayout>,
    pipelines: HashMap<RenderPipeline, wgpu::RenderPipeline>,
}

impl WgpuBackend {
    /// Creates the wgpu device for `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> RhiResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| RhiError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RhiError::DeviceCreation(format!("no suitable GPU adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RhiError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            init,
            config: None,
            swap_chain_view: None,
            frame: None,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            views: HashMap::new(),
            view_formats: HashMap::new(),
            shaders: HashMap::new(),
            bind_set_layouts: HashMap::new(),
            bind_sets: HashMap::new(),
            pipeline_layouts: HashMap::new(),
            pipelines: HashMap::new(),
        })
    }

    fn encode(&self, list: &CommandList) -> RhiResult<wgpu::CommandBuffer> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(list.label()),
            });

        let mut commands = list.commands().iter();
        while let Some(cmd) = commands.next() {
            // Recording only produces commands inside a pass.
            let Command::BeginRenderPass(desc) = cmd else {
                continue;
            };
            self.encode_pass(&mut encoder, desc, &mut commands)?;
        }

        Ok(encoder.finish())
    }

    fn encode_pass<'c>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        desc: &RenderPassDesc,
        commands: &mut impl Iterator<Item = &'c Command>,
    ) -> RhiResult<()> {
        let color_attachments = desc
            .color_attachments
            .iter()
            .map(|a| {
                Ok(Some(wgpu::RenderPassColorAttachment {
                    view: get(&self.views, a.view)?,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: convert::color_load(a.load),
                        store: convert::store(a.store),
                    },
                    depth_slice: None,
                }))
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let depth_stencil_attachment = match &desc.depth_stencil {
            Some(ds) => {
                let has_stencil = get(&self.view_formats, ds.view)?.has_stencil_aspect();
                Some(wgpu::RenderPassDepthStencilAttachment {
                    view: get(&self.views, ds.view)?,
                    depth_ops: Some(wgpu::Operations {
                        load: convert::load(ds.depth_load),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: has_stencil.then(|| wgpu::Operations {
                        load: convert::load(ds.stencil_load),
                        store: wgpu::StoreOp::Store,
                    }),
                })
            }
            None => None,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&desc.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for cmd in commands {
            match cmd {
                Command::SetPipeline(p) => rpass.set_pipeline(get(&self.pipelines, *p)?),
                Command::SetBindSet { index, bind_set } => {
                    rpass.set_bind_group(*index, get(&self.bind_sets, *bind_set)?, &[]);
                }
                Command::SetIndexBuffer { buffer, format } => rpass.set_index_buffer(
                    get(&self.buffers, *buffer)?.slice(..),
                    convert::index_format(*format),
                ),
                Command::SetVertexBuffers {
                    first_slot,
                    buffers,
                } => {
                    for (slot, buffer) in (*first_slot..).zip(buffers) {
                        rpass.set_vertex_buffer(slot, get(&self.buffers, *buffer)?.slice(..));
                    }
                }
                Command::DrawIndexed {
                    index_count,
                    instance_count,
                    first_index,
                    base_vertex,
                    first_instance,
                } => rpass.draw_indexed(
                    *first_index..first_index + index_count,
                    *base_vertex,
                    *first_instance..first_instance + instance_count,
                ),
                Command::EndRenderPass => break,
                Command::BeginRenderPass(_) => unreachable!("render passes do not nest"),
            }
        }

        Ok(())
    }
}

impl Backend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn has_transfer_queue(&self) -> bool {
        false
    }

    fn create_buffer(&mut self, handle: Buffer, desc: &BufferDesc<'_>) -> RhiResult<()> {
        let buffer = self
            .scoped(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(desc.label),
                    size: desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                    usage: convert::buffer_usage(desc.usage),
                    mapped_at_creation: false,
                })
            })
            .map_err(|reason| RhiError::resource(Buffer::KIND, desc.label, reason))?;
        self.buffers.insert(handle, buffer);
        Ok(())
    }

    fn create_texture(&mut self, handle: Texture, desc: &TextureDesc<'_>) -> RhiResult<()> {
        let texture = self
            .scoped(|device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(desc.label),
                    size: wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: convert::texture_format(desc.format),
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
            })
            .map_err(|reason| RhiError::resource(Texture::KIND, desc.label, reason))?;
        self.textures.insert(handle, texture);
        Ok(())
    }

    fn create_texture_view(&mut self, handle: TextureView, texture: Texture) -> RhiResult<()> {
        let texture = get(&self.textures, texture)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.view_formats.insert(handle, texture.format());
        self.views.insert(handle, view);
        Ok(())
    }

    fn create_shader(
        &mut self,
        handle: ShaderModule,
        desc: &ShaderModuleDesc<'_>,
    ) -> RhiResult<()> {
        let source = shader_source(desc.code)
            .map_err(|reason| RhiError::resource(ShaderModule::KIND, desc.label, reason))?;
        // Compile errors (bad WGSL, malformed SPIR-V) surface through the scope.
        let module = self
            .scoped(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(desc.label),
                    source,
                })
            })
            .map_err(|reason| RhiError::resource(ShaderModule::KIND, desc.label, reason))?;
        self.shaders.insert(handle, (module, desc.entry.to_string()));
        Ok(())
    }

    fn create_bind_set_layout(
        &mut self,
        handle: BindSetLayout,
        desc: &BindSetLayoutDesc<'_>,
    ) -> RhiResult<()> {
        let entries: Vec<_> = desc
            .entries
            .iter()
            .map(|e| wgpu::BindGroupLayoutEntry {
                binding: e.binding,
                visibility: convert::shader_stages(e.visibility),
                ty: match e.ty {
                    BindingType::UniformBuffer => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                },
                count: None,
            })
            .collect();

        let layout = self
            .scoped(|device| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(desc.label),
                    entries: &entries,
                })
            })
            .map_err(|reason| RhiError::resource(BindSetLayout::KIND, desc.label, reason))?;
        self.bind_set_layouts.insert(handle, layout);
        Ok(())
    }

    fn create_bind_set(&mut self, handle: BindSet, desc: &BindSetDesc<'_>) -> RhiResult<()> {
        let entries = desc
            .entries
            .iter()
            .map(|e| match e.resource {
                BindSetResource::Buffer(buffer) => Ok(wgpu::BindGroupEntry {
                    binding: e.binding,
                    resource: get(&self.buffers, buffer)?.as_entire_binding(),
                }),
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let layout = get(&self.bind_set_layouts, desc.layout)?;
        let group = self
            .scoped(|device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(desc.label),
                    layout,
                    entries: &entries,
                })
            })
            .map_err(|reason| RhiError::resource(BindSet::KIND, desc.label, reason))?;
        self.bind_sets.insert(handle, group);
        Ok(())
    }

    fn create_pipeline_layout(
        &mut self,
        handle: PipelineLayout,
        desc: &PipelineLayoutDesc<'_>,
    ) -> RhiResult<()> {
        let layouts = desc
            .bind_set_layouts
            .iter()
            .map(|l| get(&self.bind_set_layouts, *l))
            .collect::<RhiResult<Vec<_>>>()?;

        let layout = self
            .scoped(|device| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(desc.label),
                    bind_group_layouts: &layouts,
                    immediate_size: 0,
                })
            })
            .map_err(|reason| RhiError::resource(PipelineLayout::KIND, desc.label, reason))?;
        self.pipeline_layouts.insert(handle, layout);
        Ok(())
    }

    fn create_render_pipeline(
        &mut self,
        handle: RenderPipeline,
        desc: &RenderPipelineDesc<'_>,
    ) -> RhiResult<()> {
        let (vs, vs_entry) = get(&self.shaders, desc.vertex)?;
        let (fs, fs_entry) = get(&self.shaders, desc.fragment)?;

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_buffers
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|a| wgpu::VertexAttribute {
                        format: convert::vertex_format(a.format),
                        offset: a.offset,
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<_> = desc
            .vertex_buffers
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let targets: Vec<_> = desc
            .color_formats
            .iter()
            .map(|f| {
                Some(wgpu::ColorTargetState {
                    format: convert::texture_format(*f),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let ds = desc.state.depth_stencil;
        let depth_stencil = desc
            .depth_stencil_format
            .map(|format| wgpu::DepthStencilState {
                format: convert::texture_format(format),
                depth_write_enabled: ds.depth_test && ds.depth_write,
                depth_compare: if ds.depth_test {
                    convert::compare(ds.depth_compare)
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            });

        let raster = desc.state.raster;
        let layout = get(&self.pipeline_layouts, desc.layout)?;
        let pipeline = self
            .scoped(|device| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(desc.label),
                    layout: Some(layout),

                    vertex: wgpu::VertexState {
                        module: vs,
                        entry_point: Some(vs_entry.as_str()),
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },

                    fragment: Some(wgpu::FragmentState {
                        module: fs,
                        entry_point: Some(fs_entry.as_str()),
                        compilation_options: Default::default(),
                        targets: &targets,
                    }),

                    primitive: wgpu::PrimitiveState {
                        topology: convert::topology(raster.topology),
                        strip_index_format: None,
                        front_face: convert::front_face(raster.front_face),
                        cull_mode: convert::cull_mode(raster.cull_mode),
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },

                    depth_stencil,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                })
            })
            .map_err(|reason| RhiError::resource(RenderPipeline::KIND, desc.label, reason))?;
        self.pipelines.insert(handle, pipeline);
        Ok(())
    }

    fn configure_surface(
        &mut self,
        view: TextureView,
        config: &SurfaceConfig,
    ) -> RhiResult<TextureFormat> {
        let caps = self.surface.get_capabilities(&self.adapter);
        let (format, rhi_format) = surface::choose_surface_format(&caps, self.init.prefer_srgb)
            .ok_or_else(|| {
                RhiError::SurfaceCreation(format!(
                    "no usable swap-chain format among {:?}",
                    caps.formats
                ))
            })?;
        log::info!("swap chain: {format:?}, {}x{}", config.width, config.height);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: config.width,
            height: config.height,
            present_mode: surface::choose_present_mode(
                &caps,
                convert::present_mode(config.present_mode),
            ),
            alpha_mode: surface::choose_alpha_mode(&caps, self.init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.init.desired_maximum_frame_latency,
        };
        self.scoped(|device| self.surface.configure(device, &surface_config))
            .map_err(RhiError::SurfaceCreation)?;

        self.config = Some(surface_config);
        self.swap_chain_view = Some(view);
        Ok(rhi_format)
    }

    fn write_buffer(&mut self, _: Queue, buffer: Buffer, offset: u64, data: &[u8]) {
        match self.buffers.get(&buffer) {
            Some(b) => self.queue.write_buffer(b, offset, data),
            None => log::error!("write to unknown {buffer} dropped"),
        }
    }

    fn submit(
        &mut self,
        _: Queue,
        serial: SubmitSerial,
        lists: &[CommandList],
        _: &[ResourceTransfer<'_>],
    ) -> RhiResult<()> {
        let command_buffers = lists
            .iter()
            .map(|list| self.encode(list))
            .collect::<RhiResult<Vec<_>>>()?;
        self.queue.submit(command_buffers);
        log::trace!("wgpu submit {serial}");
        Ok(())
    }

    fn wait_for(&mut self, queue: Queue, producer: Queue, serial: SubmitSerial) {
        // A single wgpu queue already executes submissions in order.
        log::trace!("{queue} wait on {producer} {serial} is implicit");
    }

    fn acquire_next_texture(&mut self) -> RhiResult<()> {
        let (Some(config), Some(view)) = (self.config.as_ref(), self.swap_chain_view) else {
            return Err(RhiError::DeviceLost("surface is not configured".into()));
        };

        let mut failures = 0;
        let frame = loop {
            match self.surface.get_current_texture() {
                Ok(frame) => break frame,
                Err(err) => {
                    failures += 1;
                    let action =
                        surface::map_surface_error(&self.surface, &self.device, config, &err);
                    log::warn!("acquire failed ({err}); {action:?}");
                    if action == SurfaceErrorAction::Fatal
                        || failures > self.init.max_surface_retries
                    {
                        return Err(RhiError::DeviceLost(format!(
                            "cannot acquire swap-chain texture: {err}"
                        )));
                    }
                }
            }
        };

        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.views.insert(view, frame_view);
        self.view_formats.insert(view, config.format);
        self.frame = Some(frame);
        Ok(())
    }

    fn present(&mut self) -> RhiResult<()> {
        if let Some(view) = self.swap_chain_view {
            self.views.remove(&view);
        }
        let frame = self
            .frame
            .take()
            .ok_or_else(|| RhiError::DeviceLost("no drawable to present".into()))?;

        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn tick(&mut self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e}");
        }
    }
}

/// Picks the wgpu shader source for `code`: SPIR-V when it starts with the SPIR-V
/// magic number, WGSL text otherwise.
pub(crate) fn shader_source(code: &[u8]) -> Result<wgpu::ShaderSource<'_>, String> {
    let is_spirv = code
        .first_chunk::<4>()
        .is_some_and(|word| u32::from_le_bytes(*word) == SPIRV_MAGIC);

    if is_spirv {
        if code.len() % 4 != 0 {
            return Err(format!(
                "SPIR-V length {} is not a multiple of 4",
                code.len()
            ));
        }
        return Ok(wgpu::util::make_spirv(code));
    }

    std::str::from_utf8(code)
        .map(|src| wgpu::ShaderSource::Wgsl(src.into()))
        .map_err(|e| format!("neither SPIR-V nor UTF-8 WGSL: {e}"))
}

impl WgpuBackend {
    /// Runs `create` inside a validation error scope.
    ///
    /// Without a scope wgpu hands creation errors to its uncaptured-error handler,
    /// which panics.
    fn scoped<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(describe_error(&err)),
            None => Ok(value),
        }
    }
}

/// Reason text for an error caught by a scope.
pub(crate) fn describe_error(err: &wgpu::Error) -> String {
    match err {
        wgpu::Error::Validation { description, .. } => description.clone(),
        wgpu::Error::Internal { description, .. } => format!("internal error: {description}"),
        wgpu::Error::OutOfMemory { .. } => "out of GPU memory".to_string(),
    }
}

fn get<K, V>(map: &HashMap<K, V>, handle: K) -> RhiResult<&V>
where
    K: HandleKind,
{
    map.get(&handle).ok_or(RhiError::InvalidHandle {
        kind: K::KIND,
        index: handle.index(),
    })
}
