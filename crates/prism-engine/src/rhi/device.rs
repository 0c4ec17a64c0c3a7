use super::backend::Backend;
use super::command::{Command, CommandEncoder, CommandList};
use super::desc::{
    BindSetDesc, BindSetLayoutDesc, BindSetLayoutEntry, BindSetResource, BindingType, BufferDesc,
    BufferUsage, IndexFormat, PipelineLayoutDesc, RenderPassDesc, RenderPipelineDesc,
    ResourceTransfer, ShaderModuleDesc, ShaderStage, SurfaceConfig, TextureDesc, TextureFormat,
};
use super::error::{precondition, RhiError, RhiResult};
use super::handle::{
    BindSet, BindSetLayout, Buffer, HandleKind, PipelineLayout, Queue, QueueType,
    RenderPipeline, ShaderModule, SubmitSerial, Texture, TextureView,
};

/// Device creation parameters.
#[derive(Debug, Clone)]
pub struct DeviceDesc<'a> {
    pub label: &'a str,
}

impl Default for DeviceDesc<'_> {
    fn default() -> Self {
        Self { label: "prism device" }
    }
}

#[derive(Debug)]
struct BufferInfo {
    label: String,
    usage: BufferUsage,
    size: u64,
}

#[derive(Debug)]
struct TextureInfo {
    format: TextureFormat,
}

#[derive(Debug)]
struct ViewInfo {
    /// `None` for the swap-chain view.
    texture: Option<Texture>,
}

#[derive(Debug)]
struct PipelineInfo {
    bind_set_count: u32,
    vertex_buffer_count: u32,
}

#[derive(Debug)]
struct Timeline {
    queue: Queue,
    last_submitted: SubmitSerial,
    waits: Vec<(Queue, SubmitSerial)>,
}

impl Timeline {
    fn new(kind: QueueType) -> Self {
        Self {
            queue: Queue::new(kind),
            last_submitted: SubmitSerial::NONE,
            waits: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SurfaceState {
    view: TextureView,
    format: TextureFormat,
    width: u32,
    height: u32,
    acquired: bool,
}

/// Owner and sole creator of every GPU object.
///
/// `Device` keeps a CPU-side record of each object it hands out. That record is
/// what lets it reject mismatched descriptors up front, keep per-queue submission
/// serials, and refuse oversized writes before the backend ever sees them.
///
/// Resource creation is a setup-time activity: after [`lock_resources`] any
/// further creation panics.
///
/// [`lock_resources`]: Device::lock_resources
pub struct Device<B: Backend> {
    backend: B,
    label: String,

    buffers: Vec<BufferInfo>,
    textures: Vec<TextureInfo>,
    views: Vec<ViewInfo>,
    shaders: Vec<ShaderStage>,
    bind_set_layouts: Vec<Vec<BindSetLayoutEntry>>,
    bind_sets: usize,
    pipeline_layouts: Vec<u32>,
    pipelines: Vec<PipelineInfo>,

    graphics: Timeline,
    transfer: Option<Timeline>,

    surface: Option<SurfaceState>,
    locked: bool,
}

impl<B: Backend> Device<B> {
    pub fn new(backend: B, desc: &DeviceDesc<'_>) -> Self {
        let transfer = backend
            .has_transfer_queue()
            .then(|| Timeline::new(QueueType::Transfer));

        log::info!(
            "created device '{}' on {} backend (transfer queue: {})",
            desc.label,
            backend.name(),
            if transfer.is_some() { "yes" } else { "no" }
        );

        Self {
            backend,
            label: desc.label.to_string(),
            buffers: Vec::new(),
            textures: Vec::new(),
            views: Vec::new(),
            shaders: Vec::new(),
            bind_set_layouts: Vec::new(),
            bind_sets: 0,
            pipeline_layouts: Vec::new(),
            pipelines: Vec::new(),
            graphics: Timeline::new(QueueType::Graphics),
            transfer,
            surface: None,
            locked: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ── queues ────────────────────────────────────────────────────────────

    /// Returns the queue of the given type, if the device has one.
    pub fn queue(&self, kind: QueueType) -> Option<Queue> {
        match kind {
            QueueType::Graphics => Some(self.graphics.queue),
            QueueType::Transfer => self.transfer.as_ref().map(|t| t.queue),
        }
    }

    pub fn graphics_queue(&self) -> Queue {
        self.graphics.queue
    }

    /// Last serial handed out by `submit` on `queue`.
    pub fn last_submitted(&self, queue: Queue) -> SubmitSerial {
        self.timeline(queue).last_submitted
    }

    /// Cross-queue waits recorded on `queue`, in call order.
    pub fn waits(&self, queue: Queue) -> &[(Queue, SubmitSerial)] {
        &self.timeline(queue).waits
    }

    fn timeline(&self, queue: Queue) -> &Timeline {
        match queue.kind {
            QueueType::Graphics => &self.graphics,
            QueueType::Transfer => match self.transfer.as_ref() {
                Some(t) => t,
                None => panic!("precondition violated: device has no transfer queue"),
            },
        }
    }

    fn check_queue(&self, queue: Queue) {
        precondition!(
            queue.kind == QueueType::Graphics || self.transfer.is_some(),
            "device has no transfer queue"
        );
    }

    fn timeline_mut(&mut self, queue: Queue) -> &mut Timeline {
        match queue.kind {
            QueueType::Graphics => &mut self.graphics,
            QueueType::Transfer => match self.transfer.as_mut() {
                Some(t) => t,
                None => panic!("precondition violated: device has no transfer queue"),
            },
        }
    }

    /// Enqueues a write of `data` into `buffer` starting at `offset`.
    ///
    /// Bytes of the buffer outside the written range keep whatever they held.
    pub fn write_buffer(&mut self, queue: Queue, buffer: Buffer, offset: u64, data: &[u8]) {
        self.check_queue(queue);
        let info = self.buffer_info(buffer);
        let end = offset.checked_add(data.len() as u64);
        precondition!(
            end.is_some_and(|end| end <= info.size),
            "write of {} bytes at offset {} exceeds buffer '{}' ({} bytes)",
            data.len(),
            offset,
            info.label,
            info.size
        );

        log::trace!("{queue}: write {} bytes to {buffer} @ {offset}", data.len());
        self.backend.write_buffer(queue, buffer, offset, data);
    }

    /// Enqueues `lists` on `queue` and returns the serial identifying this submission.
    ///
    /// `transfers` hand the named buffers over to another queue; that queue still has
    /// to [`wait_for`](Self::wait_for) the returned serial before reading them.
    pub fn submit(
        &mut self,
        queue: Queue,
        lists: &[CommandList],
        transfers: &[ResourceTransfer<'_>],
    ) -> RhiResult<SubmitSerial> {
        for list in lists {
            self.validate_list(list);
        }
        for transfer in transfers {
            self.check_queue(transfer.receiving_queue);
            precondition!(
                transfer.receiving_queue != queue,
                "{queue} cannot transfer resources to itself"
            );
            for buffer in transfer.buffers {
                check_known(&self.buffers, buffer.0, Buffer::KIND);
            }
        }

        let serial = self.timeline(queue).last_submitted.next();
        self.backend.submit(queue, serial, lists, transfers)?;
        self.timeline_mut(queue).last_submitted = serial;

        log::trace!(
            "{queue}: submitted {} list(s), {} transfer(s) as {serial}",
            lists.len(),
            transfers.len()
        );
        Ok(serial)
    }

    /// Makes `queue` wait until `producer` has retired `serial`.
    pub fn wait_for(&mut self, queue: Queue, producer: Queue, serial: SubmitSerial) {
        precondition!(queue != producer, "{queue} cannot wait on itself");
        let produced = self.timeline(producer).last_submitted;
        precondition!(
            serial != SubmitSerial::NONE && serial <= produced,
            "{queue} waits on {producer} {serial}, but only {produced} was submitted"
        );

        log::debug!("{queue}: wait for {producer} {serial}");
        self.backend.wait_for(queue, producer, serial);
        self.timeline_mut(queue).waits.push((producer, serial));
    }

    // ── resource creation ─────────────────────────────────────────────────

    /// Forbids further resource creation. Called before entering the frame loop.
    pub fn lock_resources(&mut self) {
        if !self.locked {
            log::debug!(
                "device '{}' locked with {} buffers, {} textures, {} pipelines",
                self.label,
                self.buffers.len(),
                self.textures.len(),
                self.pipelines.len()
            );
        }
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self, what: &str) {
        precondition!(
            !self.locked,
            "{what} created after the device was locked for rendering"
        );
    }

    pub fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> RhiResult<Buffer> {
        self.check_unlocked(Buffer::KIND);
        if desc.size == 0 {
            return Err(RhiError::resource(Buffer::KIND, desc.label, "size is zero"));
        }

        let handle = Buffer(self.buffers.len() as u32);
        self.backend.create_buffer(handle, desc)?;
        self.buffers.push(BufferInfo {
            label: desc.label.to_string(),
            usage: desc.usage,
            size: desc.size,
        });

        log::debug!(
            "created {handle} '{}' ({:?}, {} bytes)",
            desc.label,
            desc.usage,
            desc.size
        );
        Ok(handle)
    }

    pub fn create_texture(&mut self, desc: &TextureDesc<'_>) -> RhiResult<Texture> {
        self.check_unlocked(Texture::KIND);
        if desc.width == 0 || desc.height == 0 {
            return Err(RhiError::resource(
                Texture::KIND,
                desc.label,
                format!("invalid extent {}x{}", desc.width, desc.height),
            ));
        }

        let handle = Texture(self.textures.len() as u32);
        self.backend.create_texture(handle, desc)?;
        self.textures.push(TextureInfo {
            format: desc.format,
        });

        log::debug!(
            "created {handle} '{}' ({:?}, {}x{})",
            desc.label,
            desc.format,
            desc.width,
            desc.height
        );
        Ok(handle)
    }

    /// Creates a view covering the whole texture.
    pub fn create_texture_view(&mut self, texture: Texture) -> RhiResult<TextureView> {
        self.check_unlocked(TextureView::KIND);
        check_known(&self.textures, texture.0, Texture::KIND);

        let handle = TextureView(self.views.len() as u32);
        self.backend.create_texture_view(handle, texture)?;
        self.views.push(ViewInfo {
            texture: Some(texture),
        });
        Ok(handle)
    }

    pub fn create_shader(&mut self, desc: &ShaderModuleDesc<'_>) -> RhiResult<ShaderModule> {
        self.check_unlocked(ShaderModule::KIND);
        if desc.code.is_empty() {
            return Err(RhiError::resource(
                ShaderModule::KIND,
                desc.label,
                "bytecode is empty",
            ));
        }
        if desc.entry.is_empty() {
            return Err(RhiError::resource(
                ShaderModule::KIND,
                desc.label,
                "entry point name is empty",
            ));
        }

        let handle = ShaderModule(self.shaders.len() as u32);
        self.backend.create_shader(handle, desc)?;
        self.shaders.push(desc.stage);

        log::debug!(
            "created {handle} '{}' ({:?}, entry '{}', {} bytes)",
            desc.label,
            desc.stage,
            desc.entry,
            desc.code.len()
        );
        Ok(handle)
    }

    pub fn create_bind_set_layout(
        &mut self,
        desc: &BindSetLayoutDesc<'_>,
    ) -> RhiResult<BindSetLayout> {
        self.check_unlocked(BindSetLayout::KIND);
        for (i, entry) in desc.entries.iter().enumerate() {
            if desc.entries[..i].iter().any(|e| e.binding == entry.binding) {
                return Err(RhiError::resource(
                    BindSetLayout::KIND,
                    desc.label,
                    format!("binding {} declared twice", entry.binding),
                ));
            }
        }

        let handle = BindSetLayout(self.bind_set_layouts.len() as u32);
        self.backend.create_bind_set_layout(handle, desc)?;
        self.bind_set_layouts.push(desc.entries.to_vec());
        Ok(handle)
    }

    /// Creates a bind set. Its entries must match the layout's entries one to one.
    pub fn create_bind_set(&mut self, desc: &BindSetDesc<'_>) -> RhiResult<BindSet> {
        self.check_unlocked(BindSet::KIND);
        let layout = lookup(&self.bind_set_layouts, desc.layout.0, BindSetLayout::KIND);
        let mismatch = |reason: String| RhiError::resource(BindSet::KIND, desc.label, reason);

        if layout.len() != desc.entries.len() {
            return Err(mismatch(format!(
                "layout declares {} entries, bind set provides {}",
                layout.len(),
                desc.entries.len()
            )));
        }
        for expected in layout {
            let Some(entry) = desc.entries.iter().find(|e| e.binding == expected.binding) else {
                return Err(mismatch(format!("binding {} is missing", expected.binding)));
            };
            match (expected.ty, entry.resource) {
                (BindingType::UniformBuffer, BindSetResource::Buffer(buffer)) => {
                    let info = self.buffer_info(buffer);
                    if info.usage != BufferUsage::Uniform {
                        return Err(mismatch(format!(
                            "binding {} expects a uniform buffer, '{}' is {:?}",
                            expected.binding, info.label, info.usage
                        )));
                    }
                }
            }
        }

        let handle = BindSet(self.bind_sets as u32);
        self.backend.create_bind_set(handle, desc)?;
        self.bind_sets += 1;
        Ok(handle)
    }

    pub fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDesc<'_>,
    ) -> RhiResult<PipelineLayout> {
        self.check_unlocked(PipelineLayout::KIND);
        for layout in desc.bind_set_layouts {
            check_known(&self.bind_set_layouts, layout.0, BindSetLayout::KIND);
        }

        let handle = PipelineLayout(self.pipeline_layouts.len() as u32);
        self.backend.create_pipeline_layout(handle, desc)?;
        self.pipeline_layouts
            .push(desc.bind_set_layouts.len() as u32);
        Ok(handle)
    }

    pub fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDesc<'_>,
    ) -> RhiResult<RenderPipeline> {
        self.check_unlocked(RenderPipeline::KIND);
        let invalid = |reason: String| RhiError::resource(RenderPipeline::KIND, desc.label, reason);

        let bind_set_count = *lookup(&self.pipeline_layouts, desc.layout.0, PipelineLayout::KIND);
        for (module, stage) in [
            (desc.vertex, ShaderStage::Vertex),
            (desc.fragment, ShaderStage::Fragment),
        ] {
            let actual = *lookup(&self.shaders, module.0, ShaderModule::KIND);
            if actual != stage {
                return Err(invalid(format!(
                    "{module} is a {actual:?} shader, expected {stage:?}"
                )));
            }
        }

        if let Some(format) = desc.color_formats.iter().find(|f| f.is_depth()) {
            return Err(invalid(format!("{format:?} is not a color format")));
        }
        match desc.depth_stencil_format {
            Some(format) if !format.is_depth() => {
                return Err(invalid(format!("{format:?} is not a depth format")));
            }
            None if desc.state.depth_stencil.depth_test => {
                return Err(invalid("depth test enabled without a depth target".into()));
            }
            _ => {}
        }

        for layout in desc.vertex_buffers {
            for attr in layout.attributes {
                if attr.offset + attr.format.size() > layout.stride {
                    return Err(invalid(format!(
                        "attribute at location {} ends past the {}-byte stride",
                        attr.location, layout.stride
                    )));
                }
            }
        }

        let handle = RenderPipeline(self.pipelines.len() as u32);
        self.backend.create_render_pipeline(handle, desc)?;
        self.pipelines.push(PipelineInfo {
            bind_set_count,
            vertex_buffer_count: desc.vertex_buffers.len() as u32,
        });

        log::debug!("created {handle} '{}' ({:?})", desc.label, desc.state);
        Ok(handle)
    }

    pub fn create_command_encoder(&mut self, label: &str) -> CommandEncoder {
        self.check_unlocked("command encoder");
        CommandEncoder::new(label)
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn buffer_size(&self, buffer: Buffer) -> u64 {
        self.buffer_info(buffer).size
    }

    pub fn buffer_usage(&self, buffer: Buffer) -> BufferUsage {
        self.buffer_info(buffer).usage
    }

    pub fn texture_format(&self, texture: Texture) -> TextureFormat {
        lookup(&self.textures, texture.0, Texture::KIND).format
    }

    /// Texture a view was created from; `None` for the swap-chain view.
    pub fn view_texture(&self, view: TextureView) -> Option<Texture> {
        lookup(&self.views, view.0, TextureView::KIND).texture
    }

    fn buffer_info(&self, buffer: Buffer) -> &BufferInfo {
        lookup(&self.buffers, buffer.0, Buffer::KIND)
    }

    // ── surface ───────────────────────────────────────────────────────────

    /// Configures the swap chain. The returned device-side view handle stays the
    /// same for the process lifetime and names the current drawable after each acquire.
    pub fn configure_surface(&mut self, config: &SurfaceConfig) -> RhiResult<TextureView> {
        self.check_unlocked("surface configuration");
        if config.width == 0 || config.height == 0 {
            return Err(RhiError::SurfaceCreation(format!(
                "invalid surface extent {}x{}",
                config.width, config.height
            )));
        }

        let view = match self.surface.as_ref() {
            Some(s) => s.view,
            None => {
                let view = TextureView(self.views.len() as u32);
                self.views.push(ViewInfo { texture: None });
                view
            }
        };

        let format = self.backend.configure_surface(view, config)?;
        log::info!(
            "surface configured: {}x{} {:?}, {:?}",
            config.width,
            config.height,
            format,
            config.present_mode
        );

        self.surface = Some(SurfaceState {
            view,
            format,
            width: config.width,
            height: config.height,
            acquired: false,
        });
        Ok(view)
    }

    fn surface(&self) -> &SurfaceState {
        match self.surface.as_ref() {
            Some(s) => s,
            None => panic!("precondition violated: surface is not configured"),
        }
    }

    pub fn swap_chain_format(&self) -> TextureFormat {
        self.surface().format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        let s = self.surface();
        (s.width, s.height)
    }

    /// Blocks until the next drawable is ready and returns the swap-chain view.
    pub fn acquire_next_texture(&mut self) -> RhiResult<TextureView> {
        precondition!(
            !self.surface().acquired,
            "acquire_next_texture called twice without present"
        );
        self.backend.acquire_next_texture()?;

        if let Some(surface) = self.surface.as_mut() {
            surface.acquired = true;
        }
        Ok(self.surface().view)
    }

    /// Swap-chain view, if a drawable is currently acquired.
    pub fn current_texture_view(&self) -> Option<TextureView> {
        self.surface
            .as_ref()
            .filter(|s| s.acquired)
            .map(|s| s.view)
    }

    pub fn present(&mut self) -> RhiResult<()> {
        precondition!(
            self.surface().acquired,
            "present called without an acquired drawable"
        );
        if let Some(surface) = self.surface.as_mut() {
            surface.acquired = false;
        }
        self.backend.present()
    }

    pub fn tick(&mut self) {
        self.backend.tick();
    }

    // ── validation ────────────────────────────────────────────────────────

    fn validate_pass(&self, desc: &RenderPassDesc) {
        for attachment in &desc.color_attachments {
            self.validate_view(attachment.view);
        }
        if let Some(ds) = &desc.depth_stencil {
            match self.view_texture(ds.view) {
                Some(texture) => precondition!(
                    self.texture_format(texture).is_depth(),
                    "render pass '{}' uses a color view as depth target",
                    desc.label
                ),
                None => panic!(
                    "precondition violated: render pass '{}' uses the swap chain as depth target",
                    desc.label
                ),
            }
        }
    }

    fn validate_view(&self, view: TextureView) {
        if self.view_texture(view).is_none() {
            precondition!(
                self.current_texture_view() == Some(view),
                "{view} refers to the swap chain but no drawable is acquired"
            );
        }
    }

    fn validate_list(&self, list: &CommandList) {
        let mut pipeline: Option<&PipelineInfo> = None;
        let mut index: Option<(Buffer, IndexFormat)> = None;
        let mut vertex_slots: Vec<u32> = Vec::new();

        for cmd in list.commands() {
            match cmd {
                Command::BeginRenderPass(desc) => {
                    self.validate_pass(desc);
                    pipeline = None;
                    index = None;
                    vertex_slots.clear();
                }
                Command::SetPipeline(p) => {
                    pipeline = Some(lookup(&self.pipelines, p.0, RenderPipeline::KIND));
                }
                Command::SetBindSet { index, bind_set } => {
                    precondition!(
                        (bind_set.0 as usize) < self.bind_sets,
                        "{bind_set} does not exist"
                    );
                    if let Some(pipeline) = pipeline {
                        precondition!(
                            *index < pipeline.bind_set_count,
                            "{bind_set} bound at index {index}, pipeline layout has {}",
                            pipeline.bind_set_count
                        );
                    }
                }
                Command::SetIndexBuffer { buffer, format } => {
                    let info = self.buffer_info(*buffer);
                    precondition!(
                        info.usage == BufferUsage::Index,
                        "'{}' bound as index buffer but is {:?}",
                        info.label,
                        info.usage
                    );
                    index = Some((*buffer, *format));
                }
                Command::SetVertexBuffers {
                    first_slot,
                    buffers,
                } => {
                    for (slot, buffer) in (*first_slot..).zip(buffers) {
                        let info = self.buffer_info(*buffer);
                        precondition!(
                            info.usage == BufferUsage::Vertex,
                            "'{}' bound as vertex buffer but is {:?}",
                            info.label,
                            info.usage
                        );
                        if !vertex_slots.contains(&slot) {
                            vertex_slots.push(slot);
                        }
                    }
                }
                Command::DrawIndexed {
                    index_count,
                    first_index,
                    ..
                } => {
                    let Some(pipeline) = pipeline else {
                        panic!("precondition violated: draw in '{}' with no pipeline", list.label());
                    };
                    let Some((buffer, format)) = index else {
                        panic!(
                            "precondition violated: draw in '{}' with no index buffer",
                            list.label()
                        );
                    };
                    let needed = (u64::from(*first_index) + u64::from(*index_count)) * format.size();
                    let info = self.buffer_info(buffer);
                    precondition!(
                        needed <= info.size,
                        "draw reads {} bytes of indices, '{}' holds {}",
                        needed,
                        info.label,
                        info.size
                    );
                    for slot in 0..pipeline.vertex_buffer_count {
                        precondition!(
                            vertex_slots.contains(&slot),
                            "draw with vertex slot {slot} unbound"
                        );
                    }
                }
                Command::EndRenderPass => {}
            }
        }
    }
}

fn check_known<T>(items: &[T], index: u32, kind: &str) {
    precondition!(
        (index as usize) < items.len(),
        "unknown {kind} #{index}"
    );
}

fn lookup<'a, T>(items: &'a [T], index: u32, kind: &str) -> &'a T {
    match items.get(index as usize) {
        Some(item) => item,
        None => panic!("precondition violated: unknown {kind} #{index}"),
    }
}
