//! End-to-end runs of the triangle pipeline on the headless backend.

use glam::Vec3;
use prism_engine::camera::CameraConfig;
use prism_engine::input::{InputEvent, Key, KeyState};
use prism_engine::render::{Renderer, RendererConfig, ShaderCode, UniformUpdate};
use prism_engine::rhi::{
    Device, DeviceDesc, HeadlessBackend, HeadlessConfig, QueueOp, QueueType, RhiError,
    TextureFormat,
};
use prism_engine::runtime::{FrameLoop, FramePlatform, LoopConfig, LoopState};
use prism_engine::time::TimeStep;

/// Replays a fixed list of per-frame events and closes after `frames` polls.
struct ScriptedWindow {
    script: Vec<Vec<InputEvent>>,
    polls: usize,
    frames: usize,
}

impl ScriptedWindow {
    fn open_for(frames: usize) -> Self {
        Self {
            script: Vec::new(),
            polls: 0,
            frames,
        }
    }

    fn with_events(mut self, script: Vec<Vec<InputEvent>>) -> Self {
        self.script = script;
        self
    }
}

impl FramePlatform for ScriptedWindow {
    fn close_requested(&self) -> bool {
        self.polls >= self.frames
    }

    fn poll_events(&mut self, out: &mut Vec<InputEvent>) {
        if let Some(events) = self.script.get(self.polls) {
            out.extend(events.iter().cloned());
        }
        self.polls += 1;
    }
}

fn shaders() -> ShaderCode {
    ShaderCode {
        vertex: b"vertex blob".to_vec(),
        fragment: b"fragment blob".to_vec(),
    }
}

fn start(
    backend: HeadlessBackend,
    uniform_update: UniformUpdate,
) -> (FrameLoop, Renderer<HeadlessBackend>) {
    let frame_loop = FrameLoop::new(
        LoopConfig {
            time_step: TimeStep::Fixed(0.25),
            max_frames: None,
        },
        &CameraConfig::default(),
        (1024, 768),
    );
    let device = Device::new(backend, &DeviceDesc::default());
    let config = RendererConfig {
        uniform_update,
        ..Default::default()
    };
    let renderer = Renderer::new(device, &shaders(), frame_loop.camera(), &config)
        .expect("renderer setup on the headless backend");
    (frame_loop, renderer)
}

fn key(key: Key, state: KeyState) -> InputEvent {
    InputEvent::Key {
        key,
        state,
        repeat: false,
    }
}

#[test]
fn staged_upload_waits_before_the_first_draw() {
    let (mut frame_loop, mut renderer) = start(
        HeadlessBackend::with_transfer_queue(),
        UniformUpdate::OnceAtStartup,
    );
    assert!(renderer.upload_path().is_staged());
    frame_loop
        .run(&mut ScriptedWindow::open_for(2), &mut renderer)
        .unwrap();

    let journal = renderer.device().backend().journal();
    let res = renderer.resources();

    let writes: Vec<_> = journal
        .iter()
        .filter_map(|op| match op {
            QueueOp::WriteBuffer { queue, buffer, .. } => Some((*queue, *buffer)),
            _ => None,
        })
        .collect();
    assert_eq!(
        writes,
        vec![
            (QueueType::Transfer, res.index_buffer),
            (QueueType::Transfer, res.vertex_buffer),
            (QueueType::Transfer, res.uniform_buffer),
        ]
    );

    let transfer_submit = journal
        .iter()
        .position(|op| matches!(op, QueueOp::Submit { queue: QueueType::Transfer, .. }))
        .expect("transfer submission");
    let QueueOp::Submit {
        serial, transfers, ..
    } = &journal[transfer_submit]
    else {
        unreachable!()
    };
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].0, QueueType::Graphics);
    for buffer in [res.vertex_buffer, res.index_buffer, res.uniform_buffer] {
        assert!(transfers[0].1.contains(&buffer));
    }

    let wait = journal
        .iter()
        .position(|op| {
            *op == QueueOp::WaitFor {
                queue: QueueType::Graphics,
                producer: QueueType::Transfer,
                serial: *serial,
            }
        })
        .expect("graphics waits on the transfer serial");
    let first_draw = journal
        .iter()
        .position(|op| matches!(op, QueueOp::Submit { queue: QueueType::Graphics, .. }))
        .expect("a graphics submission");
    assert!(transfer_submit < wait && wait < first_draw);
}

#[test]
fn direct_upload_never_crosses_queues() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    assert!(!renderer.upload_path().is_staged());
    frame_loop
        .run(&mut ScriptedWindow::open_for(2), &mut renderer)
        .unwrap();

    let journal = renderer.device().backend().journal();
    assert!(!journal.iter().any(|op| matches!(op, QueueOp::WaitFor { .. })));
    assert!(journal.iter().all(|op| match op {
        QueueOp::WriteBuffer { queue, .. } | QueueOp::Submit { queue, .. } =>
            *queue == QueueType::Graphics,
        _ => true,
    }));
}

#[test]
fn each_frame_is_one_pass_one_draw_one_submit() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    renderer.device_mut().backend_mut().take_journal();

    let frames = frame_loop
        .run(&mut ScriptedWindow::open_for(3), &mut renderer)
        .unwrap();
    assert_eq!(frames, 3);

    let journal = renderer.device().backend().journal();
    let mut list_ids = Vec::new();
    for frame in journal.chunks(4) {
        match frame {
            [
                QueueOp::Acquire { frame: acquired },
                QueueOp::Submit {
                    queue: QueueType::Graphics,
                    lists,
                    render_passes: 1,
                    draws,
                    ..
                },
                QueueOp::Present { frame: presented },
                QueueOp::Tick,
            ] => {
                assert_eq!(acquired, presented);
                assert_eq!(lists.len(), 1);
                assert_eq!(draws, &vec![3]);
                list_ids.push(lists[0]);
            }
            other => panic!("unexpected frame shape: {other:?}"),
        }
    }
    assert_eq!(list_ids.len(), 3);
    list_ids.dedup();
    assert_eq!(list_ids.len(), 3, "every frame submits a fresh list");
}

#[test]
fn submission_serials_increase_per_frame() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    let graphics = renderer.device().graphics_queue();
    let before = renderer.device().last_submitted(graphics);
    frame_loop
        .run(&mut ScriptedWindow::open_for(5), &mut renderer)
        .unwrap();
    assert_eq!(
        renderer.device().last_submitted(graphics).get(),
        before.get() + 5
    );
}

#[test]
fn closed_window_renders_nothing() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    renderer.device_mut().backend_mut().take_journal();

    let frames = frame_loop
        .run(&mut ScriptedWindow::open_for(0), &mut renderer)
        .unwrap();
    assert_eq!(frames, 0);
    assert_eq!(frame_loop.state(), LoopState::Closing);
    assert!(renderer.device().backend().journal().is_empty());
}

#[test]
fn lost_device_ends_the_loop() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    let mut window = ScriptedWindow::open_for(10);
    frame_loop.step(&mut window, &mut renderer).unwrap();

    renderer
        .device_mut()
        .backend_mut()
        .fail_next_acquire("gpu reset");
    let err = frame_loop.run(&mut window, &mut renderer).unwrap_err();
    assert!(matches!(err, RhiError::DeviceLost(_)));
    assert_eq!(frame_loop.frame_count(), 1);
}

#[test]
fn movement_keys_reach_the_uniform_every_frame() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::EveryFrame);
    let uniform = renderer.resources().uniform_buffer;
    let startup = renderer
        .device()
        .backend()
        .buffer_contents(uniform)
        .unwrap()
        .to_vec();

    let mut window = ScriptedWindow::open_for(4).with_events(vec![
        vec![key(Key::W, KeyState::Pressed)],
        vec![],
        vec![key(Key::W, KeyState::Released)],
    ]);
    frame_loop.run(&mut window, &mut renderer).unwrap();

    // Moving for two frames of 0.25 s at unit speed.
    let position = frame_loop.camera().position;
    assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, 2.5), 1e-5), "{position}");

    let now = renderer.device().backend().buffer_contents(uniform).unwrap();
    assert_ne!(now, startup.as_slice());
    // The projection block is unchanged; only the view part moved.
    assert_eq!(&now[..64], &startup[..64]);
}

#[test]
fn startup_uniform_is_frozen_without_per_frame_updates() {
    let (mut frame_loop, mut renderer) =
        start(HeadlessBackend::default(), UniformUpdate::OnceAtStartup);
    let uniform = renderer.resources().uniform_buffer;
    let startup = renderer
        .device()
        .backend()
        .buffer_contents(uniform)
        .unwrap()
        .to_vec();

    let mut window =
        ScriptedWindow::open_for(3).with_events(vec![vec![key(Key::D, KeyState::Pressed)]]);
    frame_loop.run(&mut window, &mut renderer).unwrap();

    assert!(frame_loop.camera().position.x > 0.0);
    assert_eq!(
        renderer.device().backend().buffer_contents(uniform).unwrap(),
        startup.as_slice()
    );
}

#[test]
fn swap_chain_format_comes_from_the_backend() {
    let backend = HeadlessBackend::new(HeadlessConfig {
        swapchain_format: TextureFormat::Rgba8UnormSrgb,
        ..Default::default()
    });
    let (mut frame_loop, mut renderer) = start(backend, UniformUpdate::OnceAtStartup);
    assert_eq!(
        renderer.device().swap_chain_format(),
        TextureFormat::Rgba8UnormSrgb
    );
    assert_eq!(renderer.device().surface_size(), (1024, 768));
    frame_loop
        .run(&mut ScriptedWindow::open_for(1), &mut renderer)
        .unwrap();
    assert_eq!(frame_loop.frame_count(), 1);
}
