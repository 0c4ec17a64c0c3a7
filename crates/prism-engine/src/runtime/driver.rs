use crate::camera::{Camera, CameraConfig, CameraController};
use crate::input::{InputEvent, InputState};
use crate::render::Renderer;
use crate::rhi::{Backend, RhiResult};
use crate::time::{FrameClock, TimeStep};

/// Frame loop state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Closing,
}

#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    pub time_step: TimeStep,
    /// Stop after this many frames even if the window stays open.
    pub max_frames: Option<u64>,
}

/// What the frame loop needs from the windowing layer.
pub trait FramePlatform {
    /// The window's close flag.
    fn close_requested(&self) -> bool;

    /// Drains pending window events into `out`, translated to engine input events.
    fn poll_events(&mut self, out: &mut Vec<InputEvent>);
}

/// Drives the per-frame cadence.
///
/// Owns the camera, the cursor tracking and the input state, so input handling
/// needs no shared globals. One iteration is, strictly in order: poll input, update
/// the camera, acquire, render, present, tick, count the frame.
pub struct FrameLoop {
    config: LoopConfig,
    state: LoopState,
    camera: Camera,
    controller: CameraController,
    input: InputState,
    clock: FrameClock,
    frame_count: u64,
    events: Vec<InputEvent>,
}

impl FrameLoop {
    pub fn new(config: LoopConfig, camera: &CameraConfig, window_size: (u32, u32)) -> Self {
        Self {
            clock: FrameClock::new(config.time_step),
            config,
            state: LoopState::Running,
            camera: camera.camera(),
            controller: CameraController::new(camera, window_size),
            input: InputState::default(),
            frame_count: 0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Runs until the platform asks to close (or `max_frames` is reached).
    ///
    /// Any per-frame error is fatal and ends the loop.
    pub fn run<P, B>(&mut self, platform: &mut P, renderer: &mut Renderer<B>) -> RhiResult<u64>
    where
        P: FramePlatform,
        B: Backend,
    {
        log::info!("entering frame loop");
        self.clock.reset();
        while self.step(platform, renderer)? == LoopState::Running {}
        log::info!("frame loop closed after {} frames", self.frame_count);
        Ok(self.frame_count)
    }

    /// Runs a single iteration, or transitions to `Closing` without rendering.
    pub fn step<P, B>(
        &mut self,
        platform: &mut P,
        renderer: &mut Renderer<B>,
    ) -> RhiResult<LoopState>
    where
        P: FramePlatform,
        B: Backend,
    {
        if self.state == LoopState::Closing {
            return Ok(LoopState::Closing);
        }
        let frame_limit_hit = self
            .config
            .max_frames
            .is_some_and(|max| self.frame_count >= max);
        if platform.close_requested() || frame_limit_hit {
            self.state = LoopState::Closing;
            return Ok(LoopState::Closing);
        }

        self.events.clear();
        platform.poll_events(&mut self.events);
        for ev in &self.events {
            if self.input.apply_event(ev) {
                self.controller.handle_event(&mut self.camera, ev);
            }
        }

        let time = self.clock.tick();
        self.camera.update(time.dt);

        renderer.acquire()?;
        renderer.render(&self.camera)?;
        renderer.present()?;
        renderer.tick();

        self.frame_count += 1;
        Ok(LoopState::Running)
    }
}
