use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use super::FramePlatform;
use crate::input::platform::translate_window_event;
use crate::input::InputEvent;
use crate::rhi::{RhiError, RhiResult};

const CREATE_ATTEMPTS: u32 = 100;
const CREATE_WAIT: Duration = Duration::from_millis(10);

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    /// Inner size in physical pixels.
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "draw triangle".to_string(),
            width: 1024,
            height: 768,
            resizable: false,
        }
    }
}

/// A single winit window whose event loop is pumped once per frame.
///
/// The frame loop owns the cadence, so winit never runs its own loop here: each
/// [`FramePlatform::poll_events`] drains whatever is pending without blocking.
pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    state: WindowState,
}

struct WindowState {
    config: WindowConfig,
    window: Option<Arc<Window>>,
    create_error: Option<String>,
    close_requested: bool,
    pending: Vec<InputEvent>,
}

impl WinitPlatform {
    /// Opens the window. Fails with [`RhiError::EnvironmentInit`] when there is no
    /// usable windowing system.
    pub fn new(config: WindowConfig) -> RhiResult<Self> {
        let mut event_loop =
            EventLoop::new().map_err(|e| RhiError::EnvironmentInit(e.to_string()))?;
        let mut state = WindowState {
            config,
            window: None,
            create_error: None,
            close_requested: false,
            pending: Vec::new(),
        };

        // Windows can only be created once the loop reports `resumed`.
        for _ in 0..CREATE_ATTEMPTS {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(CREATE_WAIT), &mut state)
            {
                let reason = state
                    .create_error
                    .take()
                    .unwrap_or_else(|| format!("event loop exited with code {code}"));
                return Err(RhiError::EnvironmentInit(reason));
            }
            if state.window.is_some() {
                return Ok(Self { event_loop, state });
            }
        }

        Err(RhiError::EnvironmentInit(
            "event loop never became ready for window creation".to_string(),
        ))
    }

    pub fn window(&self) -> Option<Arc<Window>> {
        self.state.window.clone()
    }

    /// Inner size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        match &self.state.window {
            Some(window) => {
                let size = window.inner_size();
                (size.width, size.height)
            }
            None => (self.state.config.width, self.state.config.height),
        }
    }
}

impl FramePlatform for WinitPlatform {
    fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    fn poll_events(&mut self, out: &mut Vec<InputEvent>) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
        if let PumpStatus::Exit(code) = status {
            log::info!("event loop exited with code {code}");
            self.state.close_requested = true;
        }
        out.append(&mut self.state.pending);
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.config.title.as_str())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                log::info!(
                    "window '{}' opened at {:?}",
                    self.config.title,
                    window.inner_size()
                );
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                self.create_error = Some(format!("failed to create window: {e}"));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Destroyed => self.close_requested = true,
            _ => {
                if let Some(ev) = translate_window_event(&event) {
                    self.pending.push(ev);
                }
            }
        }
    }
}
