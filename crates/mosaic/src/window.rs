//! winit window and event pump for the presentation loop.

use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::WindowConfig;
use crate::presentation::{EventPump, InputEvent};

const WINDOW_CREATE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("failed to create the event loop")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create the window")]
    CreateWindow(#[from] winit::error::OsError),
    #[error("the event loop never resumed, so no window was created")]
    NotResumed,
}

pub struct WinitEventPump {
    event_loop: EventLoop<()>,
    handler: InputCollector,
}

struct InputCollector {
    attributes: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    create_error: Option<winit::error::OsError>,
    events: Vec<InputEvent>,
}

impl WinitEventPump {
    /// Opens a resizable window and returns it with the pump that feeds its input.
    pub fn open(config: &WindowConfig) -> Result<(Self, Arc<Window>), WindowError> {
        let event_loop = EventLoop::new()?;
        let attributes = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(true);
        let mut pump = Self {
            event_loop,
            handler: InputCollector {
                attributes: Some(attributes),
                window: None,
                create_error: None,
                events: Vec::new(),
            },
        };

        // resumed() fires during the first pump on desktop platforms.
        let _ = pump
            .event_loop
            .pump_app_events(Some(WINDOW_CREATE_TIMEOUT), &mut pump.handler);
        if let Some(error) = pump.handler.create_error.take() {
            return Err(error.into());
        }
        let window = pump.handler.window.clone().ok_or(WindowError::NotResumed)?;
        tracing::info!(
            title = %config.title,
            width = window.inner_size().width,
            height = window.inner_size().height,
            "window opened"
        );
        Ok((pump, window))
    }
}

impl EventPump for WinitEventPump {
    fn pump(&mut self, timeout: Duration) -> Vec<InputEvent> {
        let status = self
            .event_loop
            .pump_app_events(Some(timeout), &mut self.handler);
        let mut events = std::mem::take(&mut self.handler.events);
        if let PumpStatus::Exit(code) = status {
            tracing::debug!(code, "event loop exited");
            events.push(InputEvent::Quit);
        }
        events
    }
}

impl ApplicationHandler for InputCollector {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.attributes.take() else {
            return;
        };
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(error) => self.create_error = Some(error),
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.events.push(InputEvent::Quit),
            WindowEvent::Resized(size) => self.events.push(InputEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.events.push(InputEvent::EscapePressed),
            _ => {}
        }
    }
}
