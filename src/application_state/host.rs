//! Windowed host: owns the window, forwards input to the worker and reacts to
//! its replies.

use std::sync::Arc;

use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use super::graphics_resources_builder::{Graphics, GraphicsBuilder, MaybeGraphics};
use super::input_manager::InputManager;
use crate::core::{errors::WorkerError, WorkerConfig};
use crate::engine_state::proxy::events::ClientRect;
use crate::engine_state::proxy::{ProxyEventData, ProxyId};
use crate::engine_state::rendering::WgpuSurfaceFactory;
use crate::engine_state::scripting::default_evaluator_factory;
use crate::engine_state::worker::{InboundMessage, OutboundMessage, StartParams, Status, WorkerHandle};

/// Proxy id of the window surface.
pub const CANVAS_PROXY_ID: &str = "canvas";

/// Events delivered to the host's event loop.
pub enum HostEvent {
    /// The window and its surface are ready
    GraphicsReady(Box<Graphics>),
    /// The window or GPU context could not be created
    GraphicsFailed(String),
    /// A message from the worker thread
    Worker(OutboundMessage),
}

/// What the host runs once the window is up.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub config: WorkerConfig,
    pub script: String,
    pub grid_size: usize,
}

/// The main application state container that manages the application's lifecycle.
pub struct ApplicationState {
    /// The current graphics state, which may be initializing, ready or handed over
    pub graphics: MaybeGraphics,

    /// The running host, once the worker has been spawned
    pub state: Option<InitializedApplicationState>,

    options: HostOptions,
    event_loop_proxy: EventLoopProxy<HostEvent>,
}

/// The host after the worker thread has been spawned.
pub struct InitializedApplicationState {
    /// Channel to the worker thread
    pub worker: WorkerHandle,

    /// Handle to the application window
    pub window: Arc<Window>,

    /// Turns window input into proxy events
    pub input_manager: InputManager,

    canvas_id: ProxyId,
    run_in_flight: bool,
    terminating: bool,
}

impl ApplicationState {
    /// Creates the host in its initializing state.
    ///
    /// # Arguments
    /// * `options` - Configuration, script and grid size for the worker
    /// * `event_loop_proxy` - Carries graphics and worker events back to the event loop
    pub fn new(options: HostOptions, event_loop_proxy: EventLoopProxy<HostEvent>) -> Self {
        Self {
            graphics: MaybeGraphics::Builder(GraphicsBuilder::new(event_loop_proxy.clone())),
            state: None,
            options,
            event_loop_proxy,
        }
    }

    /// Spawns the worker on the prepared surface and sends the startup sequence.
    fn initialize_application_state(&mut self) -> Result<(), WorkerError> {
        let Graphics { window, prepared } = match std::mem::replace(&mut self.graphics, MaybeGraphics::Moved) {
            MaybeGraphics::Graphics(graphics) => graphics,
            other => {
                self.graphics = other;
                return Ok(());
            }
        };

        let proxy = self.event_loop_proxy.clone();
        let worker = WorkerHandle::spawn(
            self.options.config.clone(),
            Box::new(WgpuSurfaceFactory::new(prepared)),
            default_evaluator_factory(),
            Box::new(move |message| {
                // The event loop may already be gone during shutdown.
                let _ = proxy.send_event(HostEvent::Worker(message));
            }),
        )?;

        let canvas_id = ProxyId::new(CANVAS_PROXY_ID);
        let size = window.inner_size();
        worker.post(&InboundMessage::MakeProxy { id: canvas_id.clone() })?;
        worker.post(&size_event(&canvas_id, size))?;
        worker.post(&InboundMessage::Start(StartParams {
            canvas: None,
            width: size.width as f64,
            height: size.height as f64,
            grid_size: self.options.grid_size,
            canvas_id: canvas_id.clone(),
            enable_orbit_controls: true,
        }))?;

        let mut state = InitializedApplicationState {
            worker,
            window,
            input_manager: InputManager::new(),
            canvas_id,
            run_in_flight: false,
            terminating: false,
        };
        state.run_script(&self.options.script, self.options.grid_size)?;
        self.state = Some(state);
        Ok(())
    }
}

impl InitializedApplicationState {
    /// Posts `runPythonCode` unless the script is empty or a run is already in flight.
    fn run_script(&mut self, script: &str, grid_size: usize) -> Result<(), WorkerError> {
        if script.trim().is_empty() {
            warn!("Refusing to run an empty script");
            return Ok(());
        }
        if self.run_in_flight {
            warn!("A script is already running; wait for it to finish");
            return Ok(());
        }
        self.worker.post(&InboundMessage::RunPythonCode {
            code: script.to_string(),
            grid_size: Some(grid_size),
        })?;
        self.run_in_flight = true;
        Ok(())
    }

    fn forward(&self, data: ProxyEventData) {
        let message = InboundMessage::Event {
            id: self.canvas_id.clone(),
            data,
        };
        if let Err(err) = self.worker.post(&message) {
            warn!("Dropped input event: {err}");
        }
    }

    /// Asks the worker to shut down; the event loop exits on its reply.
    fn request_terminate(&mut self, event_loop: &ActiveEventLoop) {
        if self.terminating {
            return;
        }
        self.terminating = true;
        if self.worker.post(&InboundMessage::Terminate).is_err() {
            event_loop.exit();
        }
    }
}

fn size_event(id: &ProxyId, size: PhysicalSize<u32>) -> InboundMessage {
    InboundMessage::Event {
        id: id.clone(),
        data: ProxyEventData::Size(ClientRect {
            left: 0.0,
            top: 0.0,
            width: size.width as f32,
            height: size.height as f32,
        }),
    }
}

impl ApplicationHandler<HostEvent> for ApplicationState {
    /// Forwards input to the worker and handles resize and close requests.
    ///
    /// # Arguments
    /// * `event_loop` - Reference to the active event loop
    /// * `_window_id` - ID of the window that generated the event
    /// * `event` - The window event to process
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        if let Some(data) = state.input_manager.intake_input(&event) {
            state.forward(data);
        }

        match event {
            WindowEvent::Resized(size) => {
                let resize = InboundMessage::Resize {
                    width: size.width as f64,
                    height: size.height as f64,
                };
                let posted = state
                    .worker
                    .post(&size_event(&state.canvas_id, size))
                    .and_then(|()| state.worker.post(&resize));
                if let Err(err) = posted {
                    warn!("Could not forward resize: {err}");
                }
            }
            WindowEvent::Focused(false) => state.input_manager.reset_inputs(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::KeyR),
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Err(err) = state.run_script(&self.options.script, self.options.grid_size) {
                    error!("Could not rerun script: {err}");
                }
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => state.request_terminate(event_loop),
            _ => (),
        }
    }

    /// Starts graphics initialization on the first resume.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    /// Handles graphics readiness and worker replies.
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::GraphicsReady(graphics) => {
                self.graphics = MaybeGraphics::Graphics(*graphics);
                if let Err(err) = self.initialize_application_state() {
                    error!("Could not start the worker: {err}");
                    event_loop.exit();
                }
            }
            HostEvent::GraphicsFailed(message) => {
                error!("Graphics initialization failed: {message}");
                event_loop.exit();
            }
            HostEvent::Worker(message) => {
                let Some(state) = &mut self.state else {
                    return;
                };
                match message {
                    OutboundMessage::Ready => info!("Worker is ready"),
                    OutboundMessage::Init { .. } => info!("Worker initialized"),
                    OutboundMessage::Resize { .. } => {}
                    OutboundMessage::RunPythonCode { .. } => {
                        state.run_in_flight = false;
                        info!("Script finished");
                    }
                    OutboundMessage::Warning { message } => warn!("{message}"),
                    OutboundMessage::Error { message } => {
                        state.run_in_flight = false;
                        error!("{message}");
                    }
                    OutboundMessage::ChallengeResult { status, similarity, message } => {
                        info!("Challenge result: {status:?} {similarity:?} {message:?}")
                    }
                    OutboundMessage::Terminate { status: Status::Success | Status::Error } => {
                        info!("Worker terminated");
                        event_loop.exit();
                    }
                }
            }
        }
    }
}
