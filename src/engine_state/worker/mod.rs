//! # Worker
//!
//! The message-driven controller that owns the grid, the interpreter and the
//! scene, and the thread handle hosts use to talk to it.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --start--> Ready <--run/challenge--> Running
//!       |                    |                          |
//!       +------terminate-----+--------terminate---------+--> Terminated
//! ```
//!
//! A `terminate` that arrives while a script is running is parked and handled
//! once the run returns.
//!
//! ## Interleaving
//!
//! Runs execute on the worker thread. At every population yield point the
//! controller drains the mailbox and renders a frame if one is due, so input
//! and resizes stay live during long scans:
//! - `makeProxy`, `event` and `resize` are applied right away
//! - `runPythonCode` and `evaluateChallenge` are rejected (one run at a time)
//! - `start` is rejected, the worker is already started
//! - `terminate` and everything after it wait for the run to finish

pub mod challenge;
#[cfg(not(target_family = "wasm"))]
pub mod handle;
pub mod mailbox;
pub mod messages;
pub mod render_loop;

use std::ops::ControlFlow;
use std::sync::mpsc::Receiver;

use log::{debug, error, info, warn};
use web_time::Instant;

use crate::core::{errors::WorkerError, WorkerConfig};
use crate::engine_state::camera_state::OrbitController;
use crate::engine_state::proxy::ProxyRegistry;
use crate::engine_state::rendering::{SceneHost, SurfaceFactory, SurfaceRequest};
use crate::engine_state::scripting::{EvaluatorFactory, ScriptEvaluator};
use crate::engine_state::voxels::population::{populate, CellWarning, PopulationHooks};
use crate::engine_state::voxels::VoxelGrid;

#[cfg(not(target_family = "wasm"))]
pub use handle::WorkerHandle;
pub use mailbox::{Mail, Mailbox};
pub use messages::{InboundMessage, OutboundMessage, StartParams, Status};
pub use render_loop::RenderLoop;

/// Receives every message the worker sends to its host.
pub type Outbox = Box<dyn FnMut(OutboundMessage)>;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Running,
    Terminated,
}

/// Everything `start` creates and `terminate` releases.
struct WorkerState {
    grid: VoxelGrid,
    evaluator: Box<dyn ScriptEvaluator>,
    scene: SceneHost,
    render_loop: RenderLoop,
    running: bool,
}

/// The worker's message handler and state owner.
pub struct WorkerController {
    config: WorkerConfig,
    state: Option<WorkerState>,
    terminated: bool,
    proxies: ProxyRegistry,
    surfaces: Box<dyn SurfaceFactory>,
    evaluators: EvaluatorFactory,
    outbox: Outbox,
    mailbox: Mailbox,
}

impl WorkerController {
    /// Creates an uninitialized controller.
    ///
    /// # Arguments
    /// * `config` - Worker tunables
    /// * `surfaces` - Creates the render backend on `start`
    /// * `evaluators` - Creates the script evaluator on `start`
    /// * `outbox` - Receives outbound messages
    pub fn new(
        config: WorkerConfig,
        surfaces: Box<dyn SurfaceFactory>,
        evaluators: EvaluatorFactory,
        outbox: Outbox,
    ) -> Self {
        Self {
            config,
            state: None,
            terminated: false,
            proxies: ProxyRegistry::new(),
            surfaces,
            evaluators,
            outbox,
            mailbox: Mailbox::detached(),
        }
    }

    /// Attaches the inbound channel drained by [`run`](Self::run) and at yield points.
    pub fn with_inbox(mut self, rx: Receiver<String>) -> Self {
        self.mailbox = Mailbox::new(rx);
        self
    }

    /// Posts `ready`.
    pub fn announce_ready(&mut self) {
        info!("Worker ready");
        (self.outbox)(OutboundMessage::Ready);
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match &self.state {
            _ if self.terminated => Lifecycle::Terminated,
            None => Lifecycle::Uninitialized,
            Some(state) if state.running => Lifecycle::Running,
            Some(_) => Lifecycle::Ready,
        }
    }

    /// The live grid, once started.
    pub fn grid(&self) -> Option<&VoxelGrid> {
        self.state.as_ref().map(|state| &state.grid)
    }

    /// The scene, once started.
    pub fn scene(&self) -> Option<&SceneHost> {
        self.state.as_ref().map(|state| &state.scene)
    }

    pub fn proxies(&self) -> &ProxyRegistry {
        &self.proxies
    }

    /// Decodes and handles one message.
    ///
    /// # Returns
    /// `Break` once the worker has terminated
    pub fn handle_text(&mut self, text: &str) -> ControlFlow<()> {
        if self.terminated {
            return self.reject_terminated();
        }
        match InboundMessage::decode(text) {
            Ok(message) => self.handle(message),
            Err(err) => {
                error!("{err}");
                self.post(OutboundMessage::error(err.to_string()));
                ControlFlow::Continue(())
            }
        }
    }

    /// Handles one message.
    ///
    /// # Returns
    /// `Break` once the worker has terminated
    pub fn handle(&mut self, message: InboundMessage) -> ControlFlow<()> {
        if self.terminated {
            return self.reject_terminated();
        }
        debug!("Handling `{}`", message.kind());
        match message {
            InboundMessage::MakeProxy { id } => {
                self.proxies.make_proxy(id);
            }
            InboundMessage::Event { id, data } => {
                self.proxies.dispatch(&id, data);
            }
            InboundMessage::Start(params) => {
                let reply = match self.start(params) {
                    Ok(()) => OutboundMessage::Init { status: Status::Success },
                    Err(err) => failure("Initialization failed", err),
                };
                self.post(reply);
            }
            InboundMessage::Resize { width, height } => {
                let reply = match self.state.as_mut() {
                    Some(state) => resize_reply(&mut state.scene, width, height),
                    None => failure(
                        "Resize failed",
                        WorkerError::Resource("renderer, scene, or camera not initialized".into()),
                    ),
                };
                self.post(reply);
            }
            InboundMessage::RunPythonCode { code, grid_size } => {
                let reply = match self.run_script(&code, grid_size) {
                    Ok(()) => OutboundMessage::RunPythonCode { status: Status::Success },
                    Err(err) => failure("Code execution failed", err),
                };
                self.post(reply);
            }
            InboundMessage::EvaluateChallenge {
                target_code,
                user_code,
            } => {
                let reply = match self.evaluate_challenge(&target_code, &user_code) {
                    Ok(similarity) => OutboundMessage::ChallengeResult {
                        status: Status::Success,
                        similarity: Some(similarity),
                        message: None,
                    },
                    Err(message) => {
                        error!("{message}");
                        challenge_failure(message)
                    }
                };
                self.post(reply);
            }
            InboundMessage::Terminate => {
                self.terminate();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Draws one frame now, whether or not one is due.
    pub fn render_frame(&mut self) -> Result<(), WorkerError> {
        let state = self.state.as_mut().ok_or(WorkerError::NotInitialized)?;
        state.scene.render_frame(&mut self.proxies)
    }

    /// Draws a frame if the render loop says one is due.
    ///
    /// # Returns
    /// Whether a frame was drawn
    pub fn tick(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if !state.render_loop.due(Instant::now()) {
            return false;
        }
        if let Err(err) = state.scene.render_frame(&mut self.proxies) {
            error!("Render loop error: {err}");
        }
        true
    }

    /// Serves the inbound channel until `terminate` or until every sender is gone.
    pub fn run(mut self) {
        self.announce_ready();
        loop {
            let timeout = self
                .state
                .as_ref()
                .and_then(|state| state.render_loop.time_until_next(Instant::now()));
            match self.mailbox.wait(timeout) {
                Mail::Message(text) => {
                    if self.handle_text(&text).is_break() {
                        break;
                    }
                }
                Mail::Idle => {}
                Mail::Closed => {
                    info!("Host disconnected, shutting down");
                    self.release();
                    break;
                }
            }
            self.tick();
        }
        info!("Worker stopped");
    }

    fn post(&mut self, message: OutboundMessage) {
        (self.outbox)(message);
    }

    fn reject_terminated(&mut self) -> ControlFlow<()> {
        warn!("Message received after terminate");
        self.post(OutboundMessage::error(WorkerError::Terminated.to_string()));
        ControlFlow::Break(())
    }

    fn start(&mut self, params: StartParams) -> Result<(), WorkerError> {
        if self.state.is_some() {
            return Err(WorkerError::AlreadyInitialized);
        }
        if !self.proxies.contains(&params.canvas_id) {
            return Err(WorkerError::ProxyNotFound(params.canvas_id));
        }

        self.config.population.check_grid_size(params.grid_size)?;
        let grid = VoxelGrid::new(params.grid_size)?;
        let evaluator = (self.evaluators)(&self.config.script);
        let (width, height) = (to_pixels(params.width), to_pixels(params.height));
        let request = SurfaceRequest {
            canvas: params.canvas.map(|canvas| match canvas {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            }),
            width,
            height,
            clear_color: self.config.render.clear_color,
        };
        let backend = self.surfaces.create(&request)?;
        let orbit = params.enable_orbit_controls.then(|| {
            OrbitController::new(params.canvas_id.clone(), &self.config.orbit, params.grid_size)
        });

        let mut scene = SceneHost::new(backend, width, height, params.grid_size, &self.config, orbit);
        scene.rebuild_mesh(&grid)?;

        let mut render_loop = RenderLoop::new(self.config.render.frame_rate_hz);
        render_loop.start(Instant::now());

        self.state = Some(WorkerState {
            grid,
            evaluator,
            scene,
            render_loop,
            running: false,
        });
        info!(
            "Worker initialized: grid size {}, orbit controls {}",
            params.grid_size,
            if params.enable_orbit_controls { "on" } else { "off" }
        );
        Ok(())
    }

    fn run_script(&mut self, code: &str, grid_size: Option<usize>) -> Result<(), WorkerError> {
        let Self {
            config,
            state,
            proxies,
            outbox,
            mailbox,
            ..
        } = self;
        let state = state.as_mut().ok_or(WorkerError::NotInitialized)?;
        if state.running {
            return Err(WorkerError::Reentrancy);
        }

        if let Some(size) = grid_size.filter(|size| *size != state.grid.size()) {
            config.population.check_grid_size(size)?;
            state.grid = VoxelGrid::new(size)?;
            state.scene.set_grid_size(size);
            info!("Grid reallocated with size {size}");
        }

        state.running = true;
        let WorkerState {
            grid,
            evaluator,
            scene,
            render_loop,
            running,
        } = state;
        let mut hooks = Interleave {
            scene,
            render_loop,
            proxies,
            outbox,
            mailbox,
        };
        let result = populate(grid, &**evaluator, code, &config.population, &mut hooks);
        *running = false;

        let report = result?;
        debug!(
            "Run complete: {} cells, {} yields",
            report.evaluated, report.yields
        );
        Ok(())
    }

    fn evaluate_challenge(&mut self, target_code: &str, user_code: &str) -> Result<f64, String> {
        let Self {
            config,
            state,
            proxies,
            outbox,
            mailbox,
            ..
        } = self;
        let state = state
            .as_mut()
            .ok_or_else(|| String::from("Worker not ready or grid not initialized."))?;
        if state.running {
            return Err(format!("Challenge evaluation failed: {}", WorkerError::Reentrancy));
        }

        state.running = true;
        let WorkerState {
            grid,
            evaluator,
            scene,
            render_loop,
            running,
        } = state;
        let mut hooks = Interleave {
            scene,
            render_loop,
            proxies,
            outbox,
            mailbox,
        };
        let result = challenge::evaluate(
            grid,
            &**evaluator,
            target_code,
            user_code,
            &config.population,
            &mut hooks,
        );
        *running = false;

        result.map_err(|err| format!("Challenge evaluation failed: {err}"))
    }

    fn terminate(&mut self) {
        info!("Terminating worker");
        self.release();
        self.post(OutboundMessage::Terminate { status: Status::Success });
    }

    /// Stops the render loop and frees the scene and proxies. Idempotent.
    fn release(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.render_loop.stop();
            state.scene.dispose();
        }
        self.proxies.dispose();
        self.terminated = true;
    }
}

/// Population hooks that keep the worker responsive during a run.
struct Interleave<'a> {
    scene: &'a mut SceneHost,
    render_loop: &'a mut RenderLoop,
    proxies: &'a mut ProxyRegistry,
    outbox: &'a mut Outbox,
    mailbox: &'a mut Mailbox,
}

impl Interleave<'_> {
    fn post(&mut self, message: OutboundMessage) {
        (self.outbox)(message);
    }

    /// Handles a message that arrived mid-run.
    fn service(&mut self, text: String) {
        // Once something is parked, everything behind it is parked too.
        if self.mailbox.has_deferred() {
            self.mailbox.defer(text);
            return;
        }
        let message = match InboundMessage::decode(&text) {
            Ok(message) => message,
            Err(err) => {
                error!("{err}");
                self.post(OutboundMessage::error(err.to_string()));
                return;
            }
        };
        match message {
            InboundMessage::MakeProxy { id } => {
                self.proxies.make_proxy(id);
            }
            InboundMessage::Event { id, data } => {
                self.proxies.dispatch(&id, data);
            }
            InboundMessage::Resize { width, height } => {
                let reply = resize_reply(self.scene, width, height);
                self.post(reply);
            }
            InboundMessage::RunPythonCode { .. } => {
                warn!("Rejected run request: a script is already running");
                self.post(failure("Code execution failed", WorkerError::Reentrancy));
            }
            InboundMessage::EvaluateChallenge { .. } => {
                warn!("Rejected challenge request: a script is already running");
                self.post(challenge_failure(format!(
                    "Challenge evaluation failed: {}",
                    WorkerError::Reentrancy
                )));
            }
            InboundMessage::Start(_) => {
                self.post(failure("Initialization failed", WorkerError::AlreadyInitialized));
            }
            InboundMessage::Terminate => {
                info!("Terminate deferred until the current run finishes");
                self.mailbox.defer(text);
            }
        }
    }
}

impl PopulationHooks for Interleave<'_> {
    fn on_warning(&mut self, warning: CellWarning) {
        self.post(OutboundMessage::Warning {
            message: warning.to_string(),
        });
    }

    fn on_yield(&mut self) {
        while let Some(text) = self.mailbox.try_receive() {
            self.service(text);
        }
        if self.render_loop.due(Instant::now()) {
            if let Err(err) = self.scene.render_frame(self.proxies) {
                error!("Render loop error: {err}");
            }
        }
    }

    fn present(&mut self, grid: &VoxelGrid) -> Result<(), WorkerError> {
        self.scene.rebuild_mesh(grid)
    }
}

fn resize_reply(scene: &mut SceneHost, width: f64, height: f64) -> OutboundMessage {
    match scene.resize(to_pixels(width), to_pixels(height)) {
        Ok(()) => OutboundMessage::Resize { status: Status::Success },
        Err(err) => failure("Resize failed", err),
    }
}

/// Logs `err` and wraps it in an `error` reply prefixed with `context`.
fn failure(context: &str, err: WorkerError) -> OutboundMessage {
    let message = format!("{context}: {err}");
    error!("{message}");
    OutboundMessage::error(message)
}

fn challenge_failure(message: String) -> OutboundMessage {
    OutboundMessage::ChallengeResult {
        status: Status::Error,
        similarity: None,
        message: Some(message),
    }
}

/// Host sizes arrive as CSS pixel floats.
fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine_state::proxy::ProxyId;
    use crate::engine_state::rendering::{HeadlessProbe, HeadlessSurfaceFactory};
    use crate::engine_state::scripting::default_evaluator_factory;

    fn controller() -> (WorkerController, Arc<Mutex<Vec<OutboundMessage>>>, HeadlessProbe) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let surfaces = HeadlessSurfaceFactory::new();
        let probe = surfaces.probe();
        let controller = WorkerController::new(
            WorkerConfig::default(),
            Box::new(surfaces),
            default_evaluator_factory(),
            Box::new(move |message| sink.lock().unwrap().push(message)),
        );
        (controller, sent, probe)
    }

    fn start_message(grid_size: usize) -> InboundMessage {
        InboundMessage::Start(StartParams {
            canvas: None,
            width: 640.0,
            height: 480.0,
            grid_size,
            canvas_id: ProxyId::new("canvas"),
            enable_orbit_controls: true,
        })
    }

    fn started(grid_size: usize) -> (WorkerController, Arc<Mutex<Vec<OutboundMessage>>>, HeadlessProbe) {
        let (mut controller, sent, probe) = controller();
        controller.handle(InboundMessage::MakeProxy { id: ProxyId::new("canvas") });
        controller.handle(start_message(grid_size));
        assert_eq!(controller.lifecycle(), Lifecycle::Ready);
        sent.lock().unwrap().clear();
        (controller, sent, probe)
    }

    fn run(code: &str) -> InboundMessage {
        InboundMessage::RunPythonCode { code: code.into(), grid_size: None }
    }

    #[test]
    fn start_requires_a_registered_proxy() {
        let (mut controller, sent, _) = controller();
        controller.handle(start_message(4));
        assert_eq!(controller.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [OutboundMessage::error(
                "Initialization failed: no input proxy registered with id `canvas`"
            )]
        );
    }

    #[test]
    fn start_twice_is_rejected() {
        let (mut controller, sent, _) = started(4);
        controller.handle(start_message(4));
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [OutboundMessage::error("Initialization failed: Worker already initialized")]
        );
    }

    #[test]
    fn commands_before_start_fail() {
        let (mut controller, sent, _) = controller();
        controller.handle(run("fn draw(x, y, z, n) { true }"));
        controller.handle(InboundMessage::EvaluateChallenge {
            target_code: String::new(),
            user_code: String::new(),
        });
        let sent = sent.lock().unwrap();
        assert_eq!(
            sent[0],
            OutboundMessage::error("Code execution failed: Worker not initialized")
        );
        assert_eq!(
            sent[1],
            OutboundMessage::ChallengeResult {
                status: Status::Error,
                similarity: None,
                message: Some("Worker not ready or grid not initialized.".into()),
            }
        );
    }

    #[test]
    fn run_populates_and_swaps_the_mesh() {
        let (mut controller, sent, probe) = started(4);
        controller.handle(run("fn draw(x, y, z, n) { if x == 0 { \"red\" } else { false } }"));
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::RunPythonCode { status: Status::Success })
        );
        assert_eq!(controller.grid().unwrap().occupied_count(), 16);
        assert_eq!(probe.stats().face_count, controller.scene().unwrap().mesh().face_count());
        assert!(probe.stats().face_count > 0);
    }

    #[test]
    fn syntax_error_clears_the_grid() {
        let (mut controller, sent, probe) = started(3);
        controller.handle(run("fn draw(x, y, z, n) { true }"));
        controller.handle(run("fn draw(x, y, z, n) { true "));
        let last = sent.lock().unwrap().last().cloned();
        match last {
            Some(OutboundMessage::Error { message }) => {
                assert!(message.starts_with("Code execution failed: Python Syntax Error: "))
            }
            other => panic!("expected an error, got {other:?}"),
        }
        assert_eq!(controller.grid().unwrap().occupied_count(), 0);
        assert_eq!(probe.stats().face_count, 0);
        assert_eq!(controller.lifecycle(), Lifecycle::Ready);
    }

    #[test]
    fn grid_size_change_reallocates() {
        let (mut controller, _, _) = started(4);
        controller.handle(InboundMessage::RunPythonCode {
            code: "fn draw(x, y, z, n) { true }".into(),
            grid_size: Some(6),
        });
        assert_eq!(controller.grid().unwrap().size(), 6);
        assert_eq!(controller.grid().unwrap().occupied_count(), 216);
    }

    #[test]
    fn zero_grid_size_is_rejected() {
        let (mut controller, sent, _) = started(4);
        controller.handle(InboundMessage::RunPythonCode {
            code: "fn draw(x, y, z, n) { true }".into(),
            grid_size: Some(0),
        });
        assert!(matches!(
            sent.lock().unwrap().last(),
            Some(OutboundMessage::Error { .. })
        ));
        assert_eq!(controller.grid().unwrap().size(), 4);
    }

    #[test]
    fn oversized_grid_is_rejected_without_touching_the_worker() {
        let (mut controller, sent, _) = started(4);
        controller.handle(run("fn draw(x, y, z, n) { y == 0 }"));
        sent.lock().unwrap().clear();

        for huge in [257, 2_100_000, usize::MAX] {
            let flow = controller.handle(InboundMessage::RunPythonCode {
                code: "fn draw(x, y, z, n) { true }".into(),
                grid_size: Some(huge),
            });
            assert!(flow.is_continue());
        }
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent.len(), 3);
            assert_eq!(
                sent[0],
                OutboundMessage::error(
                    "Code execution failed: grid size 257 exceeds the configured maximum of 256"
                )
            );
            assert!(sent.iter().all(|m| matches!(m, OutboundMessage::Error { .. })));
        }
        assert_eq!(controller.lifecycle(), Lifecycle::Ready);
        assert_eq!(controller.grid().unwrap().size(), 4);
        assert_eq!(controller.grid().unwrap().occupied_count(), 16);
    }

    #[test]
    fn unallocatable_grid_is_an_error_even_without_a_cap() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let mut config = WorkerConfig::default();
        config.population.max_grid_size = usize::MAX;
        let mut controller = WorkerController::new(
            config,
            Box::new(HeadlessSurfaceFactory::new()),
            default_evaluator_factory(),
            Box::new(move |message| sink.lock().unwrap().push(message)),
        );
        controller.handle(InboundMessage::MakeProxy { id: ProxyId::new("canvas") });
        controller.handle(start_message(3));

        let flow = controller.handle(InboundMessage::RunPythonCode {
            code: "fn draw(x, y, z, n) { true }".into(),
            grid_size: Some(2_100_000),
        });
        assert!(flow.is_continue());
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::error(format!(
                "Code execution failed: {}",
                WorkerError::InvalidGridSize(2_100_000)
            )))
        );
        assert_eq!(controller.lifecycle(), Lifecycle::Ready);
        assert_eq!(controller.grid().unwrap().size(), 3);
    }

    #[test]
    fn start_rejects_an_oversized_grid() {
        let (mut controller, sent, _) = controller();
        controller.handle(InboundMessage::MakeProxy { id: ProxyId::new("canvas") });
        controller.handle(start_message(2_100_000));
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::error(
                "Initialization failed: grid size 2100000 exceeds the configured maximum of 256"
            ))
        );
        assert_eq!(controller.lifecycle(), Lifecycle::Uninitialized);
    }

    #[test]
    fn failing_cell_posts_a_warning() {
        let (mut controller, sent, _) = started(4);
        controller.handle(run(
            "fn draw(x, y, z, n) { if x == 2 && y == 3 && z == 1 { throw \"boom\" } else { true } }",
        ));
        let sent = sent.lock().unwrap();
        let warnings: Vec<_> = sent
            .iter()
            .filter(|m| matches!(m, OutboundMessage::Warning { .. }))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(controller.grid().unwrap().occupied_count(), 63);
    }

    #[test]
    fn challenge_leaves_the_live_grid_untouched() {
        let (mut controller, sent, _) = started(4);
        controller.handle(run("fn draw(x, y, z, n) { y == 0 }"));
        let before = controller.grid().unwrap().clone();
        controller.handle(InboundMessage::EvaluateChallenge {
            target_code: "fn draw(x, y, z, n) { x < 2 }".into(),
            user_code: "fn draw(x, y, z, n) { x < 1 }".into(),
        });
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::ChallengeResult {
                status: Status::Success,
                similarity: Some(0.5),
                message: None,
            })
        );
        assert_eq!(controller.grid().unwrap(), &before);
        // The restored y == 0 slab: 16 top, 16 bottom and 4 on each side.
        assert_eq!(controller.scene().unwrap().mesh().face_count(), 16 + 16 + 4 * 4);
    }

    #[test]
    fn resize_before_start_fails_and_after_start_succeeds() {
        let (mut controller, sent, _) = controller();
        controller.handle(InboundMessage::Resize { width: 10.0, height: 10.0 });
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::error(
                "Resize failed: render resource unavailable: renderer, scene, or camera not initialized"
            ))
        );

        let (mut controller, sent, probe) = started(2);
        controller.handle(InboundMessage::Resize { width: 800.0, height: 600.0 });
        assert_eq!(
            sent.lock().unwrap().last(),
            Some(&OutboundMessage::Resize { status: Status::Success })
        );
        assert_eq!((probe.stats().width, probe.stats().height), (800, 600));
        assert_eq!(controller.scene().unwrap().size(), (800, 600));
    }

    #[test]
    fn terminate_releases_and_rejects_later_messages() {
        let (mut controller, sent, probe) = started(2);
        assert!(controller.handle(InboundMessage::Terminate).is_break());
        assert!(probe.stats().released);
        assert!(controller.proxies().is_empty());
        assert_eq!(controller.lifecycle(), Lifecycle::Terminated);
        assert!(controller.handle_text(r#"{"type":"resize","width":1,"height":1}"#).is_break());
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0], OutboundMessage::Terminate { status: Status::Success });
        assert_eq!(sent[1], OutboundMessage::error("Worker has been terminated"));
    }

    #[test]
    fn unknown_type_replies_with_an_error() {
        let (mut controller, sent, _) = controller();
        assert!(controller.handle_text(r#"{"type":"explode"}"#).is_continue());
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [OutboundMessage::error("Unknown message type: explode")]
        );
    }

    #[test]
    fn messages_queued_during_a_run_are_interleaved() {
        let (tx, rx) = mpsc::channel();
        let (controller, sent, probe) = started(6);
        let mut controller = controller.with_inbox(rx);
        let later_run = run("fn draw(x, y, z, n) { false }").encode();
        tx.send(InboundMessage::Resize { width: 320.0, height: 200.0 }.encode()).unwrap();
        tx.send(later_run).unwrap();
        tx.send(InboundMessage::Terminate.encode()).unwrap();
        tx.send(InboundMessage::MakeProxy { id: ProxyId::new("late") }.encode()).unwrap();

        assert!(controller.handle(run("fn draw(x, y, z, n) { true }")).is_continue());
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent[0], OutboundMessage::Resize { status: Status::Success });
            assert_eq!(
                sent[1],
                OutboundMessage::error(
                    "Code execution failed: a script is already running; wait for it to finish before starting another"
                )
            );
            assert_eq!(sent[2], OutboundMessage::RunPythonCode { status: Status::Success });
            assert_eq!(sent.len(), 3);
        }
        assert_eq!(controller.grid().unwrap().occupied_count(), 216);
        assert_eq!(probe.stats().width, 320);
        assert!(!controller.proxies().contains(&ProxyId::new("late")));

        // The parked terminate runs next, ahead of anything still in the channel.
        assert_eq!(controller.mailbox.next_deferred(), Some(InboundMessage::Terminate.encode()));
    }
}
