//! Web worker endpoint.
//!
//! A JS web worker creates one [`VoxelWorker`], transfers its
//! `OffscreenCanvas` with `attachCanvas`, forwards every `onmessage` payload
//! to `post_message` as JSON text, and calls `frame` from
//! `requestAnimationFrame`. Outbound messages reach the JS callback given to
//! the constructor as JSON text.
//!
//! ## Limitation: no interleaving during a run
//!
//! A run executes synchronously inside `post_message`, and the JS worker
//! cannot dispatch `onmessage` or `requestAnimationFrame` until it returns.
//! The controller therefore has no inbox here. Proxy events, resizes and
//! competing runs posted during a long `runPythonCode` are queued by the
//! browser and handled in order after the run finishes, not at yield points
//! as on native. Only the `warning` messages of the run arrive while it is
//! in progress.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use log::{debug, error};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::{Function, Promise};
use web_sys::OffscreenCanvas;

use crate::application_state::graphics_resources_builder::{create_instance, prepare_surface};
use crate::core::{errors::WorkerError, WorkerConfig};
use crate::engine_state::rendering::wgpu_backend::WgpuBackend;
use crate::engine_state::rendering::{PreparedSurface, RenderBackend, SurfaceFactory, SurfaceRequest};
use crate::engine_state::scripting::default_evaluator_factory;
use crate::engine_state::worker::{OutboundMessage, WorkerController};

static LOGGER: Once = Once::new();

type SurfaceSlot = Rc<RefCell<Option<PreparedSurface>>>;

/// Hands the attached canvas surface to `start`.
struct CanvasSurfaces {
    slot: SurfaceSlot,
}

impl SurfaceFactory for CanvasSurfaces {
    fn create(&mut self, request: &SurfaceRequest) -> Result<Box<dyn RenderBackend>, WorkerError> {
        let prepared = self.slot.borrow_mut().take().ok_or_else(|| {
            WorkerError::Resource("no canvas attached; call attachCanvas before start".into())
        })?;
        Ok(Box::new(WgpuBackend::new(
            prepared,
            request.width,
            request.height,
            request.clear_color,
        )))
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// The worker as seen from JavaScript.
#[wasm_bindgen]
pub struct VoxelWorker {
    controller: WorkerController,
    surface: SurfaceSlot,
}

#[wasm_bindgen]
impl VoxelWorker {
    /// Creates the worker and posts `ready`.
    ///
    /// # Arguments
    /// * `config_json` - Optional JSON worker configuration
    /// * `on_message` - Called with the JSON text of every outbound message
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, on_message: Function) -> Result<VoxelWorker, JsValue> {
        LOGGER.call_once(|| {
            console_error_panic_hook::set_once();
            if console_log::init_with_level(log::Level::Info).is_err() {
                web_sys::console::warn_1(&"Logger already initialized".into());
            }
        });

        let config = match config_json {
            Some(text) => WorkerConfig::from_json_str(&text).map_err(to_js)?,
            None => WorkerConfig::default(),
        };

        let surface = SurfaceSlot::default();
        let outbox = Box::new(move |message: OutboundMessage| {
            if let Err(err) = on_message.call1(&JsValue::NULL, &JsValue::from_str(&message.encode())) {
                error!("Could not deliver message to the host: {err:?}");
            }
        });
        let mut controller = WorkerController::new(
            config,
            Box::new(CanvasSurfaces {
                slot: Rc::clone(&surface),
            }),
            default_evaluator_factory(),
            outbox,
        );
        controller.announce_ready();

        Ok(Self { controller, surface })
    }

    /// Prepares a GPU surface on `canvas` for the next `start`.
    #[wasm_bindgen(js_name = attachCanvas)]
    pub fn attach_canvas(&self, canvas: OffscreenCanvas) -> Promise {
        let slot = Rc::clone(&self.surface);
        future_to_promise(async move {
            let (width, height) = (canvas.width(), canvas.height());
            let instance = create_instance();
            let surface = instance
                .create_surface(wgpu::SurfaceTarget::OffscreenCanvas(canvas))
                .map_err(to_js)?;
            let prepared = prepare_surface(&instance, surface, width, height)
                .await
                .map_err(to_js)?;
            *slot.borrow_mut() = Some(prepared);
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Handles one inbound message given as JSON text.
    ///
    /// # Returns
    /// `false` once the worker has terminated and the JS side should close
    pub fn post_message(&mut self, json: &str) -> bool {
        self.controller.handle_text(json).is_continue()
    }

    /// Draws one frame. Call from `requestAnimationFrame`.
    pub fn frame(&mut self) {
        if let Err(err) = self.controller.render_frame() {
            debug!("Frame skipped: {err}");
        }
    }
}
