//! # Graphics Resources Builder
//!
//! This module creates the GPU context the worker renders with. The host owns
//! window and adapter setup; the worker only receives a configured surface.
//!
//! The main components are:
//! - `prepare_surface`: adapter, device, queue and surface configuration for any surface
//! - `Graphics`: the window plus its prepared surface
//! - `GraphicsBuilder`: helper for asynchronous graphics initialization
//! - `MaybeGraphics`: represents the various states of graphics initialization

use crate::core::errors::WorkerError;
use crate::engine_state::rendering::PreparedSurface;
use wgpu::{Features, Instance, Surface};

#[cfg(not(target_family = "wasm"))]
use {
    super::HostEvent,
    log::{error, info},
    std::sync::Arc,
    winit::{
        dpi::LogicalSize,
        event_loop::{ActiveEventLoop, EventLoopProxy},
        window::Window,
    },
};

/// Creates the wgpu instance for the current platform.
pub fn create_instance() -> Instance {
    // Backends::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_family = "wasm"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_family = "wasm")]
        backends: wgpu::Backends::GL | wgpu::Backends::BROWSER_WEBGPU,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    })
}

/// Requests an adapter and device for `surface` and configures it.
///
/// # Arguments
/// * `instance` - The instance `surface` was created from
/// * `surface` - A window or canvas surface
/// * `width` - Initial width in physical pixels
/// * `height` - Initial height in physical pixels
///
/// # Returns
/// The prepared surface, or `WorkerError::Resource` when no adapter or
/// device is available
pub async fn prepare_surface(
    instance: &Instance,
    surface: Surface<'static>,
    width: u32,
    height: u32,
) -> Result<PreparedSurface, WorkerError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| WorkerError::Resource(format!("no compatible GPU adapter: {e}")))?;

    let required_limits = if cfg!(target_family = "wasm") {
        wgpu::Limits::downlevel_webgl2_defaults()
    } else {
        wgpu::Limits::default()
    };

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            required_features: Features::empty(),
            required_limits: required_limits.using_resolution(adapter.limits()),
            label: Some("Voxel Worker Device"),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| WorkerError::Resource(format!("could not create GPU device: {e}")))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| surface_caps.formats.first())
        .copied()
        .ok_or_else(|| WorkerError::Resource("surface supports no texture formats".into()))?;
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: width.max(1),
        height: height.max(1),
        present_mode: surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo),
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    Ok(PreparedSurface {
        surface,
        device,
        queue,
        config,
    })
}

/// The host window and the surface prepared for it.
#[cfg(not(target_family = "wasm"))]
pub struct Graphics {
    pub window: Arc<Window>,
    pub prepared: PreparedSurface,
}

/// Creates the window and prepares its surface, blocking until the device is ready.
#[cfg(not(target_family = "wasm"))]
fn create_graphics(event_loop: &ActiveEventLoop) -> Result<Graphics, WorkerError> {
    let window_attrs = Window::default_attributes()
        .with_title("Voxel Script Worker")
        .with_inner_size(LogicalSize::new(960.0, 720.0));
    let window = Arc::new(
        event_loop
            .create_window(window_attrs)
            .map_err(|e| WorkerError::Resource(format!("could not create window: {e}")))?,
    );

    let instance = create_instance();
    let surface = instance
        .create_surface(window.clone())
        .map_err(|e| WorkerError::Resource(format!("could not create surface: {e}")))?;

    let size = window.inner_size();
    let prepared = pollster::block_on(prepare_surface(&instance, surface, size.width, size.height))?;
    info!("Graphics ready at {}x{}", size.width, size.height);

    Ok(Graphics { window, prepared })
}

/// Helper struct for managing the initialization of graphics resources.
#[cfg(not(target_family = "wasm"))]
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<HostEvent>>,
}

/// Represents the possible states of the graphics initialization process.
#[cfg(not(target_family = "wasm"))]
pub enum MaybeGraphics {
    /// Waiting for the event loop to resume
    Builder(GraphicsBuilder),

    /// Graphics resources are ready but not yet handed to the worker
    Graphics(Graphics),

    /// The surface has been handed to the worker
    Moved,
}

#[cfg(not(target_family = "wasm"))]
impl GraphicsBuilder {
    /// Creates a new GraphicsBuilder with the specified event loop proxy.
    ///
    /// # Arguments
    /// * `event_loop_proxy` - Used to send the initialized graphics resources back to the main thread
    pub fn new(event_loop_proxy: EventLoopProxy<HostEvent>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
        }
    }

    /// Builds the graphics resources and sends them through the event loop.
    ///
    /// # Arguments
    /// * `event_loop` - The active event loop used to create the window
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            // event_loop_proxy is already spent - we already constructed Graphics
            return;
        };

        let event = match create_graphics(event_loop) {
            Ok(gfx) => HostEvent::GraphicsReady(Box::new(gfx)),
            Err(err) => HostEvent::GraphicsFailed(err.to_string()),
        };
        if event_loop_proxy.send_event(event).is_err() {
            error!("Event loop closed before graphics were ready");
        }
    }
}
