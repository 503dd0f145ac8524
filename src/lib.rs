#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Script Worker
//!
//! A message-driven worker that fills a cubic voxel grid by running a user
//! script once per cell, meshes the result with face culling, and renders it
//! with an orbiting camera.
//!
//! ## Key Modules
//!
//! * `application_state` - Hosts: the winit window, the headless runner and the CLI
//! * `core` - Configuration and the error taxonomy shared by every subsystem
//! * `engine_state` - The worker: protocol, controller, grid, scripting, meshing and rendering
//!
//! ## Architecture
//!
//! The host and the worker only talk through JSON messages:
//! * Native: the worker runs on its own thread behind a `WorkerHandle`
//! * Web: a JS web worker drives a `VoxelWorker` from `onmessage` and
//!   `requestAnimationFrame`
//!
//! ## Usage
//!
//! ```bash
//! voxel-script-worker --script sphere.rhai --grid-size 24
//! voxel-script-worker --headless --grid-size 8
//! ```

pub mod application_state;
pub mod core;
pub mod engine_state;
#[cfg(target_family = "wasm")]
pub mod web;

pub use crate::core::{WorkerConfig, WorkerError};
pub use engine_state::worker::{InboundMessage, OutboundMessage, WorkerController};
#[cfg(not(target_family = "wasm"))]
pub use engine_state::worker::WorkerHandle;

#[cfg(not(target_family = "wasm"))]
use {
    application_state::{cli::Cli, headless::run_headless, ApplicationState, HostEvent, HostOptions},
    clap::Parser,
    log::info,
    winit::event_loop::EventLoop,
};

/// Parses the command line and runs the windowed or headless host.
#[cfg(not(target_family = "wasm"))]
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Headless mode owns stdout for its JSON lines.
    let log_target = if cli.headless {
        env_logger::Target::Stderr
    } else {
        env_logger::Target::Stdout
    };
    let mut log_builder = env_logger::Builder::new();
    log_builder.target(log_target).parse_env("RUST_LOG").init();
    info!("Logger initialized");

    let options = HostOptions {
        config: cli.load_config()?,
        script: cli.load_script()?,
        grid_size: cli.grid_size,
    };

    if cli.headless {
        let stdout = std::io::stdout();
        return run_headless(options, &mut stdout.lock());
    }

    let event_loop = EventLoop::<HostEvent>::with_user_event().build()?;
    let mut state = ApplicationState::new(options, event_loop.create_proxy());
    event_loop.run_app(&mut state)?;
    Ok(())
}
