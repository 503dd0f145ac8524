//! Headless host: drives the worker over the same protocol without a window
//! and prints every outbound message as a JSON line.

use std::io::Write;
use std::sync::mpsc::Receiver;

use anyhow::{bail, Context};
use log::info;
use web_time::Duration;

use super::host::{HostOptions, CANVAS_PROXY_ID};
use crate::engine_state::proxy::ProxyId;
use crate::engine_state::rendering::HeadlessSurfaceFactory;
use crate::engine_state::scripting::default_evaluator_factory;
use crate::engine_state::worker::{InboundMessage, OutboundMessage, StartParams, WorkerHandle};

/// Surface size reported to the worker.
const HEADLESS_SIZE: (f64, f64) = (640.0, 480.0);

/// Longest wait for any single reply before giving up.
const REPLY_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs the script once and terminates the worker.
///
/// # Arguments
/// * `options` - Configuration, script and grid size
/// * `out` - Receives one JSON line per outbound message
pub fn run_headless(options: HostOptions, out: &mut dyn Write) -> anyhow::Result<()> {
    if options.script.trim().is_empty() {
        bail!("the script is empty");
    }

    let surfaces = HeadlessSurfaceFactory::new();
    let probe = surfaces.probe();
    let (worker, outbound) =
        WorkerHandle::spawn_with_channel(options.config, Box::new(surfaces), default_evaluator_factory())?;

    let canvas_id = ProxyId::new(CANVAS_PROXY_ID);
    worker.post(&InboundMessage::MakeProxy { id: canvas_id.clone() })?;
    worker.post(&InboundMessage::Start(StartParams {
        canvas: None,
        width: HEADLESS_SIZE.0,
        height: HEADLESS_SIZE.1,
        grid_size: options.grid_size,
        canvas_id,
        enable_orbit_controls: true,
    }))?;
    worker.post(&InboundMessage::RunPythonCode {
        code: options.script,
        grid_size: Some(options.grid_size),
    })?;

    print_until(&outbound, out, |message| {
        matches!(
            message,
            OutboundMessage::RunPythonCode { .. } | OutboundMessage::Error { .. }
        )
    })?;
    worker.post(&InboundMessage::Terminate)?;
    print_until(&outbound, out, |message| {
        matches!(message, OutboundMessage::Terminate { .. })
    })?;
    worker.join()?;

    let stats = probe.stats();
    info!(
        "Headless run finished: {} faces, {} frames rendered",
        stats.face_count, stats.frames_rendered
    );
    Ok(())
}

/// Prints outbound messages until one satisfies `done`.
fn print_until(
    outbound: &Receiver<OutboundMessage>,
    out: &mut dyn Write,
    done: impl Fn(&OutboundMessage) -> bool,
) -> anyhow::Result<()> {
    loop {
        let message = outbound
            .recv_timeout(REPLY_TIMEOUT)
            .context("worker stopped replying")?;
        writeln!(out, "{}", message.encode())?;
        if done(&message) {
            return Ok(());
        }
    }
}
