//! # Worker Handle
//!
//! Host end of a worker running on its own thread.
//!
//! ## Channels
//! - inbound: JSON text from the host, drained by [`WorkerController::run`]
//!   and at every population yield point
//! - outbound: whatever sink the host supplies; [`WorkerHandle::spawn_with_channel`]
//!   wires it to an mpsc receiver
//!
//! Dropping every sender (or the handle itself) shuts the worker down and
//! releases its scene, as if it had been sent `terminate`.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::info;

use super::messages::{InboundMessage, OutboundMessage};
use super::WorkerController;
use crate::core::{errors::WorkerError, WorkerConfig};
use crate::engine_state::rendering::SurfaceFactory;
use crate::engine_state::scripting::EvaluatorFactory;

/// Host-side handle to a worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    sender: Sender<String>,
    worker: JoinHandle<()>,
}

impl WorkerHandle {
    /// Starts a worker thread.
    ///
    /// # Arguments
    /// * `config` - Worker tunables
    /// * `surfaces` - Creates the render backend when `start` arrives
    /// * `evaluators` - Creates the script evaluator when `start` arrives
    /// * `sink` - Called on the worker thread for every outbound message
    ///
    /// # Returns
    /// The handle, or `WorkerError::Resource` if the thread cannot be spawned
    pub fn spawn(
        config: WorkerConfig,
        surfaces: Box<dyn SurfaceFactory + Send>,
        evaluators: EvaluatorFactory,
        sink: Box<dyn FnMut(OutboundMessage) + Send>,
    ) -> Result<Self, WorkerError> {
        let (sender, inbox) = channel::<String>();

        let worker_closure = move || {
            WorkerController::new(config, surfaces, evaluators, sink)
                .with_inbox(inbox)
                .run();
        };

        let worker = thread::Builder::new()
            .name("voxel-script-worker".into())
            .spawn(worker_closure)
            .map_err(|e| WorkerError::Resource(format!("could not spawn worker thread: {e}")))?;
        info!("Worker thread spawned");

        Ok(Self { sender, worker })
    }

    /// Starts a worker whose outbound messages land on the returned receiver.
    pub fn spawn_with_channel(
        config: WorkerConfig,
        surfaces: Box<dyn SurfaceFactory + Send>,
        evaluators: EvaluatorFactory,
    ) -> Result<(Self, Receiver<OutboundMessage>), WorkerError> {
        let (result_tx, result_rx) = channel::<OutboundMessage>();
        let sink = Box::new(move |message| {
            // The host may have stopped listening; the worker keeps going regardless.
            let _ = result_tx.send(message);
        });
        let handle = Self::spawn(config, surfaces, evaluators, sink)?;
        Ok((handle, result_rx))
    }

    /// Posts a message to the worker.
    ///
    /// # Returns
    /// `WorkerError::Terminated` if the worker thread has exited
    pub fn post(&self, message: &InboundMessage) -> Result<(), WorkerError> {
        self.post_json(message.encode())
    }

    /// Posts raw JSON text to the worker, exactly as a browser host would.
    pub fn post_json(&self, text: impl Into<String>) -> Result<(), WorkerError> {
        self.sender
            .send(text.into())
            .map_err(|_| WorkerError::Terminated)
    }

    /// A sender other threads can use to post JSON text.
    pub fn sender(&self) -> Sender<String> {
        self.sender.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Closes this handle's channel and waits for the worker thread to exit.
    pub fn join(self) -> Result<(), WorkerError> {
        let Self { sender, worker } = self;
        drop(sender);
        worker
            .join()
            .map_err(|_| WorkerError::Resource("worker thread panicked".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine_state::proxy::ProxyId;
    use crate::engine_state::rendering::HeadlessSurfaceFactory;
    use crate::engine_state::scripting::default_evaluator_factory;
    use crate::engine_state::worker::messages::Status;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn announces_ready_and_terminates() {
        let (handle, outbound) = WorkerHandle::spawn_with_channel(
            WorkerConfig::default(),
            Box::new(HeadlessSurfaceFactory::new()),
            default_evaluator_factory(),
        )
        .unwrap();
        assert_eq!(outbound.recv_timeout(TIMEOUT).unwrap(), OutboundMessage::Ready);

        handle.post(&InboundMessage::MakeProxy { id: ProxyId::new("c") }).unwrap();
        handle.post(&InboundMessage::Terminate).unwrap();
        assert_eq!(
            outbound.recv_timeout(TIMEOUT).unwrap(),
            OutboundMessage::Terminate { status: Status::Success }
        );
        handle.join().unwrap();
    }

    #[test]
    fn dropping_the_channel_stops_the_worker() {
        let (handle, outbound) = WorkerHandle::spawn_with_channel(
            WorkerConfig::default(),
            Box::new(HeadlessSurfaceFactory::new()),
            default_evaluator_factory(),
        )
        .unwrap();
        assert_eq!(outbound.recv_timeout(TIMEOUT).unwrap(), OutboundMessage::Ready);
        handle.join().unwrap();
        assert!(outbound.try_recv().is_err());
    }
}
