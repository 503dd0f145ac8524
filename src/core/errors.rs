//! # Worker Errors
//!
//! Every failure that can end an operation on the worker is a [`WorkerError`].
//! Per-cell script failures are deliberately absent: they degrade to an empty
//! cell plus a [`CellWarning`](crate::engine_state::voxels::population::CellWarning)
//! and never propagate out of grid population.

use thiserror::Error;

use crate::engine_state::proxy::ProxyId;

/// Errors produced by worker operations.
///
/// The `Display` text of each variant is what the host sees in the `message`
/// field of an outbound `error` reply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    /// The script failed to parse. The run is aborted and the grid stays cleared.
    #[error("Python Syntax Error: {0}")]
    Syntax(String),

    /// `start` referenced a proxy id that was never registered with `makeProxy`.
    #[error("no input proxy registered with id `{0}`")]
    ProxyNotFound(ProxyId),

    /// A run was requested while another one is still in flight.
    #[error("a script is already running; wait for it to finish before starting another")]
    Reentrancy,

    /// The render surface, camera, or GPU resources are missing or unusable.
    #[error("render resource unavailable: {0}")]
    Resource(String),

    /// A command that needs a started worker arrived before `start`.
    #[error("Worker not initialized")]
    NotInitialized,

    /// `start` arrived after the worker was already started.
    #[error("Worker already initialized")]
    AlreadyInitialized,

    /// A message arrived after `terminate`.
    #[error("Worker has been terminated")]
    Terminated,

    /// The requested grid side length is zero or cannot be allocated.
    #[error("invalid grid size {0}; the grid side must be at least 1 and fit in memory")]
    InvalidGridSize(usize),

    /// The requested grid side length exceeds `population.max_grid_size`.
    #[error("grid size {size} exceeds the configured maximum of {max}")]
    GridTooLarge { size: usize, max: usize },

    /// The inbound message carried a `type` tag the worker does not know.
    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    /// The inbound message could not be decoded.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::MalformedMessage(err.to_string())
    }
}
