//! # Core Module
//!
//! Crate-wide building blocks shared by every subsystem:
//!
//! * `config` - Serde-backed worker configuration with defaults
//! * `errors` - The `WorkerError` taxonomy reported to the host

pub mod config;
pub mod errors;

pub use config::WorkerConfig;
pub use errors::WorkerError;
