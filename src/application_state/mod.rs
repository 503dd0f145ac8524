//! # Application State Management
//!
//! The host side of the worker protocol:
//! - GPU surface preparation, shared by the native window and the web canvas
//! - The windowed host that forwards input and reacts to worker replies
//! - The headless host used for scripted runs
//! - Command-line parsing

pub mod graphics_resources_builder;

cfg_if::cfg_if! {
    if #[cfg(not(target_family = "wasm"))] {
        pub mod cli;
        pub mod headless;
        pub mod host;
        pub mod input_manager;

        pub use host::{ApplicationState, HostEvent, HostOptions};
    }
}
