//! # Voxel Script Worker Entry Point
//!
//! Native host binary. It calls into the library's `run()` to parse the
//! command line and start the windowed or headless host.
//!
//! For web builds, see `VoxelWorker` in the library's `web` module.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --script sphere.rhai --grid-size 24
//! ```

#[cfg(not(target_family = "wasm"))]
fn main() -> anyhow::Result<()> {
    voxel_script_worker::run()
}

#[cfg(target_family = "wasm")]
fn main() {}
