//! # Voxels
//!
//! Voxel data and the script-driven pass that fills it.
//!
//! ## Architecture
//!
//! * **ColorCell**: the value of a single voxel, empty or colored
//! * **VoxelGrid**: a cubic grid of cells with an occupancy bitmap
//! * **Population**: evaluates a script once per cell and writes the grid
//!
//! ## Data Flow
//!
//! 1. The worker receives script source
//! 2. `population::populate` clears the grid and evaluates every cell
//! 3. Per-cell failures become warnings, the cell stays empty
//! 4. The finished grid is handed to the mesh builder

pub mod color_cell;
pub mod grid;
mod named_colors;
pub mod population;

pub use color_cell::{CellColor, ColorCell, Rgb};
pub use grid::VoxelGrid;
