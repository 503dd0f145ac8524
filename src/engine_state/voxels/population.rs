//! # Grid Population
//!
//! Runs a script's entry point once per cell and writes the results into a
//! [`VoxelGrid`].
//!
//! ## Run sequence
//! 1. Clear the grid.
//! 2. Parse the script once. A parse failure (or a missing entry point) ends
//!    the run with `WorkerError::Syntax` and the grid stays cleared.
//! 3. Visit every cell, X outermost, then Y, then Z, calling
//!    `draw(x, y, z, grid_size)`.
//! 4. After each finished Z row whose Y index is a multiple of
//!    `yield_every_rows`, hand control to [`PopulationHooks::on_yield`].
//! 5. Present the finished grid through [`PopulationHooks::present`].
//!
//! A cell whose evaluation fails becomes `Empty` and produces a
//! [`CellWarning`]; it never aborts the run.

use std::fmt;

use log::{info, warn};
use web_time::{Duration, Instant};

use super::color_cell::{ColorCell, Rgb};
use super::grid::VoxelGrid;
use crate::core::{config::PopulationConfig, errors::WorkerError};
use crate::engine_state::scripting::{ScriptEvaluator, ScriptValue};

/// A non-fatal evaluation failure for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWarning {
    /// Cell X coordinate
    pub x: usize,
    /// Cell Y coordinate
    pub y: usize,
    /// Cell Z coordinate
    pub z: usize,
    /// The interpreter's error message
    pub message: String,
}

impl fmt::Display for CellWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Code evaluation error at ({},{},{}): {}",
            self.x, self.y, self.z, self.message
        )
    }
}

/// Callbacks the populator makes while it runs.
pub trait PopulationHooks {
    /// A cell failed to evaluate and was left empty.
    fn on_warning(&mut self, warning: CellWarning);

    /// Suspension point between rows; the host may service other work here.
    fn on_yield(&mut self) {}

    /// The grid reached a state worth showing: the finished result, or the
    /// cleared grid after a parse failure.
    fn present(&mut self, _grid: &VoxelGrid) -> Result<(), WorkerError> {
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PopulationReport {
    /// Cells evaluated
    pub evaluated: usize,
    /// Cells that ended up solid
    pub solid: usize,
    /// Cells that failed to evaluate
    pub warnings: usize,
    /// Times control was yielded
    pub yields: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Maps a script result to a cell value.
///
/// Non-empty text is a color, `true` is `default_color`, a numeric triple is
/// used as-is, and everything else is empty.
pub fn cell_from_value(value: ScriptValue, default_color: Rgb) -> ColorCell {
    match value {
        ScriptValue::Text(text) if !text.is_empty() => ColorCell::css(text),
        ScriptValue::Bool(true) => ColorCell::rgb(default_color),
        ScriptValue::Rgb(rgb) => ColorCell::rgb(rgb),
        _ => ColorCell::Empty,
    }
}

/// Populates `grid` by evaluating `source` for every cell.
///
/// # Arguments
/// * `grid` - The grid to overwrite
/// * `evaluator` - Parses the script
/// * `source` - Script text
/// * `config` - Entry point, default color and yield cadence
/// * `hooks` - Receives warnings, yields and the finished grid
///
/// # Returns
/// A report of the run, or `WorkerError::Syntax` when the script cannot be
/// parsed or lacks the entry point
pub fn populate(
    grid: &mut VoxelGrid,
    evaluator: &dyn ScriptEvaluator,
    source: &str,
    config: &PopulationConfig,
    hooks: &mut dyn PopulationHooks,
) -> Result<PopulationReport, WorkerError> {
    let started = Instant::now();
    let n = grid.size();
    info!("Running script for grid size {n}...");

    grid.clear();

    let parsed = evaluator.parse(source).and_then(|program| {
        if program.has_entry_point(&config.entry_point, 4) {
            Ok(program)
        } else {
            Err(WorkerError::Syntax(format!(
                "script does not define `{}(x, y, z, grid_size)`",
                config.entry_point
            )))
        }
    });
    let mut program = match parsed {
        Ok(program) => program,
        Err(err) => {
            if let Err(present_err) = hooks.present(grid) {
                warn!("Could not present cleared grid: {present_err}");
            }
            return Err(err);
        }
    };

    let every = config.yield_every_rows.max(1);
    let mut report = PopulationReport::default();

    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let args = [x as i64, y as i64, z as i64, n as i64];
                let cell = match program.call(&config.entry_point, args) {
                    Ok(value) => cell_from_value(value, config.default_color),
                    Err(message) => {
                        let warning = CellWarning { x, y, z, message };
                        warn!("{warning}");
                        hooks.on_warning(warning);
                        report.warnings += 1;
                        ColorCell::Empty
                    }
                };
                if cell.is_solid() {
                    report.solid += 1;
                }
                grid.set(x, y, z, cell);
                report.evaluated += 1;
            }

            if y % every == 0 {
                hooks.on_yield();
                report.yields += 1;
            }
        }
    }

    report.elapsed = started.elapsed();
    info!(
        "Script finished in {:.2} ms: {} solid, {} warnings",
        report.elapsed.as_secs_f64() * 1000.0,
        report.solid,
        report.warnings
    );

    hooks.present(grid)?;
    Ok(report)
}
