//! # Challenge Evaluation
//!
//! Scores a user's script against a target script by the Jaccard index of the
//! occupied cells each one produces. Colors are not compared.
//!
//! Evaluation is transactional over the live grid: both scripts run on the
//! live grid, and after each run (successful or not) the grid is restored from
//! a snapshot taken before the first run and the visible mesh is rebuilt from
//! the restored grid.

use bitvec::prelude::BitSlice;
use log::{info, warn};

use crate::core::{config::PopulationConfig, errors::WorkerError};
use crate::engine_state::scripting::ScriptEvaluator;
use crate::engine_state::voxels::population::{populate, CellWarning, PopulationHooks};
use crate::engine_state::voxels::VoxelGrid;

/// Jaccard index of two occupancy bitmaps of the same grid size.
///
/// # Returns
/// `|a ∩ b| / |a ∪ b|`, or `1.0` when both are empty
pub fn jaccard(a: &BitSlice, b: &BitSlice) -> f64 {
    let mut matching = 0usize;
    let mut union = 0usize;
    for (left, right) in a.iter().by_vals().zip(b.iter().by_vals()) {
        if left && right {
            matching += 1;
        }
        if left || right {
            union += 1;
        }
    }
    if union == 0 {
        1.0
    } else {
        matching as f64 / union as f64
    }
}

/// Forwards warnings and yields but keeps intermediate grids off screen.
struct Offscreen<'a> {
    inner: &'a mut dyn PopulationHooks,
}

impl PopulationHooks for Offscreen<'_> {
    fn on_warning(&mut self, warning: CellWarning) {
        self.inner.on_warning(warning);
    }

    fn on_yield(&mut self) {
        self.inner.on_yield();
    }
}

/// Runs `source` on the live grid, snapshots the result and restores `original`.
fn run_isolated(
    grid: &mut VoxelGrid,
    original: &VoxelGrid,
    evaluator: &dyn ScriptEvaluator,
    source: &str,
    config: &PopulationConfig,
    hooks: &mut dyn PopulationHooks,
) -> Result<VoxelGrid, WorkerError> {
    let outcome = populate(grid, evaluator, source, config, &mut Offscreen { inner: hooks });
    let result = grid.clone();
    grid.restore_from(original);
    let presented = hooks.present(grid);
    outcome?;
    presented?;
    Ok(result)
}

/// Compares the grids produced by `target_code` and `user_code`.
///
/// # Arguments
/// * `grid` - The live grid; identical before and after the call
/// * `evaluator` - Parses both scripts
/// * `target_code` - Reference solution
/// * `user_code` - Submitted solution
/// * `config` - Population settings shared by both runs
/// * `hooks` - Receives warnings and yields of both runs, plus a `present`
///   of the restored grid after each run
///
/// # Returns
/// Similarity in `0.0..=1.0`, or the first error either run hit
pub fn evaluate(
    grid: &mut VoxelGrid,
    evaluator: &dyn ScriptEvaluator,
    target_code: &str,
    user_code: &str,
    config: &PopulationConfig,
    hooks: &mut dyn PopulationHooks,
) -> Result<f64, WorkerError> {
    let original = grid.clone();

    let target = run_isolated(grid, &original, evaluator, target_code, config, hooks)
        .inspect_err(|err| warn!("Target script failed: {err}"))?;
    let user = run_isolated(grid, &original, evaluator, user_code, config, hooks)
        .inspect_err(|err| warn!("User script failed: {err}"))?;

    let similarity = jaccard(target.occupancy(), user.occupancy());
    info!(
        "Challenge evaluated: {} target cells, {} user cells, similarity {similarity:.3}",
        target.occupied_count(),
        user.occupied_count()
    );
    Ok(similarity)
}

#[cfg(test)]
mod tests {
    use bitvec::prelude::*;

    use super::*;

    #[test]
    fn jaccard_of_empty_sets_is_one() {
        let empty = bitvec![0; 8];
        assert_eq!(jaccard(&empty, &empty), 1.0);
    }

    #[test]
    fn jaccard_counts_overlap_over_union() {
        let a = bitvec![1, 1, 0, 0];
        let b = bitvec![0, 1, 1, 0];
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard(&a, &bitvec![0, 0, 0, 0]), 0.0);
        assert_eq!(jaccard(&a, &a), 1.0);
    }
}
