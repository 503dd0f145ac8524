use voxel_script_worker::core::config::{PopulationConfig, ScriptLimits};
use voxel_script_worker::core::errors::WorkerError;
use voxel_script_worker::engine_state::scripting::RhaiEvaluator;
use voxel_script_worker::engine_state::voxels::population::{CellWarning, PopulationHooks};
use voxel_script_worker::engine_state::voxels::{ColorCell, VoxelGrid};
use voxel_script_worker::engine_state::worker::challenge::evaluate;

const FLOOR: &str = r#"fn draw(x, y, z, n) { if y == 0 { "tan" } else { "" } }"#;
const LEFT_WALL: &str = r#"fn draw(x, y, z, n) { if x == 0 { "gray" } else { "" } }"#;
const NOTHING: &str = "fn draw(x, y, z, n) { false }";

#[derive(Default)]
struct Recorder {
    warnings: Vec<CellWarning>,
    presented: Vec<usize>,
}

impl PopulationHooks for Recorder {
    fn on_warning(&mut self, warning: CellWarning) {
        self.warnings.push(warning);
    }

    fn present(&mut self, grid: &VoxelGrid) -> Result<(), WorkerError> {
        self.presented.push(grid.occupied_count());
        Ok(())
    }
}

fn live_grid() -> VoxelGrid {
    let mut grid = VoxelGrid::new(4).unwrap();
    grid.set(1, 2, 3, ColorCell::css("crimson"));
    grid.set(3, 3, 3, ColorCell::css("#00ff00"));
    grid
}

fn score(grid: &mut VoxelGrid, target: &str, user: &str) -> (Result<f64, WorkerError>, Recorder) {
    let evaluator = RhaiEvaluator::new(&ScriptLimits::default());
    let mut recorder = Recorder::default();
    let result = evaluate(
        grid,
        &evaluator,
        target,
        user,
        &PopulationConfig::default(),
        &mut recorder,
    );
    (result, recorder)
}

#[test]
fn identical_scripts_score_one() {
    let mut grid = live_grid();
    let (similarity, _) = score(&mut grid, FLOOR, FLOOR);
    assert_eq!(similarity.unwrap(), 1.0);
}

#[test]
fn overlapping_scripts_score_intersection_over_union() {
    let mut grid = live_grid();
    let (similarity, _) = score(&mut grid, FLOOR, LEFT_WALL);
    // Floor and wall are 16 cells each and share the 4-cell edge at x == 0, y == 0.
    let expected = 4.0 / 28.0;
    assert!((similarity.unwrap() - expected).abs() < 1e-12);
}

#[test]
fn two_empty_results_score_one() {
    let mut grid = live_grid();
    let (similarity, _) = score(&mut grid, NOTHING, NOTHING);
    assert_eq!(similarity.unwrap(), 1.0);
}

#[test]
fn empty_against_non_empty_scores_zero() {
    let mut grid = live_grid();
    let (similarity, _) = score(&mut grid, FLOOR, NOTHING);
    assert_eq!(similarity.unwrap(), 0.0);
}

#[test]
fn live_grid_is_restored_after_success() {
    let mut grid = live_grid();
    let before = grid.clone();
    let (similarity, recorder) = score(&mut grid, FLOOR, LEFT_WALL);
    assert!(similarity.is_ok());
    assert_eq!(grid, before);
    // The restored grid is shown after each run, never a script's result.
    assert_eq!(recorder.presented, vec![2, 2]);
}

#[test]
fn live_grid_is_restored_after_a_failing_user_script() {
    let mut grid = live_grid();
    let before = grid.clone();
    let (similarity, recorder) = score(&mut grid, FLOOR, "fn draw(x, y, z, n) {");
    assert!(matches!(similarity, Err(WorkerError::Syntax(_))));
    assert_eq!(grid, before);
    assert_eq!(recorder.presented, vec![2, 2]);
}

#[test]
fn live_grid_is_restored_after_a_failing_target_script() {
    let mut grid = live_grid();
    let before = grid.clone();
    let (similarity, recorder) = score(&mut grid, "not a draw function", FLOOR);
    assert!(similarity.is_err());
    assert_eq!(grid, before);
    assert_eq!(recorder.presented, vec![2]);
}

#[test]
fn cell_failures_are_warnings_not_errors() {
    let mut grid = live_grid();
    let failing = r#"fn draw(x, y, z, n) { if x == 1 && y == 1 && z == 1 { throw "bad cell" } else { true } }"#;
    let (similarity, recorder) = score(&mut grid, failing, failing);
    assert_eq!(similarity.unwrap(), 1.0);
    assert_eq!(recorder.warnings.len(), 2);
    assert!(recorder.warnings.iter().all(|w| (w.x, w.y, w.z) == (1, 1, 1)));
}
