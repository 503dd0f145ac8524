//! # Worker Configuration
//!
//! Tunables for population, scripting limits, rendering, orbit control and
//! lighting. Every field has a default, so a config file only needs to name
//! the values it changes:
//!
//! ```json
//! { "population": { "yield_every_rows": 8 }, "render": { "frame_rate_hz": 30 } }
//! ```

use std::f32::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::WorkerError;
use crate::engine_state::voxels::color_cell::Rgb;

/// Top-level configuration handed to the worker at spawn time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Grid population settings
    pub population: PopulationConfig,
    /// Interpreter safety limits
    pub script: ScriptLimits,
    /// Camera and frame settings
    pub render: RenderConfig,
    /// Orbit controller settings
    pub orbit: OrbitConfig,
    /// Scene lighting
    pub lighting: LightingConfig,
}

impl WorkerConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Arguments
    /// * `text` - JSON document; missing fields keep their defaults
    ///
    /// # Returns
    /// The parsed configuration or `WorkerError::Config`
    pub fn from_json_str(text: &str) -> Result<Self, WorkerError> {
        let config: WorkerConfig =
            serde_json::from_str(text).map_err(|e| WorkerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Arguments
    /// * `path` - Location of the JSON file
    pub fn load(path: &Path) -> Result<Self, WorkerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorkerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), WorkerError> {
        if self.population.entry_point.trim().is_empty() {
            return Err(WorkerError::Config("population.entry_point is empty".into()));
        }
        if self.population.max_grid_size == 0 {
            return Err(WorkerError::Config("population.max_grid_size must be at least 1".into()));
        }
        if !(self.render.frame_rate_hz > 0.0) {
            return Err(WorkerError::Config("render.frame_rate_hz must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.orbit.damping_factor) {
            return Err(WorkerError::Config("orbit.damping_factor must be within 0..=1".into()));
        }
        if self.orbit.min_distance > self.orbit.max_distance_floor {
            return Err(WorkerError::Config(
                "orbit.min_distance exceeds orbit.max_distance_floor".into(),
            ));
        }
        Ok(())
    }
}

/// Controls how the grid populator walks the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Yield after every row whose Y index is a multiple of this value
    pub yield_every_rows: usize,
    /// Color assigned to cells whose script result is `true`
    pub default_color: Rgb,
    /// Name of the script function called once per cell
    pub entry_point: String,
    /// Largest grid side `start` and `runPythonCode` accept
    pub max_grid_size: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            yield_every_rows: 5,
            default_color: Rgb::GREEN,
            entry_point: String::from("draw"),
            max_grid_size: 256,
        }
    }
}

impl PopulationConfig {
    /// Checks a requested grid side against `max_grid_size`.
    ///
    /// # Returns
    /// `WorkerError::GridTooLarge` when `size` exceeds the limit
    pub fn check_grid_size(&self, size: usize) -> Result<(), WorkerError> {
        if size > self.max_grid_size {
            return Err(WorkerError::GridTooLarge {
                size,
                max: self.max_grid_size,
            });
        }
        Ok(())
    }
}

/// Safety limits applied to the embedded interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    /// Maximum function call nesting
    pub max_call_levels: usize,
    /// Maximum operations per `draw` call; zero disables the limit
    pub max_operations: u64,
    /// Maximum length of any string a script builds
    pub max_string_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_call_levels: 64,
            max_operations: 1_000_000,
            max_string_size: 4096,
        }
    }
}

/// Camera and frame cadence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Target frames per second of the render loop
    pub frame_rate_hz: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub znear: f32,
    /// Far clipping plane
    pub zfar: f32,
    /// RGBA clear color, components in 0..=1
    pub clear_color: [f32; 4],
    /// Smallest initial camera distance from the origin
    pub camera_distance_floor: f32,
    /// Initial camera distance per grid cell
    pub camera_distance_per_cell: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60.0,
            fov_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            camera_distance_floor: 15.0,
            camera_distance_per_cell: 1.5,
        }
    }
}

impl RenderConfig {
    /// Initial camera distance for a grid of side `grid_size`.
    pub fn camera_distance(&self, grid_size: usize) -> f32 {
        self.camera_distance_floor
            .max(grid_size as f32 * self.camera_distance_per_cell)
    }
}

/// Orbit controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Whether camera motion eases out over several frames
    pub enable_damping: bool,
    /// Fraction of the pending motion applied per frame when damping
    pub damping_factor: f32,
    /// Pan in screen space instead of along the ground plane
    pub screen_space_panning: bool,
    /// Largest polar angle from the +Y axis, in radians
    pub max_polar_angle: f32,
    /// Closest the camera may get to the target
    pub min_distance: f32,
    /// Lower bound of the far distance limit
    pub max_distance_floor: f32,
    /// Far distance limit per grid cell
    pub max_distance_per_cell: f32,
    /// Rotation speed multiplier
    pub rotate_speed: f32,
    /// Zoom speed multiplier
    pub zoom_speed: f32,
    /// Pan speed multiplier
    pub pan_speed: f32,
    /// Pixels panned per arrow key press
    pub key_pan_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.25,
            screen_space_panning: false,
            max_polar_angle: PI / 1.5,
            min_distance: 5.0,
            max_distance_floor: 50.0,
            max_distance_per_cell: 3.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            key_pan_speed: 7.0,
        }
    }
}

impl OrbitConfig {
    /// Far distance limit for a grid of side `grid_size`.
    pub fn max_distance(&self, grid_size: usize) -> f32 {
        self.max_distance_floor
            .max(grid_size as f32 * self.max_distance_per_cell)
    }
}

/// Ambient plus one directional light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Ambient light color
    pub ambient_color: Rgb,
    /// Ambient light intensity
    pub ambient_intensity: f32,
    /// Directional light color
    pub directional_color: Rgb,
    /// Directional light intensity
    pub directional_intensity: f32,
    /// Direction pointing from the scene toward the light; normalized on use
    pub directional_direction: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: Rgb::from_hex(0xcccccc),
            ambient_intensity: 0.5,
            directional_color: Rgb::from_hex(0xffffff),
            directional_intensity: 1.0,
            directional_direction: [1.0, 1.0, 0.5],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WorkerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.population.yield_every_rows, 5);
        assert_eq!(config.population.default_color, Rgb::GREEN);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = WorkerConfig::from_json_str(
            r##"{ "population": { "default_color": "#ff0000" }, "render": { "frame_rate_hz": 30 } }"##,
        )
        .unwrap();
        assert_eq!(config.population.default_color, Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(config.population.entry_point, "draw");
        assert_eq!(config.render.frame_rate_hz, 30.0);
        assert_eq!(config.render.fov_degrees, 75.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            WorkerConfig::from_json_str(r#"{ "render": { "frame_rate_hz": 0 } }"#),
            Err(WorkerError::Config(_))
        ));
        assert!(matches!(
            WorkerConfig::from_json_str(r#"{ "population": { "default_color": "nope" } }"#),
            Err(WorkerError::Config(_))
        ));
    }

    #[test]
    fn grid_size_limit_is_configurable() {
        let population = PopulationConfig::default();
        assert!(population.check_grid_size(256).is_ok());
        assert_eq!(
            population.check_grid_size(257),
            Err(WorkerError::GridTooLarge { size: 257, max: 256 })
        );

        let config = WorkerConfig::from_json_str(r#"{ "population": { "max_grid_size": 8 } }"#).unwrap();
        assert!(config.population.check_grid_size(9).is_err());
        assert!(matches!(
            WorkerConfig::from_json_str(r#"{ "population": { "max_grid_size": 0 } }"#),
            Err(WorkerError::Config(_))
        ));
    }

    #[test]
    fn distances_scale_with_grid_size() {
        let config = WorkerConfig::default();
        assert_eq!(config.render.camera_distance(4), 15.0);
        assert_eq!(config.render.camera_distance(20), 30.0);
        assert_eq!(config.orbit.max_distance(4), 50.0);
        assert_eq!(config.orbit.max_distance(32), 96.0);
    }
}
