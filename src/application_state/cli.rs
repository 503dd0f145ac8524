//! Command-line arguments of the host binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::core::WorkerConfig;

/// Script used when no `--script` is given: a shaded sphere.
pub const DEFAULT_SCRIPT: &str = r#"
fn draw(x, y, z, grid_size) {
    let c = (grid_size - 1) / 2.0;
    let d = hypot(hypot(x - c, y - c), z - c);
    if d <= grid_size / 2.0 {
        "hsl(" + (y * 360 / grid_size) + ", 70%, 55%)"
    } else {
        false
    }
}
"#;

/// Runs voxel drawing scripts in a worker and renders the result.
#[derive(Debug, Clone, Parser)]
#[command(name = "voxel-script-worker", version, about)]
pub struct Cli {
    /// Script defining `draw(x, y, z, grid_size)`
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Side length of the voxel grid
    #[arg(long, default_value_t = 16)]
    pub grid_size: usize,

    /// JSON worker configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Render without a window and print outbound messages as JSON lines
    #[arg(long)]
    pub headless: bool,
}

impl Cli {
    /// The configuration file's contents, or defaults.
    pub fn load_config(&self) -> anyhow::Result<WorkerConfig> {
        match &self.config {
            Some(path) => WorkerConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display())),
            None => Ok(WorkerConfig::default()),
        }
    }

    /// The script file's contents, or [`DEFAULT_SCRIPT`].
    pub fn load_script(&self) -> anyhow::Result<String> {
        match &self.script {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display())),
            None => Ok(DEFAULT_SCRIPT.to_string()),
        }
    }
}
