//! # Scripting
//!
//! The interpreter is an opaque capability behind two traits:
//!
//! * [`ScriptEvaluator`] parses source text into a reusable [`Program`]
//! * [`Program`] evaluates a named entry point with positional arguments
//!
//! The grid populator only talks to these traits, so the embedded language
//! can be swapped without touching population, meshing or the worker. The
//! shipped implementation is [`rhai_evaluator::RhaiEvaluator`].

pub mod rhai_evaluator;

use crate::core::{config::ScriptLimits, errors::WorkerError};
use crate::engine_state::voxels::color_cell::Rgb;

pub use rhai_evaluator::RhaiEvaluator;

/// The value a script returned for one cell, reduced to what the grid cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Text, usually a CSS color
    Text(String),
    /// A boolean
    Bool(bool),
    /// A numeric color built from a three-element array
    Rgb(Rgb),
    /// Anything else; carries the interpreter's type name for diagnostics
    Other(String),
}

/// A parsed script, ready to be evaluated many times.
pub trait Program {
    /// Whether the script defines `name` with exactly `arity` parameters.
    fn has_entry_point(&self, name: &str, arity: usize) -> bool;

    /// Calls `entry_point` with `args`.
    ///
    /// # Returns
    /// The reduced result, or the interpreter's error message
    fn call(&mut self, entry_point: &str, args: [i64; 4]) -> Result<ScriptValue, String>;
}

/// Parses script source into programs.
pub trait ScriptEvaluator {
    /// Parses `source` once.
    ///
    /// # Returns
    /// A program borrowing the evaluator, or `WorkerError::Syntax`
    fn parse(&self, source: &str) -> Result<Box<dyn Program + '_>, WorkerError>;
}

/// Builds the evaluator a worker uses once it is started.
pub type EvaluatorFactory = Box<dyn Fn(&ScriptLimits) -> Box<dyn ScriptEvaluator> + Send>;

/// The factory used unless a host supplies its own.
pub fn default_evaluator_factory() -> EvaluatorFactory {
    Box::new(|limits| Box::new(RhaiEvaluator::new(limits)))
}
