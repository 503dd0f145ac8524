//! Rhai-backed [`ScriptEvaluator`].
//!
//! Scripts define a `draw` function and may use the helpers registered here:
//!
//! ```text
//! fn draw(x, y, z, grid_size) {
//!     let c = grid_size / 2;
//!     let d = hypot(hypot(x - c, y - c), z - c);
//!     if d < c { "hsl(" + (d * 30) + ", 80%, 50%)" } else { false }
//! }
//! ```
//!
//! Helpers: the constants `PI`, `E`, `TAU`, `LN2`, `LN10`, `SQRT2`,
//! `SQRT1_2`, `LOG2E` and `LOG10E` (also reachable as `math::PI` and so on),
//! `random()`, `hypot(a, b)`, plus the rhai standard library. `print` goes to
//! the log.
//!
//! The bare constants resolve anywhere, including inside `draw`, unless a
//! variable of the same name is in scope.

use std::f64::consts;

use log::{debug, info};
use rhai::{Array, CallFnOptions, Dynamic, Engine, ImmutableString, Module, Scope, AST};

use super::{Program, ScriptEvaluator, ScriptValue};
use crate::core::{config::ScriptLimits, errors::WorkerError};
use crate::engine_state::voxels::color_cell::Rgb;

/// Script evaluator built on the `rhai` embedded language.
pub struct RhaiEvaluator {
    engine: Engine,
}

impl RhaiEvaluator {
    /// Creates an evaluator with the given safety limits.
    ///
    /// # Arguments
    /// * `limits` - Call depth, operation and string size caps
    pub fn new(limits: &ScriptLimits) -> Self {
        let mut engine = Engine::new();
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_string_size(limits.max_string_size);
        if limits.max_operations > 0 {
            engine.set_max_operations(limits.max_operations);
        }

        engine.on_print(|text| info!("script: {text}"));
        engine.on_debug(|text, _source, pos| debug!("script debug {pos}: {text}"));

        engine.register_fn("random", fastrand::f64);
        engine.register_fn("hypot", |a: f64, b: f64| a.hypot(b));
        engine.register_fn("hypot", |a: i64, b: i64| (a as f64).hypot(b as f64));
        engine.register_fn("hypot", |a: i64, b: f64| (a as f64).hypot(b));
        engine.register_fn("hypot", |a: f64, b: i64| a.hypot(b as f64));
        engine.register_static_module("math", math_module().into());
        engine.on_var(|name, _index, context| {
            if context.scope().contains(name) {
                return Ok(None);
            }
            Ok(constant(name).map(Dynamic::from_float))
        });

        Self { engine }
    }
}

/// Named constants every script can read.
const CONSTANTS: [(&str, f64); 9] = [
    ("PI", consts::PI),
    ("E", consts::E),
    ("TAU", consts::TAU),
    ("LN2", consts::LN_2),
    ("LN10", consts::LN_10),
    ("SQRT2", consts::SQRT_2),
    ("SQRT1_2", consts::FRAC_1_SQRT_2),
    ("LOG2E", consts::LOG2_E),
    ("LOG10E", consts::LOG10_E),
];

fn constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, value)| *value)
}

fn math_module() -> Module {
    let mut module = Module::new();
    for (name, value) in CONSTANTS {
        module.set_var(name, value);
    }
    module
}

impl ScriptEvaluator for RhaiEvaluator {
    fn parse(&self, source: &str) -> Result<Box<dyn Program + '_>, WorkerError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| WorkerError::Syntax(e.to_string()))?;

        // Top-level statements run once here rather than on every cell.
        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| WorkerError::Syntax(e.to_string()))?;

        Ok(Box::new(RhaiProgram {
            engine: &self.engine,
            ast,
            scope,
        }))
    }
}

struct RhaiProgram<'a> {
    engine: &'a Engine,
    ast: AST,
    scope: Scope<'static>,
}

impl Program for RhaiProgram<'_> {
    fn has_entry_point(&self, name: &str, arity: usize) -> bool {
        self.ast
            .iter_functions()
            .any(|f| f.name == name && f.params.len() == arity)
    }

    fn call(&mut self, entry_point: &str, args: [i64; 4]) -> Result<ScriptValue, String> {
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let [x, y, z, n] = args;
        let result = self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, entry_point, (x, y, z, n))
            .map_err(|e| e.to_string())?;
        Ok(reduce(result))
    }
}

fn reduce(value: Dynamic) -> ScriptValue {
    if let Ok(flag) = value.as_bool() {
        return ScriptValue::Bool(flag);
    }
    if value.is::<ImmutableString>() {
        return ScriptValue::Text(value.cast::<ImmutableString>().to_string());
    }
    let type_name = value.type_name().to_string();
    value
        .try_cast::<Array>()
        .and_then(|array| rgb_from_array(&array))
        .map(ScriptValue::Rgb)
        .unwrap_or(ScriptValue::Other(type_name))
}

/// `[r, g, b]` with integer channels in 0..=255 or float channels in 0..=1.
fn rgb_from_array(array: &Array) -> Option<Rgb> {
    if array.len() != 3 {
        return None;
    }
    let channel = |value: &Dynamic| -> Option<f32> {
        value
            .as_int()
            .map(|i| i as f32 / 255.0)
            .or_else(|_| value.as_float().map(|f| f as f32))
            .ok()
    };
    Some(Rgb::new(
        channel(&array[0])?,
        channel(&array[1])?,
        channel(&array[2])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> RhaiEvaluator {
        RhaiEvaluator::new(&ScriptLimits::default())
    }

    fn call(source: &str, args: [i64; 4]) -> Result<ScriptValue, String> {
        let evaluator = evaluator();
        let mut program = evaluator.parse(source).expect("script should parse");
        program.call("draw", args)
    }

    #[test]
    fn reduces_results() {
        assert_eq!(
            call(r#"fn draw(x, y, z, n) { "red" }"#, [0, 0, 0, 1]),
            Ok(ScriptValue::Text("red".into()))
        );
        assert_eq!(
            call("fn draw(x, y, z, n) { x == 1 }", [1, 0, 0, 2]),
            Ok(ScriptValue::Bool(true))
        );
        assert_eq!(
            call("fn draw(x, y, z, n) { [255, 0, 0] }", [0, 0, 0, 1]),
            Ok(ScriptValue::Rgb(Rgb::new(1.0, 0.0, 0.0)))
        );
        assert_eq!(
            call("fn draw(x, y, z, n) { [0.0, 0.5, 1.0] }", [0, 0, 0, 1]),
            Ok(ScriptValue::Rgb(Rgb::new(0.0, 0.5, 1.0)))
        );
        assert!(matches!(
            call("fn draw(x, y, z, n) { 42 }", [0, 0, 0, 1]),
            Ok(ScriptValue::Other(_))
        ));
    }

    #[test]
    fn exposes_math_helpers() {
        let source = "fn draw(x, y, z, n) { math::TAU > 6.28 && hypot(3, 4) == 5.0 && random() < 1.0 }";
        assert_eq!(call(source, [0, 0, 0, 1]), Ok(ScriptValue::Bool(true)));
    }

    #[test]
    fn bare_constants_resolve_inside_draw() {
        let source = "fn draw(x, y, z, n) { PI > 3.14 && TAU > 6.28 && SQRT1_2 < 1.0 && E == math::E }";
        assert_eq!(call(source, [0, 0, 0, 1]), Ok(ScriptValue::Bool(true)));
    }

    #[test]
    fn local_names_shadow_constants() {
        let source = "fn draw(x, y, z, E) { E == 7 }";
        assert_eq!(call(source, [0, 0, 0, 7]), Ok(ScriptValue::Bool(true)));
        assert!(call("fn draw(x, y, z, n) { NOT_A_CONSTANT }", [0, 0, 0, 1]).is_err());
    }

    #[test]
    fn hypot_accepts_mixed_numbers() {
        let source = "fn draw(x, y, z, n) { hypot(x, 4.0) == 5.0 && hypot(4.0, y) == 5.0 }";
        assert_eq!(call(source, [3, 3, 0, 1]), Ok(ScriptValue::Bool(true)));
    }

    #[test]
    fn reports_syntax_errors() {
        let evaluator = evaluator();
        assert!(matches!(
            evaluator.parse("fn draw(x, y { true }"),
            Err(WorkerError::Syntax(_))
        ));
    }

    #[test]
    fn finds_entry_points_by_arity() {
        let evaluator = evaluator();
        let program = evaluator.parse("fn draw(x, y, z, n) { true } fn helper(a) { a }").unwrap();
        assert!(program.has_entry_point("draw", 4));
        assert!(!program.has_entry_point("draw", 3));
        assert!(!program.has_entry_point("paint", 4));
    }

    #[test]
    fn runtime_errors_surface_as_messages() {
        let result = call(r#"fn draw(x, y, z, n) { throw "boom"; }"#, [0, 0, 0, 1]);
        assert!(result.unwrap_err().contains("boom"));
    }

    #[test]
    fn operation_limit_stops_runaway_scripts() {
        let limits = ScriptLimits {
            max_operations: 1_000,
            ..ScriptLimits::default()
        };
        let evaluator = RhaiEvaluator::new(&limits);
        let mut program = evaluator.parse("fn draw(x, y, z, n) { loop {} }").unwrap();
        assert!(program.call("draw", [0, 0, 0, 1]).is_err());
    }
}
