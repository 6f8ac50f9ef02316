use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cq_core::{Bindings, ExecutionResult, FaultKind, Rule, Value};
use rhai::{Dynamic, Engine, FLOAT, INT};
use tracing::{debug, warn};

mod bridge;
mod dialect;
mod fault;
mod wrapper;

pub use dialect::rewrite_dialect;
pub use fault::ScriptFault;
pub use wrapper::{is_valid_target, wrap_submission, WrappedProgram};

use bridge::dynamic_to_value;
use fault::classify;

pub const ENV_MAX_OPERATIONS: &str = "CODEQUEST_MAX_OPERATIONS";
pub const ENV_MAX_CALL_LEVELS: &str = "CODEQUEST_MAX_CALL_LEVELS";
pub const ENV_TIMEOUT_MS: &str = "CODEQUEST_TIMEOUT_MS";

const MIN_OPERATIONS: u64 = 1_000;
const MIN_CALL_LEVELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOptions {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub wall_clock_budget: Option<Duration>,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            max_operations: 250_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 16 * 1024,
            max_array_size: 4 * 1024,
            wall_clock_budget: None,
        }
    }
}

impl SandboxOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; values that do not parse are ignored
    /// and budgets are clamped to a usable minimum.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_operations = lookup(ENV_MAX_OPERATIONS)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(defaults.max_operations)
            .max(MIN_OPERATIONS);
        let max_call_levels = lookup(ENV_MAX_CALL_LEVELS)
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(defaults.max_call_levels)
            .max(MIN_CALL_LEVELS);
        let wall_clock_budget = lookup(ENV_TIMEOUT_MS)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis);
        Self {
            max_operations,
            max_call_levels,
            wall_clock_budget,
            ..defaults
        }
    }
}

/// Output of one evaluation: the final expression's value or a fault, plus
/// whatever the program printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: Result<Value, ScriptFault>,
    pub output: Vec<String>,
}

/// Evaluates a complete program in a fresh context. Implementations must not
/// carry state from one call into the next.
pub trait ScriptEvaluator {
    fn evaluate(&self, source: &str) -> Evaluation;
}

#[derive(Debug, Clone, Default)]
pub struct RhaiEvaluator {
    options: SandboxOptions,
}

impl RhaiEvaluator {
    pub fn new(options: SandboxOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    fn build_engine(&self, output: Rc<RefCell<Vec<String>>>) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.options.max_operations);
        engine.set_max_call_levels(self.options.max_call_levels);
        engine.set_max_expr_depths(self.options.max_expr_depth, self.options.max_expr_depth);
        engine.set_max_string_size(self.options.max_string_size);
        engine.set_max_array_size(self.options.max_array_size);
        engine.set_max_map_size(self.options.max_array_size);
        engine.set_strict_variables(true);
        engine.set_module_resolver(rhai::module_resolvers::DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine.disable_symbol("import");
        // Lesson arithmetic is numeric, so dividing two integers yields a float.
        engine.set_fast_operators(false);
        engine.register_fn("/", |left: INT, right: INT| left as FLOAT / right as FLOAT);

        let printed = Rc::clone(&output);
        engine.on_print(move |text| printed.borrow_mut().push(text.to_string()));
        let debugged = Rc::clone(&output);
        engine.on_debug(move |text, _source, _position| {
            debugged.borrow_mut().push(text.to_string())
        });

        if let Some(budget) = self.options.wall_clock_budget {
            let started = Instant::now();
            engine.on_progress(move |_operations| {
                if started.elapsed() > budget {
                    Some(Dynamic::from("wall-clock budget exceeded".to_string()))
                } else {
                    None
                }
            });
        }

        engine
    }
}

impl ScriptEvaluator for RhaiEvaluator {
    fn evaluate(&self, source: &str) -> Evaluation {
        let output = Rc::new(RefCell::new(Vec::new()));
        let engine = self.build_engine(Rc::clone(&output));
        let outcome = engine
            .eval::<Dynamic>(source)
            .map(dynamic_to_value)
            .map_err(|error| classify(&error));
        let output = output.take();
        Evaluation { outcome, output }
    }
}

/// Runs learner submissions against a rule and extracts the target binding.
pub struct ScriptSandbox<E: ScriptEvaluator = RhaiEvaluator> {
    evaluator: E,
}

impl Default for ScriptSandbox<RhaiEvaluator> {
    fn default() -> Self {
        Self::new(RhaiEvaluator::default())
    }
}

impl ScriptSandbox<RhaiEvaluator> {
    pub fn with_options(options: SandboxOptions) -> Self {
        Self::new(RhaiEvaluator::new(options))
    }
}

impl<E: ScriptEvaluator> ScriptSandbox<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn execute(&self, code: &str, rule: &Rule) -> ExecutionResult {
        let target = rule.required_name.as_str();
        if !is_valid_target(target) {
            warn!(
                level_id = %rule.level_id,
                target,
                "lesson target is not a valid identifier"
            );
            return ExecutionResult::faulted(
                FaultKind::Internal,
                "Internal error: this lesson cannot check your code right now.",
                None,
            );
        }

        let program = wrap_submission(rule.kind, target, &rewrite_dialect(code));
        let Evaluation { outcome, output } = self.evaluator.evaluate(&program.source);

        match outcome {
            Ok(Value::Absent) => {
                ExecutionResult::failed(nothing_defined(target)).with_output(output)
            }
            Ok(value) => {
                let mut bindings = Bindings::new();
                bindings.insert(target.to_string(), value);
                ExecutionResult::succeeded("Code ran successfully.", bindings).with_output(output)
            }
            Err(fault) => {
                debug!(kind = fault.kind.as_str(), detail = %fault.detail, "submission faulted");
                if fault.line == Some(program.probe_line) && fault.kind == FaultKind::Runtime {
                    return ExecutionResult::failed(nothing_defined(target)).with_output(output);
                }
                let line = fault.line.and_then(|line| program.code_line(line));
                ExecutionResult::faulted(fault.kind, describe_fault(&fault, line), line)
                    .with_output(output)
            }
        }
    }
}

fn nothing_defined(target: &str) -> String {
    format!("Nothing was defined or returned for `{}`.", target)
}

fn describe_fault(fault: &ScriptFault, line: Option<usize>) -> String {
    let label = match fault.kind {
        FaultKind::Syntax => "Syntax error",
        FaultKind::Runtime => "Runtime error",
        FaultKind::Timeout => "Execution stopped",
        FaultKind::Internal => "Internal error",
    };
    match line {
        Some(line) => format!("{} on line {}: {}", label, line, fault.detail),
        None => format!("{}: {}", label, fault.detail),
    }
}

#[cfg(test)]
mod tests;
