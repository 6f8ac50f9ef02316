use std::sync::OnceLock;

use cq_core::FaultKind;
use regex::Regex;
use rhai::EvalAltResult;

/// A failed evaluation, with the line in evaluated-source coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFault {
    pub kind: FaultKind,
    pub detail: String,
    pub line: Option<usize>,
}

impl ScriptFault {
    pub fn new(kind: FaultKind, detail: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            line,
        }
    }
}

pub(crate) fn classify(error: &EvalAltResult) -> ScriptFault {
    let error = innermost(error);
    let line = error.position().line();
    match error {
        EvalAltResult::ErrorParsing(parse_error, _) => {
            ScriptFault::new(FaultKind::Syntax, parse_error.to_string(), line)
        }
        EvalAltResult::ErrorTooManyOperations(_) | EvalAltResult::ErrorTerminated(_, _) => {
            ScriptFault::new(
                FaultKind::Timeout,
                "the code ran for too long (is there an endless loop?)",
                line,
            )
        }
        EvalAltResult::ErrorStackOverflow(_) => ScriptFault::new(
            FaultKind::Runtime,
            "too many nested function calls",
            line,
        ),
        other => ScriptFault::new(FaultKind::Runtime, strip_position(&other.to_string()), line),
    }
}

fn innermost(error: &EvalAltResult) -> &EvalAltResult {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => innermost(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => innermost(inner),
        other => other,
    }
}

fn strip_position(message: &str) -> String {
    static POSITION: OnceLock<Regex> = OnceLock::new();
    let position = POSITION.get_or_init(|| {
        Regex::new(r"\s*\(line \d+, position \d+\)\s*$").expect("position regex should compile")
    });
    position.replace(message, "").into_owned()
}
