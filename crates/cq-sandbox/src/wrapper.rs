use std::sync::OnceLock;

use cq_core::RuleKind;
use regex::Regex;

/// Words the evaluator reserves; a lesson target cannot use them.
const RESERVED: &[&str] = &[
    "let", "const", "fn", "if", "else", "while", "loop", "for", "in", "do", "until", "return",
    "break", "continue", "throw", "try", "catch", "switch", "import", "export", "as", "private",
    "global", "this", "true", "false", "is_def_var", "is_def_fn", "eval", "print", "debug",
    "Fn", "call", "curry", "type_of", "var", "static", "shared", "go", "goto", "exit", "match",
    "case", "public", "protected", "new", "use", "with", "module", "package", "super", "spawn",
    "thread", "sync", "async", "await", "yield", "default", "void", "null", "nil", "is",
];

/// Evaluated source plus the span of lines that belong to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedProgram {
    pub source: String,
    pub code_first_line: usize,
    pub code_line_count: usize,
    pub probe_line: usize,
}

impl WrappedProgram {
    /// Maps an evaluator line onto the learner's code, 1-based.
    pub fn code_line(&self, line: usize) -> Option<usize> {
        if line >= self.code_first_line && line < self.code_first_line + self.code_line_count {
            Some(line - self.code_first_line + 1)
        } else {
            None
        }
    }
}

pub fn is_valid_target(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let identifier = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex should compile")
    });
    identifier.is_match(name) && !RESERVED.contains(&name)
}

/// Both modes declare the target up front. Function mode then calls it, as a
/// closure when the submission assigned one and as a plain function otherwise;
/// variable mode reads it back as the final expression.
pub fn wrap_submission(kind: RuleKind, name: &str, code: &str) -> WrappedProgram {
    let code_line_count = code.split('\n').count();
    match kind {
        RuleKind::Function => WrappedProgram {
            source: format!(
                "let {name} = ();\n{code}\n;\nif type_of({name}) == \"Fn\" {{ call({name}) }} else {{ {name}() }}"
            ),
            code_first_line: 2,
            code_line_count,
            probe_line: code_line_count + 3,
        },
        RuleKind::Variable => WrappedProgram {
            source: format!("let {} = ();\n{}\n;\n{}", name, code, name),
            code_first_line: 2,
            code_line_count,
            probe_line: code_line_count + 3,
        },
    }
}

#[cfg(test)]
mod wrapper_tests {
    use super::*;

    #[test]
    fn variable_wrapper_declares_then_reads_target() {
        let program = wrap_submission(RuleKind::Variable, "x", "x = 1;");
        assert_eq!(program.source, "let x = ();\nx = 1;\n;\nx");
        assert_eq!(program.code_first_line, 2);
        assert_eq!(program.probe_line, 4);
        assert_eq!(program.code_line(1), None);
        assert_eq!(program.code_line(2), Some(1));
        assert_eq!(program.code_line(3), None);
    }

    #[test]
    fn function_wrapper_calls_target_last() {
        let program = wrap_submission(RuleKind::Function, "hop", "hop = || {\n  2\n};");
        assert_eq!(
            program.source,
            "let hop = ();\nhop = || {\n  2\n};\n;\nif type_of(hop) == \"Fn\" { call(hop) } else { hop() }"
        );
        assert_eq!(program.code_line(1), None);
        assert_eq!(program.code_line(4), Some(3));
        assert_eq!(program.code_line(5), None);
        assert_eq!(program.probe_line, 6);
    }

    #[test]
    fn targets_must_be_plain_identifiers() {
        assert!(is_valid_target("codigo"));
        assert!(is_valid_target("_private1"));
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("1abc"));
        assert!(!is_valid_target("x; evil()"));
        assert!(!is_valid_target("let"));
        assert!(!is_valid_target("go"));
    }
}
