use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

pub type Bindings = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Variable,
    Function,
}

impl RuleKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "variable" => Some(Self::Variable),
            "function" => Some(Self::Function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub level_id: String,
    pub instruction: String,
    pub kind: RuleKind,
    pub required_name: String,
    #[serde(default)]
    pub expected_value: Value,
    #[serde(default)]
    pub expected_return: Value,
    #[serde(default)]
    pub valid_patterns: BTreeSet<i64>,
    #[serde(default)]
    pub effect_id: Option<String>,
}

impl Rule {
    pub fn variable(
        level_id: impl Into<String>,
        required_name: impl Into<String>,
        expected_value: impl Into<Value>,
    ) -> Self {
        Self {
            level_id: level_id.into(),
            instruction: String::new(),
            kind: RuleKind::Variable,
            required_name: required_name.into(),
            expected_value: expected_value.into(),
            expected_return: Value::Absent,
            valid_patterns: BTreeSet::new(),
            effect_id: None,
        }
    }

    pub fn function(level_id: impl Into<String>, required_name: impl Into<String>) -> Self {
        Self {
            level_id: level_id.into(),
            instruction: String::new(),
            kind: RuleKind::Function,
            required_name: required_name.into(),
            expected_value: Value::Absent,
            expected_return: Value::Absent,
            valid_patterns: BTreeSet::new(),
            effect_id: None,
        }
    }

    /// Rule used when a level id cannot be resolved. It runs submissions but
    /// never validates.
    pub fn fallback(level_id: impl Into<String>) -> Self {
        let mut rule = Self::variable(level_id, "result", Value::Absent);
        rule.instruction =
            "This lesson is not configured. Write any code to try it out.".to_string();
        rule
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_expected_return(mut self, expected: impl Into<Value>) -> Self {
        self.expected_return = expected.into();
        self
    }

    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = i64>) -> Self {
        self.valid_patterns = patterns.into_iter().collect();
        self
    }

    pub fn with_effect(mut self, effect_id: impl Into<String>) -> Self {
        self.effect_id = Some(effect_id.into());
        self
    }

    /// True when the pattern set decides function-mode validation.
    pub fn patterns_govern(&self) -> bool {
        self.kind == RuleKind::Function
            && self.expected_return.is_absent()
            && !self.valid_patterns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub quiz_set_id: Option<String>,
    pub instruction: String,
    pub options: Vec<QuizOption>,
    pub correct_option_key: String,
}

impl Question {
    pub fn option_keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|option| option.key.as_str())
    }

    pub fn option_text(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.key == key)
            .map(|option| option.text.as_str())
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.iter().any(|option| option.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    Syntax,
    Runtime,
    Timeout,
    Internal,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Runtime => "runtime",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }

    /// Faults attributable to the submitted code, as opposed to the host.
    pub fn is_script_error(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    pub bindings: Bindings,
    pub error_line: Option<usize>,
    pub fault: Option<FaultKind>,
    #[serde(default)]
    pub output: Vec<String>,
}

impl ExecutionResult {
    pub fn succeeded(message: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            success: true,
            message: message.into(),
            bindings,
            error_line: None,
            fault: None,
            output: Vec::new(),
        }
    }

    /// Failed executions never carry bindings.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            bindings: Bindings::new(),
            error_line: None,
            fault: None,
            output: Vec::new(),
        }
    }

    pub fn faulted(kind: FaultKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            fault: Some(kind),
            error_line: line,
            ..Self::failed(message)
        }
    }

    pub fn with_output(mut self, output: Vec<String>) -> Self {
        self.output = output;
        self
    }

    /// First bound value, used when composing failure feedback.
    pub fn first_value(&self) -> Value {
        self.bindings.values().next().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl QuizScore {
    pub fn is_perfect(&self) -> bool {
        self.correct == self.total
    }
}

impl fmt::Display for QuizScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}
