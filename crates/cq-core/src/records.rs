use serde::{Deserialize, Serialize};

use crate::error::CodeQuestError;
use crate::types::{Question, QuizOption, Rule, RuleKind};
use crate::value::{format_number, Value};

const DEFAULT_INSTRUCTION: &str = "Question goes here...";
const DEFAULT_CORRECT_OPTION: &str = "B";
const DEFAULT_OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

/// Identifier as it appears in source data: numbers and strings both occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Canonical key for a question id. Numbers are truncated to integers and
/// numeric-looking text is rewritten to the same decimal form, so `5`, `5.0`
/// and `"05"` all resolve to `"5"`.
pub fn normalize_question_id(id: &RecordId) -> Option<String> {
    match id {
        RecordId::Integer(value) => Some(value.to_string()),
        RecordId::Float(value) if value.is_finite() => Some(format_number(value.trunc())),
        RecordId::Float(_) => None,
        RecordId::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(number) = trimmed.parse::<i64>() {
                return Some(number.to_string());
            }
            match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() && number.fract() == 0.0 => {
                    Some(format_number(number))
                }
                _ => Some(trimmed.to_string()),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub quiz_set_id: Option<String>,
    #[serde(default)]
    pub set_id: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub option_keys: Option<Vec<String>>,
    #[serde(default)]
    pub option_values: Option<Vec<String>>,
}

impl QuestionRecord {
    /// Rejects records without a usable id and records whose correct option
    /// is not one of the offered keys. Every key stays selectable; a key with
    /// no matching text gets an empty label.
    pub fn into_question(self) -> Result<Question, CodeQuestError> {
        let question_id = self
            .id
            .as_ref()
            .and_then(normalize_question_id)
            .ok_or_else(|| {
                CodeQuestError::new("QUESTION_ID_MISSING", "question record has no usable id")
            })?;

        let quiz_set_id = self
            .quiz_set_id
            .or(self.set_id)
            .filter(|set_id| !set_id.trim().is_empty());

        let keys = self.option_keys.unwrap_or_else(|| {
            DEFAULT_OPTION_KEYS
                .iter()
                .map(|key| (*key).to_string())
                .collect()
        });
        let values = self.option_values.unwrap_or_else(|| {
            DEFAULT_OPTION_KEYS
                .iter()
                .map(|key| format!("Option {}", key))
                .collect()
        });
        let mut values = values.into_iter();
        let options = keys
            .into_iter()
            .map(|key| QuizOption {
                key,
                text: values.next().unwrap_or_default(),
            })
            .collect();

        let question = Question {
            question_id,
            quiz_set_id,
            instruction: self
                .instruction
                .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
            options,
            correct_option_key: self
                .correct_option
                .unwrap_or_else(|| DEFAULT_CORRECT_OPTION.to_string()),
        };
        if !question.has_option(&question.correct_option_key) {
            return Err(CodeQuestError::new(
                "QUESTION_CORRECT_OPTION_UNKNOWN",
                format!(
                    "question {} marks option {} correct but does not offer it",
                    question.question_id, question.correct_option_key
                ),
            ));
        }
        Ok(question)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    #[serde(default)]
    pub level_id: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub required_variable: Option<String>,
    #[serde(default)]
    pub expected_value: Option<serde_json::Value>,
    #[serde(default)]
    pub required_function: Option<String>,
    #[serde(default)]
    pub expected_return: Option<serde_json::Value>,
    #[serde(default)]
    pub valid_patterns: Option<Vec<f64>>,
    #[serde(default)]
    pub effect: Option<String>,
}

impl RuleRecord {
    /// Returns `None` when the record has no level id.
    pub fn into_rule(self) -> Option<Rule> {
        let level_id = self
            .level_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())?;

        let required_function = self.required_function.unwrap_or_default();
        let required_variable = self.required_variable.unwrap_or_default();
        let kind = match self.kind.as_deref().and_then(RuleKind::parse) {
            Some(kind) => kind,
            None if !required_function.trim().is_empty() => RuleKind::Function,
            None => RuleKind::Variable,
        };
        let required_name = match kind {
            RuleKind::Function => required_function,
            RuleKind::Variable => required_variable,
        };

        Some(Rule {
            level_id,
            instruction: self.instruction.unwrap_or_default(),
            kind,
            required_name: required_name.trim().to_string(),
            expected_value: self
                .expected_value
                .as_ref()
                .map(Value::from_json)
                .unwrap_or_default(),
            expected_return: self
                .expected_return
                .as_ref()
                .map(Value::from_json)
                .unwrap_or_default(),
            valid_patterns: self
                .valid_patterns
                .unwrap_or_default()
                .into_iter()
                .filter(|pattern| pattern.is_finite())
                .map(|pattern| pattern.trunc() as i64)
                .collect(),
            effect_id: self.effect.filter(|effect| !effect.trim().is_empty()),
        })
    }
}

/// Top-level shape of `levels.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default)]
    pub levels: Vec<RuleRecord>,
}
