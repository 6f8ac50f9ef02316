use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "cq-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    pub trigger: CaseTrigger,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CaseTrigger {
    Code {
        #[serde(default = "default_trigger_id")]
        id: String,
        #[serde(rename = "levelId")]
        level_id: String,
        #[serde(default)]
        targets: Vec<String>,
    },
    Quiz {
        #[serde(default = "default_trigger_id")]
        id: String,
        #[serde(default, rename = "quizSetId")]
        quiz_set_id: Option<String>,
        #[serde(default, rename = "questionIds")]
        question_ids: Vec<String>,
        #[serde(default, rename = "maxCount")]
        max_count: usize,
    },
}

fn default_trigger_id() -> String {
    "trigger".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestAction {
    Verify { code: String },
    Select { key: String },
    Submit,
    /// Moves the virtual clock; without `ms` every pending continuation runs.
    Wait {
        #[serde(default)]
        ms: Option<u64>,
    },
    Cancel,
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Verify { .. } => "verify",
            Self::Select { .. } => "select",
            Self::Submit => "submit",
            Self::Wait { .. } => "wait",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExpectedEvent {
    Instruction {
        text: String,
    },
    Question {
        #[serde(rename = "questionId")]
        question_id: String,
        options: Vec<String>,
    },
    Verified {
        passed: bool,
        message: String,
    },
    Answered {
        key: String,
        correct: bool,
    },
    Mechanism {
        id: String,
        pattern: Option<i64>,
    },
    Closed {
        completed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<String>,
    },
}
