mod case;
mod runner;
mod source;

pub use case::{CaseTrigger, ExpectedEvent, TestAction, TestCase, TESTCASE_SCHEMA_V1};
pub use runner::{assert_case, run_case, RunReport};
pub use source::{read_content_from_dir, read_test_case, DemoContent};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CqToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse testcase {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid testcase schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No levels.json/questions.json files under {path}.")]
    SourceEmpty { path: PathBuf },
    #[error("Content error in {path}: {source}")]
    Content {
        path: PathBuf,
        source: cq_core::CodeQuestError,
    },
    #[error("Trigger \"{trigger_id}\" could not open a challenge.")]
    TriggerRejected { trigger_id: String },
    #[error("Action {action_index} ({action_kind}) was rejected by the host.")]
    ActionRejected {
        action_index: usize,
        action_kind: String,
    },
    #[error("Expected event count {expected}, actual {actual}. observed={observed}")]
    EventCountMismatch {
        expected: usize,
        actual: usize,
        observed: String,
    },
    #[error("Event mismatch at index {index}. expected={expected} actual={actual}")]
    EventMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("Failed to serialize event for diff: {0}")]
    EventSerialize(serde_json::Error),
}
