use std::fs;
use std::path::Path;

use cq_core::CodeQuestError;

use crate::{
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write, QuizStateV1,
    QUIZ_STATE_SCHEMA,
};

pub(crate) fn save_quiz_state(path: &Path, state: &QuizStateV1) -> Result<(), CodeQuestError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(map_cli_state_write)?;

    let payload = serde_json::to_string(state).map_err(map_cli_state_write)?;
    fs::write(path, payload).map_err(map_cli_state_write)
}

pub(crate) fn load_quiz_state(path: &Path) -> Result<QuizStateV1, CodeQuestError> {
    if !path.exists() {
        return Err(CodeQuestError::new(
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(map_cli_state_read)?;

    let state: QuizStateV1 = serde_json::from_str(&raw).map_err(map_cli_state_invalid)?;

    if state.schema_version != QUIZ_STATE_SCHEMA {
        return Err(CodeQuestError::new(
            "CLI_STATE_SCHEMA",
            format!("Unsupported quiz state schema: {}", state.schema_version),
        ));
    }

    Ok(state)
}
