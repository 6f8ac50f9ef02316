use cq_core::CodeQuestError;
use std::fmt::Display;

use crate::protocol::json_string;

fn map_error(code: &'static str, error: impl Display) -> CodeQuestError {
    CodeQuestError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CodeQuestError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

pub(crate) fn map_tui_io(error: std::io::Error) -> CodeQuestError {
    map_error("TUI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> CodeQuestError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> CodeQuestError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_code_read(error: std::io::Error) -> CodeQuestError {
    map_error("CLI_CODE_READ", error)
}

pub(crate) fn map_cli_state_write(error: impl Display) -> CodeQuestError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> CodeQuestError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> CodeQuestError {
    map_error("CLI_STATE_INVALID", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(CodeQuestError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_tui_io(std::io::Error::other("io")).code, "TUI_IO");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );
        assert_eq!(
            map_cli_source_read(std::io::Error::other("read")).code,
            "CLI_SOURCE_READ"
        );
        assert_eq!(
            map_cli_code_read(std::io::Error::other("read")).code,
            "CLI_CODE_READ"
        );
        assert_eq!(
            map_cli_state_write(std::io::Error::other("write")).code,
            "CLI_STATE_WRITE"
        );
        assert_eq!(
            map_cli_state_read(std::io::Error::other("read")).code,
            "CLI_STATE_READ"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_state_invalid(invalid).code, "CLI_STATE_INVALID");
    }
}
