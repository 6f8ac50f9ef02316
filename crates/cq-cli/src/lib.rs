use std::ffi::OsString;

use clap::Parser;
use cq_assess::PacingOptions;
use cq_core::CodeQuestError;
use tracing::info;

mod agent;
mod cli_args;
mod error_map;
mod line_tui;
mod models;
mod play_session;
mod protocol;
mod source_loader;
mod state_store;
mod tui;

pub(crate) use cli_args::{
    AgentArgs, AgentCommand, Cli, MarkupArgs, Mode, PlayArgs, QuizCommand, QuizSelectArgs,
    QuizStartArgs, QuizSubmitArgs, VerifyArgs,
};
pub(crate) use error_map::{
    emit_error, map_cli_code_read, map_cli_source_path, map_cli_source_read,
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write, map_tui_io,
};
pub(crate) use line_tui::run_play_line_mode;
#[cfg(test)]
pub(crate) use line_tui::{handle_play_command, run_play_line_mode_with_io};
pub(crate) use models::{
    LoadedContent, PlayCommandAction, QuizBoundary, QuizEvent, QuizStateV1, QUIZ_STATE_SCHEMA,
};
pub(crate) use play_session::PlaySession;
pub(crate) use source_loader::load_content_by_dir;
#[cfg(test)]
pub(crate) use source_loader::{make_content_id, read_content_from_dir, resolve_content_dir};
pub(crate) use state_store::{load_quiz_state, save_quiz_state};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return error.exit_code(),
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CodeQuestError> {
    match cli.command {
        Mode::Agent(args) => agent::run_agent(args),
        Mode::Play(args) => run_play(args),
    }
}

fn run_play(args: PlayArgs) -> Result<i32, CodeQuestError> {
    let content = load_content_by_dir(&args.content_dir)?;
    let pacing = if args.no_pacing {
        PacingOptions::immediate()
    } else {
        PacingOptions::default()
    };
    info!(content_id = %content.id, "starting play session");
    let mut session = PlaySession::new(content, pacing);
    tui::run_play_ratatui_mode(&mut session)
}
