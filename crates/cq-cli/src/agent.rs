use std::fs;
use std::path::Path;

use cq_api::check_submission;
use cq_assess::{validate_markup, QuizSession};
use cq_core::CodeQuestError;
use cq_sandbox::SandboxOptions;
use tracing::debug;

use crate::protocol::{emit_markup, emit_quiz_boundary, emit_verify, quiz_boundary};
use crate::{
    load_content_by_dir, load_quiz_state, map_cli_code_read, map_cli_source_read,
    save_quiz_state, AgentArgs, AgentCommand, MarkupArgs, QuizCommand, QuizSelectArgs,
    QuizStartArgs, QuizStateV1, QuizSubmitArgs, VerifyArgs, QUIZ_STATE_SCHEMA,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, CodeQuestError> {
    match args.command {
        AgentCommand::Verify(args) => run_verify(args),
        AgentCommand::Quiz(args) => match args.command {
            QuizCommand::Start(args) => run_quiz_start(args),
            QuizCommand::Select(args) => run_quiz_select(args),
            QuizCommand::Submit(args) => run_quiz_submit(args),
        },
        AgentCommand::Markup(args) => run_markup(args),
    }
}

pub(super) fn run_verify(args: VerifyArgs) -> Result<i32, CodeQuestError> {
    let content = load_content_by_dir(&args.content_dir)?;
    let code = match (args.code, args.code_file) {
        (Some(code), _) => code,
        (None, Some(path)) => fs::read_to_string(path).map_err(map_cli_code_read)?,
        (None, None) => {
            return Err(CodeQuestError::new(
                "CLI_CODE_MISSING",
                "Pass the submission with --code or --code-file.",
            ))
        }
    };

    let (rule, outcome) = check_submission(
        &content.catalog(),
        &args.level,
        &code,
        SandboxOptions::from_env(),
    );
    debug!(level_id = %rule.level_id, passed = outcome.passed, "submission graded");
    emit_verify(&outcome);
    Ok(0)
}

pub(super) fn run_quiz_start(args: QuizStartArgs) -> Result<i32, CodeQuestError> {
    let content = load_content_by_dir(&args.content_dir)?;
    let questions = content.bank().query(
        args.quiz_set_id.as_deref(),
        &args.question_ids,
        args.max_count,
    );

    let mut session = QuizSession::new();
    if let Some(close) = session.start(questions, None) {
        session.resume(close);
    }
    emit_with_saved_state(&session, None, &args.state_out, &content.id)
}

pub(super) fn run_quiz_select(args: QuizSelectArgs) -> Result<i32, CodeQuestError> {
    let state = load_quiz_state(Path::new(&args.state_in))?;
    let mut session = QuizSession::from_snapshot(state.session);
    if !session.select(&args.key) {
        return Err(CodeQuestError::new(
            "CLI_QUIZ_SELECT_INVALID",
            format!("Option {} is not available for the current question.", args.key),
        ));
    }
    emit_with_saved_state(&session, None, &args.state_out, &state.content_id)
}

pub(super) fn run_quiz_submit(args: QuizSubmitArgs) -> Result<i32, CodeQuestError> {
    let state = load_quiz_state(Path::new(&args.state_in))?;
    let mut session = QuizSession::from_snapshot(state.session);
    let continuation = session.submit().ok_or_else(|| {
        CodeQuestError::new(
            "CLI_QUIZ_SUBMIT_INVALID",
            "Select an option before submitting.",
        )
    })?;
    let answer = session.feedback().cloned();
    // Agent runs have no pacing; the continuation applies right away.
    session.resume(continuation);
    emit_with_saved_state(&session, answer.as_ref(), &args.state_out, &state.content_id)
}

pub(super) fn run_markup(args: MarkupArgs) -> Result<i32, CodeQuestError> {
    let code = fs::read_to_string(&args.file).map_err(map_cli_source_read)?;
    emit_markup(&validate_markup(&code));
    Ok(0)
}

fn emit_with_saved_state(
    session: &QuizSession,
    answer: Option<&cq_assess::AnswerFeedback>,
    state_out: &str,
    content_id: &str,
) -> Result<i32, CodeQuestError> {
    let boundary = quiz_boundary(session, answer);
    if session.is_finished() {
        emit_quiz_boundary(boundary, None);
        return Ok(0);
    }

    save_quiz_state(
        Path::new(state_out),
        &QuizStateV1 {
            schema_version: QUIZ_STATE_SCHEMA.to_string(),
            content_id: content_id.to_string(),
            session: session.snapshot(),
        },
    )?;
    emit_quiz_boundary(boundary, Some(state_out));
    Ok(0)
}
