use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "codequest")]
#[command(about = "CodeQuest assessment agent CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Agent(AgentArgs),
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Verify(VerifyArgs),
    Quiz(QuizArgs),
    Markup(MarkupArgs),
}

#[derive(Debug, Args)]
pub(crate) struct VerifyArgs {
    #[arg(long = "content-dir")]
    pub(crate) content_dir: String,
    #[arg(long = "level")]
    pub(crate) level: String,
    #[arg(long = "code", conflicts_with = "code_file")]
    pub(crate) code: Option<String>,
    #[arg(long = "code-file")]
    pub(crate) code_file: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct QuizArgs {
    #[command(subcommand)]
    pub(crate) command: QuizCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum QuizCommand {
    Start(QuizStartArgs),
    Select(QuizSelectArgs),
    Submit(QuizSubmitArgs),
}

#[derive(Debug, Args)]
pub(crate) struct QuizStartArgs {
    #[arg(long = "content-dir")]
    pub(crate) content_dir: String,
    #[arg(long = "set")]
    pub(crate) quiz_set_id: Option<String>,
    #[arg(long = "question")]
    pub(crate) question_ids: Vec<String>,
    #[arg(long = "max-count", default_value_t = 0)]
    pub(crate) max_count: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct QuizSelectArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "key")]
    pub(crate) key: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct QuizSubmitArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct MarkupArgs {
    #[arg(long = "file")]
    pub(crate) file: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "content-dir")]
    pub(crate) content_dir: String,
    /// Skip the feedback pauses between quiz questions.
    #[arg(long = "no-pacing")]
    pub(crate) no_pacing: bool,
}
