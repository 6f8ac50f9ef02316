pub mod bank;
pub mod catalog;
pub mod deferred;
pub mod host;
pub mod lock;
pub mod markup;
pub mod platform;
pub mod quiz;
pub mod registry;
pub mod validator;

pub use bank::QuestionBank;
pub use catalog::LevelCatalog;
pub use deferred::{DeferredQueue, TaskId};
pub use host::{
    grade_submission, AssessmentHost, Feedback, FeedbackTone, HostEvent, PacingOptions, Trigger,
    TriggerKind, VerifyOutcome,
};
pub use lock::ExclusivityLock;
pub use markup::{validate_markup, MarkupReport};
pub use platform::{MovementPattern, PlatformMechanism};
pub use quiz::{
    AnswerFeedback, CompletionCallback, QuizContinuation, QuizPhase, QuizSession, QuizSnapshot,
    QuizStep,
};
pub use registry::{Mechanism, MechanismHandle, MechanismRegistry};
pub use validator::{error_message, validate, values_match, NUMERIC_TOLERANCE};
