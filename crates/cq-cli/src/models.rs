use cq_assess::{LevelCatalog, QuestionBank, QuizSnapshot};
use cq_core::{QuestionRecord, RuleRecord};
use serde::{Deserialize, Serialize};

pub(crate) const QUIZ_STATE_SCHEMA: &str = "quiz-state.v1";

#[derive(Debug, Clone)]
pub(crate) struct LoadedContent {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) levels: Vec<RuleRecord>,
    pub(crate) questions: Vec<QuestionRecord>,
}

impl LoadedContent {
    pub(crate) fn catalog(&self) -> LevelCatalog {
        LevelCatalog::from_records(self.levels.iter().cloned())
    }

    pub(crate) fn bank(&self) -> QuestionBank {
        QuestionBank::from_records(self.questions.iter().cloned())
    }
}

/// Quiz progress carried between agent invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizStateV1 {
    pub(crate) schema_version: String,
    pub(crate) content_id: String,
    pub(crate) session: QuizSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuizEvent {
    Question,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuizBoundary {
    pub(crate) event: QuizEvent,
    pub(crate) answer: Option<(String, bool)>,
    pub(crate) progress: (usize, usize),
    pub(crate) instruction: Option<String>,
    pub(crate) options: Vec<(String, String)>,
    pub(crate) selected_key: Option<String>,
    pub(crate) score: Option<String>,
    pub(crate) headline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayCommandAction {
    NotHandled,
    Continue,
    Quit,
}
