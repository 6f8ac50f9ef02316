use std::collections::VecDeque;
use std::fmt;

use cq_core::{Question, QuizScore};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum QuizPhase {
    #[default]
    Idle,
    AwaitingSelection,
    Evaluating,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    /// Load the next front question.
    Advance,
    /// Hand the finished session back to its owner.
    Close,
}

/// A deferred step returned by the session. Resuming one that belongs to an
/// earlier session generation does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizContinuation {
    generation: u64,
    step: QuizStep,
}

impl QuizContinuation {
    pub fn step(&self) -> QuizStep {
        self.step
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub key: String,
    pub correct: bool,
}

pub type CompletionCallback = Box<dyn FnOnce(QuizScore)>;

/// Serializable view of a session, used to carry a quiz across process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    pub phase: QuizPhase,
    pub queue: Vec<Question>,
    pub correct_count: usize,
    pub total: usize,
    pub selected_key: Option<String>,
    pub feedback: Option<AnswerFeedback>,
}

/// Retry-until-correct quiz: a wrong answer sends the question to the back of
/// the queue, a right one removes it for good.
#[derive(Default)]
pub struct QuizSession {
    phase: QuizPhase,
    queue: VecDeque<Question>,
    correct_count: usize,
    total: usize,
    selected_key: Option<String>,
    feedback: Option<AnswerFeedback>,
    generation: u64,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase)
            .field("remaining", &self.queue.len())
            .field("correct_count", &self.correct_count)
            .field("total", &self.total)
            .field("selected_key", &self.selected_key)
            .field("generation", &self.generation)
            .finish()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty question list finishes immediately and returns the close step
    /// so the owner still gets its completion.
    pub fn start(
        &mut self,
        questions: Vec<Question>,
        on_complete: Option<CompletionCallback>,
    ) -> Option<QuizContinuation> {
        self.reset();
        self.total = questions.len();
        self.queue = questions.into();
        self.on_complete = on_complete;

        if self.queue.is_empty() {
            debug!("quiz started without questions");
            self.phase = QuizPhase::Finished;
            return Some(self.continuation(QuizStep::Close));
        }
        self.phase = QuizPhase::AwaitingSelection;
        None
    }

    /// Selects an option of the current question, replacing any earlier pick.
    pub fn select(&mut self, key: &str) -> bool {
        if self.phase != QuizPhase::AwaitingSelection {
            return false;
        }
        let known = self
            .current_question()
            .map(|question| question.has_option(key))
            .unwrap_or(false);
        if !known {
            return false;
        }
        self.selected_key = Some(key.to_string());
        true
    }

    pub fn can_submit(&self) -> bool {
        self.phase == QuizPhase::AwaitingSelection && self.selected_key.is_some()
    }

    pub fn submit(&mut self) -> Option<QuizContinuation> {
        if !self.can_submit() {
            return None;
        }
        let key = self.selected_key.clone()?;
        let question = self.queue.pop_front()?;
        let correct = key == question.correct_option_key;

        if correct {
            self.correct_count += 1;
        } else {
            self.queue.push_back(question);
        }
        self.feedback = Some(AnswerFeedback { key, correct });

        if self.queue.is_empty() {
            self.phase = QuizPhase::Finished;
            Some(self.continuation(QuizStep::Close))
        } else {
            self.phase = QuizPhase::Evaluating;
            Some(self.continuation(QuizStep::Advance))
        }
    }

    /// Returns false when the continuation was stale or out of phase.
    pub fn resume(&mut self, continuation: QuizContinuation) -> bool {
        if continuation.generation != self.generation {
            debug!("stale quiz continuation ignored");
            return false;
        }
        match (continuation.step, self.phase) {
            (QuizStep::Advance, QuizPhase::Evaluating) => {
                self.phase = QuizPhase::AwaitingSelection;
                self.selected_key = None;
                self.feedback = None;
                true
            }
            (QuizStep::Close, QuizPhase::Finished) => {
                if let Some(on_complete) = self.on_complete.take() {
                    on_complete(self.score());
                }
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.phase = QuizPhase::Idle;
        self.queue.clear();
        self.correct_count = 0;
        self.total = 0;
        self.selected_key = None;
        self.feedback = None;
        self.on_complete = None;
        self.generation += 1;
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == QuizPhase::Finished
    }

    /// The question on screen; while evaluating this is already the next one.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            QuizPhase::AwaitingSelection | QuizPhase::Evaluating => self.queue.front(),
            QuizPhase::Idle | QuizPhase::Finished => None,
        }
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected_key.as_deref()
    }

    pub fn feedback(&self) -> Option<&AnswerFeedback> {
        self.feedback.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn score(&self) -> QuizScore {
        QuizScore {
            correct: self.correct_count,
            total: self.total,
        }
    }

    /// `(step, total)` for the progress indicator; finished sessions show
    /// `total/total`.
    pub fn progress(&self) -> (usize, usize) {
        if self.total == 0 {
            return (0, 0);
        }
        if self.is_finished() {
            return (self.total, self.total);
        }
        ((self.correct_count + 1).clamp(1, self.total), self.total)
    }

    pub fn headline(&self) -> String {
        match self.phase {
            QuizPhase::Idle => String::new(),
            QuizPhase::Finished if self.total == 0 => {
                "No questions are configured for this quiz.".to_string()
            }
            QuizPhase::Finished => format!(
                "Completed! Correct: {} of {}",
                self.correct_count, self.total
            ),
            QuizPhase::AwaitingSelection | QuizPhase::Evaluating => self
                .current_question()
                .map(|question| question.instruction.clone())
                .unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            phase: self.phase,
            queue: self.queue.iter().cloned().collect(),
            correct_count: self.correct_count,
            total: self.total,
            selected_key: self.selected_key.clone(),
            feedback: self.feedback.clone(),
        }
    }

    /// Rebuilds a session without pending continuations; an evaluating
    /// snapshot resumes at the next question.
    pub fn from_snapshot(snapshot: QuizSnapshot) -> Self {
        let mut session = Self::new();
        session.total = snapshot.total.max(snapshot.queue.len());
        session.correct_count = snapshot.correct_count.min(session.total);
        session.queue = snapshot.queue.into();
        session.feedback = snapshot.feedback;
        session.phase = match snapshot.phase {
            QuizPhase::Evaluating => QuizPhase::AwaitingSelection,
            phase => phase,
        };
        if session.phase == QuizPhase::AwaitingSelection {
            if session.queue.is_empty() {
                session.phase = QuizPhase::Finished;
            } else if snapshot.phase == QuizPhase::AwaitingSelection {
                session.selected_key = snapshot.selected_key;
            }
        }
        session
    }

    fn continuation(&self, step: QuizStep) -> QuizContinuation {
        QuizContinuation {
            generation: self.generation,
            step,
        }
    }
}
