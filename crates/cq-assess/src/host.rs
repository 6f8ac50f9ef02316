use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cq_core::{ExecutionResult, QuizScore, Rule};
use cq_sandbox::{RhaiEvaluator, ScriptEvaluator, ScriptSandbox};
use serde::Serialize;
use tracing::{debug, info};

use crate::bank::QuestionBank;
use crate::catalog::LevelCatalog;
use crate::deferred::DeferredQueue;
use crate::lock::ExclusivityLock;
use crate::quiz::{AnswerFeedback, QuizContinuation, QuizSession, QuizStep};
use crate::registry::MechanismRegistry;
use crate::validator::{error_message, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    Code {
        level_id: String,
    },
    Quiz {
        quiz_set_id: Option<String>,
        question_ids: Vec<String>,
        max_count: usize,
    },
}

/// A world object that opens a challenge on contact. The world owns it
/// through an `Rc`; the host only keeps a weak claim on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub id: String,
    pub kind: TriggerKind,
    pub target_mechanism_ids: Vec<String>,
}

impl Trigger {
    pub fn code(id: impl Into<String>, level_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TriggerKind::Code {
                level_id: level_id.into(),
            },
            target_mechanism_ids: Vec::new(),
        }
    }

    pub fn quiz(id: impl Into<String>, quiz_set_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            kind: TriggerKind::Quiz {
                quiz_set_id: quiz_set_id.map(str::to_string),
                question_ids: Vec::new(),
                max_count: 0,
            },
            target_mechanism_ids: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.target_mechanism_ids = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_questions(
        mut self,
        ids: impl IntoIterator<Item = impl Into<String>>,
        max: usize,
    ) -> Self {
        if let TriggerKind::Quiz {
            question_ids,
            max_count,
            ..
        } = &mut self.kind
        {
            *question_ids = ids.into_iter().map(Into::into).collect();
            *max_count = max;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingOptions {
    pub quiz_advance: Duration,
    pub quiz_close: Duration,
    pub code_close: Duration,
}

impl Default for PacingOptions {
    fn default() -> Self {
        Self {
            quiz_advance: Duration::from_millis(600),
            quiz_close: Duration::from_secs(2),
            code_close: Duration::from_secs(1),
        }
    }
}

impl PacingOptions {
    /// No delays; every continuation fires on the next `advance`.
    pub fn immediate() -> Self {
        Self {
            quiz_advance: Duration::ZERO,
            quiz_close: Duration::ZERO,
            code_close: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Neutral,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub tone: FeedbackTone,
    pub text: String,
}

impl Feedback {
    fn neutral(text: impl Into<String>) -> Self {
        Self {
            tone: FeedbackTone::Neutral,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            tone: FeedbackTone::Success,
            text: text.into(),
        }
    }

    fn failure(text: impl Into<String>) -> Self {
        Self {
            tone: FeedbackTone::Failure,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub passed: bool,
    pub feedback: Feedback,
    pub execution: Option<ExecutionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    QuestionLoaded { trigger_id: String },
    ChallengeClosed { trigger_id: String, completed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostTask {
    Quiz(QuizContinuation),
    CloseCode,
}

enum ActiveChallenge {
    Code {
        trigger_id: String,
        targets: Vec<String>,
        rule: Rule,
        feedback: Feedback,
        solved: bool,
    },
    Quiz {
        trigger_id: String,
        session: QuizSession,
        completion: Rc<Cell<Option<QuizScore>>>,
    },
}

impl ActiveChallenge {
    fn trigger_id(&self) -> &str {
        match self {
            Self::Code { trigger_id, .. } | Self::Quiz { trigger_id, .. } => trigger_id,
        }
    }
}

/// Owns the shared services and runs both challenge flows for whichever
/// trigger currently holds the assessment slot.
pub struct AssessmentHost<E: ScriptEvaluator = RhaiEvaluator> {
    lock: ExclusivityLock<Trigger>,
    bank: QuestionBank,
    catalog: LevelCatalog,
    registry: MechanismRegistry,
    sandbox: ScriptSandbox<E>,
    pending: DeferredQueue<HostTask>,
    pacing: PacingOptions,
    active: Option<ActiveChallenge>,
}

impl<E: ScriptEvaluator> AssessmentHost<E> {
    pub fn new(
        bank: QuestionBank,
        catalog: LevelCatalog,
        registry: MechanismRegistry,
        sandbox: ScriptSandbox<E>,
    ) -> Self {
        Self {
            lock: ExclusivityLock::new(),
            bank,
            catalog,
            registry,
            sandbox,
            pending: DeferredQueue::new(),
            pacing: PacingOptions::default(),
            active: None,
        }
    }

    pub fn with_pacing(mut self, pacing: PacingOptions) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &MechanismRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MechanismRegistry {
        &mut self.registry
    }

    pub fn sandbox(&self) -> &ScriptSandbox<E> {
        &self.sandbox
    }

    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    pub fn active_trigger_id(&self) -> Option<&str> {
        self.active.as_ref().map(ActiveChallenge::trigger_id)
    }

    /// Player contact with a trigger. Returns false when another challenge
    /// holds the slot.
    pub fn contact(&mut self, trigger: &Rc<Trigger>) -> bool {
        let already_active = self.lock.is_held_by(trigger)
            && self.active_trigger_id() == Some(trigger.id.as_str());
        if !self.lock.try_acquire(trigger) {
            info!(trigger_id = %trigger.id, "assessment in progress; contact ignored");
            return false;
        }
        if already_active {
            return true;
        }
        if self.active.is_some() {
            debug!("previous holder dropped; discarding its challenge");
            self.discard_active();
        }

        match &trigger.kind {
            TriggerKind::Code { level_id } => {
                let rule = self.catalog.resolve(level_id);
                let feedback = Feedback::neutral(open_instruction(&rule));
                self.active = Some(ActiveChallenge::Code {
                    trigger_id: trigger.id.clone(),
                    targets: trigger.target_mechanism_ids.clone(),
                    rule,
                    feedback,
                    solved: false,
                });
            }
            TriggerKind::Quiz {
                quiz_set_id,
                question_ids,
                max_count,
            } => {
                let questions = self
                    .bank
                    .query(quiz_set_id.as_deref(), question_ids, *max_count);
                let completion = Rc::new(Cell::new(None));
                let sink = Rc::clone(&completion);
                let mut session = QuizSession::new();
                let close = session.start(
                    questions,
                    Some(Box::new(move |score| sink.set(Some(score)))),
                );
                if let Some(close) = close {
                    self.schedule_quiz(close);
                }
                self.active = Some(ActiveChallenge::Quiz {
                    trigger_id: trigger.id.clone(),
                    session,
                    completion,
                });
            }
        }
        info!(trigger_id = %trigger.id, "challenge opened");
        true
    }

    pub fn rule(&self) -> Option<&Rule> {
        match self.active.as_ref()? {
            ActiveChallenge::Code { rule, .. } => Some(rule),
            ActiveChallenge::Quiz { .. } => None,
        }
    }

    pub fn code_feedback(&self) -> Option<&Feedback> {
        match self.active.as_ref()? {
            ActiveChallenge::Code { feedback, .. } => Some(feedback),
            ActiveChallenge::Quiz { .. } => None,
        }
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        match self.active.as_ref()? {
            ActiveChallenge::Quiz { session, .. } => Some(session),
            ActiveChallenge::Code { .. } => None,
        }
    }

    /// Runs a code submission for the open code challenge. Returns `None`
    /// when no code challenge is open.
    pub fn verify(&mut self, code: &str) -> Option<VerifyOutcome> {
        let Some(ActiveChallenge::Code {
            targets,
            rule,
            feedback,
            solved,
            ..
        }) = self.active.as_mut()
        else {
            return None;
        };

        if *solved {
            return Some(VerifyOutcome {
                passed: true,
                feedback: feedback.clone(),
                execution: None,
            });
        }

        let outcome = grade_submission(&self.sandbox, rule, code);
        *feedback = outcome.feedback.clone();
        if outcome.passed {
            *solved = true;
            info!(level_id = %rule.level_id, "code challenge solved");
            if let (Some(effect), Some(execution)) =
                (rule.effect_id.as_deref(), outcome.execution.as_ref())
            {
                let value = execution.bindings.get(&rule.required_name);
                for target in targets.iter() {
                    self.registry.apply_effect(target, effect, value);
                }
            }
            self.pending.schedule(self.pacing.code_close, HostTask::CloseCode);
        }
        Some(outcome)
    }

    pub fn select(&mut self, key: &str) -> bool {
        match self.active.as_mut() {
            Some(ActiveChallenge::Quiz { session, .. }) => session.select(key),
            _ => false,
        }
    }

    pub fn submit(&mut self) -> Option<AnswerFeedback> {
        let Some(ActiveChallenge::Quiz { session, .. }) = self.active.as_mut() else {
            return None;
        };
        let continuation = session.submit()?;
        let feedback = session.feedback().cloned();
        self.schedule_quiz(continuation);
        feedback
    }

    /// Moves the virtual clock and runs every continuation that fell due.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<HostEvent> {
        let mut events = Vec::new();
        for task in self.pending.advance(elapsed) {
            match task {
                HostTask::CloseCode => {
                    if matches!(self.active, Some(ActiveChallenge::Code { .. })) {
                        events.extend(self.close(true));
                    }
                }
                HostTask::Quiz(continuation) => {
                    let Some(ActiveChallenge::Quiz {
                        trigger_id,
                        session,
                        completion,
                    }) = self.active.as_mut()
                    else {
                        continue;
                    };
                    if !session.resume(continuation) {
                        continue;
                    }
                    if continuation.step() == QuizStep::Advance {
                        events.push(HostEvent::QuestionLoaded {
                            trigger_id: trigger_id.clone(),
                        });
                    } else if let Some(score) = completion.take() {
                        info!(score = %score, "quiz completed");
                        events.extend(self.close(true));
                    }
                }
            }
        }
        events
    }

    /// Runs every pending continuation regardless of its delay.
    pub fn settle(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        while !self.pending.is_empty() {
            let remaining = self.pending.time_until_last();
            events.extend(self.advance(remaining));
        }
        events
    }

    /// Learner left the challenge: drop pending continuations, reset the
    /// session and free the slot.
    pub fn cancel(&mut self) -> Option<HostEvent> {
        self.close(false)
    }

    fn close(&mut self, completed: bool) -> Option<HostEvent> {
        let trigger_id = self.discard_active()?;
        if let Some(holder) = self.lock.holder() {
            self.lock.release(&holder);
        }
        info!(trigger_id = %trigger_id, completed, "challenge closed");
        Some(HostEvent::ChallengeClosed {
            trigger_id,
            completed,
        })
    }

    fn discard_active(&mut self) -> Option<String> {
        let discarded = self.pending.cancel_all();
        if discarded > 0 {
            debug!(discarded, "pending continuations cancelled");
        }
        let mut active = self.active.take()?;
        if let ActiveChallenge::Quiz { session, .. } = &mut active {
            session.reset();
        }
        Some(active.trigger_id().to_string())
    }

    fn schedule_quiz(&mut self, continuation: QuizContinuation) {
        let delay = match continuation.step() {
            QuizStep::Advance => self.pacing.quiz_advance,
            QuizStep::Close => self.pacing.quiz_close,
        };
        self.pending.schedule(delay, HostTask::Quiz(continuation));
    }
}

/// Runs and judges one submission without touching any challenge state.
/// Blank code is rejected before it reaches the sandbox, and validation only
/// runs on a successful execution.
pub fn grade_submission<E: ScriptEvaluator>(
    sandbox: &ScriptSandbox<E>,
    rule: &Rule,
    code: &str,
) -> VerifyOutcome {
    if code.trim().is_empty() {
        return VerifyOutcome {
            passed: false,
            feedback: Feedback::failure("Write some code before verifying."),
            execution: None,
        };
    }

    let execution = sandbox.execute(code, rule);
    let passed = execution.success && validate(rule, &execution.bindings);
    let feedback = if passed {
        Feedback::success(format!("Correct! {}", execution.message))
    } else if !execution.success {
        Feedback::failure(execution.message.clone())
    } else {
        Feedback::failure(format!(
            "{} {}",
            error_message(rule, &execution.first_value()),
            execution.message
        ))
    };
    VerifyOutcome {
        passed,
        feedback,
        execution: Some(execution),
    }
}

fn open_instruction(rule: &Rule) -> String {
    if rule.instruction.trim().is_empty() {
        format!(
            "Write your code for lesson {} and press Verify.",
            rule.level_id
        )
    } else {
        rule.instruction.clone()
    }
}
