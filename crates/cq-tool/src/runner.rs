use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use cq_assess::{
    AssessmentHost, HostEvent, LevelCatalog, MechanismRegistry, MovementPattern,
    PlatformMechanism, QuestionBank, Trigger,
};
use cq_sandbox::{SandboxOptions, ScriptSandbox};

use crate::source::{read_content_from_dir, read_test_case};
use crate::{CaseTrigger, CqToolError, ExpectedEvent, TestAction, TestCase};

type Platforms = Vec<(String, Rc<RefCell<PlatformMechanism>>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub observed_events: Vec<ExpectedEvent>,
    pub consumed_actions: usize,
    /// True when the challenge was still holding the slot after the last action.
    pub still_open: bool,
}

pub fn run_case(demo_dir: &Path, case: &TestCase) -> Result<RunReport, CqToolError> {
    let content = read_content_from_dir(demo_dir)?;
    let mut registry = MechanismRegistry::new();
    let mut platforms = Platforms::new();

    let trigger = match &case.trigger {
        CaseTrigger::Code {
            id,
            level_id,
            targets,
        } => {
            for target in targets {
                let platform = Rc::new(RefCell::new(PlatformMechanism::new(target.clone())));
                registry.register(target, platform.clone());
                platforms.push((target.clone(), platform));
            }
            Trigger::code(id.clone(), level_id.clone()).with_targets(targets.iter().cloned())
        }
        CaseTrigger::Quiz {
            id,
            quiz_set_id,
            question_ids,
            max_count,
        } => Trigger::quiz(id.clone(), quiz_set_id.as_deref())
            .with_questions(question_ids.iter().cloned(), *max_count),
    };
    let trigger = Rc::new(trigger);

    let mut host = AssessmentHost::new(
        QuestionBank::from_records(content.questions),
        LevelCatalog::from_records(content.levels),
        registry,
        ScriptSandbox::with_options(SandboxOptions::from_env()),
    );
    if !host.contact(&trigger) {
        return Err(CqToolError::TriggerRejected {
            trigger_id: trigger.id.clone(),
        });
    }

    let mut observed_events = Vec::new();
    if let Some(feedback) = host.code_feedback() {
        observed_events.push(ExpectedEvent::Instruction {
            text: feedback.text.clone(),
        });
    }
    observed_events.extend(question_event(&host));

    for (action_index, action) in case.actions.iter().enumerate() {
        let rejected = || CqToolError::ActionRejected {
            action_index,
            action_kind: action.kind_name().to_string(),
        };
        match action {
            TestAction::Verify { code } => {
                let outcome = host.verify(code).ok_or_else(rejected)?;
                observed_events.push(ExpectedEvent::Verified {
                    passed: outcome.passed,
                    message: outcome.feedback.text,
                });
                if outcome.passed {
                    observed_events.extend(mechanism_events(&platforms));
                }
            }
            TestAction::Select { key } => {
                if !host.select(key) {
                    return Err(rejected());
                }
            }
            TestAction::Submit => {
                let feedback = host.submit().ok_or_else(rejected)?;
                observed_events.push(ExpectedEvent::Answered {
                    key: feedback.key,
                    correct: feedback.correct,
                });
            }
            TestAction::Wait { ms } => {
                let score = host.quiz().map(|session| session.score().to_string());
                let events = match ms {
                    Some(ms) => host.advance(Duration::from_millis(*ms)),
                    None => host.settle(),
                };
                for event in events {
                    match event {
                        HostEvent::QuestionLoaded { .. } => {
                            observed_events.extend(question_event(&host));
                        }
                        HostEvent::ChallengeClosed { completed, .. } => {
                            observed_events.push(ExpectedEvent::Closed {
                                completed,
                                score: score.clone(),
                            });
                        }
                    }
                }
            }
            TestAction::Cancel => {
                let event = host.cancel().ok_or_else(rejected)?;
                if let HostEvent::ChallengeClosed { completed, .. } = event {
                    observed_events.push(ExpectedEvent::Closed {
                        completed,
                        score: None,
                    });
                }
            }
        }
    }

    Ok(RunReport {
        observed_events,
        consumed_actions: case.actions.len(),
        still_open: host.is_busy(),
    })
}

fn question_event(host: &AssessmentHost) -> Option<ExpectedEvent> {
    let session = host.quiz()?;
    if session.is_finished() {
        return None;
    }
    let question = session.current_question()?;
    Some(ExpectedEvent::Question {
        question_id: question.question_id.clone(),
        options: question.option_keys().map(str::to_string).collect(),
    })
}

fn mechanism_events(platforms: &Platforms) -> Vec<ExpectedEvent> {
    platforms
        .iter()
        .map(|(id, platform)| ExpectedEvent::Mechanism {
            id: id.clone(),
            pattern: platform.borrow().pattern.map(MovementPattern::index),
        })
        .collect()
}

pub fn assert_case(demo_dir: &Path, case_path: &Path) -> Result<(), CqToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(demo_dir, &case)?;

    if report.observed_events.len() != case.expected_events.len() {
        let observed = serde_json::to_string_pretty(&report.observed_events)
            .map_err(CqToolError::EventSerialize)?;
        return Err(CqToolError::EventCountMismatch {
            expected: case.expected_events.len(),
            actual: report.observed_events.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_events
        .iter()
        .zip(report.observed_events.iter())
        .enumerate()
    {
        if expected != actual {
            let expected = serde_json::to_string(expected).map_err(CqToolError::EventSerialize)?;
            let actual = serde_json::to_string(actual).map_err(CqToolError::EventSerialize)?;
            return Err(CqToolError::EventMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    Ok(())
}
