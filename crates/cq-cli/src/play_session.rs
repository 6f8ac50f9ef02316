use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cq_assess::{
    AssessmentHost, HostEvent, MechanismRegistry, PacingOptions, PlatformMechanism, Trigger,
    TriggerKind,
};
use cq_core::CodeQuestError;
use cq_sandbox::{SandboxOptions, ScriptSandbox};

use crate::LoadedContent;

const PLATFORM_ID: &str = "platform_1";

/// One place in the lesson world the player can walk up to.
#[derive(Debug, Clone)]
pub(crate) struct Station {
    pub(crate) label: String,
    pub(crate) trigger: Rc<Trigger>,
}

/// Interactive game state shared by both play front ends: a list of
/// stations, the assessment host and the platform the code lessons drive.
pub(crate) struct PlaySession {
    content: LoadedContent,
    host: AssessmentHost,
    stations: Vec<Station>,
    platform: Rc<RefCell<PlatformMechanism>>,
}

impl PlaySession {
    pub(crate) fn new(content: LoadedContent, pacing: PacingOptions) -> Self {
        let platform = Rc::new(RefCell::new(PlatformMechanism::new(PLATFORM_ID)));
        let mut registry = MechanismRegistry::new();
        registry.register(PLATFORM_ID, platform.clone());

        let catalog = content.catalog();
        let bank = content.bank();
        let mut stations = catalog
            .level_ids()
            .into_iter()
            .map(|level_id| Station {
                label: format!("Code: {}", level_id),
                trigger: Rc::new(
                    Trigger::code(format!("code:{}", level_id), level_id)
                        .with_targets([PLATFORM_ID]),
                ),
            })
            .collect::<Vec<_>>();
        let mut set_ids = bank.set_ids().map(str::to_string).collect::<Vec<_>>();
        set_ids.sort();
        stations.extend(set_ids.into_iter().map(|set_id| Station {
            label: format!("Quiz: {}", set_id),
            trigger: Rc::new(Trigger::quiz(format!("quiz:{}", set_id), Some(set_id.as_str()))),
        }));

        let host = AssessmentHost::new(
            bank,
            catalog,
            registry,
            ScriptSandbox::with_options(SandboxOptions::from_env()),
        )
        .with_pacing(pacing);

        Self {
            content,
            host,
            stations,
            platform,
        }
    }

    pub(crate) fn content(&self) -> &LoadedContent {
        &self.content
    }

    pub(crate) fn host(&self) -> &AssessmentHost {
        &self.host
    }

    pub(crate) fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub(crate) fn is_open(&self) -> bool {
        self.host.is_busy()
    }

    pub(crate) fn in_code_challenge(&self) -> bool {
        self.host.rule().is_some()
    }

    pub(crate) fn in_quiz(&self) -> bool {
        self.host.quiz().is_some()
    }

    pub(crate) fn open(&mut self, index: usize) -> Result<Vec<String>, CodeQuestError> {
        let station = self.stations.get(index).cloned().ok_or_else(|| {
            CodeQuestError::new(
                "PLAY_STATION_INVALID",
                format!("There is no station number {}.", index),
            )
        })?;
        if !self.host.contact(&station.trigger) {
            return Ok(vec!["Another challenge is already open.".to_string()]);
        }

        let mut lines = vec![format!("== {} ==", station.label)];
        match &station.trigger.kind {
            TriggerKind::Code { .. } => {
                if let Some(feedback) = self.host.code_feedback() {
                    lines.push(feedback.text.clone());
                }
            }
            TriggerKind::Quiz { .. } => lines.extend(self.question_lines()),
        }
        Ok(lines)
    }

    pub(crate) fn verify(&mut self, code: &str) -> Vec<String> {
        let Some(outcome) = self.host.verify(code) else {
            return vec!["No code challenge is open.".to_string()];
        };
        let mut lines = Vec::new();
        if let Some(execution) = &outcome.execution {
            lines.extend(execution.output.iter().map(|line| format!("> {}", line)));
        }
        lines.push(outcome.feedback.text);
        if outcome.passed {
            lines.push(self.platform_status());
        }
        lines
    }

    pub(crate) fn select(&mut self, key: &str) -> bool {
        self.host.select(key)
    }

    /// Selects `key` and submits it in one step.
    pub(crate) fn answer(&mut self, key: &str) -> Vec<String> {
        if !self.host.select(key) {
            return vec![format!("Option {} is not available.", key)];
        }
        match self.host.submit() {
            Some(feedback) if feedback.correct => vec![format!("{}: correct!", feedback.key)],
            Some(feedback) => vec![format!(
                "{}: not quite. This question comes back later.",
                feedback.key
            )],
            None => vec!["Select an option before submitting.".to_string()],
        }
    }

    pub(crate) fn tick(&mut self, elapsed: Duration) -> Vec<String> {
        let headline = self.host.quiz().map(|session| session.headline());
        let events = self.host.advance(elapsed);
        self.describe_events(events, headline)
    }

    pub(crate) fn settle(&mut self) -> Vec<String> {
        let headline = self.host.quiz().map(|session| session.headline());
        let events = self.host.settle();
        self.describe_events(events, headline)
    }

    pub(crate) fn leave(&mut self) -> Vec<String> {
        match self.host.cancel() {
            Some(_) => vec!["You walked away from the challenge.".to_string()],
            None => Vec::new(),
        }
    }

    pub(crate) fn question_lines(&self) -> Vec<String> {
        let Some(session) = self.host.quiz() else {
            return Vec::new();
        };
        if session.is_finished() {
            return vec![session.headline()];
        }
        let Some(question) = session.current_question() else {
            return Vec::new();
        };
        let (step, total) = session.progress();
        let mut lines = vec![
            format!("Question {}/{}", step, total),
            question.instruction.clone(),
        ];
        lines.extend(
            question
                .options
                .iter()
                .map(|option| format!("  [{}] {}", option.key, option.text)),
        );
        lines
    }

    pub(crate) fn platform_status(&self) -> String {
        let platform = self.platform.borrow();
        match platform.pattern {
            Some(pattern) => format!(
                "{} now follows movement pattern {}.",
                platform.id,
                pattern.index()
            ),
            None => format!("{} is standing still.", platform.id),
        }
    }

    fn describe_events(&self, events: Vec<HostEvent>, headline: Option<String>) -> Vec<String> {
        let mut lines = Vec::new();
        for event in events {
            match event {
                HostEvent::QuestionLoaded { .. } => lines.extend(self.question_lines()),
                HostEvent::ChallengeClosed { completed, .. } => {
                    if completed {
                        if let Some(headline) = &headline {
                            lines.push(headline.clone());
                        }
                        lines.push("Challenge complete.".to_string());
                    } else {
                        lines.push("Challenge closed.".to_string());
                    }
                }
            }
        }
        lines
    }
}
