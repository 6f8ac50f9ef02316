use cq_assess::{AnswerFeedback, MarkupReport, QuizSession, VerifyOutcome};
use cq_core::Value;

use crate::{QuizBoundary, QuizEvent};

pub(crate) fn json_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn binding_text(value: &Value) -> String {
    match value {
        Value::String(text) => json_string(text),
        other => other.to_string(),
    }
}

pub(crate) fn emit_verify(outcome: &VerifyOutcome) {
    println!("RESULT:OK");
    println!("PASSED:{}", outcome.passed);
    println!("MESSAGE_JSON:{}", json_string(&outcome.feedback.text));

    let Some(execution) = &outcome.execution else {
        return;
    };
    if let Some(fault) = execution.fault {
        println!("FAULT:{}", fault.as_str());
    }
    if let Some(line) = execution.error_line {
        println!("ERROR_LINE:{}", line);
    }
    for (name, value) in &execution.bindings {
        println!("BINDING:{}|{}", name, binding_text(value));
    }
    for line in &execution.output {
        println!("OUTPUT_JSON:{}", json_string(line));
    }
}

pub(crate) fn quiz_boundary(
    session: &QuizSession,
    answer: Option<&AnswerFeedback>,
) -> QuizBoundary {
    let question = session.current_question();
    QuizBoundary {
        event: if session.is_finished() {
            QuizEvent::Finished
        } else {
            QuizEvent::Question
        },
        answer: answer.map(|feedback| (feedback.key.clone(), feedback.correct)),
        progress: session.progress(),
        instruction: question.map(|question| question.instruction.clone()),
        options: question
            .map(|question| {
                question
                    .options
                    .iter()
                    .map(|option| (option.key.clone(), option.text.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        selected_key: session.selected_key().map(str::to_string),
        score: session
            .is_finished()
            .then(|| session.score().to_string()),
        headline: session.headline(),
    }
}

pub(crate) fn emit_quiz_boundary(boundary: QuizBoundary, state_out: Option<&str>) {
    println!("RESULT:OK");
    match boundary.event {
        QuizEvent::Question => println!("EVENT:QUESTION"),
        QuizEvent::Finished => println!("EVENT:FINISHED"),
    }

    if let Some((key, correct)) = boundary.answer {
        println!("ANSWER:{}|{}", key, correct);
    }
    println!("PROGRESS:{}/{}", boundary.progress.0, boundary.progress.1);

    if let Some(instruction) = boundary.instruction {
        println!("QUESTION_JSON:{}", json_string(&instruction));
    }
    for (key, text) in boundary.options {
        println!("OPTION:{}|{}", key, json_string(&text));
    }
    if let Some(selected) = boundary.selected_key {
        println!("SELECTED:{}", selected);
    }
    if let Some(score) = boundary.score {
        println!("SCORE:{}", score);
    }
    println!("MESSAGE_JSON:{}", json_string(&boundary.headline));
    println!("STATE_OUT:{}", state_out.unwrap_or("NONE"));
}

pub(crate) fn emit_markup(report: &MarkupReport) {
    println!("RESULT:OK");
    println!("PASSED:{}", report.success);
    println!("SCORE:{:.2}", report.score);
    println!("MESSAGE_JSON:{}", json_string(&report.message));
    for error in &report.errors {
        println!("ERROR_JSON:{}", json_string(error));
    }
}

#[cfg(test)]
mod protocol_tests {
    use super::*;
    use cq_core::{Question, QuizOption};

    fn question(id: &str, correct: &str) -> Question {
        Question {
            question_id: id.to_string(),
            quiz_set_id: None,
            instruction: format!("Question {}", id),
            options: ["A", "B"]
                .into_iter()
                .map(|key| QuizOption {
                    key: key.to_string(),
                    text: format!("Option {}", key),
                })
                .collect(),
            correct_option_key: correct.to_string(),
        }
    }

    #[test]
    fn json_string_escapes_quotes() {
        assert_eq!(json_string("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn binding_text_quotes_only_strings() {
        assert_eq!(binding_text(&Value::Number(4321.0)), "4321");
        assert_eq!(binding_text(&Value::Boolean(true)), "true");
        assert_eq!(binding_text(&Value::from("hello")), "\"hello\"");
    }

    #[test]
    fn quiz_boundary_describes_open_and_finished_sessions() {
        let mut session = QuizSession::new();
        session.start(vec![question("1", "A")], None);
        session.select("B");

        let open = quiz_boundary(&session, None);
        assert_eq!(open.event, QuizEvent::Question);
        assert_eq!(open.progress, (1, 1));
        assert_eq!(open.instruction.as_deref(), Some("Question 1"));
        assert_eq!(open.options.len(), 2);
        assert_eq!(open.selected_key.as_deref(), Some("B"));
        assert!(open.score.is_none());

        session.select("A");
        let close = session.submit().expect("submission accepted");
        session.resume(close);
        let finished = quiz_boundary(&session, session.feedback());
        assert_eq!(finished.event, QuizEvent::Finished);
        assert_eq!(finished.answer, Some(("A".to_string(), true)));
        assert_eq!(finished.score.as_deref(), Some("1/1"));
        assert_eq!(finished.headline, "Completed! Correct: 1 of 1");
        assert!(finished.instruction.is_none());
    }
}
