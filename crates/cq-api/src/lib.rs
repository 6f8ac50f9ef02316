use cq_assess::{
    grade_submission, AssessmentHost, LevelCatalog, MechanismRegistry, PacingOptions,
    QuestionBank, VerifyOutcome,
};
use cq_core::{CodeQuestError, LevelFile, QuestionRecord, Rule, RuleRecord};
use cq_sandbox::{SandboxOptions, ScriptSandbox};
use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct CreateHostFromJsonOptions {
    pub levels_json: Option<String>,
    pub questions_json: Option<String>,
    pub sandbox: SandboxOptions,
    pub pacing: PacingOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelsDocument {
    Bare(Vec<RuleRecord>),
    Wrapped(LevelFile),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsDocument {
    Bare(Vec<QuestionRecord>),
    Wrapped { questions: Vec<QuestionRecord> },
}

/// Accepts `{ "levels": [...] }` or a bare array.
pub fn parse_levels_json(text: &str) -> Result<Vec<RuleRecord>, CodeQuestError> {
    let document: LevelsDocument = serde_json::from_str(text).map_err(|error| {
        CodeQuestError::new(
            "API_LEVELS_JSON_INVALID",
            format!("Levels JSON is invalid: {}", error),
        )
    })?;
    Ok(match document {
        LevelsDocument::Bare(levels) => levels,
        LevelsDocument::Wrapped(file) => file.levels,
    })
}

/// Accepts a bare array or `{ "questions": [...] }`.
pub fn parse_questions_json(text: &str) -> Result<Vec<QuestionRecord>, CodeQuestError> {
    let document: QuestionsDocument = serde_json::from_str(text).map_err(|error| {
        CodeQuestError::new(
            "API_QUESTIONS_JSON_INVALID",
            format!("Questions JSON is invalid: {}", error),
        )
    })?;
    Ok(match document {
        QuestionsDocument::Bare(questions) => questions,
        QuestionsDocument::Wrapped { questions } => questions,
    })
}

pub fn catalog_from_json(text: &str) -> Result<LevelCatalog, CodeQuestError> {
    Ok(LevelCatalog::from_records(parse_levels_json(text)?))
}

pub fn bank_from_json(text: &str) -> Result<QuestionBank, CodeQuestError> {
    Ok(QuestionBank::from_records(parse_questions_json(text)?))
}

/// Builds a host with an empty mechanism registry; callers register world
/// mechanisms afterwards.
pub fn create_host_from_json(
    options: CreateHostFromJsonOptions,
) -> Result<AssessmentHost, CodeQuestError> {
    let catalog = match options.levels_json.as_deref() {
        Some(text) => catalog_from_json(text)?,
        None => LevelCatalog::new(),
    };
    let bank = match options.questions_json.as_deref() {
        Some(text) => bank_from_json(text)?,
        None => QuestionBank::new(),
    };

    Ok(AssessmentHost::new(
        bank,
        catalog,
        MechanismRegistry::new(),
        ScriptSandbox::with_options(options.sandbox),
    )
    .with_pacing(options.pacing))
}

/// One-shot grading of `code` against the rule for `level_id`, outside any
/// challenge session.
pub fn check_submission(
    catalog: &LevelCatalog,
    level_id: &str,
    code: &str,
    options: SandboxOptions,
) -> (Rule, VerifyOutcome) {
    let rule = catalog.resolve(level_id);
    let outcome = grade_submission(&ScriptSandbox::with_options(options), &rule, code);
    (rule, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_assess::Trigger;
    use std::rc::Rc;

    const LEVELS: &str = r#"{
  "levels": [
    {
      "levelId": "level_01",
      "instruction": "Create a variable codigo with value 4321",
      "type": "variable",
      "requiredVariable": "codigo",
      "expectedValue": 4321
    },
    {
      "levelId": "functions_move_01",
      "type": "function",
      "requiredFunction": "movePlatform",
      "validPatterns": [1, 2, 3],
      "effect": "set_pattern"
    }
  ]
}"#;

    const QUESTIONS: &str = r#"[
  {"id": 1, "quizSetId": "js_basics_01", "instruction": "Q1", "correctOption": "A",
   "optionKeys": ["A", "B"], "optionValues": ["yes", "no"]},
  {"id": "2", "setId": "js_basics_01", "instruction": "Q2", "correctOption": "B",
   "optionKeys": ["A", "B"], "optionValues": ["yes", "no"]},
  {"instruction": "dropped"}
]"#;

    #[test]
    fn parse_levels_json_accepts_wrapped_and_bare_documents() {
        assert_eq!(parse_levels_json(LEVELS).expect("wrapped").len(), 2);
        let bare = parse_levels_json(r#"[{"levelId": "a"}]"#).expect("bare");
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn parse_levels_json_reports_invalid_json() {
        let error = parse_levels_json("{ nope").expect_err("invalid json should fail");
        assert_eq!(error.code, "API_LEVELS_JSON_INVALID");
    }

    #[test]
    fn parse_questions_json_accepts_both_shapes() {
        assert_eq!(parse_questions_json(QUESTIONS).expect("bare").len(), 3);
        let wrapped =
            parse_questions_json(r#"{"questions": [{"id": 9}]}"#).expect("wrapped");
        assert_eq!(wrapped.len(), 1);
        let error = parse_questions_json("42").expect_err("scalar should fail");
        assert_eq!(error.code, "API_QUESTIONS_JSON_INVALID");
    }

    #[test]
    fn bank_from_json_skips_records_without_id() {
        let bank = bank_from_json(QUESTIONS).expect("bank should load");
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.query(Some("js_basics_01"), &[], 0).len(), 2);
    }

    #[test]
    fn check_submission_grades_against_catalog_rule() {
        let catalog = catalog_from_json(LEVELS).expect("catalog should load");
        let (rule, outcome) = check_submission(
            &catalog,
            "level_01",
            "var codigo = 4321;",
            SandboxOptions::default(),
        );
        assert_eq!(rule.required_name, "codigo");
        assert!(outcome.passed);

        let (_, outcome) = check_submission(
            &catalog,
            "functions_move_01",
            "function movePlatform() { return 7; }",
            SandboxOptions::default(),
        );
        assert!(!outcome.passed);
        assert!(outcome.feedback.text.contains("Accepted patterns: 1, 2, 3"));
    }

    #[test]
    fn create_host_from_json_opens_configured_challenges() {
        let mut host = create_host_from_json(CreateHostFromJsonOptions {
            levels_json: Some(LEVELS.to_string()),
            questions_json: Some(QUESTIONS.to_string()),
            ..CreateHostFromJsonOptions::default()
        })
        .expect("host should build");

        let trigger = Rc::new(Trigger::quiz("quiz", Some("js_basics_01")));
        assert!(host.contact(&trigger));
        assert_eq!(host.quiz().map(|session| session.score().total), Some(2));
    }
}
