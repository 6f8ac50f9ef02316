use std::fs;
use std::path::Path;

use cq_api::{parse_levels_json, parse_questions_json};
use cq_core::{QuestionRecord, RuleRecord};
use walkdir::WalkDir;

use crate::{CqToolError, TestCase, TESTCASE_SCHEMA_V1};

/// Level and question records gathered from one demo directory.
#[derive(Debug, Clone, Default)]
pub struct DemoContent {
    pub levels: Vec<RuleRecord>,
    pub questions: Vec<QuestionRecord>,
}

/// Collects every `*levels.json` and `*questions.json` under `demo_dir`, in
/// file-name order.
pub fn read_content_from_dir(demo_dir: &Path) -> Result<DemoContent, CqToolError> {
    let mut content = DemoContent::default();
    let mut found = 0usize;

    for entry in WalkDir::new(demo_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let is_levels = name.ends_with("levels.json");
        let is_questions = name.ends_with("questions.json");
        if !(is_levels || is_questions) {
            continue;
        }

        let raw = fs::read_to_string(path).map_err(|source| CqToolError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let content_error = |source| CqToolError::Content {
            path: path.to_path_buf(),
            source,
        };
        if is_levels {
            content
                .levels
                .extend(parse_levels_json(&raw).map_err(content_error)?);
        } else {
            content
                .questions
                .extend(parse_questions_json(&raw).map_err(content_error)?);
        }
        found += 1;
    }

    if found == 0 {
        return Err(CqToolError::SourceEmpty {
            path: demo_dir.to_path_buf(),
        });
    }

    Ok(content)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, CqToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| CqToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| CqToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(CqToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod source_tests {
    use super::*;

    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("cq-tool-{}-{}", name, nanos))
    }

    fn write_file(path: &Path, content: &str) {
        let parent = path.parent().expect("path should have parent");
        fs::create_dir_all(parent).expect("parent dir should be created");
        fs::write(path, content).expect("file should be written");
    }

    #[test]
    fn read_content_from_dir_merges_level_and_question_files() {
        let root = temp_dir("content");
        write_file(
            &root.join("levels.json"),
            r#"{"levels":[{"levelId":"a","requiredVariable":"x"}]}"#,
        );
        write_file(
            &root.join("extra").join("more.levels.json"),
            r#"[{"levelId":"b","requiredVariable":"y"}]"#,
        );
        write_file(&root.join("questions.json"), r#"[{"id":1},{"id":2}]"#);
        write_file(&root.join("notes.txt"), "skip");

        let content = read_content_from_dir(&root).expect("scan should pass");
        assert_eq!(content.levels.len(), 2);
        assert_eq!(content.questions.len(), 2);
    }

    #[test]
    fn read_content_from_dir_fails_when_no_content_files() {
        let root = temp_dir("empty-content");
        write_file(&root.join("ignore.txt"), "skip");

        let error = read_content_from_dir(&root).expect_err("empty source should fail");
        assert!(matches!(error, CqToolError::SourceEmpty { .. }));
    }

    #[test]
    fn read_content_from_dir_reports_malformed_json() {
        let root = temp_dir("bad-content");
        write_file(&root.join("questions.json"), "{ broken");

        let error = read_content_from_dir(&root).expect_err("bad json should fail");
        match error {
            CqToolError::Content { source, .. } => {
                assert_eq!(source.code, "API_QUESTIONS_JSON_INVALID")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn read_test_case_parses_valid_json() {
        let root = temp_dir("case-ok");
        let case_path = root.join("testcase.json");
        write_file(
            &case_path,
            r#"{
  "schemaVersion":"cq-tool-case.v1",
  "trigger":{"kind":"code","levelId":"level_01"},
  "actions":[{"kind":"verify","code":"let codigo = 4321;"}],
  "expectedEvents":[{"kind":"closed","completed":true}]
}"#,
        );

        let parsed = read_test_case(&case_path).expect("case should parse");
        assert_eq!(parsed.schema_version, TESTCASE_SCHEMA_V1);
        assert_eq!(parsed.actions.len(), 1);
        assert_eq!(parsed.expected_events.len(), 1);
    }

    #[test]
    fn read_test_case_reports_read_parse_and_schema_errors() {
        let root = temp_dir("case-errors");
        fs::create_dir_all(&root).expect("root should be created");

        let missing = read_test_case(&root.join("missing.json")).expect_err("missing case");
        assert!(matches!(missing, CqToolError::ReadFile { .. }));

        let bad_json_path = root.join("bad.json");
        write_file(&bad_json_path, "{");
        let parse_error = read_test_case(&bad_json_path).expect_err("parse should fail");
        assert!(matches!(parse_error, CqToolError::ParseCase { .. }));

        let bad_schema_path = root.join("bad-schema.json");
        write_file(
            &bad_schema_path,
            r#"{"schemaVersion":"v0","trigger":{"kind":"quiz"}}"#,
        );
        let schema_error = read_test_case(&bad_schema_path).expect_err("schema should fail");
        assert!(matches!(
            schema_error,
            CqToolError::InvalidSchemaVersion { .. }
        ));
    }
}
