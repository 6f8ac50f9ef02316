use std::collections::HashMap;

use cq_core::{normalize_question_id, Question, QuestionRecord, RecordId};
use tracing::{debug, warn};

/// Quiz questions indexed by normalized id and by quiz set.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_id: HashMap<String, Question>,
    order: Vec<String>,
    sets: HashMap<String, Vec<String>>,
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = QuestionRecord>) -> Self {
        let mut bank = Self::new();
        bank.load(records);
        bank
    }

    /// Returns how many records were accepted. Records without an id, or
    /// whose correct option is not offered, are skipped.
    pub fn load(&mut self, records: impl IntoIterator<Item = QuestionRecord>) -> usize {
        let mut loaded = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            match record.into_question() {
                Ok(question) => {
                    self.insert(question);
                    loaded += 1;
                }
                Err(error) => warn!(index, code = %error.code, "{}; skipped", error.message),
            }
        }
        debug!(loaded, total = self.len(), "question bank loaded");
        loaded
    }

    /// Inserts a question; a repeated id replaces the earlier question but
    /// keeps its original position.
    pub fn insert(&mut self, question: Question) {
        let id = question.question_id.clone();
        if let Some(previous) = self.by_id.get(&id) {
            if previous.quiz_set_id != question.quiz_set_id {
                if let Some(set_id) = previous.quiz_set_id.as_ref() {
                    if let Some(members) = self.sets.get_mut(set_id) {
                        members.retain(|member| member != &id);
                    }
                }
            }
        } else {
            self.order.push(id.clone());
        }

        if let Some(set_id) = question.quiz_set_id.as_ref() {
            let members = self.sets.entry(set_id.clone()).or_default();
            if !members.contains(&id) {
                members.push(id.clone());
            }
        }
        self.by_id.insert(id, question);
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        let key = normalize_question_id(&RecordId::Text(id.to_string()))?;
        self.by_id.get(&key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn set_ids(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Explicit ids win over the set id, which wins over the whole bank.
    /// `max_count == 0` means no limit.
    pub fn query(
        &self,
        quiz_set_id: Option<&str>,
        explicit_ids: &[String],
        max_count: usize,
    ) -> Vec<Question> {
        let mut selected = if !explicit_ids.is_empty() {
            explicit_ids
                .iter()
                .filter_map(|id| {
                    let found = self.get(id);
                    if found.is_none() {
                        warn!(question_id = %id, "question id not found in bank");
                    }
                    found.cloned()
                })
                .collect::<Vec<_>>()
        } else if let Some(members) = quiz_set_id.and_then(|set_id| self.sets.get(set_id)) {
            self.resolve_all(members)
        } else {
            if let Some(set_id) = quiz_set_id {
                debug!(quiz_set_id = set_id, "unknown quiz set; using every question");
            }
            self.resolve_all(&self.order)
        };

        if max_count > 0 {
            selected.truncate(max_count);
        }
        selected
    }

    fn resolve_all(&self, ids: &[String]) -> Vec<Question> {
        ids.iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod bank_tests {
    use super::*;

    fn record(id: RecordId, set_id: Option<&str>) -> QuestionRecord {
        QuestionRecord {
            id: Some(id),
            quiz_set_id: set_id.map(str::to_string),
            instruction: Some("Pick one".to_string()),
            correct_option: Some("A".to_string()),
            ..QuestionRecord::default()
        }
    }

    fn sample_bank() -> QuestionBank {
        QuestionBank::from_records([
            record(RecordId::Integer(5), Some("loops")),
            record(RecordId::from("6"), Some("loops")),
            record(RecordId::Integer(7), Some("vars")),
            record(RecordId::Integer(8), None),
        ])
    }

    fn ids(questions: &[Question]) -> Vec<&str> {
        questions
            .iter()
            .map(|question| question.question_id.as_str())
            .collect()
    }

    #[test]
    fn load_skips_records_without_id() {
        let mut bank = QuestionBank::new();
        let loaded = bank.load([
            record(RecordId::Integer(1), None),
            QuestionRecord::default(),
        ]);
        assert_eq!(loaded, 1);
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn short_option_texts_still_leave_the_quiz_finishable() {
        let records: Vec<QuestionRecord> = serde_json::from_str(
            r#"[
  {"id":1,"correctOption":"D","optionKeys":["A","B","C","D"],"optionValues":["a","b","c"]},
  {"id":2,"correctOption":"E","optionKeys":["A","B"],"optionValues":["a","b"]}
]"#,
        )
        .expect("records should parse");
        let mut bank = QuestionBank::new();
        assert_eq!(bank.load(records), 1);

        let mut session = crate::quiz::QuizSession::new();
        session.start(bank.query(None, &[], 0), None);
        assert!(session.select("D"));
        let continuation = session.submit().expect("answer should be accepted");
        assert_eq!(continuation.step(), crate::quiz::QuizStep::Close);
        assert!(session.is_finished());
        assert_eq!(session.score().to_string(), "1/1");
    }

    #[test]
    fn explicit_ids_skip_unknown_and_keep_duplicates() {
        let bank = sample_bank();
        let found = bank.query(None, &["5".to_string(), "999".to_string()], 0);
        assert_eq!(ids(&found), vec!["5"]);

        let found = bank.query(
            Some("vars"),
            &["07".to_string(), "5".to_string(), "7".to_string()],
            0,
        );
        assert_eq!(ids(&found), vec!["7", "5", "7"]);
    }

    #[test]
    fn set_query_keeps_insertion_order() {
        let bank = sample_bank();
        assert_eq!(ids(&bank.query(Some("loops"), &[], 0)), vec!["5", "6"]);
    }

    #[test]
    fn unknown_set_falls_back_to_all_questions() {
        let bank = sample_bank();
        assert_eq!(
            ids(&bank.query(Some("missing"), &[], 0)),
            vec!["5", "6", "7", "8"]
        );
        assert_eq!(ids(&bank.query(None, &[], 0)).len(), 4);
    }

    #[test]
    fn max_count_truncates() {
        let bank = sample_bank();
        assert_eq!(ids(&bank.query(None, &[], 2)), vec!["5", "6"]);
        assert_eq!(
            ids(&bank.query(None, &["8".to_string(), "5".to_string()], 1)),
            vec!["8"]
        );
    }

    #[test]
    fn repeated_id_replaces_question_in_place() {
        let mut bank = sample_bank();
        let mut replacement = record(RecordId::Integer(5), Some("vars"));
        replacement.instruction = Some("Replaced".to_string());
        bank.load([replacement]);

        assert_eq!(bank.len(), 4);
        assert_eq!(
            bank.get("5").map(|question| question.instruction.as_str()),
            Some("Replaced")
        );
        assert_eq!(ids(&bank.query(Some("loops"), &[], 0)), vec!["6"]);
        assert_eq!(ids(&bank.query(Some("vars"), &[], 0)), vec!["7", "5"]);
        assert_eq!(ids(&bank.query(None, &[], 0))[0], "5");
    }
}
