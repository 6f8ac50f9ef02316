use std::collections::HashMap;

use cq_core::{Rule, RuleRecord};
use tracing::{debug, warn};

/// Code-challenge rules keyed by level id.
#[derive(Debug, Clone, Default)]
pub struct LevelCatalog {
    rules: HashMap<String, Rule>,
}

impl LevelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = RuleRecord>) -> Self {
        let mut catalog = Self::new();
        catalog.load(records);
        catalog
    }

    pub fn load(&mut self, records: impl IntoIterator<Item = RuleRecord>) -> usize {
        let mut loaded = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            match record.into_rule() {
                Some(rule) => {
                    self.insert(rule);
                    loaded += 1;
                }
                None => warn!(index, "level record has no levelId; skipped"),
            }
        }
        debug!(loaded, total = self.rules.len(), "level catalog loaded");
        loaded
    }

    pub fn insert(&mut self, rule: Rule) {
        self.rules.insert(rule.level_id.clone(), rule);
    }

    pub fn get(&self, level_id: &str) -> Option<&Rule> {
        self.rules.get(level_id.trim())
    }

    /// Unknown ids resolve to a fallback rule that runs code but never
    /// validates.
    pub fn resolve(&self, level_id: &str) -> Rule {
        match self.get(level_id) {
            Some(rule) => rule.clone(),
            None => {
                warn!(level_id, "level not configured; using fallback rule");
                Rule::fallback(level_id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn level_ids(&self) -> Vec<&str> {
        let mut ids = self.rules.keys().map(String::as_str).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod catalog_tests {
    use super::*;
    use cq_core::{RuleKind, Value};

    fn record(level_id: Option<&str>, variable: &str) -> RuleRecord {
        RuleRecord {
            level_id: level_id.map(str::to_string),
            required_variable: Some(variable.to_string()),
            expected_value: Some(serde_json::json!(1)),
            ..RuleRecord::default()
        }
    }

    #[test]
    fn load_keys_rules_by_level_id_and_last_wins() {
        let catalog = LevelCatalog::from_records([
            record(Some("a"), "x"),
            record(None, "skipped"),
            record(Some("a"), "y"),
            record(Some("b"), "z"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("a").map(|rule| rule.required_name.as_str()),
            Some("y")
        );
        assert_eq!(catalog.level_ids(), vec!["a", "b"]);
    }

    #[test]
    fn resolve_unknown_level_returns_fallback() {
        let catalog = LevelCatalog::new();
        let rule = catalog.resolve("functions_move_99");
        assert_eq!(rule.level_id, "functions_move_99");
        assert_eq!(rule.kind, RuleKind::Variable);
        assert_eq!(rule.expected_value, Value::Absent);
    }

    #[test]
    fn resolve_known_level_returns_rule() {
        let catalog = LevelCatalog::from_records([record(Some("level_01"), "codigo")]);
        let rule = catalog.resolve(" level_01 ");
        assert_eq!(rule.required_name, "codigo");
        assert_eq!(rule.expected_value, Value::Number(1.0));
    }
}
