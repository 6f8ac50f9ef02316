use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const REQUIRED_TAGS: [&str; 4] = ["html", "head", "title", "body"];
const VOID_TAGS: [&str; 15] = [
    "img", "meta", "br", "hr", "input", "link", "area", "base", "col", "embed", "param",
    "source", "track", "wbr", "keygen",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkupReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub message: String,
    pub score: f32,
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"(?i)<!DOCTYPE\s+html\b[^>]*>|<(/?)([a-z0-9]+)(?:\s[^>]*)?/?>")
            .expect("markup tag regex should compile")
    })
}

/// Structural check for the basic HTML lesson: doctype, the essential tags,
/// and balanced open/close pairs.
pub fn validate_markup(code: &str) -> MarkupReport {
    let mut errors = Vec::new();
    let mut open = Vec::<String>::new();
    let mut found = BTreeSet::new();
    let mut has_doctype = false;

    for captures in tag_pattern().captures_iter(code) {
        let Some(tag) = captures.get(2) else {
            has_doctype = true;
            continue;
        };
        let tag = tag.as_str().to_ascii_lowercase();
        let closing = captures.get(1).map(|m| m.as_str() == "/").unwrap_or(false);

        if REQUIRED_TAGS.contains(&tag.as_str()) {
            found.insert(tag.clone());
        }
        if VOID_TAGS.contains(&tag.as_str()) {
            continue;
        }

        if !closing {
            open.push(tag);
            continue;
        }
        match open.last() {
            None => errors.push(format!("Closing tag </{}> has no matching opening tag.", tag)),
            Some(expected) if *expected != tag => errors.push(format!(
                "Wrong closing tag </{}> (expected </{}>).",
                tag, expected
            )),
            Some(_) => {
                open.pop();
            }
        }
    }

    if !open.is_empty() {
        let unclosed = open.iter().rev().cloned().collect::<Vec<_>>().join(", ");
        errors.push(format!("Unclosed tags: {}", unclosed));
    }
    for required in REQUIRED_TAGS {
        if !found.contains(required) {
            errors.push(format!("Missing essential tag: <{}>", required));
        }
    }
    if !has_doctype {
        errors.push("Missing <!DOCTYPE html> declaration at the start of the document.".to_string());
    }

    let success = errors.is_empty();
    MarkupReport {
        success,
        score: found.len() as f32 / REQUIRED_TAGS.len() as f32,
        message: if success {
            "Well done! The basic HTML structure is correct.".to_string()
        } else {
            "Fix the errors listed below.".to_string()
        },
        errors,
    }
}
