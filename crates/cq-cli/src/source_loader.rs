use std::fs;
use std::path::{Path, PathBuf};

use cq_api::{parse_levels_json, parse_questions_json};
use cq_core::CodeQuestError;
use tracing::debug;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, LoadedContent};

pub(crate) fn load_content_by_dir(content_dir: &str) -> Result<LoadedContent, CodeQuestError> {
    let content_root = resolve_content_dir(content_dir)?;
    let mut content = read_content_from_dir(&content_root)?;
    content.id = make_content_id(&content_root);
    content.title = format!(
        "Lessons {}",
        content_root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
    );
    Ok(content)
}

pub(crate) fn resolve_content_dir(content_dir: &str) -> Result<PathBuf, CodeQuestError> {
    let path = PathBuf::from(content_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(CodeQuestError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("content-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(CodeQuestError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("content-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Reads every `*levels.json` and `*questions.json` below `content_dir`.
pub(crate) fn read_content_from_dir(content_dir: &Path) -> Result<LoadedContent, CodeQuestError> {
    let mut content = LoadedContent {
        id: String::new(),
        title: String::new(),
        levels: Vec::new(),
        questions: Vec::new(),
    };
    let mut files = 0usize;

    for entry in WalkDir::new(content_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.ends_with("levels.json") {
            let raw = fs::read_to_string(entry.path()).map_err(map_cli_source_read)?;
            content.levels.extend(parse_levels_json(&raw)?);
        } else if name.ends_with("questions.json") {
            let raw = fs::read_to_string(entry.path()).map_err(map_cli_source_read)?;
            content.questions.extend(parse_questions_json(&raw)?);
        } else {
            continue;
        }
        debug!(path = %entry.path().display(), "content file loaded");
        files += 1;
    }

    if files == 0 {
        return Err(CodeQuestError::new(
            "CLI_SOURCE_EMPTY",
            format!(
                "No levels.json/questions.json files under {}",
                content_dir.display()
            ),
        ));
    }

    Ok(content)
}

pub(crate) fn make_content_id(content_dir: &Path) -> String {
    format!("content-dir:{}", content_dir.display())
}
