use std::io::{self, BufRead, Write};

use cq_core::CodeQuestError;

use crate::{map_tui_io, PlayCommandAction, PlaySession};

const HELP_TEXT: &str =
    "commands: :help :leave :quit | code: type lines, then :verify | quiz: type an option key";

pub(crate) fn run_play_line_mode(session: &mut PlaySession) -> Result<i32, CodeQuestError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(session, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    session: &mut PlaySession,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, CodeQuestError> {
    let title = session.content().title.clone();
    write_lines(writer, &[format!("CodeQuest | {}", title), HELP_TEXT.to_string()])?;
    let mut code_buffer: Vec<String> = Vec::new();

    loop {
        if !session.is_open() {
            code_buffer.clear();
            let menu = session
                .stations()
                .iter()
                .enumerate()
                .map(|(index, station)| format!("  [{}] {}", index, station.label))
                .collect::<Vec<_>>();
            write_lines(writer, &[String::new(), "Where to?".to_string()])?;
            write_lines(writer, &menu)?;
        }

        let Some(raw) = prompt_input_from("> ", reader, writer)? else {
            return Ok(0);
        };
        let mut output = Vec::new();
        let mut emit = |line: String| output.push(line);
        let action = handle_play_command(raw.as_str(), session, &mut emit)?;
        write_lines(writer, &output)?;
        match action {
            PlayCommandAction::Quit => return Ok(0),
            PlayCommandAction::Continue => continue,
            PlayCommandAction::NotHandled => {}
        }

        let lines = if !session.is_open() {
            match raw.trim().parse::<usize>() {
                Ok(index) => session.open(index).unwrap_or_else(|error| vec![error.message]),
                Err(_) => vec![format!("Invalid station number: {}", raw)],
            }
        } else if session.in_code_challenge() {
            if raw.trim() == ":verify" {
                let code = code_buffer.join("\n");
                code_buffer.clear();
                let mut lines = session.verify(&code);
                lines.extend(session.settle());
                lines
            } else {
                code_buffer.push(raw);
                Vec::new()
            }
        } else {
            let mut lines = session.answer(raw.trim());
            lines.extend(session.settle());
            lines
        };
        write_lines(writer, &lines)?;
    }
}

pub(crate) fn handle_play_command(
    raw: &str,
    session: &mut PlaySession,
    emit: &mut dyn FnMut(String),
) -> Result<PlayCommandAction, CodeQuestError> {
    match raw.trim() {
        ":help" => {
            emit(HELP_TEXT.to_string());
            Ok(PlayCommandAction::Continue)
        }
        ":leave" => {
            for line in session.leave() {
                emit(line);
            }
            Ok(PlayCommandAction::Continue)
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(PlayCommandAction::Quit)
        }
        _ => Ok(PlayCommandAction::NotHandled),
    }
}

/// Returns `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, CodeQuestError> {
    write!(writer, "{}", prefix).map_err(map_tui_io)?;
    writer.flush().map_err(map_tui_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_tui_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn write_lines(writer: &mut dyn Write, lines: &[String]) -> Result<(), CodeQuestError> {
    for line in lines {
        writeln!(writer, "{}", line).map_err(map_tui_io)?;
    }
    Ok(())
}
