#[cfg(coverage)]
pub(super) fn run_play_ratatui_mode(
    session: &mut super::PlaySession,
) -> Result<i32, cq_core::CodeQuestError> {
    super::run_play_line_mode(session)
}

#[cfg(not(coverage))]
mod rich {
    use std::io;
    use std::time::{Duration, Instant};

    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    };
    use crossterm::ExecutableCommand;
    use ratatui::backend::CrosstermBackend;
    use ratatui::style::{Color, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Paragraph, Wrap};
    use ratatui::{Frame, Terminal};
    use cq_core::CodeQuestError;

    use crate::{map_tui_io, PlaySession};

    const TICK_MS: u64 = 50;
    const PANE_ROWS: usize = 8;
    const ELLIPSIS: &str = "…";

    #[derive(Debug, Default)]
    struct PlayUiState {
        log_lines: Vec<String>,
        menu_index: usize,
        option_index: usize,
        editor: Vec<String>,
        help_visible: bool,
        status: String,
    }

    impl PlayUiState {
        fn push_lines(&mut self, lines: Vec<String>) {
            self.log_lines.extend(lines);
        }
    }

    struct TuiTerminal {
        terminal: Terminal<CrosstermBackend<io::Stdout>>,
    }

    impl TuiTerminal {
        fn new() -> Result<Self, CodeQuestError> {
            enable_raw_mode().map_err(map_tui_io)?;
            io::stdout()
                .execute(EnterAlternateScreen)
                .map_err(map_tui_io)?;
            let backend = CrosstermBackend::new(io::stdout());
            let terminal = Terminal::new(backend).map_err(map_tui_io)?;
            Ok(Self { terminal })
        }

        fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
            &mut self.terminal
        }
    }

    impl Drop for TuiTerminal {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(LeaveAlternateScreen);
        }
    }

    pub(super) fn run_play_ratatui_mode(session: &mut PlaySession) -> Result<i32, CodeQuestError> {
        let mut terminal = TuiTerminal::new()?;
        let mut ui = PlayUiState {
            status: "ready".to_string(),
            editor: vec![String::new()],
            ..PlayUiState::default()
        };

        let tick = Duration::from_millis(TICK_MS);
        let mut last_tick = Instant::now();

        loop {
            terminal
                .terminal_mut()
                .draw(|frame| render_play(frame, &ui, session))
                .map_err(map_tui_io)?;

            let elapsed = last_tick.elapsed();
            if elapsed >= tick {
                last_tick = Instant::now();
                let lines = session.tick(elapsed);
                if !lines.is_empty() {
                    ui.option_index = 0;
                    ui.push_lines(lines);
                }
            }

            let timeout = tick.saturating_sub(last_tick.elapsed());
            if !event::poll(timeout).map_err(map_tui_io)? {
                continue;
            }

            if let Event::Key(key) = event::read().map_err(map_tui_io)? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let should_quit = match handle_key(key, session, &mut ui) {
                    Ok(should_quit) => should_quit,
                    Err(error) => {
                        ui.status = error.message;
                        false
                    }
                };
                if should_quit {
                    break;
                }
            }
        }

        Ok(0)
    }

    fn handle_key(
        key: crossterm::event::KeyEvent,
        session: &mut PlaySession,
        ui: &mut PlayUiState,
    ) -> Result<bool, CodeQuestError> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }
        if key.code == KeyCode::F(1) {
            ui.help_visible = !ui.help_visible;
            return Ok(false);
        }
        if key.code == KeyCode::Esc {
            if !session.is_open() {
                return Ok(true);
            }
            ui.push_lines(session.leave());
            ui.editor = vec![String::new()];
            ui.status = "left the challenge".to_string();
            return Ok(false);
        }

        if !session.is_open() {
            return handle_menu_key(key.code, session, ui);
        }
        if session.in_code_challenge() {
            handle_editor_key(key, session, ui);
        } else if session.in_quiz() {
            handle_quiz_key(key.code, session, ui);
        }
        Ok(false)
    }

    fn handle_menu_key(
        code: KeyCode,
        session: &mut PlaySession,
        ui: &mut PlayUiState,
    ) -> Result<bool, CodeQuestError> {
        let last = session.stations().len().saturating_sub(1);
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Up => ui.menu_index = ui.menu_index.saturating_sub(1),
            KeyCode::Down => ui.menu_index = (ui.menu_index + 1).min(last),
            KeyCode::Enter => {
                let lines = session.open(ui.menu_index)?;
                ui.push_lines(lines);
                ui.option_index = 0;
                ui.editor = vec![String::new()];
                ui.status = "challenge open".to_string();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_editor_key(
        key: crossterm::event::KeyEvent,
        session: &mut PlaySession,
        ui: &mut PlayUiState,
    ) {
        let verify = key.code == KeyCode::F(5)
            || (key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL));
        if verify {
            let code = ui.editor.join("\n");
            ui.push_lines(session.verify(&code));
            ui.status = "verified".to_string();
            return;
        }

        match key.code {
            KeyCode::Enter => ui.editor.push(String::new()),
            KeyCode::Tab => {
                if let Some(line) = ui.editor.last_mut() {
                    line.push_str("  ");
                }
            }
            KeyCode::Backspace => {
                let line_empty = ui.editor.last().map(String::is_empty).unwrap_or(true);
                if line_empty && ui.editor.len() > 1 {
                    ui.editor.pop();
                } else if let Some(line) = ui.editor.last_mut() {
                    line.pop();
                }
            }
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                if let Some(line) = ui.editor.last_mut() {
                    line.push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_quiz_key(code: KeyCode, session: &mut PlaySession, ui: &mut PlayUiState) {
        let keys = session
            .host()
            .quiz()
            .and_then(|quiz| quiz.current_question())
            .map(|question| question.option_keys().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        if keys.is_empty() {
            ui.status = "waiting for the next question".to_string();
            return;
        }

        match code {
            KeyCode::Up => ui.option_index = ui.option_index.saturating_sub(1),
            KeyCode::Down => ui.option_index = (ui.option_index + 1).min(keys.len() - 1),
            KeyCode::Enter => {
                let key = &keys[ui.option_index.min(keys.len() - 1)];
                ui.push_lines(session.answer(key));
                ui.status = format!("answered {}", key);
            }
            KeyCode::Char(ch) => {
                let typed = ch.to_ascii_uppercase().to_string();
                if let Some(position) = keys.iter().position(|key| *key == typed) {
                    ui.option_index = position;
                    session.select(&typed);
                }
            }
            _ => {}
        }
    }

    fn truncate_to_width(value: &str, width: usize) -> String {
        if width == 0 {
            return String::new();
        }
        let chars = value.chars().collect::<Vec<_>>();
        if chars.len() <= width {
            return value.to_string();
        }
        if width == 1 {
            return ELLIPSIS.to_string();
        }
        let mut out = chars.into_iter().take(width - 1).collect::<String>();
        out.push_str(ELLIPSIS);
        out
    }

    fn wrap_line_to_width(value: &str, width: usize) -> Vec<String> {
        let chars = value.chars().collect::<Vec<_>>();
        if width == 0 || chars.is_empty() {
            return vec![String::new()];
        }
        chars
            .chunks(width)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }

    fn pane_rows(ui: &PlayUiState, session: &PlaySession) -> (String, Vec<(String, bool)>) {
        if !session.is_open() {
            let rows = session
                .stations()
                .iter()
                .enumerate()
                .map(|(index, station)| (station.label.clone(), index == ui.menu_index))
                .collect();
            return ("stations (up/down + enter):".to_string(), rows);
        }
        if session.in_code_challenge() {
            let rows = ui
                .editor
                .iter()
                .enumerate()
                .map(|(index, line)| (line.clone(), index + 1 == ui.editor.len()))
                .collect();
            return ("code (F5 or ctrl+r to verify):".to_string(), rows);
        }
        let rows = session
            .host()
            .quiz()
            .and_then(|quiz| quiz.current_question())
            .map(|question| {
                question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, option)| {
                        (
                            format!("[{}] {}", option.key, option.text),
                            index == ui.option_index,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        ("answer (up/down + enter):".to_string(), rows)
    }

    fn render_play(frame: &mut Frame<'_>, ui: &PlayUiState, session: &PlaySession) {
        let terminal_width = frame.area().width as usize;
        let terminal_rows = frame.area().height as usize;
        let content_width = (terminal_width.saturating_sub(2)).max(16);

        let (pane_header, rows) = pane_rows(ui, session);
        let selected_row = rows.iter().position(|(_, selected)| *selected).unwrap_or(0);
        let pane_start = (selected_row + 1).saturating_sub(PANE_ROWS);

        let mut reserved_rows = 3usize + 1 + 1 + PANE_ROWS + 1;
        if ui.help_visible {
            reserved_rows += 1;
        }
        let wrapped_log = ui
            .log_lines
            .iter()
            .flat_map(|line| wrap_line_to_width(line, content_width))
            .collect::<Vec<_>>();
        let visible_log_rows = terminal_rows.saturating_sub(reserved_rows).max(1);
        let clipped_log = if wrapped_log.len() <= visible_log_rows {
            wrapped_log
        } else {
            wrapped_log[wrapped_log.len() - visible_log_rows..].to_vec()
        };

        let header_text = truncate_to_width(
            format!("{} | {}", session.content().id, session.content().title).as_str(),
            content_width,
        );
        let platform_text = truncate_to_width(&session.platform_status(), content_width);
        let status_text =
            truncate_to_width(format!("status: {}", ui.status).as_str(), content_width);
        let key_text = truncate_to_width(
            "keys: up/down move | enter open/answer/newline | F5 verify | esc leave/quit | F1 help",
            content_width,
        );
        let help_text = truncate_to_width(
            "quiz answers advance after a short pause; a solved code challenge closes after one second.",
            content_width,
        );

        let mut lines_out: Vec<Line<'_>> = Vec::new();
        lines_out.push(Line::from(header_text));
        lines_out.push(Line::from(Span::styled(
            platform_text,
            Style::default().fg(Color::Gray),
        )));
        lines_out.push(Line::from(Span::styled(
            status_text,
            Style::default().fg(Color::Gray),
        )));
        for row in clipped_log {
            lines_out.push(Line::from(row));
        }
        lines_out.push(Line::from(Span::styled(
            "─".repeat(content_width),
            Style::default().fg(Color::Gray),
        )));
        lines_out.push(Line::from(Span::styled(
            truncate_to_width(&pane_header, content_width),
            Style::default().fg(Color::Cyan),
        )));
        for row_index in 0..PANE_ROWS {
            let Some((text, selected)) = rows.get(pane_start + row_index) else {
                lines_out.push(Line::from(" "));
                continue;
            };
            let prefix = if *selected { "> " } else { "  " };
            let style = if *selected {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            lines_out.push(Line::from(Span::styled(
                format!(
                    "{}{}",
                    prefix,
                    truncate_to_width(text, content_width.saturating_sub(2))
                ),
                style,
            )));
        }
        lines_out.push(Line::from(Span::styled(
            key_text,
            Style::default().fg(Color::Yellow),
        )));
        if ui.help_visible {
            lines_out.push(Line::from(Span::styled(
                help_text,
                Style::default().fg(Color::Magenta),
            )));
        }

        let paragraph = Paragraph::new(lines_out).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, frame.area());
    }
}

#[cfg(not(coverage))]
pub(super) fn run_play_ratatui_mode(
    session: &mut super::PlaySession,
) -> Result<i32, cq_core::CodeQuestError> {
    use std::io::IsTerminal;

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        return super::run_play_line_mode(session);
    }
    rich::run_play_ratatui_mode(session)
}
