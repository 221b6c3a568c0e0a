use crate::app::InputState;
use crate::attachment::format_file_size;
use crate::ui::conversation::commands::{ParsedCommand, parse_slash_command};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerAction {
    /// Send the current text and attachment
    Submit,
    Command(ParsedCommand),
    None,
}

/// Apply a key press to the input box
pub fn handle_key(input: &mut InputState, key: KeyEvent) -> ComposerAction {
    if key.kind != KeyEventKind::Press || input.is_disabled() {
        return ComposerAction::None;
    }

    match key.code {
        KeyCode::Enter => {
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                input.insert_char('\n');
            } else if let Some(command) = parse_slash_command(input.text()) {
                input.clear();
                return ComposerAction::Command(command);
            } else {
                return ComposerAction::Submit;
            }
        }
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                input.insert_char(c);
            }
        }
        KeyCode::Tab => input.insert_str("    "),
        KeyCode::Backspace => {
            input.backspace();
        }
        KeyCode::Delete => {
            input.delete();
        }
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => {}
    }

    ComposerAction::None
}

/// Input box with attachment preview and placeholder
pub struct Composer<'a> {
    input: &'a InputState,
    streaming: bool,
}

impl<'a> Composer<'a> {
    pub fn new(input: &'a InputState, streaming: bool) -> Self {
        Self { input, streaming }
    }

    /// Rows needed for the box, borders included
    pub fn height(input: &InputState) -> u16 {
        let text_rows = input.text().split('\n').count().clamp(1, 6) as u16;
        let preview_rows = u16::from(input.attachment().is_some());
        text_rows + preview_rows + 2
    }

    fn title(&self) -> String {
        if self.input.is_disabled() {
            "⏳ Phoenix is thinking".to_string()
        } else if self.streaming {
            "✍ Message (streaming)".to_string()
        } else {
            "✍ Message".to_string()
        }
    }
}

impl Widget for Composer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.input.is_disabled() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Green)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        let mut row = inner_area.y;
        let bottom = inner_area.y + inner_area.height;

        if let Some(attachment) = self.input.attachment() {
            let preview = Line::from(vec![
                Span::styled("📎 ", Style::default().fg(Color::Magenta)),
                Span::styled(
                    attachment.meta.filename.clone(),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  {} · {}  (/detach to remove)",
                        attachment.meta.kind.label(),
                        format_file_size(attachment.meta.size)
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            buf.set_line(inner_area.x, row, &preview, inner_area.width);
            row += 1;
        }

        if row >= bottom {
            return;
        }

        if self.input.text().is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.input.placeholder(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )]);
            buf.set_line(inner_area.x, row, &placeholder_line, inner_area.width);
            return;
        }

        // Render content with cursor indicator
        let mut content: String = self.input.text().to_string();
        if !self.input.is_disabled() {
            let at = content
                .char_indices()
                .nth(self.input.cursor())
                .map(|(index, _)| index)
                .unwrap_or(content.len());
            content.insert(at, '▌');
        }

        let lines: Vec<&str> = content.split('\n').collect();
        let visible = (bottom - row) as usize;
        let skip = lines.len().saturating_sub(visible);
        for line_text in lines.into_iter().skip(skip) {
            let line = Line::from(vec![Span::styled(
                line_text.to_string(),
                Style::default().fg(Color::White),
            )]);
            buf.set_line(inner_area.x, row, &line, inner_area.width);
            row += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut InputState, text: &str) {
        for c in text.chars() {
            handle_key(input, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_and_enter_submits() {
        let mut input = InputState::default();
        type_str(&mut input, "héllo");
        handle_key(&mut input, press(KeyCode::Left));
        handle_key(&mut input, press(KeyCode::Backspace));
        assert_eq!(input.text(), "hélo");

        assert_eq!(handle_key(&mut input, press(KeyCode::Enter)), ComposerAction::Submit);
        // Submission itself clears the box, not the composer
        assert_eq!(input.text(), "hélo");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut input = InputState::default();
        type_str(&mut input, "a");
        handle_key(&mut input, KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_str(&mut input, "b");
        assert_eq!(input.text(), "a\nb");
    }

    #[test]
    fn slash_commands_are_parsed_and_cleared() {
        let mut input = InputState::default();
        type_str(&mut input, "/stream off");

        match handle_key(&mut input, press(KeyCode::Enter)) {
            ComposerAction::Command(parsed) => {
                assert_eq!(parsed.command, SlashCommand::Stream);
                assert_eq!(parsed.streaming_target(), Some(false));
            }
            other => panic!("expected command, got {:?}", other),
        }
        assert_eq!(input.text(), "");
    }

    #[test]
    fn control_chords_do_not_type() {
        let mut input = InputState::default();
        handle_key(&mut input, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(input.text(), "");
    }

    #[test]
    fn renders_placeholder_when_empty() {
        let input = InputState::default();
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        Composer::new(&input, false).render(area, &mut buf);

        let row: String = (1..39).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert!(row.starts_with("Ask Phoenix..."));
    }
}
