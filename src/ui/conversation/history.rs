//! Conversation history display component

use crate::attachment::format_file_size;
use crate::conversation::{Conversation, Role, Turn};
use crate::streaming::StreamBuffer;
use crate::ui::conversation::streaming::typing_lines;
use crate::ui::markdown::render_markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
    },
};

const CONTENT_INDENT: &str = "   ";

/// Conversation history plus the live typing bubble
pub struct ConversationHistory<'a> {
    conversation: &'a Conversation,
    stream: &'a StreamBuffer,
    scroll_back: usize,
    copied_turn: Option<usize>,
    show_timestamps: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(conversation: &'a Conversation, stream: &'a StreamBuffer) -> Self {
        Self {
            conversation,
            stream,
            scroll_back: 0,
            copied_turn: None,
            show_timestamps: true,
        }
    }

    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    pub fn copied_turn(mut self, index: Option<usize>) -> Self {
        self.copied_turn = index;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Every line the history would draw at `width`, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        if self.conversation.is_empty() && !self.stream.should_render() {
            return welcome_lines();
        }

        let mut lines = Vec::new();
        for (index, turn) in self.conversation.turns().iter().enumerate() {
            lines.extend(self.render_turn(index, turn, width));
            lines.push(Line::from(""));
        }

        if self.stream.should_render() {
            lines.extend(typing_lines(self.stream.text(), width));
        }

        lines
    }

    fn render_turn(&self, index: usize, turn: &Turn, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let mut header = vec![
            Span::raw(format!("{} ", turn.role.avatar())),
            Span::styled(
                turn.role.display_name(),
                role_style(turn.role).add_modifier(Modifier::BOLD),
            ),
        ];
        if self.show_timestamps {
            if let Some(sent_at) = turn.sent_at {
                header.push(Span::styled(
                    format!("  {}", sent_at.with_timezone(&chrono::Local).format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        if turn.role == Role::Model {
            let marker = if self.copied_turn == Some(index) {
                "  ✓ copied".to_string()
            } else {
                format!("  [/copy {}]", index)
            };
            header.push(Span::styled(marker, Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        if let Some(file) = &turn.attached_file {
            lines.push(Line::from(vec![
                Span::raw(CONTENT_INDENT),
                Span::styled(
                    format!(
                        "📎 {} ({}, {})",
                        file.filename,
                        file.kind.label(),
                        format_file_size(file.size)
                    ),
                    Style::default().fg(Color::Magenta),
                ),
            ]));
        }

        lines.extend(render_markdown(
            &turn.text,
            width as usize,
            role_style(turn.role),
            CONTENT_INDENT,
        ));

        lines
    }
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Model => Style::default().fg(Color::Green),
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(
            "Hi,",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("How can I help you today?", Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to send · Ctrl+S streaming · /attach <path> to add a document · /help",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("💬 Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width.saturating_sub(1));

        // Show the window ending `scroll_back` lines above the bottom
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_back = total.saturating_sub(height);
        let back = self.scroll_back.min(max_back);
        let end = total - back;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }

        if total > height {
            let mut state = ScrollbarState::new(max_back).position(max_back - back);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(inner_area, buf, &mut state);
        }
    }
}
