//! Screen layout: header, history, notice line, composer.

pub mod conversation;
pub mod markdown;

use crate::app::{AppState, Notice};
use crate::storage::KeyValueStore;
use conversation::{Composer, ConversationHistory, Header, get_help_text};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Display switches that live outside the application state
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub show_timestamps: bool,
    pub show_help: bool,
}

pub fn draw<S: KeyValueStore>(frame: &mut Frame, app: &AppState<S>, options: ViewOptions) {
    let streaming = app.preferences().streaming_enabled;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(5),    // History
            Constraint::Length(1), // Notice
            Constraint::Length(Composer::height(app.input())),
        ])
        .split(frame.size());

    frame.render_widget(
        Header::new(streaming, !app.conversation().is_empty(), app.is_busy()),
        chunks[0],
    );

    frame.render_widget(
        ConversationHistory::new(app.conversation(), app.stream())
            .scroll_back(app.scroll_back())
            .copied_turn(app.copied_turn())
            .show_timestamps(options.show_timestamps),
        chunks[1],
    );

    if let Some(notice) = app.notice() {
        frame.render_widget(Paragraph::new(notice_line(notice)), chunks[2]);
    }

    frame.render_widget(Composer::new(app.input(), streaming), chunks[3]);

    if options.show_help {
        let area = centered(frame.size(), 70, 60);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(get_help_text())
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Help (any key to close)")
                        .style(Style::default().fg(Color::Cyan)),
                ),
            area,
        );
    }
}

fn notice_line(notice: &Notice) -> Line<'static> {
    let (icon, color) = match notice {
        Notice::Validation(_) => ("⚠ ", Color::Yellow),
        Notice::Info(_) => ("ℹ ", Color::Cyan),
        Notice::Error(_) => ("✖ ", Color::Red),
    };
    Line::from(vec![
        Span::styled(icon, Style::default().fg(color)),
        Span::styled(notice.message().to_string(), Style::default().fg(color)),
    ])
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
