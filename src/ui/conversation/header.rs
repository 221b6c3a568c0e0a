use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Title bar with the streaming switch and the clear hint
pub struct Header {
    streaming: bool,
    has_history: bool,
    busy: bool,
}

impl Header {
    pub fn new(streaming: bool, has_history: bool, busy: bool) -> Self {
        Self {
            streaming,
            has_history,
            busy,
        }
    }

    pub fn line(&self) -> Line<'static> {
        let (label, color) = if self.streaming {
            ("Streaming On", Color::Green)
        } else {
            ("Streaming Off", Color::DarkGray)
        };

        let mut spans = vec![
            Span::styled(
                "🔥 Phoenix",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(format!("[{}]", label), Style::default().fg(color)),
            Span::styled(" Ctrl+S", Style::default().fg(Color::DarkGray)),
        ];

        // Clearing is only offered when there is something to clear
        if self.has_history && !self.busy {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(
                "Clear history: Ctrl+L",
                Style::default().fg(Color::Yellow),
            ));
        }

        Line::from(spans)
    }
}

impl Widget for Header {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::BOTTOM);
        let inner = block.inner(area);
        block.render(area, buf);
        buf.set_line(inner.x, inner.y, &self.line(), inner.width);
    }
}
