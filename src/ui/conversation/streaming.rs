use crate::conversation::Role;
use crate::ui::markdown::render_markdown;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Lines for the ephemeral "typing" bubble fed by live stream chunks
pub fn typing_lines(text: &str, width: u16) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::raw(format!("{} ", Role::Model.avatar())),
        Span::styled(
            Role::Model.display_name(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  typing{}", animated_dots()),
            Style::default().fg(Color::Yellow),
        ),
    ])];

    lines.extend(render_markdown(
        text,
        width as usize,
        Style::default().fg(Color::Green),
        "   ",
    ));

    // Blinking cursor at the end of the newest line
    if let Some(last) = lines.last_mut() {
        last.spans.push(Span::styled(cursor_glyph(), Style::default().fg(Color::Yellow)));
    }

    lines
}

fn animation_phase(period_ms: u128, phases: u128) -> u128 {
    (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / period_ms)
        % phases
}

fn animated_dots() -> &'static str {
    match animation_phase(300, 4) {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    }
}

fn cursor_glyph() -> &'static str {
    if animation_phase(500, 2) == 0 { "▋" } else { " " }
}
