//! Light markdown to terminal lines: headings, bullets, fenced code, `**bold**` and `` `code` ``.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

type Segment = (String, Style);

/// Render `text` into lines no wider than `width` terminal columns (indent included)
pub fn render_markdown(text: &str, width: usize, base: Style, indent: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code = false;
    let code_style = Style::default().fg(Color::Cyan);

    for raw in text.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_code = !in_code;
            continue;
        }

        if in_code {
            // Code is shown verbatim, hard-wrapped
            let prefix = format!("{}│ ", indent);
            for chunk in hard_wrap(raw, width.saturating_sub(prefix.width())) {
                lines.push(Line::from(vec![
                    Span::styled(prefix.clone(), Style::default().fg(Color::DarkGray)),
                    Span::styled(chunk, code_style),
                ]));
            }
            continue;
        }

        if trimmed.is_empty() {
            lines.push(Line::from(Span::raw(indent.to_string())));
            continue;
        }

        let (segments, lead) = if let Some(heading) = heading_text(trimmed) {
            let style = base.add_modifier(Modifier::BOLD);
            (vec![(heading.to_string(), style)], String::new())
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            (parse_inline(item, base), "• ".to_string())
        } else {
            (parse_inline(trimmed, base), String::new())
        };

        lines.extend(wrap_segments(&segments, width, indent, &lead));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::raw(indent.to_string())));
    }

    lines
}

fn heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    line[hashes..].strip_prefix(' ').map(str::trim)
}

/// Split a line into styled segments for `**bold**` and `` `code` `` markers
fn parse_inline(line: &str, base: Style) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut bold = false;
    let mut code = false;
    let mut chars = line.chars().peekable();

    let style_for = |bold: bool, code: bool| {
        if code {
            Style::default().fg(Color::Cyan)
        } else if bold {
            base.add_modifier(Modifier::BOLD)
        } else {
            base
        }
    };

    while let Some(c) = chars.next() {
        if c == '`' {
            if !current.is_empty() {
                segments.push((std::mem::take(&mut current), style_for(bold, code)));
            }
            code = !code;
        } else if c == '*' && !code && chars.peek() == Some(&'*') {
            chars.next();
            if !current.is_empty() {
                segments.push((std::mem::take(&mut current), style_for(bold, code)));
            }
            bold = !bold;
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        segments.push((current, style_for(bold, code)));
    }

    segments
}

/// Word-wrap styled segments by display width; continuation lines are indented under the lead
fn wrap_segments(
    segments: &[Segment],
    width: usize,
    indent: &str,
    lead: &str,
) -> Vec<Line<'static>> {
    let first_prefix = format!("{}{}", indent, lead);
    let rest_prefix = format!("{}{}", indent, " ".repeat(lead.width()));
    let prefix_width = first_prefix.width();
    let available = width.saturating_sub(prefix_width).max(1);

    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = vec![Span::raw(first_prefix)];
    let mut used = 0;

    for (text, style) in segments {
        for (index, word) in text.split(' ').enumerate() {
            let needs_space = index > 0;
            let word_width = word.width();
            let extra = if needs_space && used > 0 { 1 } else { 0 };

            if used > 0 && used + extra + word_width > available {
                lines.push(Line::from(std::mem::replace(
                    &mut spans,
                    vec![Span::raw(rest_prefix.clone())],
                )));
                used = 0;
            } else if extra == 1 {
                spans.push(Span::styled(" ", *style));
                used += 1;
            }

            if word.is_empty() {
                continue;
            }

            for piece in hard_wrap(word, available) {
                let piece_width = piece.width();
                if used > 0 && used + piece_width > available {
                    lines.push(Line::from(std::mem::replace(
                        &mut spans,
                        vec![Span::raw(rest_prefix.clone())],
                    )));
                    used = 0;
                }
                used += piece_width;
                spans.push(Span::styled(piece, *style));
            }
        }
    }

    lines.push(Line::from(spans));
    lines
}

/// Break `text` into pieces of at most `width` columns; a wide char never straddles a break
pub fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for c in text.chars() {
        let columns = c.width().unwrap_or(0);
        if used > 0 && used + columns > width {
            pieces.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += columns;
    }

    if !current.is_empty() || pieces.is_empty() {
        pieces.push(current);
    }
    pieces
}
