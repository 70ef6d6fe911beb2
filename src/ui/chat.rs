use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use super::{components, markdown};

use crate::app::{App, Focus};
use crate::types::{ChatRole, ChatTurn};

const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Chat panel beside the notes: conversation, input, close hint
pub fn render_chat_panel(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Conversation
            Constraint::Length(3), // Input
        ])
        .split(area);

    if let [history, input] = &chunks[..] {
        render_chat_history(f, app, *history);
        render_chat_input(f, app, *input);
    }
}

/// Styles for rendering different message types
struct MessageStyles {
    prefix: &'static str,
    prefix_style: Style,
    content_style: Style,
    role_indicator: &'static str,
}

impl MessageStyles {
    fn for_turn(turn: &ChatTurn) -> Self {
        match turn.role {
            ChatRole::User => Self {
                prefix: "You",
                prefix_style: Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                content_style: Style::default().fg(Color::White),
                role_indicator: ">",
            },
            ChatRole::Assistant if turn.show_actions => Self {
                prefix: "Inquira",
                prefix_style: Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
                content_style: Style::default().fg(Color::White),
                role_indicator: "<",
            },
            // Failure notices carry no rewrite actions
            ChatRole::Assistant => Self {
                prefix: "Inquira",
                prefix_style: Style::default().fg(Color::DarkGray),
                content_style: Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
                role_indicator: "!",
            },
        }
    }
}

fn render_turn(turn: &ChatTurn, max_content_width: usize) -> Vec<Line<'static>> {
    let styles = MessageStyles::for_turn(turn);
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!(" {} ", styles.role_indicator),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(styles.prefix, styles.prefix_style),
        Span::styled(
            format!("  {}", turn.timestamp),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    for mut content_line in
        markdown::render(&turn.content, max_content_width, 1, styles.content_style)
    {
        content_line.spans.insert(0, Span::raw("   "));
        lines.push(content_line);
    }
    lines
}

fn action_hints() -> Line<'static> {
    Line::from(vec![
        Span::raw("   "),
        Span::styled(
            " ^R ",
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(" Rewrite  ", Style::default().fg(Color::White)),
        Span::styled(
            " ^S ",
            Style::default().fg(Color::Black).bg(Color::LightMagenta),
        ),
        Span::styled(" Rewrite with Summary", Style::default().fg(Color::White)),
    ])
}

fn add_loading_indicator(lines: &mut Vec<Line>, label: String, frame: u8) {
    let dots = SPINNER_FRAMES
        .get(usize::from(frame) % SPINNER_FRAMES.len())
        .copied()
        .unwrap_or("");
    lines.push(Line::from(vec![
        Span::styled(" < ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            "Inquira",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::DIM),
        ),
        Span::styled(
            format!(" {} {}", label, dots),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
}

/// Calculates scroll position based on viewport and offset
fn calculate_scroll_position(
    total_lines: usize,
    visible_height: usize,
    chat_scroll_offset: usize,
    chat_auto_scroll: bool,
) -> (usize, usize) {
    let max_scroll_offset = total_lines.saturating_sub(visible_height);
    let actual_scroll_offset = chat_scroll_offset.min(max_scroll_offset);

    let scroll_from_top = if total_lines <= visible_height {
        0
    } else if chat_auto_scroll && actual_scroll_offset == 0 {
        max_scroll_offset
    } else {
        max_scroll_offset.saturating_sub(actual_scroll_offset)
    };

    (scroll_from_top, actual_scroll_offset)
}

fn render_chat_history(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    let content_width = area.width.saturating_sub(2) as usize;
    let max_content_width = content_width.saturating_sub(4).max(1);

    if app.chat_history.is_empty() && !app.is_loading() {
        lines.push(Line::from(""));
        for line in wrap_text(
            "Ask something about your notes. Selected notes are used as context, otherwise all of them.",
            max_content_width,
            0,
        ) {
            lines.push(Line::from(Span::styled(
                format!("  {}", line),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let last_index = app.chat_history.len().saturating_sub(1);
    for (index, turn) in app.chat_history.iter().enumerate() {
        lines.push(Line::from(""));
        lines.extend(render_turn(turn, max_content_width));
        if index == last_index && turn.role == ChatRole::Assistant && turn.show_actions {
            lines.push(action_hints());
        }
    }

    if app.pending_replies > 0 {
        lines.push(Line::from(""));
        add_loading_indicator(&mut lines, "thinking".to_string(), app.loading_frame);
    }
    if app.pending_captures > 0 {
        lines.push(Line::from(""));
        add_loading_indicator(&mut lines, "capturing".to_string(), app.loading_frame);
    }
    if let Some(progress) = app.download_progress {
        lines.push(Line::from(""));
        add_loading_indicator(
            &mut lines,
            format!("downloading {}%", progress.percent()),
            app.loading_frame,
        );
    }
    lines.push(Line::from(""));

    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2) as usize;
    let (scroll_from_top, actual_scroll_offset) = calculate_scroll_position(
        total_lines,
        visible_height,
        app.chat_scroll_offset,
        app.chat_auto_scroll,
    );

    let mut title_spans = vec![Span::styled(
        " Inquira Chat ",
        Style::default().fg(Color::White),
    )];
    if actual_scroll_offset > 0 {
        title_spans.push(Span::styled(
            format!("[+{} lines] ", actual_scroll_offset),
            Style::default().fg(Color::Yellow),
        ));
    }

    let content = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(title_spans))
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .scroll((u16::try_from(scroll_from_top).unwrap_or(u16::MAX), 0));

    frame.render_widget(content, area);
}

fn render_chat_input(frame: &mut Frame, app: &App, area: Rect) {
    let placeholder = if app.pending_replies > 0 {
        "Waiting for response..."
    } else {
        "Ask something..."
    };

    let config = components::TextInputConfig::new(app.chat_input.content(), " Message ")
        .with_placeholder(placeholder)
        .with_focus(app.focus == Focus::Chat)
        .with_cursor_position(app.chat_input.cursor_position());

    components::render_text_input(frame, area, config);
}

/// Word-wraps `text` to `max_width` display columns, keeping at most
/// `max_empty_lines` consecutive blank lines
fn wrap_text(text: &str, max_width: usize, max_empty_lines: usize) -> Vec<String> {
    let mut lines = wrap_lines(text, max_width);
    trim_empty_edges(&mut lines);
    collapse_empty_lines(&mut lines, max_empty_lines);
    lines
}

fn wrap_lines(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        if raw_line.is_empty() {
            lines.push(String::new());
            continue;
        }

        let characters: Vec<char> = raw_line.chars().collect();
        let mut start = 0usize;
        let mut index = 0usize;
        let mut width = 0usize;
        let mut last_space: Option<usize> = None;

        while let Some(&character) = characters.get(index) {
            let char_width = UnicodeWidthChar::width(character).unwrap_or(0).max(1);
            if character.is_whitespace() {
                last_space = Some(index);
            }

            if width + char_width > max_width && width > 0 {
                let end = last_space.filter(|space| *space > start).unwrap_or(index);
                let line: String = characters.get(start..end).unwrap_or_default().iter().collect();
                lines.push(line.trim_end().to_string());

                start = if characters.get(end).is_some_and(|c| c.is_whitespace()) {
                    end + 1
                } else {
                    end
                };
                index = start;
                width = 0;
                last_space = None;
                continue;
            }

            width += char_width;
            index += 1;
        }

        if start < characters.len() {
            let line: String = characters.get(start..).unwrap_or_default().iter().collect();
            lines.push(line.trim_end().to_string());
        }
    }
    lines
}

fn trim_empty_edges(lines: &mut Vec<String>) {
    while lines.first().is_some_and(String::is_empty) {
        lines.remove(0);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
}

fn collapse_empty_lines(lines: &mut Vec<String>, max_empty_lines: usize) {
    let mut empty_run = 0usize;
    lines.retain(|line| {
        if line.is_empty() {
            empty_run += 1;
            empty_run <= max_empty_lines
        } else {
            empty_run = 0;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_on_spaces() {
        let lines = wrap_text("alpha beta gamma", 11, 1);
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_wrap_collapses_blank_runs() {
        let lines = wrap_text("\n\none\n\n\n\ntwo\n", 20, 1);
        assert_eq!(lines, vec!["one", "", "two"]);
        assert_eq!(wrap_text("one\n\ntwo", 20, 0), vec!["one", "two"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefgh", 3, 0), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_scroll_sticks_to_bottom_when_auto() {
        assert_eq!(calculate_scroll_position(30, 10, 0, true), (20, 0));
        assert_eq!(calculate_scroll_position(30, 10, 5, false), (15, 5));
        assert_eq!(calculate_scroll_position(5, 10, 3, false), (0, 0));
    }
}
