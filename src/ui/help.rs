use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::components;

const NOTES_KEYS: &[(&str, &str)] = &[
    ("Up/Down", "Move between notes"),
    ("Space", "Select or unselect the note"),
    ("f", "Cycle filter: all, raw, summary"),
    ("d", "Delete the note"),
    ("a", "Add the current selection as a note"),
    ("s", "Add a summary of the current selection"),
    ("e", "Export notes to notes.json"),
    ("c", "Open Inquira AI chat"),
    ("Tab", "Switch between notes and chat"),
    ("Esc", "Back to the launcher"),
];

const CHAT_KEYS: &[(&str, &str)] = &[
    ("Enter", "Send the message"),
    ("Ctrl+R", "Rewrite selected notes with the last answer"),
    ("Ctrl+S", "Rewrite with a summary of the last answer"),
    ("Ctrl+Y", "Copy the last answer"),
    ("PgUp/PgDn", "Scroll the conversation"),
    ("Esc", "Close the chat and end the session"),
];

pub fn render_help_view(f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    if let [header, body, footer] = &chunks[..] {
        components::render_view_header(f, *header, "Help", None);
        render_help_body(f, *body);
        components::render_navigation_footer(f, *footer, "HELP", &[("Esc", "back")], None);
    }
}

fn render_help_body(f: &mut Frame, area: Rect) {
    let mut lines = vec![Line::from("")];
    push_section(&mut lines, "  Notes", NOTES_KEYS);
    lines.push(Line::from(""));
    push_section(&mut lines, "  Chat", CHAT_KEYS);
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  Ctrl+C", Style::default().fg(Color::Yellow)),
        Span::styled("     Quit", Style::default().fg(Color::White)),
    ]));

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Shortcuts ")
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        area,
    );
}

fn push_section(lines: &mut Vec<Line<'static>>, title: &'static str, keys: &[(&'static str, &'static str)]) {
    lines.push(Line::from(Span::styled(title, Style::default().fg(Color::Cyan))));
    lines.push(Line::from(""));
    for &(key, description) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<11}", key), Style::default().fg(Color::Yellow)),
            Span::styled(description, Style::default().fg(Color::White)),
        ]));
    }
}
