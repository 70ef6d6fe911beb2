use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::{App, PopupItem};
use crate::ui::{components, utils::centered_rect};

pub fn render_popup(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 50, frame.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Entries
            Constraint::Length(3), // Footer
        ])
        .split(area);

    if let [header, list, footer] = &chunks[..] {
        let note_count = Span::styled(
            format!("{} notes", app.notes.len()),
            Style::default().fg(Color::DarkGray),
        );
        components::render_view_header(frame, *header, "Launcher", Some(note_count));
        render_entries(frame, app, *list);
        components::render_navigation_footer(
            frame,
            *footer,
            "INQUIRA",
            &[("Enter", "open"), ("q", "quit")],
            app.status_toast_message(),
        );
    }
}

fn render_entries(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let items: Vec<ListItem> = PopupItem::ALL
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let is_selected = index == app.popup_index;
            let name_style = if *item == PopupItem::ResetNotes && is_selected {
                Style::default().fg(Color::Red)
            } else {
                components::selected_name_style(is_selected)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    if is_selected { " > " } else { "   " },
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(item.name(), name_style),
                Span::styled("  ", Style::default()),
                Span::styled(item.description(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    frame.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        area,
    );
}
