use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::{App, Focus, NoteFilter};
use crate::session::SessionStatus;
use crate::types::NoteKind;
use crate::ui::{chat, components, markdown};

/// Lines of note text shown per entry before eliding
const NOTE_PREVIEW_LINES: usize = 4;

pub fn render_research_view(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Notes and chat
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    if let [header, body, footer] = &chunks[..] {
        components::render_view_header(f, *header, "Core", Some(status_span(app)));

        if app.chat_open {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(*body);
            if let [notes, chat_panel] = &panes[..] {
                render_notes_pane(f, app, *notes);
                chat::render_chat_panel(f, app, *chat_panel);
            }
        } else {
            render_notes_pane(f, app, *body);
        }

        render_footer(f, app, *footer);
    }
}

fn status_span(app: &App) -> Span<'static> {
    if let Some(progress) = app.download_progress {
        return Span::styled(
            format!("downloading model {}%", progress.percent()),
            Style::default().fg(Color::Yellow),
        );
    }
    match app.session_status {
        SessionStatus::Absent => Span::styled("no session", Style::default().fg(Color::DarkGray)),
        SessionStatus::Creating => {
            Span::styled("starting session", Style::default().fg(Color::Yellow))
        }
        SessionStatus::Ready => Span::styled("session ready", Style::default().fg(Color::Green)),
    }
}

fn render_notes_pane(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    if let [filter, list] = &chunks[..] {
        render_filter_bar(f, app, *filter);
        render_note_list(f, app, *list);
    }
}

fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " Filter by type: ",
        Style::default().fg(Color::DarkGray),
    )];
    for filter in [NoteFilter::All, NoteFilter::Raw, NoteFilter::Summary] {
        let style = if filter == app.filter {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!(" {} ", filter.label()), style));
        spans.push(Span::raw(" "));
    }
    if !app.selection.is_empty() {
        spans.push(Span::styled(
            format!("  {} selected", app.selection.len()),
            Style::default().fg(Color::Magenta),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        area,
    );
}

fn render_note_list(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Notes;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(" Research notes ", Style::default().fg(Color::White)))
        .border_style(Style::default().fg(if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        }));

    let visible = app.visible_notes();
    if visible.is_empty() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "  No Research notes available.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block),
            area,
        );
        return;
    }

    let text_width = (area.width as usize).saturating_sub(10).max(1);
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(index, note)| {
            let rank = app.selection_rank(note.id);
            let is_cursor = focused && index == app.notes_cursor;

            let marker = match rank {
                Some(rank) => format!("[{}]", rank + 1),
                None => "   ".to_string(),
            };
            let text_style = if rank.is_some() {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default().fg(Color::White)
            };

            let mut rendered = markdown::render(&note.text, text_width, 0, text_style);
            if rendered.len() > NOTE_PREVIEW_LINES {
                rendered.truncate(NOTE_PREVIEW_LINES);
                if let Some(last) = rendered.last_mut() {
                    last.spans.push(Span::styled(" …", text_style));
                }
            }

            let mut lines = Vec::with_capacity(rendered.len() + 2);
            for (line_index, mut line) in rendered.into_iter().enumerate() {
                let gutter = if line_index == 0 {
                    format!("{:>3}. ", index + 1)
                } else {
                    "     ".to_string()
                };
                line.spans
                    .insert(0, Span::styled(gutter, Style::default().fg(Color::DarkGray)));
                lines.push(line);
            }
            let kind_color = match note.kind {
                NoteKind::Raw => Color::Cyan,
                NoteKind::Summary => Color::Yellow,
            };
            lines.push(Line::from(vec![
                Span::raw("     "),
                Span::styled(
                    format!("Type: {}", note.kind.label()),
                    Style::default().fg(kind_color),
                ),
                Span::raw(" "),
                Span::styled(marker, Style::default().fg(Color::Magenta)),
            ]));
            lines.push(Line::from(""));

            let item = ListItem::new(lines);
            if is_cursor {
                item.style(Style::default().bg(Color::Rgb(40, 40, 56)))
            } else {
                item
            }
        })
        .collect();

    let mut state = ListState::default();
    if focused {
        state.select(Some(app.notes_cursor));
    }
    f.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let keybindings: &[(&str, &str)] = match app.focus {
        Focus::Chat => &[
            ("Enter", "send"),
            ("^R", "rewrite"),
            ("^S", "rewrite+summary"),
            ("Tab", "notes"),
            ("Esc", "close"),
        ],
        Focus::Notes => &[
            ("Space", "select"),
            ("f", "filter"),
            ("d", "delete"),
            ("e", "export"),
            ("c", "chat"),
            ("?", "help"),
        ],
    };
    components::render_navigation_footer(
        f,
        area,
        "RESEARCH",
        keybindings,
        app.status_toast_message(),
    );
}
