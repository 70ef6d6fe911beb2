use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

const SEPARATOR: &str = "  ";

/// Configuration for text input rendering
pub struct TextInputConfig<'a> {
    pub content: &'a str,
    pub title: &'a str,
    pub placeholder: Option<&'a str>,
    pub focused: bool,
    pub cursor_position: Option<usize>,
}

impl<'a> TextInputConfig<'a> {
    pub fn new(content: &'a str, title: &'a str) -> Self {
        Self {
            content,
            title,
            placeholder: None,
            focused: true,
            cursor_position: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_focus(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Cursor position as a character index
    pub fn with_cursor_position(mut self, cursor_position: usize) -> Self {
        self.cursor_position = Some(cursor_position);
        self
    }
}

/// Renders a text input field with cursor indicator
pub fn render_text_input(frame: &mut Frame, area: Rect, config: TextInputConfig) {
    let show_cursor = config.focused;
    let cursor_span = Span::styled(
        if show_cursor { "█" } else { "" },
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::SLOW_BLINK),
    );

    let line = if config.content.is_empty() {
        let mut spans = vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            cursor_span,
        ];
        if let Some(placeholder) = config.placeholder {
            spans.push(Span::styled(
                placeholder,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ));
        }
        Line::from(spans)
    } else {
        let inner_width = area.width.saturating_sub(2) as usize;
        let cursor_width = usize::from(show_cursor);
        let available_width = inner_width.saturating_sub(2 + cursor_width).max(1);
        let cursor_index = config
            .cursor_position
            .unwrap_or_else(|| config.content.chars().count());
        let (start, end) = visible_window(config.content, cursor_index, available_width);
        let visible_content = slice_by_chars(config.content, start, end);
        let relative_cursor = cursor_index
            .saturating_sub(start)
            .min(visible_content.chars().count());
        let before = slice_by_chars(&visible_content, 0, relative_cursor);
        let after = slice_by_chars(
            &visible_content,
            relative_cursor,
            visible_content.chars().count(),
        );

        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled(before, Style::default().fg(Color::White)),
            cursor_span,
            Span::styled(after, Style::default().fg(Color::White)),
        ])
    };

    let border_color = if config.focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    frame.render_widget(
        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(config.title, Style::default().fg(Color::White)))
                .border_style(Style::default().fg(border_color)),
        ),
        area,
    );
}

fn visible_window(content: &str, cursor: usize, width: usize) -> (usize, usize) {
    let length = content.chars().count();
    let cursor = cursor.min(length);
    if length <= width {
        return (0, length);
    }
    let mut start = cursor.saturating_sub(width.saturating_sub(1));
    if start + width > length {
        start = length.saturating_sub(width);
    }
    (start, start + width)
}

fn slice_by_chars(value: &str, start: usize, end: usize) -> String {
    value
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// Bordered header: bold product name, view name, and an optional right-aligned status
pub fn render_view_header(frame: &mut Frame, area: Rect, view: &str, status: Option<Span>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            "Inquira",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(view.to_string(), Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title).alignment(Alignment::Left), inner);

    if let Some(status) = status {
        frame.render_widget(
            Paragraph::new(Line::from(vec![status, Span::raw(" ")])).alignment(Alignment::Right),
            inner,
        );
    }
}

/// Renders a footer with mode indicator, keybindings and an optional toast
pub fn render_navigation_footer(
    f: &mut Frame,
    area: Rect,
    mode: &str,
    keybindings: &[(&str, &str)],
    toast: Option<&str>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            format!(" {} ", mode),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    for &(key, desc) in keybindings {
        spans.push(Span::raw(SEPARATOR));
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        spans.push(Span::styled(
            format!(" {}", desc),
            Style::default().fg(Color::White),
        ));
    }

    let toast_width = toast.map_or(0, |message| (message.width() + 4) as u16);
    let keys_area = Rect {
        width: inner.width.saturating_sub(toast_width),
        ..inner
    };
    f.render_widget(Paragraph::new(Line::from(spans)), keys_area);

    if let Some(message) = toast {
        let toast_area = Rect {
            x: inner.x + inner.width.saturating_sub(toast_width),
            width: toast_width.min(inner.width),
            ..inner
        };
        render_status_toast(f, toast_area, message);
    }
}

pub fn render_status_toast(frame: &mut Frame, area: Rect, message: &str) {
    let toast = Paragraph::new(Line::from(vec![Span::styled(
        format!(" {} ", message),
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )]))
    .alignment(Alignment::Right);

    frame.render_widget(toast, area);
}

pub fn selected_name_style(is_selected: bool) -> Style {
    if is_selected {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}
