use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Creates a centered rectangle within the given area
///
/// # Arguments
/// * `percent_x` - Width as a percentage of the container (0-100)
/// * `percent_y` - Height as a percentage of the container (0-100)
/// * `r` - The container rectangle
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);

    // Small terminals still get a usable box
    let min_width = 30u16;
    let min_height = 7u16;

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let middle = vertical.get(1).copied().unwrap_or(r);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(middle);
    let mut result = horizontal.get(1).copied().unwrap_or(middle);

    if result.width < min_width && r.width >= min_width {
        result.width = min_width;
        result.x = r.x + (r.width - result.width) / 2;
    }
    if result.height < min_height && r.height >= min_height {
        result.height = min_height;
        result.y = r.y + (r.height - result.height) / 2;
    }

    result
}

/// Modal box for blocking messages; dismissed by the next key press
pub fn render_alert(frame: &mut Frame, message: &str) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Inquira ")
                    .border_style(Style::default().fg(Color::Magenta)),
            ),
        area,
    );
}
