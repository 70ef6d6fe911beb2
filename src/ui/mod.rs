mod chat;
mod components;
mod help;
mod markdown;
mod popup;
mod research;
mod utils;

use crate::app::{App, AppMode};
use ratatui::Frame;

pub fn render(f: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Popup => popup::render_popup(f, app),
        AppMode::Research => research::render_research_view(f, app),
        AppMode::Help => help::render_help_view(f),
    }

    // Blocking alerts sit on top of every view
    if let Some(message) = &app.alert {
        utils::render_alert(f, message);
    }
}
