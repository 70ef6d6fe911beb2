use crate::types::{Note, NoteKind};

/// Application mode state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Launcher with the hub, reset and quit entries
    Popup,
    Research,
    Help,
}

/// Which research pane receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Notes,
    Chat,
}

/// Note type filter of the research view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteFilter {
    #[default]
    All,
    Raw,
    Summary,
}

impl NoteFilter {
    #[must_use]
    pub fn matches(self, note: &Note) -> bool {
        match self {
            NoteFilter::All => true,
            NoteFilter::Raw => note.kind == NoteKind::Raw,
            NoteFilter::Summary => note.kind == NoteKind::Summary,
        }
    }

    /// Notes passing the filter, in collection order
    #[must_use]
    pub fn apply(self, notes: &[Note]) -> Vec<&Note> {
        notes.iter().filter(|note| self.matches(note)).collect()
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            NoteFilter::All => NoteFilter::Raw,
            NoteFilter::Raw => NoteFilter::Summary,
            NoteFilter::Summary => NoteFilter::All,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            NoteFilter::All => "All",
            NoteFilter::Raw => "Raw",
            NoteFilter::Summary => "Summary",
        }
    }
}

/// Entry of the launcher list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupItem {
    OpenResearchHub,
    ResetNotes,
    Quit,
}

impl PopupItem {
    pub const ALL: [PopupItem; 3] = [
        PopupItem::OpenResearchHub,
        PopupItem::ResetNotes,
        PopupItem::Quit,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PopupItem::OpenResearchHub => "Open Research Hub",
            PopupItem::ResetNotes => "Reset all notes",
            PopupItem::Quit => "Quit",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            PopupItem::OpenResearchHub => "Browse notes and ask Inquira AI",
            PopupItem::ResetNotes => "Delete every captured note",
            PopupItem::Quit => "Exit the application",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusToast {
    pub message: String,
    pub created_at: std::time::Instant,
}

impl StatusToast {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            created_at: std::time::Instant::now(),
        }
    }

    pub fn is_expired(&self, duration: std::time::Duration) -> bool {
        self.created_at.elapsed() >= duration
    }
}
