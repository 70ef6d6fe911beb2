//! Notes and chat turns, the two records passed between the hub, the router
//! and the storage file.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable opaque identifier of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a note holds the captured text or an AI summary of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Raw,
    Summary,
}

impl NoteKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            NoteKind::Raw => "raw",
            NoteKind::Summary => "summary",
        }
    }
}

/// A captured text fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
}

impl Note {
    pub fn new(text: impl Into<String>, kind: NoteKind) -> Self {
        Self {
            id: NoteId::generate(),
            text: text.into(),
            kind,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, NoteKind::Raw)
    }

    pub fn summary(text: impl Into<String>) -> Self {
        Self::new(text, NoteKind::Summary)
    }
}

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the hub conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_actions: bool,
    #[serde(skip, default = "now_timestamp")]
    pub timestamp: String,
}

fn now_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            show_actions: false,
            timestamp: now_timestamp(),
        }
    }

    /// Assistant answer offering the rewrite actions
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            show_actions: true,
            timestamp: now_timestamp(),
        }
    }

    /// Assistant-side notice without rewrite actions
    pub fn assistant_notice(content: impl Into<String>) -> Self {
        Self {
            show_actions: false,
            ..Self::assistant(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_wire_shape() {
        let note = Note::summary("B");
        let value = serde_json::to_value(&note).expect("serializes");
        assert_eq!(value["type"], "summary");
        assert_eq!(value["text"], "B");
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_chat_turn_omits_actions_flag_when_false() {
        let json = serde_json::to_string(&ChatTurn::user("hi")).expect("serializes");
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let json = serde_json::to_string(&ChatTurn::assistant("yo")).expect("serializes");
        assert!(json.contains(r#""showActions":true"#));
    }
}
