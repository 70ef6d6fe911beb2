use crate::app::{App, AppEvent, Focus, Navigable};
use crate::router::{Request, Response};
use crate::services::export::export_notes;
use crate::types::{Note, NoteId, NoteKind};
use tracing::warn;

impl App {
    /// Notes passing the current filter, in collection order
    #[must_use]
    pub fn visible_notes(&self) -> Vec<&Note> {
        self.filter.apply(&self.notes)
    }

    #[must_use]
    pub fn note_at_cursor(&self) -> Option<&Note> {
        self.visible_notes().get(self.notes_cursor).copied()
    }

    /// Position of `id` in the click-ordered selection
    #[must_use]
    pub fn selection_rank(&self, id: NoteId) -> Option<usize> {
        self.selection.iter().position(|selected| *selected == id)
    }

    pub(crate) fn sync_notes(&mut self) {
        if !self.notes_rx.has_changed().unwrap_or(false) {
            return;
        }
        self.notes = self.notes_rx.borrow_and_update().clone();
        let notes = &self.notes;
        self.selection
            .retain(|id| notes.iter().any(|note| note.id == *id));
        self.clamp_selected_index();
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.notes_cursor = 0;
    }

    /// Adds the note under the cursor to the selection, or removes it
    pub fn toggle_selection_at_cursor(&mut self) {
        let Some(id) = self.note_at_cursor().map(|note| note.id) else {
            return;
        };
        self.toggle_selection(id);
    }

    pub fn toggle_selection(&mut self, id: NoteId) {
        match self.selection_rank(id) {
            Some(rank) => {
                self.selection.remove(rank);
            }
            None => self.selection.push(id),
        }
    }

    /// Texts the conversation is grounded on: the selection in click order,
    /// or every note when nothing is selected. `None` when there are no notes.
    #[must_use]
    pub fn chat_context(&self) -> Option<String> {
        let texts: Vec<&str> = if self.selection.is_empty() {
            self.notes.iter().map(|note| note.text.as_str()).collect()
        } else {
            self.selected_texts()
        };
        if texts.is_empty() {
            return None;
        }
        Some(texts.join("\n\n"))
    }

    pub(crate) fn selected_texts(&self) -> Vec<&str> {
        self.selection
            .iter()
            .filter_map(|id| self.notes.iter().find(|note| note.id == *id))
            .map(|note| note.text.as_str())
            .collect()
    }

    pub fn delete_note_at_cursor(&mut self) {
        let Some(id) = self.note_at_cursor().map(|note| note.id) else {
            return;
        };
        self.selection.retain(|selected| *selected != id);

        let store = self.store.clone();
        self.spawn_task(async move {
            AppEvent::NoteDeleted(store.remove(id).await.map_err(|err| err.to_string()))
        });
    }

    pub fn export_notes(&mut self) {
        match export_notes(&self.notes, &self.export_path) {
            Ok(()) => self.show_status_toast("EXPORTED"),
            Err(error) => {
                warn!(error = %error, "export failed");
                self.show_alert(format!("Failed to export notes: {}", error));
            }
        }
    }

    /// Captures the current text selection as a raw or summarized note
    pub fn capture_selection(&mut self, kind: NoteKind) {
        let text = match self.clipboard_service.read_selection() {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                self.show_status_toast("NOTHING SELECTED");
                return;
            }
            Err(error) => {
                self.show_alert(format!("Could not read the selection: {}", error));
                return;
            }
        };
        self.capture_text(kind, text);
    }

    pub(crate) fn capture_text(&mut self, kind: NoteKind, text: String) {
        let request = match kind {
            NoteKind::Raw => Request::AddRawNote { text },
            NoteKind::Summary => Request::AddSummaryNote { text },
        };
        let reply = match self.router.send(request) {
            Ok(reply) => reply,
            Err(error) => {
                self.show_alert(error.to_string());
                return;
            }
        };

        self.pending_captures += 1;
        self.spawn_task(async move {
            let response = reply
                .await
                .unwrap_or_else(|_| Response::failure("Router dropped the request"));
            AppEvent::Captured { kind, response }
        });
    }

    pub(crate) fn apply_capture(&mut self, kind: NoteKind, response: Response) {
        self.pending_captures = self.pending_captures.saturating_sub(1);
        match response {
            Response::Failure { error } => self.show_alert(error),
            Response::Text(_) | Response::Empty => match kind {
                NoteKind::Raw => self.show_status_toast("NOTE ADDED"),
                NoteKind::Summary => self.show_status_toast("SUMMARY ADDED"),
            },
        }
    }

    pub fn reset_notes(&mut self) {
        self.selection.clear();
        let store = self.store.clone();
        self.spawn_task(async move {
            AppEvent::NotesReset(store.reset().await.map_err(|err| err.to_string()))
        });
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Notes if self.chat_open => Focus::Chat,
            Focus::Notes | Focus::Chat => Focus::Notes,
        };
    }
}

impl Navigable for App {
    fn get_item_count(&self) -> usize {
        self.visible_notes().len()
    }

    fn get_selected_index(&self) -> usize {
        self.notes_cursor
    }

    fn set_selected_index(&mut self, index: usize) {
        self.notes_cursor = index;
    }
}
