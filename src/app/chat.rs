use crate::app::{App, AppEvent, Focus};
use crate::error::{self, InquiraError};
use crate::router::{Request, Response};
use crate::types::{ChatTurn, Note, NoteId, NoteKind};
use tracing::{debug, warn};

const NO_NOTES_ALERT: &str = "No notes available to ask questions about.";
const EMPTY_MESSAGE_ALERT: &str = "Please enter a message!";
const NOTHING_TO_REWRITE_ALERT: &str = "No AI response available to rewrite.";
const NO_SELECTION_ALERT: &str = "Please select notes to rewrite.";
const EMPTY_REPLY_PLACEHOLDER: &str = "AI response: Skip this response.";

impl App {
    pub fn open_chat(&mut self) {
        self.chat_open = true;
        self.focus = Focus::Chat;
    }

    /// Closes the panel and ends the conversation. Replies still in flight
    /// belong to the old generation and are dropped when they arrive.
    pub fn close_chat(&mut self) {
        self.chat_history.clear();
        self.chat_input.clear();
        self.chat_open = false;
        self.focus = Focus::Notes;
        self.chat_generation = self.chat_generation.wrapping_add(1);
        self.pending_replies = 0;
        self.reset_chat_scroll();
        if let Err(error) = self.router.notify(Request::ClearChat) {
            warn!(error = %error, "could not clear the conversation session");
        }
    }

    /// Message and notes context for the next question
    fn chat_request_parts(&self) -> error::Result<(String, String)> {
        let user_message = self.chat_input.content().trim().to_string();
        if user_message.is_empty() {
            return Err(InquiraError::empty_input(EMPTY_MESSAGE_ALERT));
        }
        let context = self
            .chat_context()
            .ok_or_else(|| InquiraError::empty_input(NO_NOTES_ALERT))?;
        Ok((user_message, context))
    }

    pub fn send_chat_message(&mut self) {
        let (user_message, context) = match self.chat_request_parts() {
            Ok(parts) => parts,
            Err(error) => {
                self.show_alert(error.to_string());
                return;
            }
        };

        let request = Request::AskAi {
            context,
            chat_history: self.chat_history.clone(),
            user_message: user_message.clone(),
        };
        self.chat_history.push(ChatTurn::user(user_message));
        self.chat_input.clear();
        self.reset_chat_scroll();

        let reply = match self.router.send(request) {
            Ok(reply) => reply,
            Err(error) => {
                self.chat_history.push(ChatTurn::assistant_notice(format!(
                    "Failed to generate AI response: {}",
                    error
                )));
                return;
            }
        };

        self.pending_replies += 1;
        let generation = self.chat_generation;
        self.spawn_task(async move {
            let response = reply
                .await
                .unwrap_or_else(|_| Response::failure("Router dropped the request"));
            AppEvent::ChatReply {
                generation,
                response,
            }
        });
    }

    pub(crate) fn apply_chat_reply(&mut self, generation: u64, response: Response) {
        if generation != self.chat_generation {
            debug!("dropping reply to a closed conversation");
            return;
        }
        self.pending_replies = self.pending_replies.saturating_sub(1);

        let turn = match response {
            Response::Text(text) if !text.trim().is_empty() => ChatTurn::assistant(text),
            Response::Text(_) | Response::Empty => ChatTurn::assistant(EMPTY_REPLY_PLACEHOLDER),
            Response::Failure { error } => ChatTurn::assistant_notice(error),
        };
        self.chat_history.push(turn);
        if self.chat_auto_scroll {
            self.chat_scroll_offset = 0;
        }
    }

    /// Merges the latest answer with the selected notes into one new note
    /// that replaces them.
    pub fn rewrite(&mut self, with_summary: bool) {
        let Some(text) = self.chat_history.last().map(|turn| turn.content.clone()) else {
            self.show_alert(NOTHING_TO_REWRITE_ALERT);
            return;
        };
        if self.selection.is_empty() {
            self.show_alert(NO_SELECTION_ALERT);
            return;
        }

        let request = Request::Rewrite {
            text,
            context: self.selected_texts().join("\n\n"),
            with_summary,
        };
        let reply = match self.router.send(request) {
            Ok(reply) => reply,
            Err(error) => {
                self.show_alert(error.to_string());
                return;
            }
        };

        let kind = if with_summary {
            NoteKind::Summary
        } else {
            NoteKind::Raw
        };
        let selected = self.selection.clone();
        let store = self.store.clone();
        let generation = self.chat_generation;
        self.pending_replies += 1;
        self.spawn_task(async move {
            let response = reply
                .await
                .unwrap_or_else(|_| Response::failure("Router dropped the request"));
            let result = match response {
                Response::Text(text) if !text.trim().is_empty() => store
                    .merge(&selected, Note::new(text, kind))
                    .await
                    .map_err(|err| err.to_string()),
                Response::Text(_) | Response::Empty => {
                    Err("Failed to rewrite AI response: empty reply".to_string())
                }
                Response::Failure { error } => Err(error),
            };
            AppEvent::Rewritten {
                generation,
                kind,
                merged: selected,
                result,
            }
        });
    }

    pub(crate) fn apply_rewrite(
        &mut self,
        generation: u64,
        kind: NoteKind,
        merged: &[NoteId],
        result: Result<(), String>,
    ) {
        let current = generation == self.chat_generation;
        if current {
            self.pending_replies = self.pending_replies.saturating_sub(1);
        }
        match result {
            Ok(()) => {
                // Notes picked while the rewrite ran stay selected
                self.selection.retain(|id| !merged.contains(id));
                match kind {
                    NoteKind::Raw => self.show_status_toast("REWRITTEN"),
                    NoteKind::Summary => self.show_status_toast("REWRITTEN WITH SUMMARY"),
                }
            }
            Err(error) => {
                warn!(error = %error, "rewrite failed");
                if current {
                    self.chat_history.push(ChatTurn::assistant_notice(error));
                } else {
                    self.show_status_toast("REWRITE FAILED");
                }
            }
        }
    }

    /// Copies the latest assistant answer to the clipboard
    pub fn copy_last_answer(&mut self) {
        let Some(answer) = self
            .chat_history
            .iter()
            .rev()
            .find(|turn| turn.show_actions)
            .map(|turn| turn.content.clone())
        else {
            return;
        };
        if self.clipboard_service.copy_text(&answer).is_ok() {
            self.show_status_toast("COPIED");
        } else {
            self.show_status_toast("COPY FAILED");
        }
    }

    pub fn scroll_chat_up_lines(&mut self, lines: usize) {
        self.chat_auto_scroll = false;
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_add(lines);
    }

    pub fn scroll_chat_down_lines(&mut self, lines: usize) {
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_sub(lines);
        if self.chat_scroll_offset == 0 {
            self.chat_auto_scroll = true;
        }
    }

    pub fn reset_chat_scroll(&mut self) {
        self.chat_scroll_offset = 0;
        self.chat_auto_scroll = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::*;
    use crate::capability::Availability;
    use crate::capability::fakes::*;
    use crate::router::Router;
    use crate::session::SessionManager;
    use crate::storage::NoteStore;
    use crate::types::ChatRole;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    #[tokio::test]
    async fn test_send_without_notes_alerts_and_skips_router() {
        let mut t = detached_app(Vec::new()).await;
        t.app.open_chat();
        t.app.chat_input.set_content("what is this about?");

        t.app.send_chat_message();

        assert_eq!(t.app.alert.as_deref(), Some(NO_NOTES_ALERT));
        assert!(t.app.chat_history.is_empty());
        assert!(t.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blank_message_alerts() {
        let mut t = detached_app(vec![Note::raw("A")]).await;
        t.app.chat_input.set_content("   ");
        t.app.send_chat_message();
        assert_eq!(t.app.alert.as_deref(), Some(EMPTY_MESSAGE_ALERT));
        assert!(t.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_pushes_user_turn_before_reply() {
        let mut t = detached_app(vec![Note::raw("A"), Note::summary("B")]).await;
        t.app.chat_history.push(ChatTurn::assistant("earlier"));
        t.app.chat_input.set_content("why?");

        t.app.send_chat_message();

        assert_eq!(t.app.chat_history.len(), 2);
        assert_eq!(t.app.chat_history[1].role, ChatRole::User);
        assert!(t.app.chat_input.is_empty());
        let envelope = t.requests.try_recv().expect("askAI queued");
        match &envelope.request {
            Request::AskAi {
                context,
                chat_history,
                user_message,
            } => {
                assert_eq!(context, "A\n\nB");
                assert_eq!(chat_history.len(), 1);
                assert_eq!(user_message, "why?");
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_reply_renders_fallback_turn() {
        let mut t = detached_app(vec![Note::raw("A")]).await;
        t.app.chat_input.set_content("q");
        t.app.send_chat_message();
        drop(t.requests.try_recv().expect("queued"));

        settle(&mut t.app, |app| app.chat_history.len() == 2).await;
        let turn = &t.app.chat_history[1];
        assert_eq!(turn.role, ChatRole::Assistant);
        assert!(!turn.show_actions);
        assert!(!t.app.is_loading());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_placeholder() {
        let mut t = detached_app(vec![Note::raw("A")]).await;
        t.app.apply_chat_reply(0, Response::Empty);
        assert_eq!(t.app.chat_history[0].content, EMPTY_REPLY_PLACEHOLDER);
        assert!(t.app.chat_history[0].show_actions);
    }

    #[tokio::test]
    async fn test_late_reply_after_close_is_dropped() {
        let mut t = detached_app(vec![Note::raw("A")]).await;
        t.app.open_chat();
        t.app.chat_input.set_content("q");
        t.app.send_chat_message();
        let ask = t.requests.try_recv().expect("askAI queued");

        t.app.close_chat();
        let clear = t.requests.try_recv().expect("clearChat queued");
        assert_eq!(clear.request, Request::ClearChat);

        drop(ask);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        t.app.update();
        assert!(t.app.chat_history.is_empty());
        assert!(!t.app.chat_open);
    }

    #[tokio::test]
    async fn test_rewrite_requires_history_and_selection() {
        let notes = vec![Note::raw("A")];
        let a = notes[0].id;
        let mut t = detached_app(notes).await;

        t.app.rewrite(false);
        assert_eq!(t.app.alert.as_deref(), Some(NOTHING_TO_REWRITE_ALERT));

        t.app.dismiss_alert();
        t.app.chat_history.push(ChatTurn::assistant("answer"));
        t.app.rewrite(false);
        assert_eq!(t.app.alert.as_deref(), Some(NO_SELECTION_ALERT));
        assert!(t.requests.try_recv().is_err());

        t.app.dismiss_alert();
        t.app.toggle_selection(a);
        t.app.rewrite(false);
        assert!(t.app.alert.is_none());
        assert!(t.requests.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_rewrite_keeps_notes_selected_meanwhile() {
        let notes = vec![Note::raw("a"), Note::raw("b"), Note::raw("c")];
        let ids: Vec<NoteId> = notes.iter().map(|note| note.id).collect();
        let mut t = detached_app(notes).await;
        t.app.toggle_selection(ids[0]);
        t.app.toggle_selection(ids[1]);
        let merged = t.app.selection.clone();

        // picked after the rewrite was sent
        t.app.toggle_selection(ids[2]);
        let generation = t.app.chat_generation;
        t.app.apply_rewrite(generation, NoteKind::Raw, &merged, Ok(()));

        assert_eq!(t.app.selection, vec![ids[2]]);
    }

    #[tokio::test]
    async fn test_rewrite_with_summary_replaces_selected_notes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = NoteStore::open(dir.path()).await.expect("store");
        let notes = vec![Note::raw("first"), Note::raw("second"), Note::raw("third")];
        let selected = [notes[0].id, notes[1].id];
        store.replace_all(notes).await.expect("seed");

        let router = Router::new(
            Arc::new(gateway(
                FakeSummarizerCapability::new(Availability::Ready),
                FakeLanguageModelCapability::new(Availability::Ready),
            )),
            Arc::new(SessionManager::new()),
            store.clone(),
        );
        let (handle, _task) = router.spawn();
        let mut app = crate::app::App::new(handle, store.clone(), Handle::current());
        app.chat_history.push(ChatTurn::assistant("the answer"));
        for id in selected {
            app.toggle_selection(id);
        }

        app.rewrite(true);
        settle(&mut app, |app| app.notes.len() == 2 && app.selection.is_empty()).await;

        assert_eq!(app.notes[0].text, "third");
        let merged = &app.notes[1];
        assert_eq!(merged.kind, NoteKind::Summary);
        assert!(merged.text.contains("Text 1: first\n\nsecond"));
        assert!(merged.text.contains("Text 2: - summary of the answer"));
        assert_eq!(store.load_all().await.expect("load").len(), 2);
    }
}
