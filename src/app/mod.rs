mod chat;
mod help;
mod navigation;
mod notes;
mod popup;
mod text_input;
mod types;

pub use navigation::Navigable;
pub use text_input::TextInput;
pub use types::*;

use crate::capability::DownloadProgress;
use crate::router::{Response, RouterHandle};
use crate::services::clipboard::ClipboardService;
use crate::session::SessionStatus;
use crate::storage::NoteStore;
use crate::types::{ChatTurn, Note, NoteId, NoteKind};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;

const TOAST_DURATION: Duration = Duration::from_secs(3);
const ANIMATION_TICK: Duration = Duration::from_millis(200);

/// Completions of work handed to the runtime
pub enum AppEvent {
    ChatReply {
        generation: u64,
        response: Response,
    },
    Rewritten {
        generation: u64,
        kind: NoteKind,
        merged: Vec<NoteId>,
        result: Result<(), String>,
    },
    Captured {
        kind: NoteKind,
        response: Response,
    },
    NoteDeleted(Result<(), String>),
    NotesReset(Result<(), String>),
}

/// Main application state
pub struct App {
    pub mode: AppMode,
    pub previous_mode: Option<AppMode>,
    pub should_quit: bool,
    pub popup_index: usize,

    // Research view
    pub notes: Vec<Note>,
    pub filter: NoteFilter,
    /// Selected note ids in click order
    pub selection: Vec<NoteId>,
    pub notes_cursor: usize,
    pub focus: Focus,

    // Chat panel
    pub chat_open: bool,
    pub chat_history: Vec<ChatTurn>,
    pub chat_input: TextInput,
    pub chat_scroll_offset: usize,
    pub chat_auto_scroll: bool,
    // Bumped on close so replies to a closed conversation are dropped
    chat_generation: u64,
    pub pending_replies: usize,
    pub pending_captures: usize,

    pub alert: Option<String>,
    pub status_toast: Option<StatusToast>,
    pub session_status: SessionStatus,
    pub download_progress: Option<DownloadProgress>,
    pub loading_frame: u8,
    last_loading_tick: Option<Instant>,
    pub clipboard_service: ClipboardService,
    export_path: PathBuf,

    router: RouterHandle,
    store: NoteStore,
    runtime: Handle,
    notes_rx: watch::Receiver<Vec<Note>>,
    progress_rx: Option<watch::Receiver<Option<DownloadProgress>>>,
    session_rx: Option<watch::Receiver<SessionStatus>>,
    event_tx: Sender<AppEvent>,
    event_rx: Receiver<AppEvent>,
}

impl App {
    /// Creates the application on top of a running router and store.
    /// Async work is spawned on `runtime`.
    pub fn new(router: RouterHandle, store: NoteStore, runtime: Handle) -> Self {
        let mut notes_rx = store.subscribe();
        let notes = notes_rx.borrow_and_update().clone();
        let (event_tx, event_rx) = channel();

        Self {
            mode: AppMode::Popup,
            previous_mode: None,
            should_quit: false,
            popup_index: 0,
            notes,
            filter: NoteFilter::All,
            selection: Vec::new(),
            notes_cursor: 0,
            focus: Focus::Notes,
            chat_open: false,
            chat_history: Vec::new(),
            chat_input: TextInput::new(),
            chat_scroll_offset: 0,
            chat_auto_scroll: true,
            chat_generation: 0,
            pending_replies: 0,
            pending_captures: 0,
            alert: None,
            status_toast: None,
            session_status: SessionStatus::Absent,
            download_progress: None,
            loading_frame: 0,
            last_loading_tick: None,
            clipboard_service: ClipboardService::new(),
            export_path: PathBuf::from("notes.json"),
            router,
            store,
            runtime,
            notes_rx,
            progress_rx: None,
            session_rx: None,
            event_tx,
            event_rx,
        }
    }

    /// Feeds the header with session state and model download progress
    #[must_use]
    pub fn with_status_feeds(
        mut self,
        progress: watch::Receiver<Option<DownloadProgress>>,
        session: watch::Receiver<SessionStatus>,
    ) -> Self {
        self.progress_rx = Some(progress);
        self.session_rx = Some(session);
        self
    }

    #[must_use]
    pub fn with_export_path(mut self, path: PathBuf) -> Self {
        self.export_path = path;
        self
    }

    /// Applies everything that happened off the UI thread since the last frame
    pub fn update(&mut self) {
        self.sync_notes();
        self.sync_status_feeds();
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
        self.tick_loading_animation();
        self.clear_expired_status_toast();
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ChatReply {
                generation,
                response,
            } => self.apply_chat_reply(generation, response),
            AppEvent::Rewritten {
                generation,
                kind,
                merged,
                result,
            } => self.apply_rewrite(generation, kind, &merged, result),
            AppEvent::Captured { kind, response } => self.apply_capture(kind, response),
            AppEvent::NoteDeleted(result) => {
                if let Err(error) = result {
                    self.show_alert(format!("Failed to delete note: {}", error));
                }
            }
            AppEvent::NotesReset(result) => match result {
                Ok(()) => self.show_status_toast("NOTES RESET"),
                Err(error) => self.show_alert(format!("Failed to reset notes: {}", error)),
            },
        }
    }

    fn sync_status_feeds(&mut self) {
        if let Some(progress_rx) = &mut self.progress_rx
            && progress_rx.has_changed().unwrap_or(false)
        {
            self.download_progress = *progress_rx.borrow_and_update();
        }
        if let Some(session_rx) = &mut self.session_rx
            && session_rx.has_changed().unwrap_or(false)
        {
            self.session_status = *session_rx.borrow_and_update();
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending_replies > 0 || self.pending_captures > 0
    }

    fn tick_loading_animation(&mut self) {
        if !self.is_loading() && self.download_progress.is_none() {
            self.loading_frame = 0;
            self.last_loading_tick = None;
            return;
        }

        let now = Instant::now();
        let should_tick = self
            .last_loading_tick
            .is_none_or(|last_tick| now.duration_since(last_tick) >= ANIMATION_TICK);
        if should_tick {
            self.loading_frame = self.loading_frame.wrapping_add(1);
            self.last_loading_tick = Some(now);
        }
    }

    /// Blocking message; the next key press dismisses it
    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn show_status_toast(&mut self, message: impl Into<String>) {
        self.status_toast = Some(StatusToast::new(message));
    }

    pub fn clear_expired_status_toast(&mut self) {
        let should_clear = self
            .status_toast
            .as_ref()
            .is_some_and(|toast| toast.is_expired(TOAST_DURATION));
        if should_clear {
            self.status_toast = None;
        }
    }

    #[must_use]
    pub fn status_toast_message(&self) -> Option<&str> {
        self.status_toast.as_ref().map(|toast| toast.message.as_str())
    }

    /// Runs `task` on the runtime and posts its result back as an event
    fn spawn_task<F>(&self, task: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let event = task.await;
            if event_tx.send(event).is_err() {
                tracing::debug!("application closed before the task finished");
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::router::Envelope;
    use tokio::sync::mpsc::UnboundedReceiver;

    pub(crate) struct TestApp {
        pub(crate) _dir: tempfile::TempDir,
        pub(crate) app: App,
        pub(crate) store: NoteStore,
        pub(crate) requests: UnboundedReceiver<Envelope>,
    }

    /// App over a router that never answers; requests are observable
    pub(crate) async fn detached_app(notes: Vec<Note>) -> TestApp {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = NoteStore::open(dir.path()).await.expect("store");
        store.replace_all(notes).await.expect("seed");
        let (router, requests) = RouterHandle::detached();
        let mut app = App::new(router, store.clone(), Handle::current());
        app.mode = AppMode::Research;
        TestApp {
            _dir: dir,
            app,
            store,
            requests,
        }
    }

    /// Updates `app` until `done` holds
    pub(crate) async fn settle(app: &mut App, done: impl Fn(&App) -> bool) {
        for _ in 0..200 {
            app.update();
            if done(app) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("app did not settle");
    }
}
