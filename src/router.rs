//! Message switchboard between the hub, the capture entry points and the
//! capability, session and storage layers.
//!
//! Requests travel as `{type, payload}` and every routed request produces one
//! `Response`: the raw result (`string` or `null`) or `{error}`.

use crate::capability::Gateway;
use crate::error::InquiraError;
use crate::session::SessionManager;
use crate::storage::NoteStore;
use crate::types::{ChatTurn, Note};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A typed request to the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Request {
    AddRawNote {
        text: String,
    },
    AddSummaryNote {
        text: String,
    },
    #[serde(rename = "askAI", rename_all = "camelCase")]
    AskAi {
        context: String,
        chat_history: Vec<ChatTurn>,
        user_message: String,
    },
    #[serde(rename_all = "camelCase")]
    Rewrite {
        text: String,
        context: String,
        with_summary: bool,
    },
    ClearChat,
}

impl Request {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Request::AddRawNote { .. } => "addRawNote",
            Request::AddSummaryNote { .. } => "addSummaryNote",
            Request::AskAi { .. } => "askAI",
            Request::Rewrite { .. } => "rewrite",
            Request::ClearChat => "clearChat",
        }
    }
}

/// Reply to a routed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Failure { error: String },
    Text(String),
    Empty,
}

impl Response {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Failure { .. } | Response::Empty => None,
        }
    }
}

pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// How a routed request will be answered
pub enum Dispatch {
    /// The reply is known now
    Immediate(Response),
    /// The reply arrives once the future resolves; keep the channel open
    Deferred(ResponseFuture),
}

impl Dispatch {
    pub async fn resolve(self) -> Response {
        match self {
            Dispatch::Immediate(response) => response,
            Dispatch::Deferred(future) => future.await,
        }
    }
}

/// Dependencies every handler needs
struct RouterContext {
    gateway: Arc<Gateway>,
    sessions: Arc<SessionManager>,
    store: NoteStore,
}

#[derive(Clone)]
pub struct Router {
    context: Arc<RouterContext>,
}

impl Router {
    pub fn new(gateway: Arc<Gateway>, sessions: Arc<SessionManager>, store: NoteStore) -> Self {
        Self {
            context: Arc::new(RouterContext {
                gateway,
                sessions,
                store,
            }),
        }
    }

    pub fn route(&self, request: Request) -> Dispatch {
        debug!(kind = request.kind(), "routing request");
        let context = Arc::clone(&self.context);
        match request {
            Request::AddRawNote { text } => {
                Dispatch::Deferred(Box::pin(async move { context.add_raw_note(text).await }))
            }
            Request::AddSummaryNote { text } => Dispatch::Deferred(Box::pin(async move {
                context.add_summary_note(text).await
            })),
            Request::AskAi {
                context: notes_context,
                chat_history,
                user_message,
            } => Dispatch::Deferred(Box::pin(async move {
                context
                    .ask_ai(notes_context, chat_history, user_message)
                    .await
            })),
            Request::Rewrite {
                text,
                context: notes_context,
                with_summary,
            } => Dispatch::Deferred(Box::pin(async move {
                context.rewrite(text, notes_context, with_summary).await
            })),
            Request::ClearChat => Dispatch::Deferred(Box::pin(async move {
                context.sessions.destroy().await;
                Response::Empty
            })),
        }
    }

    /// Routes an untyped `{type, payload}` message
    pub fn route_json(&self, message: serde_json::Value) -> Dispatch {
        match serde_json::from_value::<Request>(message) {
            Ok(request) => self.route(request),
            Err(err) => {
                warn!(error = %err, "rejecting malformed message");
                Dispatch::Immediate(Response::failure(format!("Unrecognized message: {}", err)))
            }
        }
    }

    /// Serves requests from a channel until every handle is dropped
    pub fn spawn(self) -> (RouterHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let task = tokio::spawn(async move {
            while let Some(Envelope { request, reply }) = rx.recv().await {
                match self.route(request) {
                    Dispatch::Immediate(response) => deliver(reply, response),
                    Dispatch::Deferred(future) => {
                        tokio::spawn(async move {
                            let response = future.await;
                            deliver(reply, response);
                        });
                    }
                }
            }
            debug!("router channel closed");
        });
        (RouterHandle { tx }, task)
    }
}

impl RouterContext {
    async fn add_raw_note(&self, text: String) -> Response {
        match self.store.append(Note::raw(text)).await {
            Ok(()) => {
                info!("raw note added");
                Response::Empty
            }
            Err(err) => {
                error!(error = %err, "could not add raw note");
                Response::failure(format!("Failed to add note: {}", err))
            }
        }
    }

    async fn add_summary_note(&self, text: String) -> Response {
        let summary = match self.gateway.summarize(&text).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "summary note not added");
                return Response::failure(format!("Failed to summarize selection: {}", err));
            }
        };
        match self.store.append(Note::summary(summary)).await {
            Ok(()) => {
                info!("summary note added");
                Response::Empty
            }
            Err(err) => {
                error!(error = %err, "could not add summary note");
                Response::failure(format!("Failed to add note: {}", err))
            }
        }
    }

    async fn ask_ai(
        &self,
        notes_context: String,
        chat_history: Vec<ChatTurn>,
        user_message: String,
    ) -> Response {
        debug!(
            context_chars = notes_context.chars().count(),
            history = chat_history.len(),
            "askAI"
        );
        let result: Result<String, InquiraError> = async {
            self.sessions
                .ensure_session(&self.gateway, &notes_context, &chat_history)
                .await?;
            self.sessions.prompt(&user_message).await
        }
        .await;

        match result {
            Ok(reply) => Response::Text(reply),
            Err(err) => {
                error!(error = %err, "askAI failed");
                Response::failure(format!("Failed to generate AI response: {}", err))
            }
        }
    }

    async fn rewrite(&self, text: String, notes_context: String, with_summary: bool) -> Response {
        let result: Result<String, InquiraError> = async {
            let text = if with_summary {
                self.gateway.summarize(&text).await?
            } else {
                text
            };
            self.sessions
                .ensure_session(&self.gateway, &notes_context, &[])
                .await?;
            self.sessions.prompt(&combine_prompt(&notes_context, &text)).await
        }
        .await;

        match result {
            Ok(combined) => Response::Text(combined),
            Err(err) => {
                error!(error = %err, "rewrite failed");
                Response::failure(format!("Failed to rewrite AI response: {}", err))
            }
        }
    }
}

/// Instruction merging the selected notes with an answer
fn combine_prompt(notes_context: &str, text: &str) -> String {
    format!(
        "Combine the following two texts into concise bullet points under a single descriptive title:\n\n\
         Text 1: {notes_context}\n\n\
         Text 2: {text}\n\n\
         Provide the title first as a heading, followed by the bullet points. Avoid giving multiple title options."
    )
}

/// A queued request and where its reply goes
pub(crate) struct Envelope {
    pub(crate) request: Request,
    reply: Option<oneshot::Sender<Response>>,
}

fn deliver(reply: Option<oneshot::Sender<Response>>, response: Response) {
    if let Some(reply) = reply
        && reply.send(response).is_err()
    {
        debug!("requester went away before the reply");
    }
}

/// Cloneable sender side of the router
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl RouterHandle {
    /// Queues `request`; the receiver resolves with the reply
    pub fn send(&self, request: Request) -> Result<oneshot::Receiver<Response>, InquiraError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: Some(reply),
            })
            .map_err(|_| InquiraError::transport("router is not running"))?;
        Ok(rx)
    }

    /// Queues `request` without waiting for a reply
    pub fn notify(&self, request: Request) -> Result<(), InquiraError> {
        self.tx
            .send(Envelope {
                request,
                reply: None,
            })
            .map_err(|_| InquiraError::transport("router is not running"))
    }

    /// Sends `request` and waits for its reply
    pub async fn request(&self, request: Request) -> Response {
        let rx = match self.send(request) {
            Ok(rx) => rx,
            Err(err) => return Response::failure(err.to_string()),
        };
        rx.await
            .unwrap_or_else(|_| Response::failure("Router dropped the request"))
    }

    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Availability;
    use crate::capability::fakes::*;
    use crate::session::SessionStatus;
    use crate::types::NoteKind;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        _dir: tempfile::TempDir,
        router: Router,
        store: NoteStore,
        sessions: Arc<SessionManager>,
    }

    async fn harness(
        summarizer: FakeSummarizerCapability,
        language_model: FakeLanguageModelCapability,
    ) -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = NoteStore::open(dir.path()).await.expect("store");
        let sessions = Arc::new(SessionManager::new());
        let router = Router::new(
            Arc::new(gateway(summarizer, language_model)),
            Arc::clone(&sessions),
            store.clone(),
        );
        Harness {
            _dir: dir,
            router,
            store,
            sessions,
        }
    }

    async fn ready_harness() -> Harness {
        harness(
            FakeSummarizerCapability::new(Availability::Ready),
            FakeLanguageModelCapability::new(Availability::Ready),
        )
        .await
    }

    #[test]
    fn test_request_wire_shape() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "type": "askAI",
            "payload": {
                "context": "notes",
                "chatHistory": [{"role": "user", "content": "earlier"}],
                "userMessage": "why?"
            }
        }))
        .expect("askAI parses");
        assert!(matches!(request, Request::AskAi { ref user_message, .. } if user_message == "why?"));

        let request: Request =
            serde_json::from_value(serde_json::json!({"type": "clearChat"})).expect("parses");
        assert_eq!(request, Request::ClearChat);

        let value = serde_json::to_value(Request::Rewrite {
            text: "t".to_string(),
            context: "c".to_string(),
            with_summary: true,
        })
        .expect("serializes");
        assert_eq!(value["payload"]["withSummary"], true);
    }

    #[test]
    fn test_response_wire_shape() {
        assert_eq!(
            serde_json::to_string(&Response::failure("nope")).expect("serializes"),
            r#"{"error":"nope"}"#
        );
        assert_eq!(serde_json::to_string(&Response::Empty).expect("serializes"), "null");
        assert_eq!(
            serde_json::to_string(&Response::Text("hi".to_string())).expect("serializes"),
            r#""hi""#
        );
    }

    #[tokio::test]
    async fn test_add_raw_note_appends() {
        let h = ready_harness().await;
        let response = h
            .router
            .route(Request::AddRawNote {
                text: "selected".to_string(),
            })
            .resolve()
            .await;

        assert_eq!(response, Response::Empty);
        let notes = h.store.load_all().await.expect("load");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NoteKind::Raw);
    }

    #[tokio::test]
    async fn test_add_summary_note_stores_summary() {
        let h = ready_harness().await;
        h.router
            .route(Request::AddSummaryNote {
                text: "page".to_string(),
            })
            .resolve()
            .await;

        let notes = h.store.load_all().await.expect("load");
        assert_eq!(notes[0].text, "- summary of page");
        assert_eq!(notes[0].kind, NoteKind::Summary);
    }

    #[tokio::test]
    async fn test_add_summary_note_skips_append_when_unavailable() {
        let h = harness(
            FakeSummarizerCapability::new(Availability::Unavailable),
            FakeLanguageModelCapability::new(Availability::Ready),
        )
        .await;
        let response = h
            .router
            .route(Request::AddSummaryNote {
                text: "page".to_string(),
            })
            .resolve()
            .await;

        assert!(matches!(response, Response::Failure { .. }));
        assert!(h.store.load_all().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_ask_ai_failure_is_error_object() {
        let h = harness(
            FakeSummarizerCapability::new(Availability::Ready),
            FakeLanguageModelCapability::new(Availability::Unavailable),
        )
        .await;
        let response = h
            .router
            .route(Request::AskAi {
                context: "notes".to_string(),
                chat_history: Vec::new(),
                user_message: "q".to_string(),
            })
            .resolve()
            .await;

        match response {
            Response::Failure { error } => assert!(error.starts_with("Failed to generate AI response")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rewrite_with_summary_summarizes_answer_first() {
        let h = ready_harness().await;
        let response = h
            .router
            .route(Request::Rewrite {
                text: "answer".to_string(),
                context: "note A\n\nnote B".to_string(),
                with_summary: true,
            })
            .resolve()
            .await;

        let combined = response.text().expect("text reply");
        assert!(combined.contains("Text 2: - summary of answer"));
        assert!(combined.starts_with("[note A\n\nnote B]"));
    }

    #[tokio::test]
    async fn test_clear_chat_destroys_session() {
        let h = ready_harness().await;
        h.router
            .route(Request::AskAi {
                context: "notes".to_string(),
                chat_history: Vec::new(),
                user_message: "q".to_string(),
            })
            .resolve()
            .await;
        assert_eq!(h.sessions.status(), SessionStatus::Ready);

        let response = h.router.route(Request::ClearChat).resolve().await;
        assert_eq!(response, Response::Empty);
        assert_eq!(h.sessions.status(), SessionStatus::Absent);
    }

    #[tokio::test]
    async fn test_malformed_message_answers_immediately() {
        let h = ready_harness().await;
        let dispatch = h
            .router
            .route_json(serde_json::json!({"type": "explode", "payload": {}}));
        assert!(matches!(dispatch, Dispatch::Immediate(Response::Failure { .. })));
    }

    #[tokio::test]
    async fn test_back_to_back_ask_ai_creates_one_session() {
        let mut language_model = FakeLanguageModelCapability::new(Availability::Ready);
        language_model.create_delay = Duration::from_millis(30);
        let counters = Arc::clone(&language_model.counters);
        let h = harness(FakeSummarizerCapability::new(Availability::Ready), language_model).await;
        let (handle, _task) = h.router.clone().spawn();

        let ask = |message: &str| Request::AskAi {
            context: "notes".to_string(),
            chat_history: Vec::new(),
            user_message: message.to_string(),
        };
        let first = handle.send(ask("one")).expect("queued");
        let second = handle.send(ask("two")).expect("queued");

        assert_eq!(first.await.expect("reply"), Response::Text("[notes] one".to_string()));
        assert_eq!(second.await.expect("reply"), Response::Text("[notes] two".to_string()));
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_request_reports_stopped_router() {
        let (handle, rx) = RouterHandle::detached();
        drop(rx);
        let response = handle.request(Request::ClearChat).await;
        assert!(matches!(response, Response::Failure { .. }));
    }
}
