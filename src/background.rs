use crate::capability::language_model::OllamaLanguageModelCapability;
use crate::capability::ollama::OllamaClient;
use crate::capability::summarizer::OllamaSummarizerCapability;
use crate::capability::{DownloadProgress, Gateway};
use crate::config::Config;
use crate::router::{Response, Router, RouterHandle};
use crate::session::{SessionManager, SessionStatus};
use crate::storage::NoteStore;
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

const STORE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Long-lived side of the application: router, session, store and watchers
pub struct Background {
    pub router: RouterHandle,
    pub store: NoteStore,
    core: Router,
    gateway: Arc<Gateway>,
    sessions: Arc<SessionManager>,
    tasks: Vec<JoinHandle<()>>,
}

impl Background {
    /// Wires the Ollama-backed capabilities into a running router.
    /// Must be called from within the tokio runtime.
    pub async fn start(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = NoteStore::open(&data_dir).await?;

        let client = Arc::new(OllamaClient::new(&config.ollama.url));
        let gateway = Arc::new(Gateway::new(
            Arc::new(OllamaSummarizerCapability::new(
                Arc::clone(&client),
                config.models.summarizer.clone(),
            )),
            Arc::new(OllamaLanguageModelCapability::new(
                client,
                config.models.language_model.clone(),
                config.session.top_k,
                config.session.temperature,
            )),
            config.summarizer.clone(),
        ));
        let sessions = Arc::new(SessionManager::new());

        let core = Router::new(Arc::clone(&gateway), Arc::clone(&sessions), store.clone());
        let (router, router_task) = core.clone().spawn();
        info!(storage = %store.path().display(), "background started");

        Ok(Self {
            router,
            store,
            core,
            gateway,
            sessions,
            tasks: vec![router_task],
        })
    }

    /// Follows writes made by capture commands in other processes
    pub fn watch_store(&mut self) {
        self.tasks.push(self.store.spawn_watcher(STORE_POLL_INTERVAL));
    }

    /// Answers a raw `{type, payload}` message the way the router channel would
    pub async fn route_json(&self, message: serde_json::Value) -> Response {
        self.core.route_json(message).resolve().await
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<DownloadProgress>> {
        self.gateway.subscribe_progress()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionStatus> {
        self.sessions.subscribe()
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
