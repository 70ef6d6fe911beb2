//! Local AI capabilities (summarization and conversational prompting) behind
//! one availability-checked gateway.

pub mod language_model;
pub mod ollama;
pub mod summarizer;

use crate::error::{InquiraError, Result};
use crate::types::ChatTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use summarizer::SummarizerOptions;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Availability tri-state reported by a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    Unavailable,
    NeedsDownload,
    Ready,
}

/// Bytes fetched so far while a model downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl DownloadProgress {
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = self.loaded.saturating_mul(100) / self.total;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}

/// Observer of download progress events
pub type ProgressFn<'a> = dyn Fn(DownloadProgress) + Send + Sync + 'a;

/// What the conversational capability reports before a session is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCapabilities {
    pub available: Availability,
    pub default_top_k: u32,
    pub default_temperature: f32,
}

/// Parameters fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub system_prompt: String,
    pub top_k: u32,
    pub temperature: f32,
    pub initial_prompts: Vec<ChatTurn>,
}

#[async_trait]
pub trait SummarizerCapability: Send + Sync {
    async fn availability(&self) -> Result<Availability>;
    async fn create(&self, options: &SummarizerOptions) -> Result<Box<dyn Summarizer>>;
}

/// Short-lived summarizer handle, destroyed after one call
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Resolves once the backing model is present locally
    async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()>;
    async fn summarize(&self, text: &str) -> Result<String>;
    fn destroy(&self);
}

#[async_trait]
pub trait LanguageModelCapability: Send + Sync {
    async fn capabilities(&self) -> Result<ModelCapabilities>;
    async fn create(&self, options: SessionOptions) -> Result<Arc<dyn LanguageModel>>;
}

/// Long-lived conversational handle bound to one system prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()>;
    async fn prompt(&self, message: &str) -> Result<String>;
    fn destroy(&self);
}

/// Uniform entry point to both capabilities
pub struct Gateway {
    summarizer: Arc<dyn SummarizerCapability>,
    language_model: Arc<dyn LanguageModelCapability>,
    summarizer_options: SummarizerOptions,
    progress: watch::Sender<Option<DownloadProgress>>,
}

impl Gateway {
    pub fn new(
        summarizer: Arc<dyn SummarizerCapability>,
        language_model: Arc<dyn LanguageModelCapability>,
        summarizer_options: SummarizerOptions,
    ) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            summarizer,
            language_model,
            summarizer_options,
            progress,
        }
    }

    /// Latest download progress; `None` when nothing is downloading
    pub fn subscribe_progress(&self) -> watch::Receiver<Option<DownloadProgress>> {
        self.progress.subscribe()
    }

    fn report_progress(&self, capability: &str, progress: DownloadProgress) {
        debug!(capability, loaded = progress.loaded, total = progress.total, "model download progress");
        self.progress.send_replace(Some(progress));
    }

    /// Summarizes `text` with a fresh summarizer handle
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let available = self.summarizer.availability().await?;
        if available == Availability::Unavailable {
            warn!("summarizer capability unavailable");
            return Err(InquiraError::unavailable("Summarizer"));
        }

        let handle = self.summarizer.create(&self.summarizer_options).await?;
        if available == Availability::NeedsDownload {
            info!("summarizer model needs download; waiting until ready");
            let report = |progress| self.report_progress("summarizer", progress);
            let ready = handle.ready(&report).await;
            self.progress.send_replace(None);
            if let Err(err) = ready {
                handle.destroy();
                return Err(err);
            }
        }

        let summary = handle.summarize(text).await;
        handle.destroy();
        summary
    }

    /// Creates a conversational handle with `system_prompt` fixed for its lifetime
    pub async fn open_session(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
    ) -> Result<Arc<dyn LanguageModel>> {
        let capabilities = self.language_model.capabilities().await?;
        if capabilities.available == Availability::Unavailable {
            warn!("language model capability unavailable");
            return Err(InquiraError::unavailable("Language model"));
        }

        let options = SessionOptions {
            system_prompt: system_prompt.to_string(),
            top_k: capabilities.default_top_k,
            temperature: capabilities.default_temperature,
            initial_prompts: history.to_vec(),
        };
        let model = self.language_model.create(options).await?;
        if capabilities.available == Availability::NeedsDownload {
            info!("language model needs download; waiting until ready");
            let report = |progress| self.report_progress("language model", progress);
            let ready = model.ready(&report).await;
            self.progress.send_replace(None);
            if let Err(err) = ready {
                model.destroy();
                return Err(err);
            }
        }
        Ok(model)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Scripted capabilities for exercising the gateway, sessions and router.

    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    pub struct Counters {
        pub created: AtomicUsize,
        pub destroyed: AtomicUsize,
        pub readied: AtomicUsize,
    }

    pub struct FakeSummarizerCapability {
        pub available: Availability,
        pub fail: bool,
        pub counters: Arc<Counters>,
    }

    impl FakeSummarizerCapability {
        pub fn new(available: Availability) -> Self {
            Self {
                available,
                fail: false,
                counters: Arc::new(Counters::default()),
            }
        }
    }

    struct FakeSummarizer {
        fail: bool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl SummarizerCapability for FakeSummarizerCapability {
        async fn availability(&self) -> Result<Availability> {
            Ok(self.available)
        }

        async fn create(&self, _options: &SummarizerOptions) -> Result<Box<dyn Summarizer>> {
            self.counters.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSummarizer {
                fail: self.fail,
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()> {
            progress(DownloadProgress { loaded: 50, total: 100 });
            progress(DownloadProgress { loaded: 100, total: 100 });
            self.counters.readied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            if self.fail {
                return Err(InquiraError::transport("summarizer crashed"));
            }
            Ok(format!("- summary of {text}"))
        }

        fn destroy(&self) {
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub struct FakeLanguageModelCapability {
        pub available: Availability,
        pub create_delay: Duration,
        pub counters: Arc<Counters>,
        pub created_prompts: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLanguageModelCapability {
        pub fn new(available: Availability) -> Self {
            Self {
                available,
                create_delay: Duration::ZERO,
                counters: Arc::new(Counters::default()),
                created_prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    /// Echoes prompts back together with the system prompt
    pub struct FakeLanguageModel {
        system_prompt: String,
        destroyed: AtomicBool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl LanguageModelCapability for FakeLanguageModelCapability {
        async fn capabilities(&self) -> Result<ModelCapabilities> {
            Ok(ModelCapabilities {
                available: self.available,
                default_top_k: 3,
                default_temperature: 1.0,
            })
        }

        async fn create(&self, options: SessionOptions) -> Result<Arc<dyn LanguageModel>> {
            if !self.create_delay.is_zero() {
                tokio::time::sleep(self.create_delay).await;
            }
            self.counters.created.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.created_prompts.lock() {
                prompts.push(options.system_prompt.clone());
            }
            Ok(Arc::new(FakeLanguageModel {
                system_prompt: options.system_prompt,
                destroyed: AtomicBool::new(false),
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    #[async_trait]
    impl LanguageModel for FakeLanguageModel {
        async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()> {
            progress(DownloadProgress { loaded: 1, total: 2 });
            self.counters.readied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn prompt(&self, message: &str) -> Result<String> {
            if self.destroyed.load(Ordering::SeqCst) {
                return Err(InquiraError::transport("session destroyed"));
            }
            Ok(format!("[{}] {}", self.system_prompt, message))
        }

        fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn gateway(
        summarizer: FakeSummarizerCapability,
        language_model: FakeLanguageModelCapability,
    ) -> Gateway {
        Gateway::new(
            Arc::new(summarizer),
            Arc::new(language_model),
            SummarizerOptions::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_download_percent() {
        let progress = DownloadProgress { loaded: 25, total: 200 };
        assert_eq!(progress.percent(), 12);
        assert_eq!(DownloadProgress::default().percent(), 0);
    }

    #[tokio::test]
    async fn test_ready_reports_to_borrowing_observer() {
        let capability = FakeSummarizerCapability::new(Availability::NeedsDownload);
        let summarizer = capability
            .create(&SummarizerOptions::default())
            .await
            .expect("summarizer");
        let seen = std::sync::Mutex::new(Vec::new());
        let record = |progress: DownloadProgress| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(progress.percent());
            }
        };

        summarizer.ready(&record).await.expect("ready");
        assert_eq!(*seen.lock().expect("lock"), vec![50, 100]);
    }

    #[tokio::test]
    async fn test_summarize_ready_destroys_handle() {
        let summarizer = FakeSummarizerCapability::new(Availability::Ready);
        let counters = Arc::clone(&summarizer.counters);
        let gateway = gateway(summarizer, FakeLanguageModelCapability::new(Availability::Ready));

        let summary = gateway.summarize("rust").await.expect("summary");
        assert_eq!(summary, "- summary of rust");
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.readied.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_unavailable_creates_nothing() {
        let summarizer = FakeSummarizerCapability::new(Availability::Unavailable);
        let counters = Arc::clone(&summarizer.counters);
        let gateway = gateway(summarizer, FakeLanguageModelCapability::new(Availability::Ready));

        let err = gateway.summarize("rust").await.expect_err("unavailable");
        assert!(matches!(err, InquiraError::CapabilityUnavailable { .. }));
        assert_eq!(counters.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_waits_for_download() {
        let summarizer = FakeSummarizerCapability::new(Availability::NeedsDownload);
        let counters = Arc::clone(&summarizer.counters);
        let gateway = gateway(summarizer, FakeLanguageModelCapability::new(Availability::Ready));
        let progress = gateway.subscribe_progress();

        gateway.summarize("rust").await.expect("summary");
        assert_eq!(counters.readied.load(Ordering::SeqCst), 1);
        assert_eq!(*progress.borrow(), None);
    }

    #[tokio::test]
    async fn test_summarize_failure_still_destroys_handle() {
        let mut summarizer = FakeSummarizerCapability::new(Availability::Ready);
        summarizer.fail = true;
        let counters = Arc::clone(&summarizer.counters);
        let gateway = gateway(summarizer, FakeLanguageModelCapability::new(Availability::Ready));

        assert!(gateway.summarize("rust").await.is_err());
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_session_uses_context_as_system_prompt() {
        let language_model = FakeLanguageModelCapability::new(Availability::NeedsDownload);
        let counters = Arc::clone(&language_model.counters);
        let gateway = gateway(FakeSummarizerCapability::new(Availability::Ready), language_model);

        let model = gateway.open_session("notes", &[]).await.expect("session");
        assert_eq!(model.prompt("hi").await.expect("reply"), "[notes] hi");
        assert_eq!(counters.readied.load(Ordering::SeqCst), 1);
    }
}
