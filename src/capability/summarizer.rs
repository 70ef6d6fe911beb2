use crate::capability::ollama::{OllamaClient, WireMessage};
use crate::capability::{Availability, ProgressFn, Summarizer, SummarizerCapability};
use crate::error::{InquiraError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryKind {
    KeyPoints,
    Tldr,
    Teaser,
    Headline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryFormat {
    Markdown,
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

/// Summarizer settings, overridable under `[summarizer]` in `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizerOptions {
    pub shared_context: String,
    pub kind: SummaryKind,
    pub format: SummaryFormat,
    pub length: SummaryLength,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            shared_context: "This is some text on the internet".to_string(),
            kind: SummaryKind::KeyPoints,
            format: SummaryFormat::Markdown,
            length: SummaryLength::Long,
        }
    }
}

impl SummarizerOptions {
    /// Instruction block the summarizing model receives as its system prompt
    #[must_use]
    pub fn system_prompt(&self) -> String {
        let shape = match (self.kind, self.length) {
            (SummaryKind::KeyPoints, SummaryLength::Short) => "the 3 most important key points as a bulleted list",
            (SummaryKind::KeyPoints, SummaryLength::Medium) => "the 5 most important key points as a bulleted list",
            (SummaryKind::KeyPoints, SummaryLength::Long) => "the 7 most important key points as a bulleted list",
            (SummaryKind::Tldr, SummaryLength::Short) => "a one sentence TL;DR",
            (SummaryKind::Tldr, SummaryLength::Medium) => "a three sentence TL;DR",
            (SummaryKind::Tldr, SummaryLength::Long) => "a five sentence TL;DR",
            (SummaryKind::Teaser, SummaryLength::Short) => "a one sentence teaser that makes the reader curious",
            (SummaryKind::Teaser, SummaryLength::Medium) => "a three sentence teaser that makes the reader curious",
            (SummaryKind::Teaser, SummaryLength::Long) => "a five sentence teaser that makes the reader curious",
            (SummaryKind::Headline, SummaryLength::Short) => "a headline of at most 12 words",
            (SummaryKind::Headline, SummaryLength::Medium) => "a headline of at most 17 words",
            (SummaryKind::Headline, SummaryLength::Long) => "a headline of at most 22 words",
        };
        let format = match self.format {
            SummaryFormat::Markdown => "Format the answer as Markdown.",
            SummaryFormat::PlainText => "Answer in plain text without any Markdown.",
        };

        let mut prompt = format!(
            "You summarize text. Produce {shape} of the text the user sends. {format} \
             Reply with the summary only."
        );
        if !self.shared_context.trim().is_empty() {
            prompt.push_str(&format!(" Context: {}", self.shared_context.trim()));
        }
        prompt
    }
}

/// Summarization backed by a local Ollama model
pub struct OllamaSummarizerCapability {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaSummarizerCapability {
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SummarizerCapability for OllamaSummarizerCapability {
    async fn availability(&self) -> Result<Availability> {
        Ok(self.client.model_availability(&self.model).await)
    }

    async fn create(&self, options: &SummarizerOptions) -> Result<Box<dyn Summarizer>> {
        Ok(Box::new(OllamaSummarizer {
            client: Arc::clone(&self.client),
            model: self.model.clone(),
            system_prompt: options.system_prompt(),
            destroyed: AtomicBool::new(false),
        }))
    }
}

struct OllamaSummarizer {
    client: Arc<OllamaClient>,
    model: String,
    system_prompt: String,
    destroyed: AtomicBool,
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()> {
        self.client.pull(&self.model, progress).await
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(InquiraError::transport("summarizer was destroyed"));
        }
        let messages = [
            WireMessage::system(self.system_prompt.as_str()),
            WireMessage::user(text),
        ];
        let summary = self.client.chat(&self.model, &messages, None).await?;
        Ok(summary.trim().to_string())
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}
