use crate::capability::{Availability, DownloadProgress, ProgressFn};
use crate::error::{InquiraError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Async client for the local Ollama daemon
pub struct OllamaClient {
    base_url: String,
    client: Client,
}

/// A message on the Ollama chat wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling options sent with each chat call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub top_k: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingOptions>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireMessage,
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    parameters: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Sampling defaults a model publishes in its Modelfile
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelParameters {
    pub top_k: Option<u32>,
    pub temperature: Option<f32>,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: &[WireMessage],
        options: Option<SamplingOptions>,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InquiraError::transport(format!(
                "Ollama chat failed ({}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)?;
        Ok(chat_response.message.content)
    }

    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let model_list: ModelList = response.json().await?;
        Ok(model_list.models.into_iter().map(|model| model.name).collect())
    }

    /// Maps daemon reachability and local model presence onto the tri-state
    pub async fn model_availability(&self, model: &str) -> Availability {
        if !self.is_available().await {
            return Availability::Unavailable;
        }
        match self.list_models().await {
            Ok(models) if models.iter().any(|name| model_name_matches(name, model)) => {
                Availability::Ready
            }
            Ok(_) => Availability::NeedsDownload,
            Err(err) => {
                warn!(model, error = %err, "could not list local models");
                Availability::Unavailable
            }
        }
    }

    /// Pulls `model`, reporting monotonically increasing byte counts
    pub async fn pull(&self, model: &str, progress: &ProgressFn<'_>) -> Result<()> {
        let request = ModelRequest {
            model,
            stream: Some(true),
        };
        let mut response = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InquiraError::transport(format!(
                "Ollama pull failed ({})",
                response.status()
            )));
        }

        let mut tracker = PullTracker::default();
        let mut buffer = String::new();
        while let Some(chunk) = response.chunk().await? {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                if tracker.consume_line(&line, progress)? {
                    return Ok(());
                }
            }
        }
        if tracker.consume_line(&buffer, progress)? || tracker.finished {
            return Ok(());
        }
        Err(InquiraError::transport(format!(
            "Ollama pull for '{}' ended before completion",
            model
        )))
    }

    pub async fn show_parameters(&self, model: &str) -> Result<ModelParameters> {
        let request = ModelRequest { model, stream: None };
        let response = self
            .client
            .post(format!("{}/api/show", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(ModelParameters::default());
        }

        let show: ShowResponse = response.json().await?;
        Ok(show
            .parameters
            .as_deref()
            .map(parse_parameters)
            .unwrap_or_default())
    }
}

/// Folds pull status lines into progress events
#[derive(Default)]
struct PullTracker {
    loaded: u64,
    finished: bool,
}

impl PullTracker {
    /// Returns `true` once the pull reports success
    fn consume_line(&mut self, line: &str, progress: &ProgressFn<'_>) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }
        let status: PullStatus = serde_json::from_str(line)?;
        if let Some(error) = status.error {
            return Err(InquiraError::transport(error));
        }
        if let (Some(completed), Some(total)) = (status.completed, status.total)
            && completed > self.loaded
        {
            self.loaded = completed;
            progress(DownloadProgress {
                loaded: completed,
                total,
            });
        }
        debug!(status = %status.status, "pull status");
        if status.status == "success" {
            self.finished = true;
        }
        Ok(self.finished)
    }
}

/// Reads `top_k` and `temperature` out of a Modelfile parameter block
fn parse_parameters(parameters: &str) -> ModelParameters {
    let mut parsed = ModelParameters::default();
    for line in parameters.lines() {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("top_k"), Some(value)) => parsed.top_k = value.parse().ok(),
            (Some("temperature"), Some(value)) => parsed.temperature = value.parse().ok(),
            _ => {}
        }
    }
    parsed
}

fn model_name_matches(available: &str, requested: &str) -> bool {
    if available == requested || available.starts_with(&format!("{requested}:")) {
        return true;
    }

    // Untagged requests match the implicit `:latest`
    let requested_has_tag = requested.contains(':');
    let requested_base = requested.split(':').next().unwrap_or(requested);
    let available_base = available.split(':').next().unwrap_or(available);
    !requested_has_tag && available_base == requested_base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_model_name_matches() {
        assert!(model_name_matches("gemma3:4b", "gemma3:4b"));
        assert!(model_name_matches("llama3.2:latest", "llama3.2"));
        assert!(!model_name_matches("gemma3:12b", "gemma3:4b"));
        assert!(!model_name_matches("mistral:latest", "gemma3"));
    }

    #[test]
    fn test_parse_parameters() {
        let parsed = parse_parameters("stop \"<end>\"\ntemperature 0.7\ntop_k 40\n");
        assert_eq!(parsed.top_k, Some(40));
        assert_eq!(parsed.temperature, Some(0.7));

        assert_eq!(parse_parameters(""), ModelParameters::default());
    }

    #[test]
    fn test_pull_tracker_reports_monotonic_progress() {
        let seen = Mutex::new(Vec::new());
        let record = |progress: DownloadProgress| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(progress.loaded);
            }
        };
        let mut tracker = PullTracker::default();

        let lines = [
            r#"{"status":"pulling manifest"}"#,
            r#"{"status":"pulling abc","completed":10,"total":100}"#,
            r#"{"status":"pulling abc","completed":5,"total":100}"#,
            r#"{"status":"pulling abc","completed":100,"total":100}"#,
            r#"{"status":"success"}"#,
        ];
        let mut done = false;
        for line in lines {
            done = tracker.consume_line(line, &record).expect("valid line");
        }

        assert!(done);
        assert_eq!(*seen.lock().expect("lock"), vec![10, 100]);
    }

    #[test]
    fn test_pull_tracker_surfaces_errors() {
        let mut tracker = PullTracker::default();
        let result = tracker.consume_line(r#"{"error":"model not found"}"#, &|_: DownloadProgress| {});
        assert!(matches!(result, Err(InquiraError::Transport(_))));
    }
}
