use crate::capability::ollama::{OllamaClient, SamplingOptions, WireMessage};
use crate::capability::{
    Availability, LanguageModel, LanguageModelCapability, ModelCapabilities, ProgressFn,
    SessionOptions,
};
use crate::error::{InquiraError, Result};
use crate::types::ChatRole;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::warn;

/// Conversational prompting backed by a local Ollama model
pub struct OllamaLanguageModelCapability {
    client: Arc<OllamaClient>,
    model: String,
    fallback_top_k: u32,
    fallback_temperature: f32,
}

impl OllamaLanguageModelCapability {
    pub fn new(
        client: Arc<OllamaClient>,
        model: impl Into<String>,
        fallback_top_k: u32,
        fallback_temperature: f32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            fallback_top_k,
            fallback_temperature,
        }
    }
}

#[async_trait]
impl LanguageModelCapability for OllamaLanguageModelCapability {
    async fn capabilities(&self) -> Result<ModelCapabilities> {
        let available = self.client.model_availability(&self.model).await;
        let parameters = if available == Availability::Ready {
            match self.client.show_parameters(&self.model).await {
                Ok(parameters) => parameters,
                Err(err) => {
                    warn!(model = %self.model, error = %err, "could not read model parameters");
                    Default::default()
                }
            }
        } else {
            Default::default()
        };

        Ok(ModelCapabilities {
            available,
            default_top_k: parameters.top_k.unwrap_or(self.fallback_top_k),
            default_temperature: parameters.temperature.unwrap_or(self.fallback_temperature),
        })
    }

    async fn create(&self, options: SessionOptions) -> Result<Arc<dyn LanguageModel>> {
        let transcript = options
            .initial_prompts
            .iter()
            .map(|turn| match turn.role {
                ChatRole::User => WireMessage::user(turn.content.as_str()),
                ChatRole::Assistant => WireMessage::assistant(turn.content.as_str()),
            })
            .collect();

        Ok(Arc::new(OllamaSession {
            client: Arc::clone(&self.client),
            model: self.model.clone(),
            system_prompt: options.system_prompt,
            sampling: SamplingOptions {
                top_k: options.top_k,
                temperature: options.temperature,
            },
            transcript: Mutex::new(transcript),
            destroyed: AtomicBool::new(false),
        }))
    }
}

/// Keeps the running transcript so each prompt continues the conversation
struct OllamaSession {
    client: Arc<OllamaClient>,
    model: String,
    system_prompt: String,
    sampling: SamplingOptions,
    transcript: Mutex<Vec<WireMessage>>,
    destroyed: AtomicBool,
}

#[async_trait]
impl LanguageModel for OllamaSession {
    async fn ready(&self, progress: &ProgressFn<'_>) -> Result<()> {
        self.client.pull(&self.model, progress).await
    }

    async fn prompt(&self, message: &str) -> Result<String> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(InquiraError::transport("session was destroyed"));
        }

        let mut messages = vec![WireMessage::system(self.system_prompt.as_str())];
        messages.extend(self.transcript.lock().await.iter().cloned());
        messages.push(WireMessage::user(message));

        let reply = self
            .client
            .chat(&self.model, &messages, Some(self.sampling))
            .await?;

        let mut transcript = self.transcript.lock().await;
        transcript.push(WireMessage::user(message));
        transcript.push(WireMessage::assistant(reply.as_str()));
        Ok(reply)
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatTurn;

    #[tokio::test]
    async fn test_destroyed_session_rejects_prompts() {
        let capability = OllamaLanguageModelCapability::new(
            Arc::new(OllamaClient::new("http://127.0.0.1:9")),
            "gemma3:4b",
            3,
            1.0,
        );
        let options = SessionOptions {
            system_prompt: "notes".to_string(),
            top_k: 3,
            temperature: 1.0,
            initial_prompts: vec![ChatTurn::user("q"), ChatTurn::assistant("a")],
        };
        let model = capability.create(options).await.expect("session");
        model.destroy();

        let err = model.prompt("again").await.expect_err("destroyed");
        assert!(matches!(err, InquiraError::Transport(_)));
    }
}
