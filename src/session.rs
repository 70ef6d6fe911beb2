//! Lifetime of the single conversational session.
//!
//! The session is created lazily with the first context it is asked for and
//! reused for every later turn until it is destroyed. A later request with a
//! different context does not change the system prompt of an open session.

use crate::capability::{Gateway, LanguageModel};
use crate::error::{InquiraError, Result};
use crate::types::ChatTurn;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

/// Observable state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Absent,
    Creating,
    Ready,
}

enum SessionState {
    Absent,
    Ready {
        model: Arc<dyn LanguageModel>,
        system_prompt: String,
    },
}

/// Owns the session handle; injected into the router
pub struct SessionManager {
    // Held across creation so concurrent callers wait for one session
    state: Mutex<SessionState>,
    status: watch::Sender<SessionStatus>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::Absent);
        Self {
            state: Mutex::new(SessionState::Absent),
            status,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Returns the open session, creating it with `context` as system prompt if absent
    pub async fn ensure_session(
        &self,
        gateway: &Gateway,
        context: &str,
        history: &[ChatTurn],
    ) -> Result<Arc<dyn LanguageModel>> {
        let mut state = self.state.lock().await;
        if let SessionState::Ready {
            model,
            system_prompt,
        } = &*state
        {
            if system_prompt != context {
                debug!("reusing open session; new context is ignored");
            }
            return Ok(Arc::clone(model));
        }

        self.status.send_replace(SessionStatus::Creating);
        match gateway.open_session(context, history).await {
            Ok(model) => {
                *state = SessionState::Ready {
                    model: Arc::clone(&model),
                    system_prompt: context.to_string(),
                };
                self.status.send_replace(SessionStatus::Ready);
                info!(context_chars = context.chars().count(), "conversation session created");
                Ok(model)
            }
            Err(err) => {
                self.status.send_replace(SessionStatus::Absent);
                Err(err)
            }
        }
    }

    /// Sends `message` to the open session
    pub async fn prompt(&self, message: &str) -> Result<String> {
        let model = {
            let state = self.state.lock().await;
            match &*state {
                SessionState::Ready { model, .. } => Arc::clone(model),
                SessionState::Absent => return Err(InquiraError::NoSession),
            }
        };
        model.prompt(message).await
    }

    /// Releases the session; destroying an absent session is a no-op
    pub async fn destroy(&self) {
        let mut state = self.state.lock().await;
        if let SessionState::Ready { model, .. } =
            std::mem::replace(&mut *state, SessionState::Absent)
        {
            model.destroy();
            info!("conversation session destroyed");
        }
        self.status.send_replace(SessionStatus::Absent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Availability;
    use crate::capability::fakes::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn manager_and_gateway(
        language_model: FakeLanguageModelCapability,
    ) -> (Arc<SessionManager>, Arc<Gateway>) {
        (
            Arc::new(SessionManager::new()),
            Arc::new(gateway(
                FakeSummarizerCapability::new(Availability::Ready),
                language_model,
            )),
        )
    }

    #[tokio::test]
    async fn test_prompt_without_session_fails() {
        let manager = SessionManager::new();
        let err = manager.prompt("hello").await.expect_err("no session");
        assert_eq!(err, InquiraError::NoSession);
    }

    #[tokio::test]
    async fn test_context_is_fixed_for_session_lifetime() {
        let (manager, gateway) =
            manager_and_gateway(FakeLanguageModelCapability::new(Availability::Ready));

        manager.ensure_session(&gateway, "first", &[]).await.expect("session");
        manager.ensure_session(&gateway, "second", &[]).await.expect("session");

        assert_eq!(manager.prompt("q").await.expect("reply"), "[first] q");
        assert_eq!(manager.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_racing_callers_share_one_session() {
        let mut language_model = FakeLanguageModelCapability::new(Availability::Ready);
        language_model.create_delay = Duration::from_millis(50);
        let counters = Arc::clone(&language_model.counters);
        let (manager, gateway) = manager_and_gateway(language_model);

        let first = {
            let (manager, gateway) = (Arc::clone(&manager), Arc::clone(&gateway));
            tokio::spawn(async move { manager.ensure_session(&gateway, "ctx", &[]).await.is_ok() })
        };
        let second = {
            let (manager, gateway) = (Arc::clone(&manager), Arc::clone(&gateway));
            tokio::spawn(async move { manager.ensure_session(&gateway, "ctx", &[]).await.is_ok() })
        };

        assert!(first.await.expect("join"));
        assert!(second.await.expect("join"));
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_allows_new_context() {
        let language_model = FakeLanguageModelCapability::new(Availability::Ready);
        let counters = Arc::clone(&language_model.counters);
        let (manager, gateway) = manager_and_gateway(language_model);

        manager.destroy().await;
        manager.ensure_session(&gateway, "old", &[]).await.expect("session");
        manager.destroy().await;
        manager.destroy().await;
        assert_eq!(manager.status(), SessionStatus::Absent);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

        manager.ensure_session(&gateway, "new", &[]).await.expect("session");
        assert_eq!(manager.prompt("q").await.expect("reply"), "[new] q");
    }

    #[tokio::test]
    async fn test_unavailable_model_leaves_session_absent() {
        let (manager, gateway) =
            manager_and_gateway(FakeLanguageModelCapability::new(Availability::Unavailable));

        let result = manager.ensure_session(&gateway, "ctx", &[]).await;
        assert!(matches!(result, Err(InquiraError::CapabilityUnavailable { .. })));
        assert_eq!(manager.status(), SessionStatus::Absent);
    }
}
