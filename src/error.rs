//! Error types shared by the capability gateway, session manager, note store
//! and command router.

use thiserror::Error;

/// Typed failures of the research core.
///
/// `EmptyInput` is raised by the hub before any request is sent.
/// `CapabilityUnavailable` and `Transport` are turned into `{error}` replies by
/// the router and never cross the message boundary as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InquiraError {
    /// A local AI capability is missing or disabled
    #[error("{capability} is not available in this environment")]
    CapabilityUnavailable { capability: &'static str },

    /// Nothing to act on (no notes, no message, no selection)
    #[error("{0}")]
    EmptyInput(String),

    /// A call into a capability or the router channel failed
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A prompt was issued while no session is open
    #[error("No conversation session is open")]
    NoSession,

    /// Reading or writing the storage file failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl InquiraError {
    pub fn unavailable(capability: &'static str) -> Self {
        Self::CapabilityUnavailable { capability }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }
}

impl From<std::io::Error> for InquiraError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for InquiraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for InquiraError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InquiraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_capability() {
        let err = InquiraError::unavailable("Summarizer");
        assert_eq!(err.to_string(), "Summarizer is not available in this environment");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(InquiraError::from(io), InquiraError::Storage(_)));
    }
}
