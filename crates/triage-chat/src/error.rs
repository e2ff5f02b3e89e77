//! Error types for dialogue routing and generation.

use triage_core::TriageError;

/// Failures of the external generative-text service.
///
/// The router treats every variant the same way (deterministic fallback);
/// the distinction only matters for logs.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generative service is not configured")]
    Unavailable,
    #[error("generative service timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("generative service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generative service returned no text")]
    EmptyResponse,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from router construction and consultation sessions.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("consultation has no patient messages")]
    NoPatientTurns,
    #[error("a specialist switch is pending: {0}")]
    ReferralPending(String),
    #[error("consultation already reported")]
    AlreadyReported,
}

impl From<TriageError> for ChatError {
    fn from(err: TriageError) -> Self {
        ChatError::Config(err.to_string())
    }
}

impl From<ChatError> for TriageError {
    fn from(err: ChatError) -> Self {
        TriageError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        assert_eq!(
            GenerationError::Unavailable.to_string(),
            "generative service is not configured"
        );
        assert_eq!(
            GenerationError::Timeout(20).to_string(),
            "generative service timed out after 20s"
        );
        let err = GenerationError::Status {
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(err.to_string(), "generative service returned 429: quota");
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::NoPatientTurns.to_string(),
            "consultation has no patient messages"
        );
        assert_eq!(
            ChatError::ReferralPending("eye".to_string()).to_string(),
            "a specialist switch is pending: eye"
        );
    }

    #[test]
    fn test_chat_error_from_triage_error() {
        let err: ChatError = TriageError::Config("duplicate key".to_string()).into();
        assert!(matches!(err, ChatError::Config(_)));
        assert!(err.to_string().contains("duplicate key"));
    }
}
