//! Error types for AskRC.
//!
//! One enum covers every failure category of the question-answering
//! pipeline. Bias findings and ungrounded answers are *not* errors; they are
//! regular pipeline outcomes.

use thiserror::Error;

/// Unified error type for AskRC.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search index transport, auth or protocol failure
    #[error("Retrieval failure: {0}")]
    Retrieval(String),

    /// Generation backend asked us to slow down (HTTP 429 and friends)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other generation backend failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Alert delivery failures. Never surfaced by the pipeline.
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error is a throttling signal worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_detection() {
        assert!(AppError::RateLimited("slow down".to_string()).is_rate_limited());
        assert!(!AppError::Llm("boom".to_string()).is_rate_limited());
        assert!(!AppError::Retrieval("down".to_string()).is_rate_limited());
    }

    #[test]
    fn test_display_messages() {
        let err = AppError::Retrieval("401 Unauthorized".to_string());
        assert_eq!(err.to_string(), "Retrieval failure: 401 Unauthorized");

        let err = AppError::Other("plain".to_string());
        assert_eq!(err.to_string(), "plain");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
