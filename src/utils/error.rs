use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read notes from '{path}': {message}")]
    Source { path: String, message: String },

    #[error("No readable notes found in '{directory}'")]
    NoNotesFound { directory: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM API returned status {status}: {body}")]
    LlmApi { status: u16, body: String },

    #[error("Order extraction failed: {message}")]
    Extraction { message: String },

    #[error("Order delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Operation cancelled or timed out: {context}")]
    Cancelled { context: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Worker cannot run from state {state:?}")]
    InvalidState { state: crate::core::worker::WorkerState },
}

/// Coarse classification used in logs and run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Source,
    Extraction,
    Delivery,
    Transport,
    Cancelled,
    Config,
    Internal,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Source { .. } | PipelineError::NoNotesFound { .. } => ErrorKind::Source,
            PipelineError::LlmApi { .. }
            | PipelineError::Extraction { .. }
            | PipelineError::Serialization(_) => ErrorKind::Extraction,
            PipelineError::Delivery { .. } => ErrorKind::Delivery,
            PipelineError::Http(e) if e.is_timeout() => ErrorKind::Cancelled,
            PipelineError::Http(_) => ErrorKind::Transport,
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
            PipelineError::ConfigError { .. }
            | PipelineError::ConfigValidationError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::MissingConfigError { .. } => ErrorKind::Config,
            PipelineError::Io(_) | PipelineError::InvalidState { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    pub fn cancelled(context: impl Into<String>) -> Self {
        PipelineError::Cancelled {
            context: context.into(),
        }
    }

    /// Converts a reqwest error, folding client timeouts into `Cancelled`.
    pub fn from_request(err: reqwest::Error, context: &str) -> Self {
        if err.is_timeout() {
            PipelineError::cancelled(format!("{}: {}", context, err))
        } else {
            PipelineError::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_classify_by_stage() {
        let delivery = PipelineError::Delivery {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(delivery.kind(), ErrorKind::Delivery);

        let llm = PipelineError::LlmApi {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(llm.kind(), ErrorKind::Extraction);

        let empty = PipelineError::NoNotesFound {
            directory: "./notes".to_string(),
        };
        assert_eq!(empty.kind(), ErrorKind::Source);
    }

    #[test]
    fn test_cancelled_is_cancellation() {
        let err = PipelineError::cancelled("posting order");
        assert!(err.is_cancellation());
        assert!(err.to_string().contains("posting order"));

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!PipelineError::from(parse).is_cancellation());
    }
}
