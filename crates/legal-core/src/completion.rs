use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single call to the AI completion service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("completion timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),

    #[error("completion service returned no text")]
    Empty,

    #[error("completion backend not configured: {0}")]
    NotConfigured(String),
}

/// Wire form of a [`CompletionError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl CompletionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "COMPLETION_TIMEOUT",
            Self::Transport(_) => "COMPLETION_TRANSPORT",
            Self::Status { .. } => "COMPLETION_STATUS",
            Self::Malformed(_) => "COMPLETION_MALFORMED",
            Self::Empty => "COMPLETION_EMPTY",
            Self::NotConfigured(_) => "COMPLETION_NOT_CONFIGURED",
        }
    }

    /// Text placed where the answer would have been.
    pub fn user_message(&self) -> String {
        format!("AI Error: {self}")
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// A hosted or local model that turns a prompt into text.
///
/// Implementations make exactly one request per call. Timeouts and output
/// capping are applied by [`crate::pipeline::Pipeline::complete`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short backend name for logs and `/health` (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model identifier sent to the service.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;
}
