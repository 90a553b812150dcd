use async_trait::async_trait;
use legal_core::completion::{CompletionBackend, CompletionError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http;

/// Calls a locally-hosted Ollama model via its native chat API.
///
/// Useful when documents must not leave the machine. One user message per
/// call; no conversation state is kept between calls.
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs: 300,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let request_body = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        info!(
            model = %self.model,
            base_url = %self.base_url,
            prompt_len = prompt.len(),
            "calling ollama chat API"
        );

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let client = http::client(self.timeout_secs)?;

        let response = match client.post(&url).json(&request_body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(timeout_secs = self.timeout_secs, "ollama request failed: {e}");
                return Err(http::send_error(e, self.timeout_secs));
            },
        };

        let response = http::check_status(response).await.map_err(|e| {
            warn!("ollama returned an error: {e}");
            e
        })?;

        let parsed: OllamaChatResponse = http::read_json(response, self.timeout_secs).await?;
        let output = parsed.message.content;
        if output.trim().is_empty() {
            return Err(CompletionError::Empty);
        }

        info!(output_len = output.len(), "ollama response received");
        Ok(output)
    }
}
