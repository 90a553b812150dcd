use async_trait::async_trait;
use legal_core::completion::{CompletionBackend, CompletionError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API, single user turn.
pub struct AnthropicBackend {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_tokens: 2048,
            timeout_secs: 60,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessagesResponse {
    fn into_text(self) -> Result<String, CompletionError> {
        let text: String = self
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if text.trim().is_empty() {
            Err(CompletionError::Empty)
        } else {
            Ok(text)
        }
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::NotConfigured("ANTHROPIC_API_KEY is not set".into()));
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        info!(model = %self.model, prompt_len = prompt.len(), "calling anthropic messages API");

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let client = http::client(self.timeout_secs)?;
        let response = match client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(timeout_secs = self.timeout_secs, "anthropic request failed: {e}");
                return Err(http::send_error(e, self.timeout_secs));
            },
        };

        let response = http::check_status(response).await.map_err(|e| {
            warn!("anthropic returned an error: {e}");
            e
        })?;

        let parsed: MessagesResponse = http::read_json(response, self.timeout_secs).await?;
        let text = parsed.into_text()?;
        info!(output_len = text.len(), "anthropic response received");
        Ok(text)
    }
}
