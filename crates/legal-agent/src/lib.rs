pub mod anthropic;
pub mod gemini;
mod http;
pub mod ollama;

use std::sync::Arc;

use legal_core::completion::CompletionBackend;
use legal_core::config::Config;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

/// Build the backend named by `config.backend`. Unknown names fall back to Gemini.
pub fn from_config(config: &Config) -> Arc<dyn CompletionBackend> {
    let timeout = config.completion_timeout_s;
    match config.backend.as_str() {
        "ollama" => Arc::new(
            OllamaBackend::new(config.ollama_url.clone(), config.model.clone())
                .with_timeout(timeout),
        ),
        "anthropic" => Arc::new(
            AnthropicBackend::new(config.anthropic_api_key.clone(), config.model.clone())
                .with_timeout(timeout),
        ),
        other => {
            if other != "gemini" {
                tracing::warn!(backend = other, "unknown BACKEND, using gemini");
            }
            Arc::new(
                GeminiBackend::new(config.google_api_key.clone(), config.model.clone())
                    .with_base_url(config.gemini_base_url.clone())
                    .with_timeout(timeout),
            )
        },
    }
}
