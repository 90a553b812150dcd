use std::time::Duration;

use legal_core::completion::CompletionError;

/// Longest error body kept in a `CompletionError::Status`.
const MAX_ERROR_BODY: usize = 500;

pub(crate) fn client(timeout_secs: u64) -> Result<reqwest::Client, CompletionError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CompletionError::Transport(e.to_string()))
}

pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout { secs: timeout_secs }
    } else {
        CompletionError::Transport(e.to_string())
    }
}

/// Turn a non-2xx response into `CompletionError::Status`, passing 2xx through.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, CompletionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(CompletionError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Read the whole body, then decode it. A body that stalls past the client
/// timeout is a `Timeout`; only a body that arrives but does not decode is
/// `Malformed`.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<T, CompletionError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| send_error(e, timeout_secs))?;
    serde_json::from_slice(&bytes).map_err(|e| CompletionError::Malformed(e.to_string()))
}
