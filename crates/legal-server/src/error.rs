use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use legal_core::extract::TextExtractionError;
use serde::Serialize;
use thiserror::Error;

/// Request failures that are reported with a non-2xx status.
///
/// Completion failures are not here: they travel inside a 200 body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("could not extract text: {0}")]
    Extraction(#[from] TextExtractionError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "TEXT_EXTRACTION_FAILED"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Multipart(e) => match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
                _ => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            },
        };

        tracing::warn!(status = status.as_u16(), code, "request rejected: {self}");

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
