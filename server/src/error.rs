use audio_core::AudioError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lesson_core::GenerationError;
use serde::Serialize;
use thiserror::Error;

/// The one message a visitor sees when generation fails.
pub const GENERATION_NOTICE: &str = "The spirits are quiet today. Please try again.";

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Audio(AudioError::MalformedAudioData(msg)) => {
                tracing::warn!("Rejected audio payload: {}", msg);
                (StatusCode::BAD_REQUEST, format!("Malformed audio data: {msg}"))
            }
            ApiError::Audio(e) => {
                tracing::error!("Audio error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Generation(e) => {
                tracing::error!("Generation error: {}", e);
                (StatusCode::BAD_GATEWAY, GENERATION_NOTICE.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(status(ApiError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AudioError::MalformedAudioData("odd".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AudioError::SynthesisFailure("boom".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(GenerationError::Timeout(5, "speech").into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
    }
}
