use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::error,
};

use studyhall_chat::ChatError;

/// HTTP-facing failure type. Every variant renders as a structured
/// `{"error": message}` payload.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Chat(ChatError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Chat(ChatError::NotFound) => StatusCode::NOT_FOUND,
            Self::Chat(ChatError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal detail stays in the logs, not the response.
        let message = match &self {
            Self::Chat(ChatError::Persistence(e)) => {
                error!(error = %e, "persistence failure");
                "internal server error".to_string()
            },
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
