//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use chatrelay_types::error::{ChatError, RepositoryError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat and session errors from the core services.
    Chat(ChatError),
    /// Session id that does not name a stored session.
    SessionNotFound,
    /// Malformed request body.
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Chat(ChatError::from(e))
    }
}

impl AppError {
    /// Status code and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Chat(ChatError::InvalidInput(_)) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Chat(ChatError::NotFound) | AppError::SessionNotFound => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND")
            }
            AppError::Chat(ChatError::NothingToRegenerate) => {
                (StatusCode::CONFLICT, "NOTHING_TO_REGENERATE")
            }
            AppError::Chat(ChatError::Configuration(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            AppError::Chat(ChatError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            AppError::Chat(ChatError::Provider(_) | ChatError::ProviderTimeout(_)) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(ChatError::NotFound) | AppError::SessionNotFound => {
                "Session not found".to_string()
            }
            AppError::Chat(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, error = %message, "Request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_errors_map_to_documented_statuses() {
        let cases = [
            (ChatError::InvalidInput("empty".into()), StatusCode::BAD_REQUEST),
            (ChatError::NotFound, StatusCode::NOT_FOUND),
            (ChatError::NothingToRegenerate, StatusCode::CONFLICT),
            (
                ChatError::Configuration("no url".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ChatError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ChatError::Provider("down".into()), StatusCode::BAD_GATEWAY),
            (ChatError::ProviderTimeout(30), StatusCode::BAD_GATEWAY),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_repository_not_found_is_session_not_found() {
        let err = AppError::from(RepositoryError::NotFound);
        assert_eq!(
            err.status_and_code(),
            (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND")
        );
    }

    #[test]
    fn test_malformed_session_id_is_not_found() {
        let err = crate::http::handlers::parse_session_id("not-a-uuid").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
