use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::portal::SessionError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// A portal run failed. Carries the run log so the caller sees how far
    /// the session got.
    #[error("{source}")]
    Session {
        #[source]
        source: SessionError,
        log: Vec<String>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InputError,
    SessionUnavailable,
    VerificationChallenge,
    AuthenticationFailed,
    ControlNotFound,
    DownloadNotCaptured,
    Timeout,
    BrowserError,
    Unauthorized,
    NotFound,
    DatabaseError,
    Internal,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl ApiError {
    pub fn session(source: SessionError, log: Vec<String>) -> Self {
        ApiError::Session { source, log }
    }

    fn code_and_status(&self) -> (ErrorCode, StatusCode) {
        match self {
            ApiError::Unauthorized => (ErrorCode::Unauthorized, StatusCode::UNAUTHORIZED),
            ApiError::BadRequest(_) => (ErrorCode::InputError, StatusCode::BAD_REQUEST),
            ApiError::NotFound(_) => (ErrorCode::NotFound, StatusCode::NOT_FOUND),
            ApiError::Database(_) => (ErrorCode::DatabaseError, StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal(_) => (ErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Session { source, .. } => match source {
                SessionError::Input(_) => (ErrorCode::InputError, StatusCode::BAD_REQUEST),
                SessionError::SessionUnavailable(_) => {
                    (ErrorCode::SessionUnavailable, StatusCode::PRECONDITION_FAILED)
                }
                SessionError::VerificationChallenge(_) => {
                    (ErrorCode::VerificationChallenge, StatusCode::FORBIDDEN)
                }
                SessionError::AuthenticationFailed(_) => {
                    (ErrorCode::AuthenticationFailed, StatusCode::UNAUTHORIZED)
                }
                SessionError::ControlNotFound(_) => {
                    (ErrorCode::ControlNotFound, StatusCode::BAD_GATEWAY)
                }
                SessionError::DownloadNotCaptured(_) => {
                    (ErrorCode::DownloadNotCaptured, StatusCode::BAD_GATEWAY)
                }
                SessionError::Timeout { .. } => (ErrorCode::Timeout, StatusCode::GATEWAY_TIMEOUT),
                SessionError::Browser(_) => {
                    (ErrorCode::BrowserError, StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();
        let message = self.to_string();
        let log = match self {
            ApiError::Session { log, .. } => log,
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            ok: false,
            error: ErrorBody { code, message },
            log,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_map_to_codes_and_statuses() {
        let cases = [
            (
                SessionError::Input("bad".into()),
                ErrorCode::InputError,
                StatusCode::BAD_REQUEST,
            ),
            (
                SessionError::SessionUnavailable("gone".into()),
                ErrorCode::SessionUnavailable,
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                SessionError::VerificationChallenge("captcha".into()),
                ErrorCode::VerificationChallenge,
                StatusCode::FORBIDDEN,
            ),
            (
                SessionError::AuthenticationFailed("denied".into()),
                ErrorCode::AuthenticationFailed,
                StatusCode::UNAUTHORIZED,
            ),
            (
                SessionError::ControlNotFound("no button".into()),
                ErrorCode::ControlNotFound,
                StatusCode::BAD_GATEWAY,
            ),
            (
                SessionError::DownloadNotCaptured("silent click".into()),
                ErrorCode::DownloadNotCaptured,
                StatusCode::BAD_GATEWAY,
            ),
            (
                SessionError::timeout("navigation", "stuck"),
                ErrorCode::Timeout,
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, code, status) in cases {
            let (got_code, got_status) = ApiError::session(err, vec![]).code_and_status();
            assert_eq!(got_code, code);
            assert_eq!(got_status, status);
        }
    }

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::DownloadNotCaptured).unwrap();
        assert_eq!(json, "\"DOWNLOAD_NOT_CAPTURED\"");
    }
}
