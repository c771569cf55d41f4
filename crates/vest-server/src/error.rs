//! HTTP error type and its JSON body.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use vest_auth::AuthError;
use vest_db::error::DatabaseError;
use vest_mail::MailError;

/// Failures while assembling the application at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("mail: {0}")]
    Mail(#[from] MailError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Every failure a handler can return.
///
/// Rendered as `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("admin role required")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("insufficient funds: requested {requested_cents}, available {available_cents}")]
    InsufficientFunds {
        requested_cents: i64,
        available_cents: i64,
    },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("unsupported file type '{0}'")]
    UnsupportedMediaType(String),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::Validation(_) => "validation",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::Internal(_) => "internal",
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, .. } => Self::not_found(entity),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            DatabaseError::InvalidState(msg) => Self::InvalidState(msg),
            DatabaseError::Validation(msg) => Self::Validation(msg),
            DatabaseError::InsufficientFunds {
                requested_cents,
                available_cents,
            } => Self::InsufficientFunds {
                requested_cents,
                available_cents,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword(msg) => Self::Validation(format!("password {msg}")),
            AuthError::InvalidToken(_) => Self::Unauthorized("invalid access token".into()),
            AuthError::TokenExpired => Self::Unauthorized("access token expired".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("request body too large".into())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("request body too large".into())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("io: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn body_has_code_and_message() {
        let response = ApiError::not_found("payment").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"error": {"code": "not_found", "message": "payment not found"}})
        );
    }

    #[test]
    fn database_errors_map_to_statuses() {
        let cases = [
            (DatabaseError::Conflict("dup".into()), StatusCode::CONFLICT),
            (DatabaseError::InvalidState("closed".into()), StatusCode::CONFLICT),
            (DatabaseError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                DatabaseError::InsufficientFunds {
                    requested_cents: 2,
                    available_cents: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DatabaseError::NoResult, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(DatabaseError::Query("SELECT secret".into()));
        assert_eq!(err.to_string(), "internal server error");
    }
}
