//! Application error handling
//!
//! `ApiError` is the typed error taxonomy of the auth boundary. Each kind
//! maps to exactly one status code, and every kind renders `{"error": message}`.
//! Server faults are logged in full and reach the client only as a generic
//! message.
//!
//! `envelope_response` builds the `{"status", "statusCode", "message"}` body of
//! the process-wide fallback used for failures no handler converted.

use crate::repositories::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shopfront_shared::{ErrorBody, ErrorEnvelope};
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

/// Message shown for every 5xx response
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Credential store unavailable")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::DuplicateEmail => "duplicate_email",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::InvalidToken => "invalid_token",
            ApiError::UserNotFound => "user_not_found",
            ApiError::StoreUnavailable(_) => "store_unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    /// Message safe to send to the client
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::Unavailable(e) => ApiError::StoreUnavailable(e),
            StoreError::Corrupt(msg) => ApiError::Internal(anyhow::anyhow!("Corrupt user record: {}", msg)),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    /// Flatten field errors into one message, ordered by field name
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{}: {}", field, err.code),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::StoreUnavailable(err) => error!(kind = self.kind(), "Store error: {:?}", err),
            ApiError::Internal(err) => error!(kind = self.kind(), "Internal error: {:?}", err),
            _ => warn!(kind = self.kind(), status = status.as_u16(), "{}", self),
        }

        let body = Json(ErrorBody {
            error: self.public_message(),
        });

        (status, body).into_response()
    }
}

/// Uniform envelope for failures that escaped the handlers
pub fn envelope_response(status: StatusCode, message: impl Into<String>) -> Response {
    let message = if status.is_server_error() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message.into()
    };

    let body = Json(ErrorEnvelope {
        status: "error".to_string(),
        status_code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
