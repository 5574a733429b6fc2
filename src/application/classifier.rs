//! Normalizes every failure into an [`AppError`].
//!
//! Raw errors are first reduced to a [`Failure`], then mapped by an
//! exhaustive match:
//!
//! | failure            | code                                   |
//! |--------------------|----------------------------------------|
//! | HTTP 400           | `VALIDATION_ERROR`                     |
//! | HTTP 401 / 403     | `UNAUTHORIZED` / `FORBIDDEN`           |
//! | HTTP 404 / 409     | `NOT_FOUND` / `CONFLICT`               |
//! | HTTP 422           | `UNPROCESSABLE_ENTITY` (with details)  |
//! | HTTP 500           | `SERVER_ERROR`                         |
//! | other HTTP status  | `API_ERROR`                            |
//! | local validation   | `VALIDATION_ERROR`                     |
//! | network            | `NETWORK_ERROR`                        |
//! | timeout            | `TIMEOUT_ERROR`                        |
//! | anything else      | `UNKNOWN_ERROR`                        |

use crate::domain::app_error::{AppError, ErrorCode};
use crate::domain::error::Failure;
use serde_json::Value;
use tracing::{error, warn};

pub const MSG_BAD_REQUEST: &str = "Invalid request. Please check your input.";
pub const MSG_UNAUTHORIZED: &str = "Your session has expired. Please log in again.";
pub const MSG_FORBIDDEN: &str = "You do not have permission to perform this action.";
pub const MSG_NOT_FOUND: &str = "The requested resource was not found.";
pub const MSG_CONFLICT: &str = "This resource conflicts with an existing one.";
pub const MSG_UNPROCESSABLE: &str = "Validation failed.";
pub const MSG_SERVER: &str = "Server error. Please try again later.";
pub const MSG_NETWORK: &str = "Network error. Please check your connection.";
pub const MSG_TIMEOUT: &str = "The request timed out. Please try again.";
pub const MSG_UNKNOWN: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `error` and log it under `context`. Never fails.
    pub fn handle(&self, error: impl Into<Failure>, context: Option<&str>) -> AppError {
        let failure = error.into();
        let context = context.unwrap_or("unspecified");
        let app_error = self.classify(&failure);

        match app_error.code {
            ErrorCode::ServerError | ErrorCode::UnknownError => {
                error!(context, code = %app_error.code, %failure, "request failed")
            }
            _ => warn!(context, code = %app_error.code, %failure, "request failed"),
        }

        app_error
    }

    /// The mapping itself, without logging.
    pub fn classify(&self, failure: &Failure) -> AppError {
        match failure {
            Failure::Http { status, body } => classify_status(*status, body.as_ref()),
            Failure::Validation(v) => AppError::new(ErrorCode::ValidationError, v.message.clone())
                .with_field(v.field.clone())
                .with_details(v.details.clone()),
            Failure::Network(_) => AppError::new(ErrorCode::NetworkError, MSG_NETWORK),
            Failure::Timeout => AppError::new(ErrorCode::TimeoutError, MSG_TIMEOUT),
            Failure::Unknown(message) => AppError::new(
                ErrorCode::UnknownError,
                message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(MSG_UNKNOWN),
            ),
        }
    }

    pub fn is_retryable_error(&self, error: &AppError) -> bool {
        error.code.is_retryable()
    }
}

fn classify_status(status: u16, body: Option<&Value>) -> AppError {
    let server_message = body.and_then(body_message);
    let message_or = |fallback: &str| server_message.clone().unwrap_or_else(|| fallback.to_string());
    let errors = body.and_then(|b| b.get("errors")).cloned();

    let app_error = match status {
        400 => AppError::new(ErrorCode::ValidationError, message_or(MSG_BAD_REQUEST))
            .with_details(errors),
        401 => AppError::new(ErrorCode::Unauthorized, MSG_UNAUTHORIZED),
        403 => AppError::new(ErrorCode::Forbidden, MSG_FORBIDDEN),
        404 => AppError::new(ErrorCode::NotFound, message_or(MSG_NOT_FOUND)),
        409 => AppError::new(ErrorCode::Conflict, message_or(MSG_CONFLICT)),
        422 => AppError::new(ErrorCode::UnprocessableEntity, message_or(MSG_UNPROCESSABLE))
            .with_details(errors.or_else(|| body.cloned())),
        500 => AppError::new(ErrorCode::ServerError, MSG_SERVER),
        other => AppError::new(
            ErrorCode::ApiError,
            message_or(&format!("Request failed with status {}", other)),
        ),
    };
    app_error.with_status(status)
}

/// `message` (a string or a list of strings) or `error` from an error body.
fn body_message(body: &Value) -> Option<String> {
    match body.get("message") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if !parts.is_empty() {
                return Some(parts.join("; "));
            }
        }
        _ => {}
    }
    body.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
