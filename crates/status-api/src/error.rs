//! API error handling
//!
//! Validation failures are returned as field-keyed message lists
//! (`{"email": [...], "non_field_errors": [...]}`); every other error
//! carries a single `detail` message.
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use status_core::{CoreError, ValidationErrors};
use utoipa::ToSchema;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;

/// Message returned when a protected route is called anonymously
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Message returned when an authenticated caller hits an anonymous-only route
pub const ALREADY_AUTHENTICATED: &str = "You are already authenticated";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Field-keyed validation messages (400)
    Validation(ValidationErrors),
    BadRequest(String),
    /// Request body is not JSON (415)
    UnsupportedMediaType(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
    Database(String),
}

impl AppError {
    pub fn not_authenticated() -> Self {
        AppError::Unauthorized(NOT_AUTHENTICATED.to_string())
    }

    pub fn already_authenticated() -> Self {
        AppError::BadRequest(ALREADY_AUTHENTICATED.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            AppError::Validation(errors) => return (status, Json(errors)).into_response(),
            AppError::BadRequest(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => ApiError::new(msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::new("Internal server error")
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ApiError::new("Internal server error")
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Field messages from a `#[derive(Validate)]` request body
pub fn field_messages(errors: &validator::ValidationErrors) -> ValidationErrors {
    let mut out = ValidationErrors::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            out.add(field.to_string(), message);
        }
    }
    out
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_messages(&errors))
    }
}

/// Malformed bodies answer with `detail` like every other error
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::UnsupportedMediaType(rejection.body_text())
            }
            _ => AppError::BadRequest(rejection.body_text()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(e) => AppError::Internal(format!("Failed to sign token: {e}")),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::Validation(errors) => AppError::Validation(errors),
            // Lost a race against a concurrent insert of the same identity
            CoreError::Conflict(_) => AppError::Validation(ValidationErrors::non_field(
                "A user with that username or email already exists.",
            )),
            CoreError::DatabaseError(msg) => AppError::Database(msg),
            CoreError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            CoreError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_shape() {
        let mut errors = ValidationErrors::field("email", "User with this email already exists");
        errors.add("non_field_errors", "Passwords must match");

        let response = AppError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["email"][0], "User with this email already exists");
        assert_eq!(json["non_field_errors"][0], "Passwords must match");
    }

    #[tokio::test]
    async fn test_detail_error_shape() {
        let response = AppError::Unauthorized("Invalid password".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["detail"], "Invalid password");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Database("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["detail"], "Internal server error");
    }

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            AppError::from(CoreError::NotFound("user".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(CoreError::Conflict("dup".into())),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(CoreError::DatabaseError("down".into())),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert!(matches!(
            AppError::from(JwtError::ExpiredToken),
            AppError::Unauthorized(msg) if msg == "Signature has expired."
        ));
        assert!(matches!(
            AppError::from(JwtError::Revoked),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_already_authenticated() {
        let err = AppError::already_authenticated();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::BadRequest(msg) if msg == ALREADY_AUTHENTICATED));
    }
}
