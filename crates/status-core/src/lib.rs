//! Status Core - Domain models, validation, and persistence
//!
//! This crate defines the core abstractions used by the status service:
//! - Identity and status records
//! - Request validation rules and DRF-style validation errors
//! - Common error types
//! - Repository traits with PostgreSQL and in-memory backends
//! - Configuration management

pub mod config;
pub mod repository;
pub mod validation;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use repository::{MemoryStore, PgStore, StatusFilter, StatusRepository, UserRepository};
pub use validation::{ValidationErrors, NON_FIELD_ERRORS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for status service operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================================================
// Identity
// ============================================================================

/// A registered identity
///
/// `username` and `email` are unique under case-insensitive comparison.
/// The password is only ever held as an Argon2id PHC string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new identity with a freshly generated id
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    /// Case-insensitive username comparison
    pub fn username_matches(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }

    /// Case-insensitive email comparison
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

// ============================================================================
// Status
// ============================================================================

/// A user-authored post carrying text, an image reference, or both
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub id: Uuid,
    /// Owner of the status
    pub user_id: Uuid,
    pub content: Option<String>,
    /// Image reference (upload path or URL)
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Status {
    /// Build a status from an entry that already passed validation
    pub fn new(user_id: Uuid, entry: validation::StatusEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            content: entry.content,
            image: entry.image,
            created_at: Utc::now(),
        }
    }
}
