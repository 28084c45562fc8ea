//! Persistence for identities and statuses
//!
//! Two backends implement the same traits: [`PgStore`] for PostgreSQL and
//! [`MemoryStore`] for tests and database-less development runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Result, Status, User};

/// Default page size for status listings
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Identity store operations
///
/// Every lookup by username or email is a case-insensitive exact match.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new identity
    ///
    /// Fails with `CoreError::Conflict` if the username or email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get identity by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Get identity by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Whether any identity uses this username
    async fn username_exists(&self, username: &str) -> Result<bool>;

    /// Whether any identity uses this email
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Distinct identities whose username OR email equals `identifier`
    async fn find_by_login(&self, identifier: &str) -> Result<Vec<User>>;

    /// Record a successful login
    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Status listing filter
#[derive(Debug, Clone)]
pub struct StatusFilter {
    /// Only statuses owned by this identity
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of the content
    pub query: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            query: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Status store operations
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Persist a validated status
    async fn create_status(&self, status: &Status) -> Result<()>;

    /// Get status by ID
    async fn get_status(&self, id: Uuid) -> Result<Option<Status>>;

    /// List statuses, newest first
    async fn list_statuses(&self, filter: &StatusFilter) -> Result<Vec<Status>>;
}
