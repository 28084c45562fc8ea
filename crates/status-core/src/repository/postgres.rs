//! PostgreSQL store
//!
//! Provides identity and status persistence using SQLx and PostgreSQL.
//! Case-insensitive uniqueness is backed by `LOWER(...)` unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use super::{StatusFilter, StatusRepository, UserRepository};
use crate::{CoreError, Result, Status, User};

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("Migration failed: {e}")))
    }

    /// Round-trip check used by readiness probes
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            date_joined: row.date_joined,
            last_login: row.last_login,
        }
    }
}

/// Status row from database
#[derive(Debug, FromRow)]
struct StatusRow {
    id: Uuid,
    user_id: Uuid,
    content: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<StatusRow> for Status {
    fn from(row: StatusRow) -> Self {
        Status {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, date_joined, last_login";
const STATUS_COLUMNS: &str = "id, user_id, content, image, created_at";

fn db_error(context: &str, err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return CoreError::Conflict(format!("{context}: {db_err}"));
        }
    }
    CoreError::DatabaseError(format!("{context}: {err}"))
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, date_joined, last_login)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.date_joined)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user", e))?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to get user", e))?;

        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find user", e))?;

        Ok(row.map(User::from))
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check username", e))?;

        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to check email", e))?;

        Ok(exists)
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT DISTINCT {USER_COLUMNS}
            FROM users
            WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)
            "#
        ))
        .bind(identifier)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to resolve login", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update last login", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusRepository for PgStore {
    async fn create_status(&self, status: &Status) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO statuses (id, user_id, content, image, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(status.id)
        .bind(status.user_id)
        .bind(&status.content)
        .bind(&status.image)
        .bind(status.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create status", e))?;

        Ok(())
    }

    async fn get_status(&self, id: Uuid) -> Result<Option<Status>> {
        let row: Option<StatusRow> =
            sqlx::query_as(&format!("SELECT {STATUS_COLUMNS} FROM statuses WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to get status", e))?;

        Ok(row.map(Status::from))
    }

    async fn list_statuses(&self, filter: &StatusFilter) -> Result<Vec<Status>> {
        let rows: Vec<StatusRow> = sqlx::query_as(&format!(
            r#"
            SELECT {STATUS_COLUMNS}
            FROM statuses
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR content ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.user_id)
        .bind(&filter.query)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list statuses", e))?;

        Ok(rows.into_iter().map(Status::from).collect())
    }
}
