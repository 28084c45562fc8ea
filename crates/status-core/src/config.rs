//! Status Service Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token and session settings
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

fn parse_var<T: FromStr>(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match vars(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Apply every variable present in `vars` on top of `self`
    pub fn with_vars(mut self, vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Server
        if let Some(host) = vars("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&vars, "API_PORT")? {
            self.server.port = port;
        }
        if let Some(origins) = vars("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // PostgreSQL
        if let Some(url) = vars("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(size) = parse_var(&vars, "DATABASE_POOL_SIZE")? {
            self.database.pool_size = size;
        }

        // Auth
        if let Some(secret) = vars("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = vars("JWT_ISSUER") {
            self.auth.jwt_issuer = issuer;
        }
        if let Some(secs) = parse_var(&vars, "JWT_EXPIRATION_SECS")? {
            self.auth.jwt_expiration_secs = secs;
        }
        if let Some(secs) = parse_var(&vars, "JWT_REFRESH_EXPIRATION_SECS")? {
            self.auth.jwt_refresh_expiration_secs = secs;
        }
        if let Some(secs) = parse_var(&vars, "SESSION_COOKIE_AGE_SECS")? {
            self.auth.session_cookie_age_secs = secs;
        }

        // Logging
        if let Some(level) = vars("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = vars("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    ///
    /// Every variable that is set wins over the file, even when it equals
    /// the built-in default.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Load from `STATUS_CONFIG` when set, otherwise from the environment alone
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("STATUS_CONFIG") {
            Ok(path) => Self::from_file(path)?.with_env_override(),
            Err(_) => Self::from_env(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 10 * 1024 * 1024, // 10MB
            // Empty by default for security - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
        }
    }
}

/// Token, session and password hashing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret key for HMAC signing
    pub jwt_secret: String,

    /// Token issuer identifier
    pub jwt_issuer: String,

    /// Lifetime of a single token in seconds
    pub jwt_expiration_secs: u64,

    /// Window after the original login during which a token may be refreshed
    pub jwt_refresh_expiration_secs: u64,

    /// Lifetime of a login session cookie in seconds
    pub session_cookie_age_secs: u64,

    /// Argon2 memory cost in KiB
    pub password_memory_cost: u32,

    /// Argon2 iterations
    pub password_time_cost: u32,

    /// Argon2 lanes
    pub password_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-key-change-in-production".to_string(),
            jwt_issuer: "status-api".to_string(),
            jwt_expiration_secs: 7 * 24 * 3600,
            jwt_refresh_expiration_secs: 7 * 24 * 3600,
            session_cookie_age_secs: 14 * 24 * 3600,
            password_memory_cost: 65536, // 64 MB
            password_time_cost: 3,
            password_parallelism: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
