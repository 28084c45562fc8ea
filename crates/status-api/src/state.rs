//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthService, JwtConfig, PasswordConfig, SessionStore, TokenIssuer};
use status_core::{AppConfig, MemoryStore, PgStore, StatusRepository, UserRepository};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Identity store
    pub users: Arc<dyn UserRepository>,
    /// Status store
    pub statuses: Arc<dyn StatusRepository>,
    /// Registration, login and caller identification
    pub auth: AuthService,
    /// Set when running on PostgreSQL; pinged by the readiness probe
    pub database: Option<PgStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create state over the given stores
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        statuses: Arc<dyn StatusRepository>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(JwtConfig::from(&config.auth)));
        let sessions = Arc::new(SessionStore::new(config.auth.session_cookie_age_secs));
        let auth = AuthService::new(
            users.clone(),
            tokens,
            sessions,
            PasswordConfig::from(&config.auth),
        );

        Self {
            config,
            users,
            statuses,
            auth,
            database: None,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// State backed by a process-local store
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// State backed by PostgreSQL
    pub fn with_postgres(config: AppConfig, store: PgStore) -> Self {
        let shared = Arc::new(store.clone());
        let mut state = Self::new(config, shared.clone(), shared);
        state.database = Some(store);
        state
    }

    /// In-memory state with cheap password hashing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        let mut config = AppConfig::default();
        config.auth.password_memory_cost = 4096;
        config.auth.password_time_cost = 1;
        config.auth.password_parallelism = 1;
        Self::in_memory(config)
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Name of the active storage backend
    pub fn backend(&self) -> &'static str {
        if self.database.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter() {
        let state = AppState::for_testing();
        assert_eq!(state.get_request_count(), 0);

        state.increment_requests();
        state.increment_requests();
        assert_eq!(state.get_request_count(), 2);
    }

    #[test]
    fn test_ready_flag_and_backend() {
        let state = AppState::for_testing();
        assert!(state.is_ready());
        assert_eq!(state.backend(), "memory");

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[test]
    fn test_auth_settings_flow_from_config() {
        let mut config = AppConfig::default();
        config.auth.jwt_issuer = "custom-issuer".to_string();
        config.auth.session_cookie_age_secs = 60;

        let state = AppState::in_memory(config);
        assert_eq!(state.auth.tokens().config().issuer, "custom-issuer");
        assert_eq!(state.auth.sessions().max_age_secs(), 60);
    }
}
