//! Login sessions and token revocation
//!
//! A successful login opens a server-side session referenced by the
//! `sessionid` cookie. Session ids are stored only as SHA-256 digests.
//! Logged-out tokens are remembered by `jti` until they would have expired.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sessionid";

/// Server-side session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory session and revoked-token registry
///
/// Single-instance only; state is lost on restart.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    /// Revoked `jti` values mapped to the token's own expiry
    revoked_tokens: RwLock<HashMap<String, i64>>,
    max_age_secs: u64,
}

impl SessionStore {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            revoked_tokens: RwLock::new(HashMap::new()),
            max_age_secs,
        }
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// Open a session and return its cookie value
    pub async fn create(&self, user_id: Uuid) -> String {
        let session_id = generate_session_id();
        let now = Utc::now();
        let session = Session {
            user_id,
            created_at: now,
            expires_at: now + Duration::seconds(self.max_age_secs as i64),
        };

        self.sessions
            .write()
            .await
            .insert(hash_session_id(&session_id), session);

        session_id
    }

    /// Owner of a live session; expired sessions are dropped on sight
    pub async fn resolve(&self, session_id: &str) -> Option<Uuid> {
        let key = hash_session_id(session_id);
        let now = Utc::now();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                Some(session) if !session.is_expired(now) => return Some(session.user_id),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(&key);
        None
    }

    /// End a session; returns whether it existed
    pub async fn destroy(&self, session_id: &str) -> bool {
        self.sessions
            .write()
            .await
            .remove(&hash_session_id(session_id))
            .is_some()
    }

    /// Remember a token id as revoked until `expires_at` (Unix seconds)
    pub async fn revoke_token(&self, jti: &str, expires_at: i64) {
        self.revoked_tokens
            .write()
            .await
            .insert(jti.to_string(), expires_at);
    }

    pub async fn is_token_revoked(&self, jti: &str) -> bool {
        self.revoked_tokens.read().await.contains_key(jti)
    }

    /// Drop expired sessions and revocations of tokens that expired anyway
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed_sessions = before - sessions.len();
        drop(sessions);

        let mut revoked = self.revoked_tokens.write().await;
        let before = revoked.len();
        revoked.retain(|_, exp| *exp > now.timestamp());
        let removed_tokens = before - revoked.len();

        removed_sessions + removed_tokens
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate a cryptographically random session id
fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a session id for storage (SHA-256)
fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cookie opening a session
pub fn session_cookie(session_id: String, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

/// Cookie telling the client to drop its session cookie
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Session id from the request's `Cookie` headers
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
