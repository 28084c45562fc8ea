//! Security audit logging for authentication events
//!
//! Registration, login, logout, token refresh, rejected tokens and status
//! creation are recorded at INFO level under the "audit" target, so they
//! can be filtered and routed apart from application logs.
//!
//! Author: hephaex@gmail.com

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login by username or email
    LoginSuccess {
        user_id: Uuid,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        /// Username or email as submitted
        identifier: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Session or token ended
    Logout {
        user_id: Option<Uuid>,
        ip_address: Option<String>,
    },

    /// Token re-issued within the refresh window
    TokenRefresh {
        user_id: Uuid,
        username: String,
        ip_address: Option<String>,
    },

    /// New identity created
    RegistrationSuccess {
        user_id: Uuid,
        username: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Registration rejected
    RegistrationFailure {
        username: String,
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Invalid, expired or revoked token presented
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Status posted
    StatusCreated {
        user_id: Uuid,
        status_id: Uuid,
        has_content: bool,
        has_image: bool,
    },
}

impl AuditEvent {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::TokenRefresh { .. } => "Token refreshed",
            AuditEvent::RegistrationSuccess { .. } => "User registered",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::StatusCreated { .. } => "Status created",
        }
    }

    /// Identity the event concerns, when known
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::RegistrationSuccess { user_id, .. }
            | AuditEvent::StatusCreated { user_id, .. } => Some(*user_id),
            AuditEvent::Logout { user_id, .. } => *user_id,
            AuditEvent::LoginFailure { .. }
            | AuditEvent::RegistrationFailure { .. }
            | AuditEvent::InvalidToken { .. } => None,
        }
    }

    fn ip_address(&self) -> Option<&str> {
        match self {
            AuditEvent::LoginSuccess { ip_address, .. }
            | AuditEvent::LoginFailure { ip_address, .. }
            | AuditEvent::Logout { ip_address, .. }
            | AuditEvent::TokenRefresh { ip_address, .. }
            | AuditEvent::RegistrationSuccess { ip_address, .. }
            | AuditEvent::RegistrationFailure { ip_address, .. }
            | AuditEvent::InvalidToken { ip_address, .. } => ip_address.as_deref(),
            AuditEvent::StatusCreated { .. } => None,
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is attached as JSON in the `event` field, e.g.
///
/// ```json
/// {"event_type":"login_success","user_id":"550e8400-...","username":"alice","ip_address":"192.168.1.1","user_agent":null}
/// ```
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %Utc::now(),
        event = %event_json,
        user_id = ?event.user_id(),
        ip_address = ?event.ip_address(),
        "{}",
        event.label()
    );
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginFailure {
            identifier: "alice@example.com".to_string(),
            reason: "Invalid password".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_failure");
        assert_eq!(json["identifier"], "alice@example.com");
        assert_eq!(event.label(), "Login failed");
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_event_accessors() {
        let user_id = Uuid::new_v4();
        let event = AuditEvent::StatusCreated {
            user_id,
            status_id: Uuid::new_v4(),
            has_content: false,
            has_image: true,
        };
        assert_eq!(event.user_id(), Some(user_id));
        assert_eq!(event.ip_address(), None);

        let logout = AuditEvent::Logout {
            user_id: None,
            ip_address: Some("10.0.0.1".to_string()),
        };
        assert_eq!(logout.ip_address(), Some("10.0.0.1"));

        // Must not panic
        audit_log(&event);
        audit_log(&logout);
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
