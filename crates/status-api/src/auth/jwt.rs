//! JWT token generation and validation
//!
//! Implements JWT-based authentication with HMAC-SHA256 signing.
//! Tokens carry the identity's id, username and email, plus the original
//! issue time so a token can be refreshed within the refresh window.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use status_core::{AuthConfig, User};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Safety margin subtracted from the advertised expiry
pub const EXPIRY_MARGIN_SECS: i64 = 200;

/// JWT Claims structure containing user information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// JWT ID - unique token identifier for revocation
    pub jti: String,
    /// Identity id
    pub user_id: Uuid,
    /// Username at issue time
    pub username: String,
    /// Email at issue time
    pub email: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Issue time of the first token in a refresh chain
    pub orig_iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

/// JWT token generation and validation errors
///
/// Display strings are the messages returned to clients.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Error decoding signature.")]
    InvalidToken,

    #[error("Signature has expired.")]
    ExpiredToken,

    #[error("Error decoding signature.")]
    InvalidSignature,

    #[error("Refresh has expired.")]
    RefreshExpired,

    #[error("Token has been revoked.")]
    Revoked,
}

/// JWT Configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token issuer identifier
    pub issuer: String,
    /// Lifetime of a single token in seconds
    pub expiration_secs: u64,
    /// Refresh window measured from `orig_iat`, in seconds
    pub refresh_expiration_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            issuer: auth.jwt_issuer.clone(),
            expiration_secs: auth.jwt_expiration_secs,
            refresh_expiration_secs: auth.jwt_refresh_expiration_secs,
        }
    }
}

/// Body returned to clients after authentication
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Signed token
    pub token: String,
    /// Username the token was issued to
    pub user: String,
    /// Advertised expiry (refresh window minus safety margin)
    pub expires: DateTime<Utc>,
}

/// Result of signing a token for an identity
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires: DateTime<Utc>,
    pub claims: Claims,
}

impl IssuedToken {
    /// Response envelope for this token
    pub fn response(&self) -> TokenResponse {
        TokenResponse {
            token: self.token.clone(),
            user: self.claims.username.clone(),
            expires: self.expires,
        }
    }
}

/// Signs and verifies tokens with a fixed key
#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.config.issuer)
            .field("expiration_secs", &self.config.expiration_secs)
            .field("refresh_expiration_secs", &self.config.refresh_expiration_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Advertised expiry for a token issued at `issued_at`
    ///
    /// `issued_at + refresh delta - 200s`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::seconds(self.config.refresh_expiration_secs as i64)
            - Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    /// Sign a fresh token for `user`
    pub fn issue(&self, user: &User) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        self.issue_at(user, now, now.timestamp())
    }

    fn issue_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
        orig_iat: i64,
    ) -> Result<IssuedToken, JwtError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.config.issuer.clone(),
            sub: user.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat,
            orig_iat,
            exp: iat + self.config.expiration_secs as i64,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            expires: self.expires_at(now),
            claims,
        })
    }

    /// Validate a token and extract claims
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Re-issue a still-valid token, keeping its `orig_iat`
    ///
    /// Fails once `orig_iat + refresh delta` has passed.
    pub fn refresh(&self, claims: &Claims, user: &User) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let refresh_limit = claims.orig_iat + self.config.refresh_expiration_secs as i64;
        if now.timestamp() > refresh_limit {
            return Err(JwtError::RefreshExpired);
        }
        self.issue_at(user, now, claims.orig_iat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new("alice", "alice@example.com", "hash")
    }

    #[test]
    fn test_issue_and_validate_token() {
        let issuer = TokenIssuer::new(JwtConfig::default());
        let user = test_user();

        let issued = issuer.issue(&user).expect("Failed to generate token");
        let claims = issuer.validate(&issued.token).expect("Failed to validate token");

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.iss, "status-api");
        assert_eq!(claims.orig_iat, claims.iat);
        assert_eq!(issued.response().user, "alice");
    }

    #[test]
    fn test_expiry_is_refresh_delta_minus_margin() {
        let config = JwtConfig {
            refresh_expiration_secs: 3600,
            ..Default::default()
        };
        let issuer = TokenIssuer::new(config);

        let before = Utc::now();
        let issued = issuer.issue(&test_user()).unwrap();
        let after = Utc::now();

        let lower = before + Duration::seconds(3600 - 200);
        let upper = after + Duration::seconds(3600 - 200);
        assert!(issued.expires >= lower && issued.expires <= upper);
        assert_eq!(issued.response().expires, issued.expires);
    }

    #[test]
    fn test_invalid_token() {
        let issuer = TokenIssuer::new(JwtConfig::default());
        let result = issuer.validate("invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer1 = TokenIssuer::new(JwtConfig {
            secret: "secret1".to_string(),
            ..Default::default()
        });
        let issuer2 = TokenIssuer::new(JwtConfig {
            secret: "secret2".to_string(),
            ..Default::default()
        });

        let issued = issuer1.issue(&test_user()).unwrap();
        let result = issuer2.validate(&issued.token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let config = JwtConfig::default();
        let issuer = TokenIssuer::new(config.clone());
        let now = Utc::now().timestamp();

        let claims = Claims {
            iss: config.issuer.clone(),
            sub: Uuid::nil().to_string(),
            jti: Uuid::new_v4().to_string(),
            user_id: Uuid::nil(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            iat: now - 7200,
            orig_iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(issuer.validate(&token), Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_refresh_keeps_orig_iat() {
        let issuer = TokenIssuer::new(JwtConfig::default());
        let user = test_user();

        let mut claims = issuer.validate(&issuer.issue(&user).unwrap().token).unwrap();
        claims.orig_iat -= 60;

        let refreshed = issuer.refresh(&claims, &user).unwrap();
        assert_eq!(refreshed.claims.orig_iat, claims.orig_iat);
        assert_ne!(refreshed.claims.jti, claims.jti);
    }

    #[test]
    fn test_refresh_window_elapsed() {
        let issuer = TokenIssuer::new(JwtConfig {
            refresh_expiration_secs: 60,
            ..Default::default()
        });
        let user = test_user();

        let mut claims = issuer.validate(&issuer.issue(&user).unwrap().token).unwrap();
        claims.orig_iat -= 120;

        assert!(matches!(
            issuer.refresh(&claims, &user),
            Err(JwtError::RefreshExpired)
        ));
    }
}
