//! Authentication service layer
//!
//! Registration (field checks, uniqueness, password confirmation, hashing),
//! username-or-email login, token refresh, logout and caller identification.

use super::jwt::{IssuedToken, JwtError, TokenIssuer, TokenResponse};
use super::password::{hash_password_with_config, verify_password, PasswordConfig};
use super::session::{session_id_from_headers, SessionStore};
use crate::error::{field_messages, AppError};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use status_core::validation::{check_passwords_match, validate_username_format};
use status_core::{User, UserRepository, ValidationErrors};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const EMAIL_TAKEN: &str = "User with this email already exists";
pub const USERNAME_TAKEN: &str = "User with this username already exists";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const USER_DOES_NOT_EXIST: &str = "User does not exist";

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    /// Required, since an email can be used to log in
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,

    /// Password confirmation
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password2: String,
}

/// Registration data that passed every check
///
/// The confirmation password is not carried past validation.
#[derive(Debug, Clone)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Registration response: identity fields plus the issued token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    pub token_response: TokenResponse,
}

impl RegisterResponse {
    pub fn new(user: &User, issued: &IssuedToken) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            token: issued.token.clone(),
            expires: issued.expires,
            token_response: issued.response(),
        }
    }
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub token: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: IssuedToken,
    /// Cookie value of the session opened for this login
    pub session_id: String,
}

/// How the caller proved its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSource {
    Token { jti: String, exp: i64 },
    Session { session_id: String },
}

/// Identity of the caller, added to request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub source: AuthSource,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
    sessions: Arc<SessionStore>,
    password: PasswordConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenIssuer>,
        sessions: Arc<SessionStore>,
        password: PasswordConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            sessions,
            password,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Reject an email already used by any identity, ignoring case
    pub async fn validate_email(&self, email: &str) -> Result<(), AppError> {
        if self.users.email_exists(email).await? {
            return Err(ValidationErrors::field("email", EMAIL_TAKEN).into());
        }
        Ok(())
    }

    /// Reject a username already used by any identity, ignoring case
    pub async fn validate_username(&self, username: &str) -> Result<(), AppError> {
        if self.users.username_exists(username).await? {
            return Err(ValidationErrors::field("username", USERNAME_TAKEN).into());
        }
        Ok(())
    }

    /// Run every registration check
    ///
    /// Field errors are collected together; the password confirmation is
    /// only compared once all fields are valid.
    pub async fn validate(
        &self,
        request: RegisterRequest,
    ) -> Result<ValidatedRegistration, AppError> {
        let mut errors = match request.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => field_messages(&e),
        };

        if !errors.has_field("username") {
            match validate_username_format(&request.username) {
                Ok(()) => collect(&mut errors, self.validate_username(&request.username).await)?,
                Err(message) => errors.add("username", message),
            }
        }
        if !errors.has_field("email") {
            collect(&mut errors, self.validate_email(&request.email).await)?;
        }
        errors.into_result()?;

        check_passwords_match(&request.password, &request.password2)?;

        Ok(ValidatedRegistration {
            username: request.username,
            email: request.email,
            password: request.password,
        })
    }

    /// Hash the password and persist a new identity
    pub async fn create(&self, data: ValidatedRegistration) -> Result<User, AppError> {
        let password_hash = hash_password_with_config(&data.password, &self.password)?;
        let user = User::new(data.username, data.email, password_hash);

        self.users.create_user(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Validate, create and issue a token for a new identity
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, IssuedToken), AppError> {
        let data = self.validate(request).await?;
        let user = self.create(data).await?;
        let issued = self.tokens.issue(&user)?;
        Ok((user, issued))
    }

    /// Log in with a username or an email address
    ///
    /// The identifier must resolve to exactly one identity.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AppError> {
        let matches = self.users.find_by_login(&request.username).await?;
        let user = match matches.as_slice() {
            [user] => user.clone(),
            _ => return Err(AppError::Unauthorized(USER_DOES_NOT_EXIST.to_string())),
        };

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::Unauthorized(INVALID_PASSWORD.to_string()));
        }

        self.users.update_last_login(user.id, Utc::now()).await?;
        let session_id = self.sessions.create(user.id).await;
        let token = self.tokens.issue(&user)?;

        Ok(LoginOutcome {
            user,
            token,
            session_id,
        })
    }

    /// Re-issue a still-valid token within its refresh window
    ///
    /// Failures are reported as non-field validation errors.
    pub async fn refresh(&self, token: &str) -> Result<(User, IssuedToken), AppError> {
        let claims = self.tokens.validate(token).map_err(refresh_error)?;
        if self.sessions.is_token_revoked(&claims.jti).await {
            return Err(refresh_error(JwtError::Revoked));
        }

        let user = self
            .users
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Validation(ValidationErrors::non_field(USER_DOES_NOT_EXIST)))?;

        let issued = self.tokens.refresh(&claims, &user).map_err(refresh_error)?;
        Ok((user, issued))
    }

    /// End the caller's session and revoke the token it presented
    pub async fn logout(&self, caller: Option<&AuthenticatedUser>, headers: &HeaderMap) {
        if let Some(session_id) = session_id_from_headers(headers) {
            self.sessions.destroy(&session_id).await;
        }

        if let Some(AuthenticatedUser {
            source: AuthSource::Token { jti, exp },
            ..
        }) = caller
        {
            self.sessions.revoke_token(jti, *exp).await;
        }
    }

    /// Identify the caller from a token header or the session cookie
    ///
    /// A presented token that fails validation is an error; a missing or
    /// stale session is simply anonymous.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<AuthenticatedUser>, AppError> {
        if let Some(token) = token_from_headers(headers) {
            let claims = self.tokens.validate(token)?;
            if self.sessions.is_token_revoked(&claims.jti).await {
                return Err(JwtError::Revoked.into());
            }
            return Ok(Some(AuthenticatedUser {
                user_id: claims.user_id,
                username: claims.username,
                email: claims.email,
                source: AuthSource::Token {
                    jti: claims.jti,
                    exp: claims.exp,
                },
            }));
        }

        let Some(session_id) = session_id_from_headers(headers) else {
            return Ok(None);
        };
        let Some(user_id) = self.sessions.resolve(&session_id).await else {
            return Ok(None);
        };

        Ok(self.users.get_user(user_id).await?.map(|user| AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            email: user.email,
            source: AuthSource::Session { session_id },
        }))
    }
}

/// Merge field errors into `errors`, passing any other failure through
fn collect(errors: &mut ValidationErrors, result: Result<(), AppError>) -> Result<(), AppError> {
    match result {
        Ok(()) => Ok(()),
        Err(AppError::Validation(e)) => {
            errors.merge(e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn refresh_error(err: JwtError) -> AppError {
    match err {
        e @ JwtError::EncodingError(_) => e.into(),
        other => AppError::Validation(ValidationErrors::non_field(other.to_string())),
    }
}

/// Token from `Authorization: JWT <token>` or `Authorization: Bearer <token>`
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("JWT ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtConfig;
    use axum::http::HeaderValue;
    use status_core::{MemoryStore, NON_FIELD_ERRORS};

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TokenIssuer::new(JwtConfig::default())),
            Arc::new(SessionStore::new(3600)),
            PasswordConfig {
                memory_cost: 4096,
                time_cost: 1,
                parallelism: 1,
                output_len: Some(32),
            },
        )
    }

    fn registration(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
            password2: "secret".to_string(),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn validation(err: AppError) -> ValidationErrors {
        match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_and_duplicate_checks() {
        let service = service();
        let (user, issued) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(issued.claims.user_id, user.id);
        assert!(user.password_hash.starts_with("$argon2id$"));

        let err = service
            .register(registration("ALICE", "ALICE@EXAMPLE.COM"))
            .await
            .unwrap_err();
        let errors = validation(err);
        assert_eq!(errors.messages("username"), [USERNAME_TAKEN]);
        assert_eq!(errors.messages("email"), [EMAIL_TAKEN]);
    }

    #[tokio::test]
    async fn test_passwords_must_match_after_fields() {
        let service = service();
        let mut request = registration("bob", "bob@example.com");
        request.password = "a".to_string();
        request.password2 = "b".to_string();

        let errors = validation(service.validate(request.clone()).await.unwrap_err());
        assert_eq!(errors.messages(NON_FIELD_ERRORS), ["Passwords must match"]);

        // Field errors win; the confirmation is not compared yet
        request.email = "not-an-email".to_string();
        let errors = validation(service.validate(request).await.unwrap_err());
        assert!(errors.has_field("email"));
        assert!(!errors.has_field(NON_FIELD_ERRORS));
    }

    #[tokio::test]
    async fn test_username_format_rejected() {
        let service = service();
        let errors = validation(
            service
                .validate(registration("bad name!", "x@example.com"))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_field("username"));
        assert!(!errors.has_field("email"));
    }

    #[tokio::test]
    async fn test_blank_email_rejected() {
        let service = service();
        let errors = validation(
            service
                .validate(registration("erin", ""))
                .await
                .unwrap_err(),
        );
        assert_eq!(errors.messages("email"), ["Enter a valid email address."]);
        assert!(!errors.has_field("username"));
    }

    #[tokio::test]
    async fn test_validate_drops_confirmation() {
        let service = service();
        let data = service
            .validate(registration("carol", "carol@example.com"))
            .await
            .unwrap();
        assert_eq!(data.username, "carol");
        assert_eq!(data.password, "secret");
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let service = service();
        service
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = service.login(login("Alice", "secret")).await.unwrap();
        assert_eq!(by_name.token.response().user, "alice");
        assert!(service.sessions().resolve(&by_name.session_id).await.is_some());

        let by_email = service
            .login(login("ALICE@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(by_email.user.id, by_name.user.id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = service();
        service
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = service.login(login("alice", "wrong")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == INVALID_PASSWORD));

        let err = service.login(login("nobody", "secret")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == USER_DOES_NOT_EXIST));
    }

    #[tokio::test]
    async fn test_ambiguous_login_identifier() {
        let service = service();
        service
            .register(registration("dave@example.com", "dave1@example.com"))
            .await
            .unwrap();
        service
            .register(registration("dave", "dave@example.com"))
            .await
            .unwrap();

        let err = service
            .login(login("dave@example.com", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == USER_DOES_NOT_EXIST));
    }

    #[tokio::test]
    async fn test_authenticate_and_logout_revokes_token() {
        let service = service();
        let (_, issued) = service
            .register(registration("erin", "erin@example.com"))
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("JWT {}", issued.token)).unwrap(),
        );

        let caller = service.authenticate(&headers).await.unwrap().unwrap();
        assert_eq!(caller.username, "erin");

        service.logout(Some(&caller), &headers).await;
        assert!(matches!(
            service.authenticate(&headers).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_with_session_cookie() {
        let service = service();
        service
            .register(registration("frank", "frank@example.com"))
            .await
            .unwrap();
        let outcome = service.login(login("frank", "secret")).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("sessionid={}", outcome.session_id)).unwrap(),
        );

        let caller = service.authenticate(&headers).await.unwrap().unwrap();
        assert_eq!(caller.user_id, outcome.user.id);

        service.logout(Some(&caller), &headers).await;
        assert!(service.authenticate(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh() {
        let service = service();
        let (user, issued) = service
            .register(registration("gina", "gina@example.com"))
            .await
            .unwrap();

        let (refreshed_user, refreshed) = service.refresh(&issued.token).await.unwrap();
        assert_eq!(refreshed_user.id, user.id);
        assert_eq!(refreshed.claims.orig_iat, issued.claims.orig_iat);

        let errors = validation(service.refresh("garbage").await.unwrap_err());
        assert!(errors.has_field(NON_FIELD_ERRORS));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(token_from_headers(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("JWT xyz"));
        assert_eq!(token_from_headers(&headers), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(token_from_headers(&headers), None);
    }
}
