//! Authentication API handlers
//!
//! Registration, login, token refresh and logout.
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::{LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, TokenResponse};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Where logout sends the client
pub const LOGOUT_REDIRECT: &str = "/api/auth/";

/// Register a new user account
///
/// Username and email must be unique ignoring case, and the two passwords
/// must match. Only anonymous callers may register.
#[utoipa::path(
    post,
    path = "/api/register/",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Validation failed or already authenticated"),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = request.username.clone();
    let email = request.email.clone();

    let (user, issued) = match state.auth.register(request).await {
        Ok(registered) => registered,
        Err(err) => {
            if let AppError::Validation(errors) = &err {
                audit_log(&AuditEvent::RegistrationFailure {
                    username,
                    email,
                    reason: errors.to_string(),
                    ip_address: extract_ip_address(&headers),
                    user_agent: extract_user_agent(&headers),
                });
            }
            return Err(err);
        }
    };

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        ip_address: extract_ip_address(&headers),
        user_agent: extract_user_agent(&headers),
    });

    Ok((StatusCode::CREATED, Json(RegisterResponse::new(&user, &issued))))
}

/// Log in with a username or email address
///
/// Opens a session (`sessionid` cookie) and returns a signed token.
#[utoipa::path(
    post,
    path = "/api/auth/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Already authenticated", body = crate::error::ApiError),
        (status = 401, description = "Invalid password or unknown user", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = request.username.clone();

    let outcome = match state.auth.login(request).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let AppError::Unauthorized(reason) = &err {
                audit_log(&AuditEvent::LoginFailure {
                    identifier,
                    reason: reason.clone(),
                    ip_address: extract_ip_address(&headers),
                    user_agent: extract_user_agent(&headers),
                });
            }
            return Err(err);
        }
    };

    audit_log(&AuditEvent::LoginSuccess {
        user_id: outcome.user.id,
        username: outcome.user.username.clone(),
        ip_address: extract_ip_address(&headers),
        user_agent: extract_user_agent(&headers),
    });

    let cookie = session_cookie(outcome.session_id, state.auth.sessions().max_age_secs());
    Ok((jar.add(cookie), Json(outcome.token.response())))
}

/// Refresh a token
///
/// Issues a new token for a still-valid one, as long as the refresh
/// window measured from the original login has not passed.
#[utoipa::path(
    post,
    path = "/api/auth/refresh/",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 400, description = "Token invalid, expired or past its refresh window"),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (user, issued) = state.auth.refresh(&request.token).await?;

    audit_log(&AuditEvent::TokenRefresh {
        user_id: user.id,
        username: user.username,
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(issued.response()))
}

/// Log out
///
/// Ends the session, revokes the presented token and redirects to the
/// login endpoint. Always succeeds: anonymous callers and callers holding a
/// stale or invalid token are redirected as well.
#[utoipa::path(
    get,
    path = "/api/logout/",
    tag = "auth",
    responses(
        (status = 302, description = "Logged out; redirect to /api/auth/"),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let caller = state.auth.authenticate(&headers).await.ok().flatten();
    state.auth.logout(caller.as_ref(), &headers).await;

    audit_log(&AuditEvent::Logout {
        user_id: caller.as_ref().map(|user| user.user_id),
        ip_address: extract_ip_address(&headers),
    });

    (
        StatusCode::FOUND,
        jar.add(clear_session_cookie()),
        [(header::LOCATION, LOGOUT_REDIRECT)],
    )
}
