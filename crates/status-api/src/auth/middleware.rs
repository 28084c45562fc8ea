/// Request authentication middleware
///
/// `identify_caller` runs on every API route but logout and adds an
/// `AuthenticatedUser` to request extensions when the caller presents a
/// valid token or session cookie. `require_auth` and `anonymous_only` are
/// route layers that gate on that extension.
use super::service::AuthenticatedUser;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Resolve the caller's identity
///
/// Anonymous requests pass through unchanged. A token that is malformed,
/// expired or revoked is rejected with 401.
pub async fn identify_caller(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.auth.authenticate(request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(err) => {
            if let AppError::Unauthorized(reason) = &err {
                audit_log(&AuditEvent::InvalidToken {
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                    reason: reason.clone(),
                });
            }
            return err.into_response();
        }
    }

    next.run(request).await
}

/// Reject anonymous callers with 401
///
/// ```ignore
/// let app = Router::new()
///     .route("/status/", post(create_status))
///     .route_layer(middleware::from_fn(require_auth));
/// ```
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(AppError::not_authenticated());
    }
    Ok(next.run(request).await)
}

/// Reject authenticated callers with 400
pub async fn anonymous_only(request: Request, next: Next) -> Result<Response, AppError> {
    if let Some(user) = request.extensions().get::<AuthenticatedUser>() {
        tracing::debug!(user_id = %user.user_id, path = %request.uri().path(), "Already authenticated");
        return Err(AppError::already_authenticated());
    }
    Ok(next.run(request).await)
}
