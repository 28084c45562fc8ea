//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::{anonymous_only, identify_caller, require_auth};
use crate::handlers::{auth, status, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Routes mounted under `/api`
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Anonymous callers only
    let anonymous_routes = Router::new()
        .route("/register/", post(auth::register_handler))
        .route("/auth/", post(auth::login_handler))
        .route_layer(middleware::from_fn(anonymous_only));

    // Open to everyone
    let public_routes = Router::new()
        .route("/auth/refresh/", post(auth::refresh_handler))
        .route("/status/", get(status::list_statuses))
        .route("/status/:id/", get(status::get_status))
        .route("/user/:username/", get(users::get_user))
        .route("/user/:username/status/", get(users::list_user_statuses));

    // Authentication required
    let protected_routes = Router::new()
        .route("/status/", post(status::create_status))
        .route_layer(middleware::from_fn(require_auth));

    // Logout resolves the caller itself so a bad token cannot block it
    let logout_routes = Router::new().route("/logout/", get(auth::logout_handler));

    Router::new()
        .merge(anonymous_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state, identify_caller))
        .merge(logout_routes)
}
