//! OpenAPI documentation
//!
//! Served as JSON at `/api-docs/openapi.json` and browsable through
//! Swagger UI at `/swagger-ui/`.
//!
//! Author: hephaex@gmail.com

use crate::auth::{LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, TokenResponse};
use crate::error::ApiError;
use crate::handlers::health::{BuildInfo, HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::handlers::status::{CreateStatusRequest, StatusListResponse, StatusResponse};
use crate::handlers::users::UserPublic;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the token header and session cookie schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "sessionid",
                "Session cookie set by POST /api/auth/.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Status API",
        description = "Registration, token authentication and status posts.",
        license(name = "Apache-2.0", url = "https://www.apache.org/licenses/LICENSE-2.0.html")
    ),
    paths(
        crate::handlers::auth::register_handler,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::refresh_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::status::create_status,
        crate::handlers::status::list_statuses,
        crate::handlers::status::get_status,
        crate::handlers::users::get_user,
        crate::handlers::users::list_user_statuses,
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
    ),
    components(schemas(
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        RefreshRequest,
        TokenResponse,
        CreateStatusRequest,
        StatusResponse,
        StatusListResponse,
        UserPublic,
        ApiError,
        HealthResponse,
        BuildInfo,
        ReadinessResponse,
        ReadinessChecks,
    )),
    tags(
        (name = "auth", description = "Registration, login, refresh and logout"),
        (name = "status", description = "Status posts"),
        (name = "users", description = "Public user profiles"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
