//! Authentication module
//!
//! - Token signing, validation and refresh
//! - Password hashing with Argon2id
//! - Login sessions and token revocation
//! - Middleware for caller identification and route gating
//! - Authentication service for registration and login

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;

pub use jwt::{Claims, IssuedToken, JwtConfig, JwtError, TokenIssuer, TokenResponse};
pub use middleware::{anonymous_only, identify_caller, require_auth};
pub use password::{hash_password, hash_password_with_config, verify_password, PasswordConfig};
pub use service::{
    AuthService, AuthSource, AuthenticatedUser, LoginOutcome, LoginRequest, RefreshRequest,
    RegisterRequest, RegisterResponse, ValidatedRegistration,
};
pub use session::{SessionStore, SESSION_COOKIE};
