//! Request extractors

use crate::error::AppError;
use axum::extract::FromRequest;

/// `Json` body whose rejections are reported as `AppError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
