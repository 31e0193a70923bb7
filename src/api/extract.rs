use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` extractor whose rejections come back as `AppError`, so malformed
/// bodies get the same `{"error": ...}` shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
