use axum::extract::{FromRequest, FromRequestParts};

use crate::constants::{ERR_INVALID_USER_ID, ERR_USER_ID_REQUIRED};
use crate::error::{AppError, Result};
use crate::models::User;

/// `Json` extractor whose rejections render as `AppError::InvalidInput`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` extractor whose rejections render as `AppError::InvalidInput`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Require a well-formed user ID from an optional request field
pub fn require_user_id(user_id: Option<String>) -> Result<String> {
    let user_id = user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput(ERR_USER_ID_REQUIRED.to_string()))?;

    if !User::validate_id(&user_id) {
        tracing::warn!("Invalid user ID format: {}", user_id);
        return Err(AppError::InvalidInput(ERR_INVALID_USER_ID.to_string()));
    }

    Ok(user_id)
}
