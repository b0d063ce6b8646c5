//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;

use crate::web::state::UserId;

/// The header the identity gateway sets after verifying the caller's token.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that reads the verified caller id and stores it for handlers.
///
/// If present, inserts a `UserId` into request extensions.
/// If missing or blank, returns 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // 1. Extract the identity header
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            debug!("Request rejected: missing {} header", USER_ID_HEADER);
            StatusCode::UNAUTHORIZED
        })?;

    // 2. Insert user_id into request extensions
    req.extensions_mut().insert(UserId(user_id));

    // 3. Continue to the handler
    Ok(next.run(req).await)
}
