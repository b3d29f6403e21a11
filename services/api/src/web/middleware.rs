//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Pulls the session token from `Authorization: Bearer ...` or, failing that,
/// from the `session` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Middleware that validates the session token.
///
/// If valid, inserts the `AuthSession` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let session = state.accounts.authenticate(&token).await.map_err(|e| {
        warn!("Rejected session token: {:?}", e);
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
