//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and session restore.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use learnhub_core::{
    domain::{AuthSession, Role, User},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::accounts::Registration;
use crate::web::{
    middleware::session_token,
    rejection::{reject, Rejection},
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// A username or an e-mail address.
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to `student`. Administrative roles are refused.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub user: User,
}

impl AuthResponse {
    fn new(session: AuthSession, user: User) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            user,
        }
    }
}

fn session_cookie(session: &AuthSession) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session.token, max_age
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account and sign in
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration details"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let session = state
        .accounts
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            role: req.role.unwrap_or(Role::Student),
        })
        .await
        .map_err(|e| reject("register", e))?;

    let cookie = session_cookie(&session);
    let user = session.user.clone();
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(session, user)),
    ))
}

/// POST /auth/login - Login with a demo, local or provider account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let session = state
        .accounts
        .login(&req.username, &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            other => reject("log in", other),
        })?;

    let user = state
        .accounts
        .profile(&session.user)
        .await
        .map_err(|e| reject("load profile", e))?;
    let cookie = session_cookie(&session);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(session, user)),
    ))
}

/// POST /auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Rejection> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .accounts
        .logout(&token)
        .await
        .map_err(|e| reject("log out", e))?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/session - Restore the session behind the presented token
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is valid", body = AuthResponse),
        (status = 401, description = "No valid session")
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Rejection> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;
    let session = state
        .accounts
        .restore(&token)
        .await
        .map_err(|e| reject("restore session", e))?;
    let user = state
        .accounts
        .profile(&session.user)
        .await
        .map_err(|e| reject("load profile", e))?;
    info!(user_id = %user.id, "session restored");
    Ok(Json(AuthResponse::new(session, user)))
}
