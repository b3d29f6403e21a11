//! services/api/src/web/sessions.rs
//!
//! Handlers for mentor sessions and instant video calls. Every change is
//! mirrored to the remote `sessions` table when one is configured.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use learnhub_core::{
    domain::{AuthSession, Role, Session},
    ports::{PortResult, Table},
    scheduling::MentorSessionRequest,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    rejection::{reject, Rejection},
    state::AppState,
};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookMentorSessionRequest {
    /// The mentor when a learner books, the learner when a mentor books.
    pub with_user_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    /// Minutes, 60 when omitted.
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StartVideoCallRequest {
    #[serde(default)]
    pub invitees: Vec<Uuid>,
}

fn books_as_mentor(role: Role) -> bool {
    matches!(role, Role::Mentor | Role::Teacher | Role::MentorAdmin)
}

/// Stores the outcome remotely and turns it into a response.
async fn respond(
    state: &AppState,
    action: &str,
    result: PortResult<Session>,
) -> Result<Json<Session>, Rejection> {
    let session = result.map_err(|e| reject(action, e))?;
    state.mirror(Table::Sessions, session.id, &session).await;
    Ok(Json(session))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Sessions the caller takes part in, earliest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses((status = 200, description = "The caller's sessions"))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<impl IntoResponse, Rejection> {
    let sessions = state
        .sessions
        .for_user(auth.user.id)
        .await
        .map_err(|e| reject("load sessions", e))?;
    Ok(Json(sessions))
}

#[utoipa::path(
    post,
    path = "/sessions/mentor",
    request_body = BookMentorSessionRequest,
    responses(
        (status = 201, description = "Session scheduled"),
        (status = 400, description = "Past date, bad duration or self-booking")
    )
)]
pub async fn book_mentor_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Json(req): Json<BookMentorSessionRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let (mentor_id, student_id) = if books_as_mentor(auth.user.role) {
        (auth.user.id, req.with_user_id)
    } else {
        (req.with_user_id, auth.user.id)
    };
    let result = state
        .sessions
        .schedule_mentor_session(MentorSessionRequest {
            mentor_id,
            student_id,
            scheduled_for: req.scheduled_for,
            duration_minutes: req.duration_minutes,
            topic: req.topic,
        })
        .await;
    let session = respond(&state, "schedule session", result).await?;
    info!(session_id = %session.0.id, "mentor session scheduled");
    Ok((StatusCode::CREATED, session))
}

#[utoipa::path(
    post,
    path = "/sessions/video",
    request_body = StartVideoCallRequest,
    responses((status = 201, description = "Call started with the caller as host"))
)]
pub async fn start_video_call_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Json(req): Json<StartVideoCallRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let result = state
        .sessions
        .start_video_call(auth.user.id, req.invitees)
        .await;
    let session = respond(&state, "start video call", result).await?;
    info!(session_id = %session.0.id, "video call started");
    Ok((StatusCode::CREATED, session))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Joined"),
        (status = 401, description = "Not a member of this mentor session"),
        (status = 409, description = "Session is closed")
    )
)]
pub async fn join_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, Rejection> {
    let result = state.sessions.join(id, auth.user.id).await;
    respond(&state, "join session", result).await
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    params(("id" = Uuid, Path, description = "Session id")),
    responses((status = 200, description = "Left; a call ends once its host leaves"))
)]
pub async fn leave_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let result = state.sessions.leave(id, auth.user.id).await;
    respond(&state, "leave session", result).await
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    params(("id" = Uuid, Path, description = "Session id")),
    responses((status = 200, description = "Ended"))
)]
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let result = state.sessions.end(id, auth.user.id).await;
    respond(&state, "end session", result).await
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Cancelled"),
        (status = 409, description = "Only scheduled sessions can be cancelled")
    )
)]
pub async fn cancel_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let result = state.sessions.cancel(id, auth.user.id).await;
    respond(&state, "cancel session", result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support::local_state;
    use chrono::Duration;
    use learnhub_core::domain::{SessionKind, SessionStatus};

    async fn signed_in(state: &Arc<AppState>, username: &str) -> AuthSession {
        state.accounts.login(username, "12345678").await.unwrap()
    }

    async fn book(state: &Arc<AppState>, caller: &AuthSession, with_user_id: Uuid) {
        let booked = book_mentor_session_handler(
            State(state.clone()),
            Extension(caller.clone()),
            Json(BookMentorSessionRequest {
                with_user_id,
                scheduled_for: Utc::now() + Duration::days(1),
                duration_minutes: None,
                topic: "Portfolio review".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(booked.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn booking_fills_mentor_and_student_slots_from_either_side() {
        let state = local_state();
        let student = signed_in(&state, "student").await;
        let mentor = signed_in(&state, "mentor").await;

        book(&state, &student, mentor.user.id).await;
        book(&state, &mentor, student.user.id).await;

        let sessions = state.sessions.for_user(student.user.id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        for session in sessions {
            match session.kind {
                SessionKind::MentorSession {
                    mentor_id,
                    student_id,
                    ..
                } => {
                    assert_eq!(mentor_id, mentor.user.id);
                    assert_eq!(student_id, student.user.id);
                }
                other => panic!("expected a mentor session, got {other:?}"),
            }
        }

        let listed = list_sessions_handler(State(state.clone()), Extension(mentor))
            .await
            .unwrap()
            .into_response();
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn outsiders_cannot_join_mentor_sessions_but_can_join_calls() {
        let state = local_state();
        let student = signed_in(&state, "student").await;
        let mentor = signed_in(&state, "mentor").await;
        let outsider = signed_in(&state, "teacher").await;

        let booked = book_mentor_session_handler(
            State(state.clone()),
            Extension(student.clone()),
            Json(BookMentorSessionRequest {
                with_user_id: mentor.user.id,
                scheduled_for: Utc::now() + Duration::hours(2),
                duration_minutes: Some(30),
                topic: "Career chat".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(booked.status(), StatusCode::CREATED);
        let mentor_session = state.sessions.for_user(student.user.id).await.unwrap()[0].id;

        let err = join_session_handler(
            State(state.clone()),
            Extension(outsider.clone()),
            Path(mentor_session),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let call = state
            .sessions
            .start_video_call(mentor.user.id, vec![])
            .await
            .unwrap();
        let Json(joined) = join_session_handler(State(state.clone()), Extension(outsider), Path(call.id))
            .await
            .unwrap();
        assert_eq!(joined.status, SessionStatus::Live);
    }
}
