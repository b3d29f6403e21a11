//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the learning REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::accounts::ProfileUpdate;
use crate::web::{
    auth, chat,
    rejection::{reject, Rejection},
    sessions,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use learnhub_core::{
    catalog::{CourseQuery, MentorQuery},
    dashboard::{average_progress, dashboard_for},
    domain::{AuthSession, Preferences},
    leaderboard::{self, Participant},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::session_handler,
        me_handler,
        update_me_handler,
        list_courses_handler,
        get_course_handler,
        enroll_handler,
        complete_lesson_handler,
        get_quiz_handler,
        submit_quiz_handler,
        submit_assignment_handler,
        list_enrollments_handler,
        list_certificates_handler,
        leaderboard_handler,
        list_mentors_handler,
        dashboard_handler,
        sessions::list_sessions_handler,
        sessions::book_mentor_session_handler,
        sessions::start_video_call_handler,
        sessions::join_session_handler,
        sessions::leave_session_handler,
        sessions::end_session_handler,
        sessions::cancel_session_handler,
        chat::chat_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::RegisterRequest,
            auth::AuthResponse,
            UpdateProfileRequest,
            QuizAnswers,
            AssignmentBody,
            QuizView,
            QuestionView,
            sessions::BookMentorSessionRequest,
            sessions::StartVideoCallRequest,
        )
    ),
    tags(
        (name = "LearnHub API", description = "Courses, progress, certificates, mentoring sessions and chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub avatar: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<Preferences>,
}

#[derive(Deserialize, ToSchema)]
pub struct QuizAnswers {
    /// The chosen option index for each question, in order.
    pub answers: Vec<usize>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignmentBody {
    pub content: String,
}

/// A quiz as shown to a learner, without the answer key.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub course_id: String,
    pub lesson_id: String,
    pub title: String,
    pub pass_percent: u8,
    pub questions: Vec<QuestionView>,
}

#[derive(Serialize, ToSchema)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct CourseSearch {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct MentorSearch {
    pub search: Option<String>,
    pub expertise: Option<String>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFilter {
    pub course_id: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct LeaderboardParams {
    pub seed: Option<u64>,
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// The signed-in user with per-course progress.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, Rejection> {
    let user = state
        .accounts
        .profile(&session.user)
        .await
        .map_err(|e| reject("load profile", e))?;
    Ok(Json(user))
}

/// Update username, avatar or preferences.
#[utoipa::path(
    patch,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user"),
        (status = 400, description = "Invalid username"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let user = state
        .accounts
        .update_profile(
            &session.user,
            ProfileUpdate {
                username: req.username,
                avatar: req.avatar,
                preferences: req.preferences,
            },
        )
        .await
        .map_err(|e| reject("update profile", e))?;
    Ok(Json(user))
}

//=========================================================================================
// Course and Lesson Handlers
//=========================================================================================

/// List courses, filtered by free text and category, with the caller's progress.
#[utoipa::path(
    get,
    path = "/courses",
    params(
        ("search" = Option<String>, Query, description = "Free-text filter"),
        ("category" = Option<String>, Query, description = "Exact category")
    ),
    responses((status = 200, description = "Matching courses"))
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<CourseSearch>,
) -> Result<impl IntoResponse, Rejection> {
    let query = CourseQuery {
        search: params.search,
        category: params.category,
    };
    let mut views = Vec::new();
    for course in state.learning.catalog().search_courses(&query) {
        let view = state
            .learning
            .course_view(session.user.id, &course.id)
            .await
            .map_err(|e| reject("load course", e))?;
        views.push(view);
    }
    Ok(Json(views))
}

/// One course with lock state, progress, enrollment and certificate.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course view"),
        (status = 404, description = "Unknown course")
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, Rejection> {
    let view = state
        .learning
        .course_view(session.user.id, &course_id)
        .await
        .map_err(|e| reject("load course", e))?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrollment, existing or new"),
        (status = 404, description = "Unknown course")
    )
)]
pub async fn enroll_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, Rejection> {
    let enrollment = state
        .learning
        .enroll(session.user.id, &course_id)
        .await
        .map_err(|e| reject("enroll", e))?;
    Ok(Json(enrollment))
}

/// Mark a lesson complete. A locked lesson is refused with 409.
#[utoipa::path(
    post,
    path = "/courses/{id}/lessons/{lesson_id}/complete",
    params(
        ("id" = String, Path, description = "Course id"),
        ("lesson_id" = String, Path, description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Updated course view and any new certificate"),
        (status = 404, description = "Unknown course or lesson"),
        (status = 409, description = "Lesson is still locked")
    )
)]
pub async fn complete_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path((course_id, lesson_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Rejection> {
    let completion = state
        .learning
        .complete_lesson(session.user.id, &course_id, &lesson_id)
        .await
        .map_err(|e| reject("complete lesson", e))?;
    Ok(Json(completion))
}

#[utoipa::path(
    get,
    path = "/lessons/{lesson_id}/quiz",
    params(("lesson_id" = String, Path, description = "Quiz lesson id")),
    responses(
        (status = 200, description = "Quiz questions", body = QuizView),
        (status = 404, description = "No quiz for this lesson")
    )
)]
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, Rejection> {
    let quiz = state.learning.catalog().quiz(&lesson_id).ok_or((
        StatusCode::NOT_FOUND,
        format!("No quiz for lesson {lesson_id}"),
    ))?;
    Ok(Json(QuizView {
        course_id: quiz.course_id.clone(),
        lesson_id: quiz.lesson_id.clone(),
        title: quiz.title.clone(),
        pass_percent: quiz.pass_percent,
        questions: quiz
            .questions
            .iter()
            .map(|q| QuestionView {
                prompt: q.prompt.clone(),
                options: q.options.clone(),
            })
            .collect(),
    }))
}

/// Grade a quiz. A passing score completes the lesson.
#[utoipa::path(
    post,
    path = "/lessons/{lesson_id}/quiz",
    request_body = QuizAnswers,
    params(("lesson_id" = String, Path, description = "Quiz lesson id")),
    responses(
        (status = 200, description = "Score and, when passed, the completion"),
        (status = 400, description = "Wrong number of answers or unknown option"),
        (status = 409, description = "Lesson is still locked")
    )
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(lesson_id): Path<String>,
    Json(body): Json<QuizAnswers>,
) -> Result<impl IntoResponse, Rejection> {
    let submission = state
        .learning
        .submit_quiz(session.user.id, &lesson_id, &body.answers)
        .await
        .map_err(|e| reject("submit quiz", e))?;
    Ok(Json(submission))
}

#[utoipa::path(
    post,
    path = "/lessons/{lesson_id}/assignment",
    request_body = AssignmentBody,
    params(("lesson_id" = String, Path, description = "Assignment lesson id")),
    responses(
        (status = 201, description = "Submission stored and lesson completed"),
        (status = 400, description = "Empty submission or not an assignment"),
        (status = 409, description = "Lesson is still locked")
    )
)]
pub async fn submit_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(lesson_id): Path<String>,
    Json(body): Json<AssignmentBody>,
) -> Result<impl IntoResponse, Rejection> {
    let outcome = state
        .learning
        .submit_assignment(session.user.id, &lesson_id, &body.content)
        .await
        .map_err(|e| reject("submit assignment", e))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

//=========================================================================================
// Records Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/enrollments",
    responses((status = 200, description = "The caller's enrollments"))
)]
pub async fn list_enrollments_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, Rejection> {
    let enrollments = state
        .learning
        .enrollments_for(session.user.id)
        .await
        .map_err(|e| reject("load enrollments", e))?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    get,
    path = "/certificates",
    params(("courseId" = Option<String>, Query, description = "Only this course")),
    responses((status = 200, description = "The caller's certificates"))
)]
pub async fn list_certificates_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(filter): Query<CertificateFilter>,
) -> Result<impl IntoResponse, Rejection> {
    let certificates = state
        .learning
        .certificates_for(session.user.id, filter.course_id.as_deref())
        .await
        .map_err(|e| reject("load certificates", e))?;
    Ok(Json(certificates))
}

/// Completed and in-progress leaderboards, padded with filler learners.
#[utoipa::path(
    get,
    path = "/leaderboard",
    params(("seed" = Option<u64>, Query, description = "Seed for the random filler scores")),
    responses((status = 200, description = "Both leaderboard views"))
)]
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, Rejection> {
    let participants = participants(&state, &session)
        .await
        .map_err(|e| reject("build leaderboard", e))?;
    let mut rng = leaderboard::rng_for(params.seed.or(state.config.leaderboard_seed));
    Ok(Json(leaderboard::build(
        &participants,
        Some(session.user.id),
        &mut rng,
    )))
}

/// Every known user with at least one enrollment, plus the caller.
async fn participants(state: &AppState, session: &AuthSession) -> Result<Vec<Participant>, PortError> {
    let enrollments = state.learning.all_enrollments().await?;
    let certificates = state.learning.all_certificates().await?;

    let mut users = state.accounts.known_users().await?;
    if !users.iter().any(|u| u.id == session.user.id) {
        users.push(session.user.clone());
    }

    let mut by_user: HashMap<Uuid, Vec<_>> = HashMap::new();
    for enrollment in enrollments {
        by_user.entry(enrollment.user_id).or_default().push(enrollment);
    }

    Ok(users
        .into_iter()
        .filter(|u| u.id == session.user.id || by_user.contains_key(&u.id))
        .map(|u| {
            let own = by_user.get(&u.id).map(Vec::as_slice).unwrap_or_default();
            Participant {
                user_id: u.id,
                certificates: certificates.iter().filter(|c| c.user_id == u.id).count() as u32,
                progress: average_progress(own),
                username: u.username,
            }
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/mentors",
    params(
        ("search" = Option<String>, Query, description = "Free-text filter"),
        ("expertise" = Option<String>, Query, description = "Required expertise"),
        ("available" = Option<bool>, Query, description = "Only available mentors")
    ),
    responses((status = 200, description = "Matching mentors"))
)]
pub async fn list_mentors_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MentorSearch>,
) -> Result<impl IntoResponse, Rejection> {
    let query = MentorQuery {
        search: params.search,
        expertise: params.expertise,
        available_only: params.available,
    };
    let mentors: Vec<_> = state
        .learning
        .catalog()
        .search_mentors(&query)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(mentors))
}

/// The dashboard for the caller's role.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Role-specific dashboard"))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, Rejection> {
    let total_users = state
        .accounts
        .known_users()
        .await
        .map_err(|e| reject("count users", e))?
        .len();
    let dashboard = dashboard_for(&session.user, &state.learning, &state.sessions, total_users)
        .await
        .map_err(|e| reject("build dashboard", e))?;
    Ok(Json(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support::local_state;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn signed_in(state: &Arc<AppState>, username: &str) -> Extension<AuthSession> {
        Extension(state.accounts.login(username, "12345678").await.unwrap())
    }

    #[tokio::test]
    async fn quiz_view_hides_the_answer_key() {
        let state = local_state();
        let response = get_quiz_handler(State(state), Path("wdf-3".to_string()))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;
        assert!(body["questions"][0].get("correct_option").is_none());
        assert_eq!(body["passPercent"], Value::from(60));
    }

    #[tokio::test]
    async fn locked_lesson_completion_is_a_conflict() {
        let state = local_state();
        let session = signed_in(&state, "student").await;
        let err = complete_lesson_handler(
            State(state),
            session,
            Path(("web-dev-fundamentals".to_string(), "wdf-2".to_string())),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let state = local_state();
        let session = signed_in(&state, "student").await;
        let err = get_course_handler(State(state), session, Path("nope".to_string()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn leaderboard_marks_the_caller() {
        let state = local_state();
        let session = signed_in(&state, "student").await;
        state
            .learning
            .complete_lesson(session.0.user.id, "career-mentoring", "cme-1")
            .await
            .unwrap();

        let response = leaderboard_handler(
            State(state),
            session,
            Query(LeaderboardParams { seed: Some(3) }),
        )
        .await
        .unwrap()
        .into_response();
        let body = body_json(response).await;
        let incomplete = body["incomplete"].as_array().unwrap();
        let me: Vec<&Value> = incomplete
            .iter()
            .filter(|e| e["is_current_user"] == Value::Bool(true))
            .collect();
        assert_eq!(me.len(), 1);
        assert_eq!(me[0]["progress"], Value::from(50));
    }

    #[tokio::test]
    async fn admin_dashboard_counts_demo_accounts() {
        let state = local_state();
        let session = signed_in(&state, "admin").await;
        let response = dashboard_handler(State(state), session)
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;
        assert_eq!(body["kind"], Value::from("admin"));
        assert_eq!(body["total_users"], Value::from(5));
    }

    #[tokio::test]
    async fn mentor_search_filters_by_expertise() {
        let state = local_state();
        let response = list_mentors_handler(
            State(state),
            Query(MentorSearch {
                expertise: Some("javascript".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }
}
