//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{JsonFileStore, PgRowStore, RemoteAuthAdapter, ScriptedAssistant},
    config::{Config, ConfigError},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, register_handler, session_handler},
        chat_handler,
        middleware::require_auth,
        rest::{
            complete_lesson_handler, dashboard_handler, enroll_handler, get_course_handler,
            get_quiz_handler, leaderboard_handler, list_certificates_handler,
            list_courses_handler, list_enrollments_handler, list_mentors_handler, me_handler,
            submit_assignment_handler, submit_quiz_handler, update_me_handler,
        },
        sessions::{
            book_mentor_session_handler, cancel_session_handler, end_session_handler,
            join_session_handler, leave_session_handler, list_sessions_handler,
            start_video_call_handler,
        },
        state::AppState,
        ApiDoc,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode, Uri,
};
use axum::{
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use learnhub_core::{
    catalog::Catalog,
    ports::{AuthProvider, RemoteDatabase},
    records::Records,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Unknown paths answer with JSON rather than an empty body.
async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not_found",
            "path": uri.path(),
        })),
    )
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Local Store ---
    let store = Arc::new(JsonFileStore::open(&config.data_path).await?);
    info!("Local store at {}", store.path().display());
    let records = Records::new(store);

    // --- 3. Optional Remote Services ---
    let remote_db: Option<Arc<dyn RemoteDatabase>> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let db_adapter = PgRowStore::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Some(Arc::new(db_adapter))
        }
        None => {
            info!("DATABASE_URL not set; running without remote mirroring");
            None
        }
    };

    let auth_provider: Option<Arc<dyn AuthProvider>> = match &config.auth_provider {
        Some(provider) => {
            info!("Using external auth provider at {}", provider.url);
            Some(Arc::new(RemoteAuthAdapter::new(provider)?))
        }
        None => {
            info!("No auth provider configured; using local accounts only");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        records,
        Arc::new(ScriptedAssistant::new(Catalog::builtin())),
        auth_provider,
        remote_db,
    ));

    // --- 5. CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler))
        .route("/mentors", get(list_mentors_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(me_handler).patch(update_me_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses/{id}", get(get_course_handler))
        .route("/courses/{id}/enroll", post(enroll_handler))
        .route(
            "/courses/{id}/lessons/{lesson_id}/complete",
            post(complete_lesson_handler),
        )
        .route(
            "/lessons/{lesson_id}/quiz",
            get(get_quiz_handler).post(submit_quiz_handler),
        )
        .route(
            "/lessons/{lesson_id}/assignment",
            post(submit_assignment_handler),
        )
        .route("/enrollments", get(list_enrollments_handler))
        .route("/certificates", get(list_certificates_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/mentor", post(book_mentor_session_handler))
        .route("/sessions/video", post(start_video_call_handler))
        .route("/sessions/{id}/join", post(join_session_handler))
        .route("/sessions/{id}/leave", post(leave_session_handler))
        .route("/sessions/{id}/end", post(end_session_handler))
        .route("/sessions/{id}/cancel", post(cancel_session_handler))
        .route("/chat", get(chat_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
