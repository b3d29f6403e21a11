//! services/api/src/web/rejection.rs
//!
//! Maps core port errors onto HTTP rejections.

use axum::http::StatusCode;
use learnhub_core::ports::PortError;
use tracing::{error, warn};

/// The `(StatusCode, String)` pair every handler rejects with.
pub type Rejection = (StatusCode, String);

/// Turns a `PortError` into a status and message, logging it on the way out.
/// `action` completes the phrase "Failed to ...".
pub fn reject(action: &str, e: PortError) -> Rejection {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Corrupt { .. } | PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Failed to {}: {:?}", action, e);
        return (status, format!("Failed to {action}"));
    }
    warn!("Failed to {}: {}", action, e);
    let message = match e {
        PortError::NotFound(m) | PortError::InvalidInput(m) | PortError::Conflict(m) => m,
        other => other.to_string(),
    };
    (status, message)
}
