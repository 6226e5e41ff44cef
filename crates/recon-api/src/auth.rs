//! # Admin Authentication
//!
//! Shared-token middleware for the `/admin` surface. Callers present
//! the token in `X-Admin-Token`; anything else is a 401 before the
//! handler runs.

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Header carrying the acting admin's id for the audit trail
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if token == state.config.admin_token => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "admin request rejected: bad or missing token");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Unauthorized".to_string(),
                    message: "Valid X-Admin-Token header required".to_string(),
                }),
            )
                .into_response()
        }
    }
}
