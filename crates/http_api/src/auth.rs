//! Bearer-token check.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::{ApiError, AppState, HEALTH_PATH};

/// Whether an `Authorization` header value carries `token`.
///
/// The scheme must be exactly `Bearer`; surrounding whitespace on the
/// credential is ignored, nothing else is.
pub(super) fn bearer_matches(header: &str, token: &str) -> bool {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .is_some_and(|presented| !presented.is_empty() && presented == token)
}

/// Reject any request except the health probe that lacks the configured
/// token. Runs before routing, so nothing is touched on failure.
pub(super) async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == HEALTH_PATH {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| bearer_matches(value, &state.token));

    if !authorized {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
