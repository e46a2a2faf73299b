use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use dispatcher::{SubmitRequest, Submission};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};

#[derive(Serialize)]
pub(super) struct HealthResponse {
    ok: bool,
    tmux_target: String,
}

/// Liveness probe. Always 200; `ok` reports whether the pane exists.
pub(super) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let ok = match state.dispatcher.health().await {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!("Health check failed: {}", error);
            false
        }
    };
    Json(HealthResponse {
        ok,
        tmux_target: state.dispatcher.target(),
    })
}

pub(super) async fn send(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<Submission>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let submission = state.dispatcher.submit(request).await?;
    Ok(Json(submission))
}

#[derive(Deserialize)]
pub(super) struct TailQuery {
    lines: Option<usize>,
}

/// Last `lines` lines of a job's stored output, as plain text.
pub(super) async fn tail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<TailQuery>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let lines = query.lines.unwrap_or(state.default_tail_lines);
    Ok(state.dispatcher.store().read_tail(&id, lines)?)
}
