use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatcher::DispatchError;
use jobs::StoreError;
use pane::PaneError;
use serde_json::json;

/// Request failure as seen by an HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown id: {0}")]
    JobNotFound(String),

    #[error("target unavailable: {0}")]
    TargetUnavailable(#[from] PaneError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            // An id that can't name a record was never stored.
            StoreError::NotFound(id) | StoreError::InvalidId(id) => ApiError::JobNotFound(id),
            error @ StoreError::Io { .. } => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::InvalidJobId(id) => {
                ApiError::InvalidRequest(format!("invalid job id: {:?}", id))
            }
            DispatchError::Pane(error) => ApiError::TargetUnavailable(error),
            DispatchError::Store(error) => ApiError::Internal(error.to_string()),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::JobNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TargetUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = match &self {
            ApiError::Unauthorized => json!({ "error": "unauthorized" }),
            ApiError::InvalidRequest(detail) => {
                json!({ "error": "invalid request", "detail": detail })
            }
            ApiError::JobNotFound(id) => json!({ "error": "unknown id", "id": id }),
            ApiError::TargetUnavailable(error) => {
                json!({ "error": "target unavailable", "detail": error.to_string() })
            }
            ApiError::Internal(detail) => json!({ "error": "internal error", "detail": detail }),
        };
        (status, Json(body)).into_response()
    }
}
