//! HTTP surface of the bridge.
//!
//! Every route except `/healthz` sits behind bearer-token auth. Handlers are
//! thin: they translate requests into [`Dispatcher`] and [`jobs::JobStore`]
//! calls and map failures through [`ApiError`].

mod auth;
mod error;
mod handlers;
mod live;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use dispatcher::Dispatcher;
use std::sync::Arc;

pub use error::ApiError;
pub use live::render_live_page;

/// Path exempt from authentication.
pub const HEALTH_PATH: &str = "/healthz";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    token: Arc<str>,
    /// Lines returned by `/jobs/{id}/tail` when `lines` is not given.
    pub default_tail_lines: usize,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        token: impl Into<Arc<str>>,
        default_tail_lines: usize,
    ) -> Self {
        Self {
            dispatcher,
            token: token.into(),
            default_tail_lines,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handlers::healthz))
        .route("/send", post(handlers::send))
        .route("/jobs/{id}/tail", get(handlers::tail))
        .route("/jobs/{id}/live", get(live::live))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ))
        .with_state(state)
}
