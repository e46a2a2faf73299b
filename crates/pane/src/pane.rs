//! Pane capture adapter.
//!
//! The bridge talks to the terminal through exactly two primitives: type a
//! line into the pane, and read back the last N lines of it. [`PaneAdapter`]
//! is that contract; [`TmuxPane`] implements it by shelling out to tmux.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod tmux;

use async_trait::async_trait;

pub use tmux::TmuxPane;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePane, PaneCall};

/// Failure talking to the multiplexer. Every variant means the target pane
/// could not be reached; none of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum PaneError {
    #[error("failed to inject into {target}: {reason}")]
    Injection { target: String, reason: String },

    #[error("failed to capture {target}: {reason}")]
    Capture { target: String, reason: String },

    #[error("pane {target} unavailable: {reason}")]
    Unavailable { target: String, reason: String },

    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Narrow contract over one terminal pane.
///
/// Implementations are shared across request handlers, so they must be
/// `Send + Sync`; callers serialize inject/capture sequences themselves.
#[cfg_attr(any(test, feature = "test-support"), mockall::automock)]
#[async_trait]
pub trait PaneAdapter: Send + Sync {
    /// Identifier of the pane this adapter drives (e.g. `claude:0.0`).
    fn target(&self) -> String;

    /// Type `line` into the pane and press Enter.
    async fn inject(&self, line: &str) -> Result<(), PaneError>;

    /// Visible pane content plus `depth` lines of scrollback, newest last.
    async fn capture(&self, depth: usize) -> Result<String, PaneError>;

    /// Verify the pane exists without touching its contents.
    async fn health_check(&self) -> Result<(), PaneError>;
}
