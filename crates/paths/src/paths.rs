//! Where panebridge keeps its files.
//!
//! Two layouts are supported:
//!
//! - platform (default): config under the OS config dir, job state under the
//!   OS data dir, logs under `~/Library/Logs` on macOS and `<data>/logs`
//!   elsewhere.
//! - home: everything under one directory, chosen with `--home` or
//!   `PANEBRIDGE_HOME`. Handy for running several bridges side by side.
//!
//! The layout is resolved once. Call [`set_layout`] before first access to pin it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable selecting the single-directory layout.
pub const HOME_ENV: &str = "PANEBRIDGE_HOME";

const APP_DIR: &str = "panebridge";

static LAYOUT: OnceLock<Layout> = OnceLock::new();

/// Resolved service directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub config: PathBuf,
    pub data: PathBuf,
    pub logs: PathBuf,
}

impl Layout {
    /// Everything under `root`: `config.toml`, `token`, `state/`, `logs/`.
    pub fn home(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config: root.to_path_buf(),
            data: root.to_path_buf(),
            logs: root.join("logs"),
        }
    }

    /// Platform directories via `dirs`, falling back to `.` when unknown.
    pub fn platform() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        #[cfg(target_os = "macos")]
        let logs = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Logs")
            .join(APP_DIR);
        #[cfg(not(target_os = "macos"))]
        let logs = data.join("logs");

        Self {
            config: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            data,
            logs,
        }
    }

    /// [`Layout::home`] if `PANEBRIDGE_HOME` is set and non-empty, else
    /// [`Layout::platform`].
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(root) if !root.is_empty() => Self::home(PathBuf::from(root)),
            _ => Self::platform(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    pub fn token_file(&self) -> PathBuf {
        self.config.join("token")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data.join("state")
    }

    pub fn event_log_file(&self) -> PathBuf {
        self.logs.join("events.log")
    }
}

/// Pin the layout. Returns `false` if it was already resolved.
pub fn set_layout(layout: Layout) -> bool {
    LAYOUT.set(layout).is_ok()
}

/// The active layout, resolving it from the environment on first use.
pub fn layout() -> &'static Layout {
    LAYOUT.get_or_init(Layout::from_env)
}

/// Default config file.
pub fn config_file() -> PathBuf {
    layout().config_file()
}

/// Default bearer token file.
pub fn token_file() -> PathBuf {
    layout().token_file()
}

/// Default job state directory.
pub fn state_dir() -> PathBuf {
    layout().state_dir()
}

/// Default audit event log.
pub fn event_log_file() -> PathBuf {
    layout().event_log_file()
}
