//! TOML config file support.
//!
//! Config location: `~/.config/panebridge/config.toml`

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;

/// What to do with a caller's `workdir` annotation.
///
/// The hint never changes which pane is targeted; this only decides whether
/// anything about it reaches the terminal.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WorkdirHint {
    /// Inject `(workdir hint) <dir>` as a display-only line before the marker.
    #[default]
    Comment,
    /// Record the hint in the event log only.
    Ignore,
    /// Inject `cd <dir>` so the hint becomes a real directory change.
    #[serde(rename = "cd")]
    ChangeDirectory,
}

/// User-facing config parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// HTTP listener port.
    pub port: u16,
    /// tmux `session:window.pane` receiving commands.
    pub tmux_target: String,
    /// tmux executable.
    pub tmux_binary: String,
    /// Scrollback depth read back after the wait window.
    pub max_capture_lines: usize,
    /// Default wait window between injection and capture.
    pub capture_delay_ms: u64,
    /// Cap on any wait window, including per-request `wait_ms`.
    pub max_wait_ms: u64,
    /// Characters of output echoed in the submit response.
    pub preview_chars: usize,
    /// Lines returned by the tail endpoint when unspecified.
    pub default_tail_lines: usize,
    /// Mode recorded when the caller gives none.
    pub default_mode: String,
    /// Handling of caller-supplied workdir hints.
    pub workdir_hint: WorkdirHint,
    /// File holding the bearer token (defaults to `<config-dir>/token`).
    pub bearer_token_file: Option<PathBuf>,
    /// Job output directory (defaults to `<data-dir>/state`).
    pub state_dir: Option<PathBuf>,
    /// Audit event log (defaults to `<logs-dir>/events.log`).
    pub event_log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: constants::server::DEFAULT_BIND_ADDRESS.to_string(),
            port: constants::server::DEFAULT_PORT,
            tmux_target: constants::tmux::DEFAULT_TARGET.to_string(),
            tmux_binary: constants::tmux::DEFAULT_BINARY.to_string(),
            max_capture_lines: constants::capture::DEFAULT_MAX_LINES,
            capture_delay_ms: constants::capture::DEFAULT_DELAY_MS,
            max_wait_ms: constants::capture::DEFAULT_MAX_WAIT_MS,
            preview_chars: constants::jobs::DEFAULT_PREVIEW_CHARS,
            default_tail_lines: constants::jobs::DEFAULT_TAIL_LINES,
            default_mode: constants::jobs::DEFAULT_MODE.to_string(),
            workdir_hint: WorkdirHint::default(),
            bearer_token_file: None,
            state_dir: None,
            event_log_file: None,
        }
    }
}

impl Config {
    /// Clamp numeric settings into their supported ranges.
    pub fn sanitized(mut self) -> Self {
        let clamped = self
            .max_capture_lines
            .clamp(1, constants::capture::MAX_LINES_LIMIT);
        if clamped != self.max_capture_lines {
            tracing::warn!(
                "max-capture-lines {} out of range, using {}",
                self.max_capture_lines,
                clamped
            );
            self.max_capture_lines = clamped;
        }
        if self.capture_delay_ms > self.max_wait_ms {
            tracing::warn!(
                "capture-delay-ms {} exceeds max-wait-ms, using {}",
                self.capture_delay_ms,
                self.max_wait_ms
            );
            self.capture_delay_ms = self.max_wait_ms;
        }
        self
    }

    /// Default wait window as a `Duration`.
    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    /// Longest wait window any request gets.
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Resolved bearer token file.
    pub fn token_path(&self) -> PathBuf {
        self.bearer_token_file
            .clone()
            .unwrap_or_else(panebridge_paths::token_file)
    }

    /// Resolved job state directory.
    pub fn state_path(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(panebridge_paths::state_dir)
    }

    /// Resolved audit event log path.
    pub fn event_log_path(&self) -> PathBuf {
        self.event_log_file
            .clone()
            .unwrap_or_else(panebridge_paths::event_log_file)
    }
}

/// Default config file content with comments (generated on first launch).
pub const DEFAULT_CONFIG: &str = r#"# panebridge configuration
# Restart the service after editing.

# HTTP listener
bind-address = "127.0.0.1"
port = 8008

# tmux pane that receives commands (session:window.pane)
tmux-target = "claude:0.0"
# tmux-binary = "tmux"

# Lines of scrollback read back after the wait window
max-capture-lines = 2000

# Milliseconds to wait between injecting a command and reading the pane.
# Callers can override per request with `wait_ms`.
capture-delay-ms = 1500

# Upper bound on any wait window; larger `wait_ms` values are cut down to it
max-wait-ms = 120000

# Characters of output echoed back by POST /send
# preview-chars = 2000

# Lines returned by GET /jobs/{id}/tail when `lines` is omitted
# default-tail-lines = 400

# Mode recorded when the caller sends none
# default-mode = "ask"

# Caller `workdir` hints: "comment" (display-only line), "ignore", or "cd"
workdir-hint = "comment"

# bearer-token-file = "/path/to/token"
# state-dir = "/path/to/state"
# event-log-file = "/path/to/events.log"
"#;

/// Ensure the config file exists, creating a default if missing.
pub fn ensure_config_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write default config: {:?}", path))?;
    tracing::info!("Created default config at {:?}", path);
    Ok(())
}

/// Load and parse the config file. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config: {:?}", path));
        }
    };

    // Size guard
    if content.len() > constants::settings::MAX_FILE_SIZE as usize {
        bail!(
            "Config file too large ({} bytes, limit {})",
            content.len(),
            constants::settings::MAX_FILE_SIZE
        );
    }

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {:?}", path))?;
    Ok(config.sanitized())
}

/// Read the bearer token from `path`, trimming surrounding whitespace.
///
/// An empty token is an error: the service never runs unauthenticated.
pub fn load_bearer_token(path: &Path) -> Result<String> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Bearer token file not readable: {:?}", path))?;
    if metadata.len() > constants::settings::MAX_TOKEN_SIZE {
        bail!("Bearer token file too large: {:?}", path);
    }
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bearer token: {:?}", path))?
        .trim()
        .to_string();
    if token.is_empty() {
        bail!("Bearer token file is empty: {:?}", path);
    }
    Ok(token)
}
