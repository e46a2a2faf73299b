//! Centralized configuration constants for panebridge.
//!
//! Defaults used when `config.toml` leaves a key unset, plus hard limits
//! applied after parsing.

/// HTTP listener defaults.
pub mod server {
    /// Loopback only unless the operator opts in.
    pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
    /// Default TCP port.
    pub const DEFAULT_PORT: u16 = 8008;
}

/// Terminal multiplexer targeting.
pub mod tmux {
    /// Default `session:window.pane` target.
    pub const DEFAULT_TARGET: &str = "claude:0.0";
    /// Default multiplexer executable, resolved through `PATH`.
    pub const DEFAULT_BINARY: &str = "tmux";
}

/// Capture window and pane read-back.
pub mod capture {
    /// Lines of scrollback read back after the wait window.
    pub const DEFAULT_MAX_LINES: usize = 2000;
    /// Upper bound for `max-capture-lines`.
    pub const MAX_LINES_LIMIT: usize = 100_000;
    /// Delay between injection and capture when the caller gives none.
    pub const DEFAULT_DELAY_MS: u64 = 1500;
    /// Longest wait window a request may ask for.
    pub const DEFAULT_MAX_WAIT_MS: u64 = 120_000;
}

/// Job results as returned over HTTP.
pub mod jobs {
    /// Characters of captured output echoed back in the submit response.
    pub const DEFAULT_PREVIEW_CHARS: usize = 2000;
    /// Lines returned by the tail endpoint when `lines` is omitted.
    pub const DEFAULT_TAIL_LINES: usize = 400;
    /// Advisory mode recorded when the caller gives none.
    pub const DEFAULT_MODE: &str = "ask";
    /// Longest accepted caller-supplied job id.
    pub const MAX_ID_LENGTH: usize = 64;
    /// Length of ids derived from content hash.
    pub const DERIVED_ID_LENGTH: usize = 12;
}

/// Settings file validation limits.
pub mod settings {
    /// Maximum settings file size in bytes (64 KB).
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;
    /// Maximum bearer token file size in bytes.
    pub const MAX_TOKEN_SIZE: u64 = 4 * 1024;
}
