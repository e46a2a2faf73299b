//! Configuration system for panebridge.
//!
//! Provides compile-time defaults and TOML config file support.

pub mod constants;
pub mod file;

pub use file::{
    ensure_config_file, load_bearer_token, load_config, Config, WorkdirHint, DEFAULT_CONFIG,
};
