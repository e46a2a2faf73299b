//! panebridge - HTTP bridge into a long-lived tmux pane
//!
//! Main entry point for the service.

use anyhow::{Context, Result};
use clap::Parser;
use dispatcher::{DispatchOptions, Dispatcher};
use http_api::AppState;
use jobs::{EventLog, JobStore};
use once_cell::sync::Lazy;
use pane::{PaneAdapter, TmuxPane};
use panebridge_paths::Layout;
use settings::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Service startup time for performance monitoring
static STARTUP_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Parser)]
#[command(name = "panebridge", version, about = "Relay HTTP commands into a tmux pane")]
struct Args {
    /// Keep config, token, state and logs under one directory
    /// (also `PANEBRIDGE_HOME`)
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Config file (default: <config-dir>/panebridge/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind, overriding `bind-address`
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Port to listen on, overriding `port`
    #[arg(long)]
    port: Option<u16>,
}

impl Args {
    /// Command-line flags take precedence over the config file.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config
    }
}

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var("PANEBRIDGE_DEBUG").is_ok()
}

/// Initialize the logging system.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if is_debug_mode() {
        "panebridge=trace,dispatcher=trace,pane=trace,jobs=trace,http_api=trace,info"
    } else {
        "panebridge=info,dispatcher=info,pane=info,jobs=info,http_api=info,settings=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(filter)
        .init();

    if is_debug_mode() {
        info!(
            "panebridge v{} starting up (DEBUG MODE ENABLED)",
            env!("CARGO_PKG_VERSION")
        );
        info!("Set RUST_LOG for custom log levels, e.g. RUST_LOG=dispatcher=trace");
    } else {
        info!("panebridge v{} starting up", env!("CARGO_PKG_VERSION"));
    }
}

/// Locate, create if needed, and parse the config file.
fn load_settings(args: &Args) -> Result<Config> {
    if let Some(home) = &args.home {
        panebridge_paths::set_layout(Layout::home(home));
    }
    debug!("Using directories {:?}", panebridge_paths::layout());

    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let path = panebridge_paths::config_file();
            settings::ensure_config_file(&path)?;
            path
        }
    };
    debug!("Loading config from {:?}", path);
    let config = settings::load_config(&path)?;
    Ok(args.apply(config))
}

/// Wire the pane, store and event log into the HTTP application.
fn build_app(config: &Config) -> Result<axum::Router> {
    let token_path = config.token_path();
    let token = settings::load_bearer_token(&token_path)
        .with_context(|| format!("Refusing to start without a bearer token ({:?})", token_path))?;

    let state_path = config.state_path();
    let store = JobStore::open(&state_path)
        .with_context(|| format!("Failed to open job store: {:?}", state_path))?;
    let events = EventLog::open(config.event_log_path())?;

    let pane: Arc<dyn PaneAdapter> = Arc::new(TmuxPane::new(
        config.tmux_binary.clone(),
        config.tmux_target.clone(),
    ));
    let dispatcher = Dispatcher::new(
        pane,
        store,
        Arc::new(events),
        DispatchOptions::from_config(config),
    );

    Ok(http_api::router(AppState::new(
        Arc::new(dispatcher),
        token,
        config.default_tail_lines,
    )))
}

/// Warn early if the target pane is missing. Not fatal: the session may be
/// started after the bridge.
async fn probe_pane(config: &Config) {
    let pane = TmuxPane::new(config.tmux_binary.clone(), config.tmux_target.clone());
    match pane.health_check().await {
        Ok(()) => info!("tmux target {} is reachable", config.tmux_target),
        Err(e) => warn!("tmux target not ready: {}", e),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let app = build_app(&config)?;
    probe_pane(&config).await;

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Listening on {} (target {}) after {:?}",
        addr,
        config.tmux_target,
        STARTUP_TIME.elapsed()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = *STARTUP_TIME;
    let args = Args::parse();

    init_logging();

    let config = load_settings(&args).inspect_err(|e| error!("{:#}", e))?;
    run(config).await.inspect_err(|e| error!("{:#}", e))
}
