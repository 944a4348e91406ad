//! Fleet - binary entry point.
//!
//! ```text
//! main() -> Settings::load() -> init_tracing() -> Store::open()
//!        -> Fleet::new() -> fleet_server::serve() until Ctrl-C
//! ```

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    future, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fleet_config::{Settings, fleet_home};
use fleet_core::Fleet;
use fleet_server::App;
use fleet_store::Store;

fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = match log_file {
        Some(configured) => open_log_file(configured),
        None => (None, Vec::new()),
    };
    let (log_path, file_layer) = match log_file {
        Some((path, file)) => (
            Some(path),
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(env_filter)
        .init();

    if let Some(path) = log_path {
        tracing::info!(path = %path.display(), "Logging to file");
    }
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(configured: &Path) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(configured) {
        if let Some(parent) = candidate.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(configured: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![configured.to_path_buf()];

    // Fallback: ~/.fleet/logs/fleet.log
    if let Some(home) = fleet_home() {
        candidates.push(home.join("logs").join("fleet.log"));
    }

    // Last resort: ./.fleet/logs/fleet.log (useful in constrained environments)
    candidates.push(PathBuf::from(".fleet").join("logs").join("fleet.log"));

    candidates.dedup();
    candidates
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    init_tracing(settings.log_file.as_deref());
    tracing::info!(environment = settings.environment.as_str(), "Starting fleet");

    let store = Store::open(&settings.database_path)?;
    tracing::info!(path = %settings.database_path.display(), "Opened store");
    if let Some(name) = &settings.bootstrap_org {
        store.ensure_bootstrap_org(name)?;
    }

    let fleet = Fleet::new(store, &settings)?;
    let app = Arc::new(App::new(fleet, settings.server.max_body_bytes));

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    fleet_server::serve(listener, app, shutdown_signal()).await
}
