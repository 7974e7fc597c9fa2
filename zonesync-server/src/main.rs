//! zonesync - headless daemon for unbound local-data clusters.
//!
//! A node runs the roles its configuration enables:
//! - master: authoritative record store behind a REST API on /api/*
//! - agent: periodic puller that regenerates unbound local-data files and
//!   SIGHUPs the local resolver
//!
//! Both roles may be active in the same process.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod state;
#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};
use state::AppState;
use zonesync_core::{RecordStore, SyncAgent, Watermark};
use zonesync_types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if matches!(cli.command, Some(Commands::CheckConfig)) {
        println!("configuration ok: {}", cli.config.display());
        return Ok(());
    }

    let _log_guard = init_tracing(&cli, &config)?;

    if config.master.is_none() && config.agent.is_none() {
        bail!(
            "neither a [master] nor an [agent] section is present in {}; nothing to run",
            cli.config.display()
        );
    }

    let cancel = CancellationToken::new();

    let agent_task = match &config.agent {
        Some(agent_config) => {
            let agent = SyncAgent::new(agent_config.clone(), Watermark::default())
                .context("failed to initialize sync agent")?;
            Some(tokio::spawn(agent.run(cancel.clone())))
        }
        None => None,
    };

    if let Some(master_config) = &config.master {
        let store = RecordStore::connect(&master_config.database)
            .await
            .with_context(|| {
                format!("failed to open database {}", master_config.database.display())
            })?;
        let state = AppState::new(store, master_config.default_ttl);
        let app = build_router(state);

        let addr: SocketAddr = format!("{}:{}", master_config.bind, master_config.port)
            .parse()
            .with_context(|| {
                format!("invalid bind address {}:{}", master_config.bind, master_config.port)
            })?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("master API listening on http://{addr}/api/");

        let shutdown_cancel = cancel.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                shutdown_cancel.cancel();
            })
            .await?;
    } else {
        // Agent-only process: block on the shutdown signal ourselves.
        shutdown_signal().await;
        cancel.cancel();
    }

    if let Some(task) = agent_task {
        task.await.context("sync agent task panicked")?;
    }

    info!("shutdown complete");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("failed to read config file {}", cli.config.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", cli.config.display()))
}

/// Install the global subscriber. The returned guard must stay alive for the
/// lifetime of the process when logging to a file.
fn init_tracing(
    cli: &Cli,
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("invalid log level filter {level:?}"))?;

    match &config.log.file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log file path {} has no file name", path.display()))?;
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::router())
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
