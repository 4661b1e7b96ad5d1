// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vet daemon (vetd)
//!
//! Long-running HTTP service that accepts evaluation requests, runs them
//! through the external engine with bounded concurrency, streams progress
//! to clients, and persists terminal results.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vet_daemon::engine_adapter::{CommandEngine, NullEngine};
use vet_daemon::{routes, AppState, ServiceConfig};
use vet_engine::Engine;
use vet_storage::JsonlStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("vetd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("vetd {}", env!("CARGO_PKG_VERSION"));
                println!("vet daemon - evaluation service with bounded job orchestration");
                println!();
                println!("USAGE:");
                println!("    vetd");
                println!();
                println!("Configuration comes from vet.toml (or VET_CONFIG) and VET_*");
                println!("environment variables; see the repository README.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: vetd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VET_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::load()?;
    info!(state_dir = %config.state_dir.display(), "starting vetd");

    let storage = Arc::new(JsonlStore::open(&config.state_dir)?);

    let engine = build_engine(config.engine_command.as_deref(), "engine");
    let remediation_engine =
        build_engine(config.remediation_command.as_deref(), "remediation engine");

    let state = AppState::new(
        config.clone(),
        engine,
        remediation_engine,
        Arc::clone(&storage) as _,
        storage as _,
    );

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("listening on http://{}", config.bind);

    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Streamers close client connections first, then the managers stop
    // their sweeps. In-flight engine work is not preempted.
    shutdown_state.shutdown();
    info!("vetd stopped");
    Ok(())
}

fn build_engine(command: Option<&str>, label: &str) -> Arc<dyn Engine> {
    match command.and_then(CommandEngine::from_command_line) {
        Some(engine) => Arc::new(engine),
        None => {
            warn!("no {label} command configured; submitted jobs will fail");
            Arc::new(NullEngine)
        }
    }
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to install SIGINT handler: {e}");
            std::future::pending::<()>().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }
}
