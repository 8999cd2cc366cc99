// crates/aegisflux-correlator/src/main.rs
// ============================================================================
// Module: Correlator Service Entry Point
// Description: Wires the rule engine, stores, bus, and HTTP surface.
// Purpose: Run the correlator as a long-lived service process.
// Dependencies: aegisflux-bus, aegisflux-correlator, clap, tokio, tracing
// ============================================================================

//! ## Overview
//! The service connects to the bus, loads and watches the rule directory,
//! starts the evaluator loop (queue group `correlator`), the override and
//! window sweepers, and the HTTP API, then runs until SIGINT/SIGTERM.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::NatsBus;
use aegisflux_bus::NatsBusConfig;
use aegisflux_correlator::CorrelatorEngine;
use aegisflux_correlator::CorrelatorMetrics;
use aegisflux_correlator::FindingPublisher;
use aegisflux_correlator::FindingStore;
use aegisflux_correlator::OverrideManager;
use aegisflux_correlator::PublisherConfig;
use aegisflux_correlator::RuleLoader;
use aegisflux_correlator::WindowBuffer;
use aegisflux_correlator::http::ApiState;
use aegisflux_correlator::http::router;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Correlator service configuration.
#[derive(Debug, Parser)]
#[command(name = "aegisflux-correlator", about = "AegisFlux correlation service")]
struct Args {
    /// Bus server URL.
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    nats_url: String,
    /// HTTP listen address.
    #[arg(long, env = "CORR_HTTP_ADDR", default_value = "0.0.0.0:8081")]
    http_addr: String,
    /// Directory of rule files.
    #[arg(long, env = "CORR_RULES_DIR", default_value = "rules")]
    rules_dir: PathBuf,
    /// Finding ring capacity.
    #[arg(long, env = "CORR_MAX_FINDINGS", default_value_t = aegisflux_correlator::store::DEFAULT_MAX_FINDINGS)]
    max_findings: usize,
    /// Dedup cache capacity.
    #[arg(long, env = "CORR_DEDUPE_CAP", default_value_t = aegisflux_correlator::dedup::DEFAULT_DEDUPE_CAP)]
    dedupe_cap: usize,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "correlator terminated");
            ExitCode::FAILURE
        }
    }
}

/// Builds and runs the service until shutdown.
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let bus: Arc<dyn Bus> = Arc::new(
        NatsBus::connect(NatsBusConfig {
            url: args.nats_url.clone(),
            ..NatsBusConfig::default()
        })
        .await?,
    );
    tracing::info!(url = %args.nats_url, "bus connected");

    let loader = RuleLoader::new(&args.rules_dir);
    match loader.load() {
        Ok(snapshot) => {
            tracing::info!(version = %snapshot.version, rules = snapshot.rules.len(), "rules loaded");
        }
        Err(err) => {
            tracing::warn!(error = %err, "initial rule load failed, starting with empty snapshot");
        }
    }

    let overrides = OverrideManager::new();
    let window = WindowBuffer::new();
    let store = Arc::new(FindingStore::new(args.max_findings));
    let metrics = Arc::new(CorrelatorMetrics::new());
    let publisher = FindingPublisher::new(Arc::clone(&bus), PublisherConfig::default());
    let engine = Arc::new(CorrelatorEngine::new(
        Arc::clone(&loader),
        Arc::clone(&overrides),
        Arc::clone(&window),
        Arc::clone(&store),
        publisher,
        Arc::clone(&metrics),
        args.dedupe_cap,
    ));

    tokio::spawn(Arc::clone(&loader).watch());
    tokio::spawn(Arc::clone(&overrides).run_sweeper());
    tokio::spawn(Arc::clone(&engine).run_window_sweeper());
    tokio::spawn(Arc::clone(&engine).run(Arc::clone(&bus)));

    let state = Arc::new(ApiState {
        store,
        loader,
        overrides,
        metrics,
        bus,
    });
    let listener = tokio::net::TcpListener::bind(&args.http_addr).await?;
    tracing::info!(addr = %args.http_addr, "http listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("correlator stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
