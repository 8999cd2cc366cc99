// crates/aegisflux-decision/src/main.rs
// ============================================================================
// Module: Decision Service Entry Point
// Description: Wires config, the pipeline, the plan store, and HTTP.
// Purpose: Run the decision pipeline as a long-lived service process.
// Dependencies: aegisflux-bus, aegisflux-config, aegisflux-decision, clap
// ============================================================================

//! ## Overview
//! The service bootstraps live configuration (config API with env
//! fallback), connects to the bus, consumes `correlator.findings` (queue
//! group `decision`), and serves the plan HTTP API until SIGINT/SIGTERM.
//! No reasoner is wired by default; every stage runs its deterministic
//! path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::ExitCode;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::NatsBus;
use aegisflux_bus::NatsBusConfig;
use aegisflux_config::ConfigManager;
use aegisflux_config::ConfigSnapshot;
use aegisflux_decision::DecisionPipeline;
use aegisflux_decision::Explainer;
use aegisflux_decision::Planner;
use aegisflux_decision::PlanStore;
use aegisflux_decision::Segmenter;
use aegisflux_decision::http::ApiState;
use aegisflux_decision::http::router;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Decision service configuration.
#[derive(Debug, Parser)]
#[command(name = "aegisflux-decision", about = "AegisFlux decision pipeline service")]
struct Args {
    /// Bus server URL.
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    nats_url: String,
    /// HTTP listen address.
    #[arg(long, env = "DECISION_HTTP_ADDR", default_value = "0.0.0.0:8082")]
    http_addr: String,
    /// Config API base URL; env defaults apply when absent or down.
    #[arg(long, env = "CONFIG_API_URL")]
    config_api_url: Option<String>,
    /// Plan store capacity.
    #[arg(long, env = "DECISION_MAX_PLANS", default_value_t = aegisflux_decision::store::DEFAULT_PLAN_CAPACITY)]
    max_plans: usize,
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
            tracing::error!(error = %err, "decision terminated");
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

    let config =
        ConfigManager::bootstrap(args.config_api_url.as_deref(), ConfigSnapshot::from_env()).await;
    tokio::spawn(Arc::clone(&config).run(Arc::clone(&bus)));

    let store = PlanStore::new(args.max_plans, Arc::clone(&bus));
    tokio::spawn(Arc::clone(&store).run_sweeper());

    let pipeline = DecisionPipeline::new(
        Planner::new(None),
        Segmenter::new(None),
        Explainer::new(None),
        config,
        store,
        Arc::clone(&bus),
    );
    tokio::spawn(Arc::clone(&pipeline).run(Arc::clone(&bus)));

    let state = Arc::new(ApiState {
        pipeline,
        bus,
    });
    let listener = tokio::net::TcpListener::bind(&args.http_addr).await?;
    tracing::info!(addr = %args.http_addr, "http listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("decision stopped");
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
