// crates/aegisflux-registry/src/main.rs
// ============================================================================
// Module: Registry Service Entry Point
// Description: Wires the agent, artifact, and assignment stores with HTTP.
// Purpose: Run the registry as a long-lived service process.
// Dependencies: aegisflux-registry, clap, tokio, tracing
// ============================================================================

//! ## Overview
//! The registry serves agent registration, artifact storage, and bundle
//! assignment over HTTP until SIGINT/SIGTERM. The development signer is
//! wired explicitly; deployments with a production trust root replace it at
//! build time, and there is no unsigned fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aegisflux_registry::AgentRegistry;
use aegisflux_registry::ArtifactStore;
use aegisflux_registry::AssignmentStore;
use aegisflux_registry::DevSigner;
use aegisflux_registry::http::ApiState;
use aegisflux_registry::http::router;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Registry service configuration.
#[derive(Debug, Parser)]
#[command(name = "aegisflux-registry", about = "AegisFlux agent and artifact registry")]
struct Args {
    /// HTTP listen address.
    #[arg(long, env = "REGISTRY_HTTP_ADDR", default_value = "0.0.0.0:8083")]
    http_addr: String,
    /// Artifact storage root.
    #[arg(long, env = "ARTIFACT_DATA_DIR", default_value = "artifacts")]
    data_dir: PathBuf,
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
            tracing::error!(error = %err, "registry terminated");
            ExitCode::FAILURE
        }
    }
}

/// Builds and runs the service until shutdown.
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(ApiState {
        agents: AgentRegistry::new(),
        artifacts: ArtifactStore::new(&args.data_dir, Arc::new(DevSigner)),
        assignments: AssignmentStore::new(),
    });
    let listener = tokio::net::TcpListener::bind(&args.http_addr).await?;
    tracing::info!(addr = %args.http_addr, data_dir = %args.data_dir.display(), "http listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("registry stopped");
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
