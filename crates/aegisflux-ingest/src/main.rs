// crates/aegisflux-ingest/src/main.rs
// ============================================================================
// Module: Ingest Service Entry Point
// Description: Wires the schema validator, bus, gRPC, and health surfaces.
// Purpose: Run ingest as a long-lived service process.
// Dependencies: aegisflux-bus, aegisflux-ingest, clap, tokio, tonic
// ============================================================================

//! ## Overview
//! The service compiles the event schema, connects to the bus, and serves
//! the gRPC stream endpoint plus the health HTTP surface until
//! SIGINT/SIGTERM.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::NatsBus;
use aegisflux_bus::NatsBusConfig;
use aegisflux_ingest::IngestGrpc;
use aegisflux_ingest::IngestMetrics;
use aegisflux_ingest::IngestState;
use aegisflux_ingest::SchemaValidator;
use aegisflux_ingest::http::router;
use aegisflux_ingest::proto::ingest_service_server::IngestServiceServer;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Ingest service configuration.
#[derive(Debug, Parser)]
#[command(name = "aegisflux-ingest", about = "AegisFlux event ingestion service")]
struct Args {
    /// Bus server URL.
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    nats_url: String,
    /// gRPC listen address.
    #[arg(long, env = "INGEST_GRPC_ADDR", default_value = "0.0.0.0:50051")]
    grpc_addr: SocketAddr,
    /// Health HTTP listen address.
    #[arg(long, env = "INGEST_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    http_addr: String,
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
            tracing::error!(error = %err, "ingest terminated");
            ExitCode::FAILURE
        }
    }
}

/// Builds and runs the service until shutdown.
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let validator = SchemaValidator::compile()?;
    let bus: Arc<dyn Bus> = Arc::new(
        NatsBus::connect(NatsBusConfig {
            url: args.nats_url.clone(),
            ..NatsBusConfig::default()
        })
        .await?,
    );
    tracing::info!(url = %args.nats_url, "bus connected");

    let state = Arc::new(IngestState {
        validator,
        bus,
        metrics: Arc::new(IngestMetrics::new()),
    });

    let http_state = Arc::clone(&state);
    let http_addr = args.http_addr.clone();
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&http_addr).await {
            Ok(listener) => {
                tracing::info!(addr = %http_addr, "health http listening");
                if let Err(err) = axum::serve(listener, router(http_state)).await {
                    tracing::error!(error = %err, "health http stopped");
                }
            }
            Err(err) => tracing::error!(error = %err, "health http bind failed"),
        }
    });

    tracing::info!(addr = %args.grpc_addr, "grpc listening");
    tonic::transport::Server::builder()
        .add_service(IngestServiceServer::new(IngestGrpc::new(state)))
        .serve_with_shutdown(args.grpc_addr, shutdown_signal())
        .await?;
    tracing::info!("ingest stopped");
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
