//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and begin accepting traffic
//! - Keep the trace exporter alive until the server has stopped
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last, after telemetry is in place

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{metrics, Telemetry, TelemetryError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize tracer: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("failed to build server: {0}")]
    Server(#[from] ServerError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the proxy until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    // Dropped on every return path below, flushing the exporter once.
    let (telemetry, _guard) = Telemetry::init(&config.otlp_endpoint, &config.service_name)?;

    if let Some(addr) = config.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %config.bind_address,
        role = %config.role,
        upstream = %config.target,
        "Proxy starting"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, telemetry)?;
    server
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Serve)?;

    Ok(())
}
