//! Tracing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────┐
//!                 │                      TRACE PROXY                      │
//!                 │                                                       │
//!  Client ───────▶│  request id ─▶ span annotator ─▶ forwarder ──────────┼──▶ Upstream
//!                 │                  (open span)      (rewrite, inject    │
//!                 │                                    trace + token)     │
//!  Client ◀───────┼─────────────── relay response / 502 ◀────────────────┼─── Upstream
//!                 │                                                       │
//!                 │  /health  always 200                                  │
//!                 │  /ready   GET <upstream>/health within 5s ───────────┼──▶ Upstream
//!                 │  /token   mock token (mock-oauth role)                │
//!                 └───────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use trace_proxy::config::{ProxyArgs, ProxyConfig};
use trace_proxy::lifecycle::startup;
use trace_proxy::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ProxyArgs::parse();
    logging::init(args.log_format);

    tracing::info!(role = %args.role, "trace-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match ProxyConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match startup::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
