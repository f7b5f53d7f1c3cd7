//! Health endpoints.
//!
//! # Data Flow
//! ```text
//! GET /health → liveness, always 200 "OK", touches nothing
//! GET /ready  → probe.rs: one bounded GET to <upstream>/health
//!             → 200 "Ready" or 503 with a short reason
//! ```
//!
//! # Design Decisions
//! - Liveness attests only that this process is serving
//! - Readiness re-probes on every call; no caching, no background checks
//! - A failed probe is never retried

pub mod probe;

use std::sync::Arc;

use axum::{extract::State, response::Response};

use crate::http::response;
use crate::observability::metrics;

pub use probe::{ProbeError, ReadinessProbe};

pub async fn liveness() -> Response {
    response::ok("OK")
}

pub async fn readiness(State(probe): State<Arc<ReadinessProbe>>) -> Response {
    match probe.check().await {
        Ok(()) => {
            metrics::record_ready_check(true);
            response::ok("Ready")
        }
        Err(e) => {
            metrics::record_ready_check(false);
            tracing::warn!(error = %e, "Readiness check failed");
            response::service_unavailable(probe.describe(&e))
        }
    }
}
