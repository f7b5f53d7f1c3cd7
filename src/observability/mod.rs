//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → logging.rs (tracing subscriber, pretty or JSON)
//!     → telemetry.rs (tracer provider, OTLP exporter, propagator)
//!     → metrics.rs (optional Prometheus endpoint)
//!
//! Per request:
//!     → span.rs (open span, attach to request extensions)
//!     → http::forward (annotate, inject trace headers, record errors)
//!     → span.rs (record status, end span)
//! ```
//!
//! # Design Decisions
//! - Tracer and propagator live in an explicit [`Telemetry`] value passed
//!   to the components that need it; no process-global provider is set
//! - The exporter is flushed exactly once through [`TelemetryGuard`]
//! - Logs (tracing) and spans (OpenTelemetry) are independent pipelines

pub mod logging;
pub mod metrics;
pub mod span;
pub mod telemetry;

pub use span::{Annotator, RequestSpan, RequestTrace};
pub use telemetry::{Telemetry, TelemetryError, TelemetryGuard};
