//! Tracing reverse proxy library.
//!
//! Relays every request to one upstream, continuing the caller's trace
//! (or starting one) and, in the `mock-oauth` role, attaching a mock
//! bearer token. Exposes `/health` and `/ready` probes alongside.

// Core subsystems
pub mod config;
pub mod http;

// Request enrichment
pub mod credentials;
pub mod security;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::{ProxyArgs, ProxyConfig, Role};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;
