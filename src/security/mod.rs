//! Header hygiene for relayed traffic.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → forwarder
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → client
//! ```

pub mod headers;
