//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, probe routes, catch-all)
//!     → request.rs (request ID assigned and echoed)
//!     → observability::span (request span opened)
//!     → forward.rs (rewrite, inject trace + credential, send upstream)
//!     → response.rs (502 on transport failure)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{build_client, ForwardError, Forwarder, HttpClient, OutboundRequest};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
