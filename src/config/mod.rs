//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line flags / environment variables
//!     → args.rs (clap parse, every flag env-backed)
//!     → schema.rs (role defaults applied)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup and never mutated afterwards
//! - Unset values fall back to the defaults of the selected [`Role`]
//! - Validation returns every problem at once, not just the first

pub mod args;
pub mod schema;
pub mod validation;

pub use args::ProxyArgs;
pub use schema::{ConfigError, LogFormat, ProxyConfig, Role, UpstreamTarget};
pub use validation::ValidationError;
