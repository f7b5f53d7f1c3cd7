//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Resolve the upstream target, falling back to the role default
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::args::ProxyArgs;
use crate::config::schema::{Role, UpstreamTarget};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("role {0} requires an upstream URL (UPSTREAM_URL)")]
    MissingTarget(Role),
    #[error("invalid upstream URL {url:?}: {reason}")]
    InvalidTarget { url: String, reason: String },
    #[error("listen port must be non-zero")]
    ZeroPort,
    #[error("readiness timeout must be non-zero")]
    ZeroReadyTimeout,
    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
    #[error("role {0} is not available in this build")]
    RoleUnavailable(Role),
}

/// Values that only exist once validation has succeeded.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub target: UpstreamTarget,
    pub metrics_address: Option<SocketAddr>,
}

pub(crate) fn validate_args(args: &ProxyArgs) -> Result<Resolved, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if args.role.injects_credential() && !cfg!(feature = "mock-credential") {
        errors.push(ValidationError::RoleUnavailable(args.role));
    }

    let legacy_target = match args.role {
        Role::Trace => args.mcp_server_url.as_deref(),
        Role::MockOauth => args.policy_guard_url.as_deref(),
    };
    let raw_target = [args.upstream_url.as_deref(), legacy_target]
        .into_iter()
        .flatten()
        .find(|url| !url.trim().is_empty())
        .or(args.role.default_target());
    let target = match raw_target {
        Some(raw) => match UpstreamTarget::parse(raw.trim()) {
            Ok(target) => Some(target),
            Err(e) => {
                errors.push(e);
                None
            }
        },
        None => {
            errors.push(ValidationError::MissingTarget(args.role));
            None
        }
    };

    if args.port == Some(0) {
        errors.push(ValidationError::ZeroPort);
    }

    if args.ready_timeout_secs == 0 {
        errors.push(ValidationError::ZeroReadyTimeout);
    }

    let metrics_address = match args.metrics_address.as_deref() {
        Some(raw) => match raw.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                errors.push(ValidationError::InvalidMetricsAddress(raw.to_string()));
                None
            }
        },
        None => None,
    };

    match target {
        Some(target) if errors.is_empty() => Ok(Resolved {
            target,
            metrics_address,
        }),
        _ => Err(errors),
    }
}
