//! Configuration schema definitions.
//!
//! This module defines the resolved configuration for the proxy and the
//! per-role defaults applied when a value is not supplied.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use clap::ValueEnum;
use thiserror::Error;
use url::Url;

use crate::config::args::ProxyArgs;
use crate::config::validation::{validate_args, ValidationError};

/// Deployment role of a proxy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Trace propagation only. The upstream URL is mandatory.
    Trace,
    /// Trace propagation plus a freshly minted mock bearer token on every
    /// forwarded request.
    MockOauth,
}

impl Role {
    pub fn default_target(self) -> Option<&'static str> {
        match self {
            Role::Trace => None,
            Role::MockOauth => Some("http://mcp-policy-guard:8090"),
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Role::Trace => 8090,
            Role::MockOauth => 8080,
        }
    }

    pub fn default_service_name(self) -> &'static str {
        match self {
            Role::Trace => "mcp-policy-guard",
            Role::MockOauth => "mcp-oauth",
        }
    }

    pub fn default_downstream_name(self) -> &'static str {
        match self {
            Role::Trace => "mcp-aggregator",
            Role::MockOauth => "mcp-policy-guard",
        }
    }

    /// Name of the per-request span opened by the annotator.
    pub fn span_name(self) -> &'static str {
        match self {
            Role::Trace => "mcp-proxy-request",
            Role::MockOauth => "mcp-oauth-request",
        }
    }

    /// Namespace for role-specific span attributes.
    pub fn attribute_prefix(self) -> &'static str {
        match self {
            Role::Trace => "mcp.proxy",
            Role::MockOauth => "mcp.oauth",
        }
    }

    pub fn injects_credential(self) -> bool {
        matches!(self, Role::MockOauth)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Trace => f.write_str("trace"),
            Role::MockOauth => f.write_str("mock-oauth"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// The single upstream all traffic is relayed to.
///
/// Parsed once at startup; the URI pieces needed per request are
/// precomputed so forwarding never re-parses the URL.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    url: Url,
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamTarget {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidTarget {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            _ => return Err(invalid("scheme must be http or https")),
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            url,
            scheme,
            authority,
        })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite an inbound path and query onto this target. The target's
    /// base path is joined to the inbound path with exactly one slash, and
    /// both queries are kept when present.
    pub fn rewrite(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_path(self.url.path(), inbound.path());
        let query = match (self.url.query(), inbound.query()) {
            (Some(base), Some(extra)) if !base.is_empty() && !extra.is_empty() => {
                Some(format!("{}&{}", base, extra))
            }
            (Some(base), _) if !base.is_empty() => Some(base.to_string()),
            (_, Some(extra)) if !extra.is_empty() => Some(extra.to_string()),
            _ => None,
        };
        let path_and_query = match query {
            Some(query) => PathAndQuery::from_str(&format!("{}?{}", path, query))?,
            None => PathAndQuery::from_str(&path)?,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }

    /// URI of the upstream's own liveness endpoint.
    pub fn health_uri(&self) -> Result<Uri, axum::http::Error> {
        let path = join_path(self.url.path(), "/health");
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::from_str(&path)?)
            .build()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Error type for configuration resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolved, validated proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub role: Role,
    pub target: UpstreamTarget,
    /// Listener bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
    pub otlp_endpoint: String,
    pub service_name: String,
    pub downstream_name: String,
    pub ready_timeout: Duration,
    /// `None` leaves forwarded calls without a deadline.
    pub forward_timeout: Option<Duration>,
    pub metrics_address: Option<SocketAddr>,
    pub log_format: LogFormat,
}

impl ProxyConfig {
    /// Apply role defaults to the parsed arguments and validate the result.
    pub fn from_args(args: ProxyArgs) -> Result<Self, ConfigError> {
        let resolved = validate_args(&args).map_err(ConfigError::Invalid)?;
        let role = args.role;

        Ok(Self {
            role,
            target: resolved.target,
            bind_address: format!("{}:{}", args.host, args.port.unwrap_or(role.default_port())),
            otlp_endpoint: args.otlp_endpoint,
            service_name: args
                .service_name
                .unwrap_or_else(|| role.default_service_name().to_string()),
            downstream_name: args
                .downstream_name
                .unwrap_or_else(|| role.default_downstream_name().to_string()),
            ready_timeout: Duration::from_secs(args.ready_timeout_secs),
            forward_timeout: match args.forward_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            metrics_address: resolved.metrics_address,
            log_format: args.log_format,
        })
    }

    /// Configuration for a given role and upstream with every other value
    /// at its default.
    pub fn for_target(role: Role, upstream_url: &str) -> Result<Self, ConfigError> {
        let mut args = ProxyArgs::for_role(role);
        args.upstream_url = Some(upstream_url.to_string());
        Self::from_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "mock-credential")]
    #[test]
    fn test_mock_oauth_defaults() {
        let config = ProxyConfig::from_args(ProxyArgs::for_role(Role::MockOauth)).unwrap();
        assert_eq!(config.target.as_str(), "http://mcp-policy-guard:8090/");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.service_name, "mcp-oauth");
        assert_eq!(config.downstream_name, "mcp-policy-guard");
        assert_eq!(config.ready_timeout, Duration::from_secs(5));
        assert_eq!(config.forward_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_trace_defaults() {
        let config = ProxyConfig::for_target(Role::Trace, "http://aggregator:9000").unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8090");
        assert_eq!(config.service_name, "mcp-policy-guard");
        assert_eq!(config.downstream_name, "mcp-aggregator");
    }

    #[test]
    fn test_trace_role_requires_target() {
        let err = ProxyConfig::from_args(ProxyArgs::for_role(Role::Trace)).unwrap_err();
        let ConfigError::Invalid(errors) = err;
        assert!(matches!(errors.as_slice(), [ValidationError::MissingTarget(Role::Trace)]));
    }

    #[test]
    fn test_zero_forward_timeout_is_unbounded() {
        let mut args = ProxyArgs::for_role(Role::Trace);
        args.upstream_url = Some("http://aggregator:9000".into());
        args.forward_timeout_secs = 0;
        let config = ProxyConfig::from_args(args).unwrap();
        assert_eq!(config.forward_timeout, None);
    }

    #[test]
    fn test_rewrite_preserves_path_and_query() {
        let target = UpstreamTarget::parse("http://upstream:9000").unwrap();
        let uri: Uri = "/items?id=5".parse().unwrap();
        let rewritten = target.rewrite(&uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://upstream:9000/items?id=5");
    }

    #[test]
    fn test_rewrite_joins_base_path() {
        let target = UpstreamTarget::parse("http://upstream:9000/api/?v=2").unwrap();
        let uri: Uri = "/items?id=5".parse().unwrap();
        assert_eq!(
            target.rewrite(&uri).unwrap().to_string(),
            "http://upstream:9000/api/items?v=2&id=5"
        );

        let target = UpstreamTarget::parse("http://upstream/api").unwrap();
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(target.rewrite(&uri).unwrap().to_string(), "http://upstream/api/");
    }

    #[test]
    fn test_health_uri() {
        let target = UpstreamTarget::parse("http://upstream:9000").unwrap();
        assert_eq!(target.health_uri().unwrap().to_string(), "http://upstream:9000/health");

        let target = UpstreamTarget::parse("http://upstream:9000/svc").unwrap();
        assert_eq!(target.health_uri().unwrap().to_string(), "http://upstream:9000/svc/health");
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert!(UpstreamTarget::parse("not a url").is_err());
        assert!(UpstreamTarget::parse("/relative/path").is_err());
        assert!(UpstreamTarget::parse("ftp://upstream").is_err());
        assert!(UpstreamTarget::parse("http://[::1]:9000").is_ok());
    }

    #[test]
    fn test_https_target() {
        let config = ProxyConfig::for_target(Role::Trace, "https://upstream.example:8443/mcp").unwrap();
        let uri: Uri = "/tools?page=2".parse().unwrap();
        assert_eq!(
            config.target.rewrite(&uri).unwrap().to_string(),
            "https://upstream.example:8443/mcp/tools?page=2"
        );
        assert_eq!(
            config.target.health_uri().unwrap().to_string(),
            "https://upstream.example:8443/mcp/health"
        );

        // Default port stays implicit.
        let target = UpstreamTarget::parse("https://upstream.example").unwrap();
        assert_eq!(target.authority().as_str(), "upstream.example");
    }
}
