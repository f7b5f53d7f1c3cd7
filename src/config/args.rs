//! Command line and environment parsing.

use clap::Parser;

use crate::config::schema::{LogFormat, Role};

/// Raw startup arguments. Every flag can also be supplied through the
/// environment variable named next to it.
#[derive(Debug, Clone, Parser)]
#[command(name = "trace-proxy", version, about = "Tracing reverse proxy for a single upstream")]
pub struct ProxyArgs {
    /// Deployment role; selects the defaults below and whether a mock
    /// credential is injected.
    #[arg(long, env = "PROXY_ROLE", value_enum, default_value_t = Role::Trace)]
    pub role: Role,

    /// Base URL of the upstream service every request is forwarded to.
    #[arg(long, env = "UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Upstream URL under the name older deployments of the `trace` role
    /// use. Ignored when `UPSTREAM_URL` is set.
    #[arg(long, env = "MCP_SERVER_URL", hide = true)]
    pub mcp_server_url: Option<String>,

    /// Upstream URL under the name older deployments of the `mock-oauth`
    /// role use. Ignored when `UPSTREAM_URL` is set.
    #[arg(long, env = "POLICY_GUARD_URL", hide = true)]
    pub policy_guard_url: Option<String>,

    /// Listen port.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Listen host.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// OTLP/HTTP collector base URL.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = "http://aspire-dashboard:18889")]
    pub otlp_endpoint: String,

    /// Service name reported to the tracing backend.
    #[arg(long, env = "OTEL_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Logical name of the upstream, recorded on spans and readiness bodies.
    #[arg(long, env = "DOWNSTREAM_SERVICE")]
    pub downstream_name: Option<String>,

    /// Deadline for the readiness probe against `<upstream>/health`.
    #[arg(long, env = "READY_TIMEOUT_SECS", default_value_t = 5)]
    pub ready_timeout_secs: u64,

    /// Deadline for forwarded calls. 0 leaves them unbounded.
    #[arg(long, env = "FORWARD_TIMEOUT_SECS", default_value_t = 30)]
    pub forward_timeout_secs: u64,

    /// Address for the Prometheus scrape endpoint. Disabled when unset.
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl ProxyArgs {
    /// Arguments with every optional value unset, as if started with an
    /// empty environment.
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            upstream_url: None,
            mcp_server_url: None,
            policy_guard_url: None,
            port: None,
            host: "0.0.0.0".to_string(),
            otlp_endpoint: "http://aspire-dashboard:18889".to_string(),
            service_name: None,
            downstream_name: None,
            ready_timeout_secs: 5,
            forward_timeout_secs: 30,
            metrics_address: None,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = ProxyArgs::try_parse_from([
            "trace-proxy",
            "--role",
            "mock-oauth",
            "--upstream-url",
            "http://upstream:9000",
            "--port",
            "9999",
            "--forward-timeout-secs",
            "0",
        ])
        .unwrap();

        assert_eq!(args.role, Role::MockOauth);
        assert_eq!(args.upstream_url.as_deref(), Some("http://upstream:9000"));
        assert_eq!(args.port, Some(9999));
        assert_eq!(args.forward_timeout_secs, 0);
        assert_eq!(args.ready_timeout_secs, 5);
    }

    #[test]
    fn test_legacy_upstream_flags() {
        let args = ProxyArgs::try_parse_from([
            "trace-proxy",
            "--mcp-server-url",
            "http://aggregator:9000/mcp",
            "--policy-guard-url",
            "http://policy-guard:8090",
        ])
        .unwrap();

        assert_eq!(args.upstream_url, None);
        assert_eq!(args.mcp_server_url.as_deref(), Some("http://aggregator:9000/mcp"));
        assert_eq!(args.policy_guard_url.as_deref(), Some("http://policy-guard:8090"));
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(ProxyArgs::try_parse_from(["trace-proxy", "--role", "gateway"]).is_err());
    }
}
