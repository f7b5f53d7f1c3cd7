//! Readiness probing of the upstream.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode, Uri},
};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::forward::HttpClient;

const USER_AGENT: &str = "trace-proxy-readiness";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build probe request: {0}")]
    Build(#[from] axum::http::Error),
    #[error("upstream unreachable: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),
    #[error("upstream reported status {0}")]
    Unhealthy(StatusCode),
}

/// Checks the upstream's `/health` endpoint on demand.
pub struct ReadinessProbe {
    client: HttpClient,
    uri: Uri,
    timeout: Duration,
    downstream_name: String,
}

impl ReadinessProbe {
    pub fn new(config: &ProxyConfig, client: HttpClient) -> Result<Self, axum::http::Error> {
        Ok(Self {
            client,
            uri: config.target.health_uri()?,
            timeout: config.ready_timeout,
            downstream_name: config.downstream_name.clone(),
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// One GET against the upstream health endpoint. Only a 200 within the
    /// deadline counts as ready.
    pub async fn check(&self) -> Result<(), ProbeError> {
        let request = Request::get(self.uri.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Connect)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ProbeError::Unhealthy(status)),
        }
    }

    /// Caller-facing reason for a failed probe.
    pub fn describe(&self, err: &ProbeError) -> String {
        match err {
            ProbeError::Unhealthy(_) => format!("{} not healthy", self.downstream_name),
            _ => format!("{} not ready", self.downstream_name),
        }
    }
}
