//! Request forwarding to the upstream.
//!
//! # Pipeline
//! ```text
//! inbound request + request trace context
//!     → rewrite scheme/authority/path onto the target
//!     → strip hop-by-hop headers, add X-Forwarded-*
//!     → inject traceparent/tracestate/baggage
//!     → (mock-oauth role) set Authorization: Bearer <mock token>
//!     → annotate the request span
//!     → send, relay upstream response as-is
//! ```
//!
//! Steps before sending live in [`Forwarder::prepare`], which builds the
//! outbound request without any I/O. Only transport failures are errors;
//! upstream 4xx/5xx responses are relayed like any other.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, Version},
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use opentelemetry::trace::{Status, TraceContextExt};
use opentelemetry::{Context, KeyValue};
use thiserror::Error;

use crate::config::{ProxyConfig, UpstreamTarget};
use crate::credentials::CredentialSource;
use crate::http::response;
use crate::observability::{metrics, Telemetry};
use crate::security::headers::{set_forwarded, strip_hop_by_hop};

/// Client shared by the forwarder and the readiness probe. Speaks plain
/// HTTP or TLS depending on the target URI's scheme.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the upstream client, trusting the webpki root set.
pub fn build_client() -> Result<HttpClient, rustls::Error> {
    let connector = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream request: {0}")]
    Build(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// A request ready to leave the process.
#[derive(Debug)]
pub struct OutboundRequest {
    pub request: Request<Body>,
    pub credential_injected: bool,
}

/// Relays requests to the single configured upstream.
#[derive(Clone)]
pub struct Forwarder {
    target: UpstreamTarget,
    telemetry: Telemetry,
    client: HttpClient,
    credentials: Option<Arc<dyn CredentialSource>>,
    timeout: Option<Duration>,
    prefix: &'static str,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig, telemetry: Telemetry, client: HttpClient) -> Self {
        Self {
            target: config.target.clone(),
            telemetry,
            client,
            credentials: None,
            timeout: config.forward_timeout,
            prefix: config.role.attribute_prefix(),
        }
    }

    /// Attach a bearer token from `source` to every forwarded request.
    pub fn with_credentials(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(source);
        self
    }

    /// Transform an inbound request into the request sent upstream.
    ///
    /// `cx` is the request's trace context; its span receives the
    /// forwarding attributes and its identifiers are injected into the
    /// outbound headers.
    pub fn prepare(
        &self,
        inbound: Request<Body>,
        cx: &Context,
        client_ip: Option<IpAddr>,
    ) -> Result<OutboundRequest, ForwardError> {
        let (parts, body) = inbound.into_parts();
        let uri = self.target.rewrite(&parts.uri)?;

        let mut headers = parts.headers;
        let inbound_host = headers.remove(header::HOST);
        strip_hop_by_hop(&mut headers);
        set_forwarded(&mut headers, client_ip, inbound_host);
        if let Ok(host) = HeaderValue::from_str(self.target.authority().as_str()) {
            headers.insert(header::HOST, host);
        }

        // After the rewrite so nothing above can drop the trace headers.
        self.telemetry.inject(cx, &mut headers);

        let mut credential_injected = false;
        if let Some(source) = &self.credentials {
            match source.bearer_token() {
                Ok(token) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                    Ok(value) => {
                        headers.insert(header::AUTHORIZATION, value);
                        credential_injected = true;
                    }
                    Err(e) => tracing::error!(error = %e, "Mock token is not a valid header value"),
                },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to generate mock token, forwarding without it");
                }
            }
        }

        let span = cx.span();
        if credential_injected {
            span.set_attribute(KeyValue::new("oauth.token_generated", "true"));
        }
        span.set_attributes([
            KeyValue::new(format!("{}.target", self.prefix), self.target.to_string()),
            KeyValue::new(format!("{}.method", self.prefix), parts.method.to_string()),
            KeyValue::new(format!("{}.path", self.prefix), parts.uri.path().to_string()),
            KeyValue::new(
                format!("{}.credential_injected", self.prefix),
                credential_injected,
            ),
        ]);

        let mut request = Request::new(body);
        *request.method_mut() = parts.method;
        *request.uri_mut() = uri;
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = headers;

        Ok(OutboundRequest {
            request,
            credential_injected,
        })
    }

    /// Prepare and send `inbound`, returning the upstream response with its
    /// status, headers and streaming body intact.
    pub async fn forward(
        &self,
        inbound: Request<Body>,
        cx: &Context,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let outbound = self.prepare(inbound, cx, client_ip)?;

        tracing::debug!(
            uri = %outbound.request.uri(),
            credential_injected = outbound.credential_injected,
            "Forwarding request upstream"
        );

        let call = self.client.request(outbound.request);
        let upstream = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ForwardError::Timeout(limit))?,
            None => call.await,
        }
        .map_err(ForwardError::Upstream)?;

        let (mut parts, body) = upstream.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Forward `inbound`, turning transport failures into a 502 after
    /// recording them on the request span.
    pub async fn handle(
        &self,
        inbound: Request<Body>,
        cx: &Context,
        client_ip: Option<IpAddr>,
    ) -> Response<Body> {
        match self.forward(inbound, cx, client_ip).await {
            Ok(response) => response,
            Err(err) => {
                self.record_failure(cx, &err);
                response::bad_gateway()
            }
        }
    }

    fn record_failure(&self, cx: &Context, err: &ForwardError) {
        tracing::error!(target_url = %self.target, error = %err, "Proxy error");
        metrics::record_upstream_error();

        let span = cx.span();
        span.record_error(err);
        span.set_attribute(KeyValue::new(format!("{}.error", self.prefix), err.to_string()));
        span.set_status(Status::error(err.to_string()));
    }
}
