//! Per-request span annotation.
//!
//! Every proxied request runs inside one server span. The span is opened
//! before the forwarder sees the request, handed to it through the request
//! extensions, and ended when the handler returns, whichever way it exits.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};

use crate::config::ProxyConfig;
use crate::http::request::request_id;
use crate::observability::Telemetry;

/// Trace context of the current request, inserted into the request
/// extensions by [`annotate`].
#[derive(Clone, Debug)]
pub struct RequestTrace(pub Context);

/// State for the [`annotate`] middleware.
#[derive(Clone)]
pub struct Annotator {
    telemetry: Telemetry,
    span_name: &'static str,
    service_key: String,
    downstream_name: String,
}

impl Annotator {
    pub fn new(telemetry: Telemetry, config: &ProxyConfig) -> Self {
        Self {
            telemetry,
            span_name: config.role.span_name(),
            service_key: format!("{}.service", config.role.attribute_prefix()),
            downstream_name: config.downstream_name.clone(),
        }
    }

    /// Open the span for `request`, continuing any trace its headers carry.
    pub fn start(&self, request: &Request) -> RequestSpan {
        let parent = self.telemetry.extract(request.headers());
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let mut attributes = vec![
            KeyValue::new("http.method", request.method().to_string()),
            KeyValue::new("http.url", request.uri().to_string()),
            KeyValue::new("http.user_agent", user_agent.to_string()),
            KeyValue::new(self.service_key.clone(), self.downstream_name.clone()),
        ];
        if let Some(id) = request_id(request.headers()) {
            attributes.push(KeyValue::new("http.request_id", id.to_string()));
        }

        RequestSpan {
            cx: self.telemetry.start_span(self.span_name, &parent, attributes),
        }
    }
}

/// An open request span. Ends the span when dropped, so it is closed on
/// every exit path including handler panics and client disconnects.
#[derive(Debug)]
pub struct RequestSpan {
    cx: Context,
}

impl RequestSpan {
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn finish(self, status: StatusCode) {
        self.cx
            .span()
            .set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    }
}

impl Drop for RequestSpan {
    fn drop(&mut self) {
        self.cx.span().end();
    }
}

/// Middleware wrapping the catch-all proxy route.
pub async fn annotate(State(annotator): State<Annotator>, mut request: Request, next: Next) -> Response {
    let span = annotator.start(&request);
    request
        .extensions_mut()
        .insert(RequestTrace(span.context().clone()));

    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );

    let response = next.run(request).await;
    span.finish(response.status());
    response
}
