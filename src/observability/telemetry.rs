//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the tracer provider and OTLP/HTTP exporter
//! - Extract trace context from incoming requests
//! - Propagate trace context (W3C trace-context + baggage) to upstream requests
//! - Create spans for proxy operations

use std::sync::Arc;

use axum::http::HeaderMap;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

/// Version reported in the `service.version` resource attribute.
pub const SERVICE_VERSION: &str = "1.0.0";

const TRACES_PATH: &str = "/v1/traces";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter for {endpoint}: {reason}")]
    Exporter { endpoint: String, reason: String },
}

/// Tracer and propagator shared by the annotator and the forwarder.
///
/// Cheap to clone. Built once at startup by [`Telemetry::init`], or from
/// any provider with [`Telemetry::from_provider`] (tests hand in a provider
/// backed by an in-memory exporter).
#[derive(Clone)]
pub struct Telemetry {
    tracer: SdkTracer,
    propagator: Arc<TextMapCompositePropagator>,
}

impl Telemetry {
    /// Build an always-sampling provider exporting over OTLP/HTTP through a
    /// batch processor. The returned guard flushes and shuts the exporter
    /// down when dropped.
    pub fn init(
        endpoint: &str,
        service_name: &str,
    ) -> Result<(Self, TelemetryGuard), TelemetryError> {
        let endpoint = traces_endpoint(endpoint);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|e| TelemetryError::Exporter {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .with_attribute(KeyValue::new("service.version", SERVICE_VERSION))
            .build();

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource)
            .build();

        tracing::info!(
            endpoint = %endpoint,
            service_name = %service_name,
            "Trace exporter initialized"
        );

        let telemetry = Self::from_provider(&provider, service_name);
        Ok((telemetry, TelemetryGuard { provider }))
    }

    pub fn from_provider(provider: &SdkTracerProvider, tracer_name: &str) -> Self {
        let propagator = TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]);

        Self {
            tracer: provider.tracer(tracer_name.to_string()),
            propagator: Arc::new(propagator),
        }
    }

    /// Context carried by the inbound headers. Without trace headers this
    /// is an empty context and the next span starts a fresh trace.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator.extract(&HeaderExtractor(headers))
    }

    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator.inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Start a server span as a child of `parent` and return the context
    /// that carries it.
    pub fn start_span(
        &self,
        name: &'static str,
        parent: &Context,
        attributes: Vec<KeyValue>,
    ) -> Context {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, parent);
        parent.with_span(span)
    }
}

/// Owns the tracer provider for the process lifetime.
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        match self.provider.shutdown() {
            Ok(()) => tracing::info!("Trace exporter flushed"),
            Err(e) => tracing::warn!(error = %e, "Error shutting down tracer provider"),
        }
    }
}

fn traces_endpoint(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with(TRACES_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, TRACES_PATH)
    }
}
