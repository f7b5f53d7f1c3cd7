//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, request logging, span annotation)
//! - Bind server to listener
//! - Forward everything that is not a probe to the upstream

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::Response,
    routing::{any, get},
    Router,
};
use opentelemetry::Context;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::health::{self, ReadinessProbe};
use crate::http::forward::{build_client, Forwarder};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::{metrics, span, Annotator, RequestTrace, Telemetry};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream TLS client: {0}")]
    Tls(#[from] rustls::Error),
    #[error("failed to build router: {0}")]
    Router(#[from] axum::http::Error),
}

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig, telemetry: Telemetry) -> Result<Self, ServerError> {
        let router = Self::build_router(&config, telemetry)?;
        Ok(Self {
            router,
            config: Arc::new(config),
        })
    }

    fn build_router(config: &ProxyConfig, telemetry: Telemetry) -> Result<Router, ServerError> {
        let client = build_client()?;

        let probe = Arc::new(ReadinessProbe::new(config, client.clone())?);
        let annotator = Annotator::new(telemetry.clone(), config);
        let forwarder = Forwarder::new(config, telemetry, client);

        let router: Router<AppState> = Router::new()
            .route("/health", get(health::liveness))
            .route("/ready", get(health::readiness).with_state(probe));

        #[cfg(feature = "mock-credential")]
        let (router, forwarder) = with_mock_credentials(config, router, forwarder);

        let proxied = any(proxy_handler)
            .layer(middleware::from_fn_with_state(annotator, span::annotate));

        Ok(router
            .route("/", proxied.clone())
            .route("/{*path}", proxied)
            .with_state(AppState {
                forwarder: Arc::new(forwarder),
            })
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer()))
    }

    /// Run the server until a shutdown signal arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            role = %self.config.role,
            upstream = %self.config.target,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(feature = "mock-credential")]
fn with_mock_credentials(
    config: &ProxyConfig,
    router: Router<AppState>,
    forwarder: Forwarder,
) -> (Router<AppState>, Forwarder) {
    use crate::credentials::mock::{token_handler, MockIssuer};
    use crate::credentials::CredentialSource;

    if !config.role.injects_credential() {
        return (router, forwarder);
    }

    let issuer: Arc<dyn CredentialSource> = Arc::new(MockIssuer::new());
    (
        router.route("/token", get(token_handler).with_state(issuer.clone())),
        forwarder.with_credentials(issuer),
    )
}

/// Catch-all handler: relay the request to the upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let cx = request
        .extensions()
        .get::<RequestTrace>()
        .map(|trace| trace.0.clone())
        .unwrap_or_else(Context::new);
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let response = state.forwarder.handle(request, &cx, client_ip).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
