//! Liveness, readiness and forward-deadline behavior.

use std::time::Duration;

use axum::http::StatusCode;
use trace_proxy::{ProxyConfig, Role};

mod common;

async fn get(proxy: std::net::SocketAddr, path: &str) -> (StatusCode, String) {
    let res = common::client()
        .get(format!("http://{}{}", proxy, path))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn test_liveness_with_dead_upstream() {
    let (telemetry, _) = common::recording_telemetry();
    let config =
        ProxyConfig::for_target(Role::Trace, &format!("http://{}", common::unused_addr())).unwrap();
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    assert_eq!(get(proxy, "/health").await, (StatusCode::OK, "OK".to_string()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_ready_when_upstream_healthy() {
    let upstream = common::start_programmable_backend(|| async { (200, "OK".to_string()) }).await;
    let (telemetry, _) = common::recording_telemetry();
    let config = ProxyConfig::for_target(Role::Trace, &format!("http://{}", upstream)).unwrap();
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    assert_eq!(get(proxy, "/ready").await, (StatusCode::OK, "Ready".to_string()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_not_ready_on_unhealthy_status() {
    let upstream =
        common::start_programmable_backend(|| async { (503, "draining".to_string()) }).await;
    let (telemetry, _) = common::recording_telemetry();
    let config = ProxyConfig::for_target(Role::Trace, &format!("http://{}", upstream)).unwrap();
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    assert_eq!(
        get(proxy, "/ready").await,
        (StatusCode::SERVICE_UNAVAILABLE, "mcp-aggregator not healthy".to_string())
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_not_ready_on_refused_connection() {
    let (telemetry, _) = common::recording_telemetry();
    let config =
        ProxyConfig::for_target(Role::Trace, &format!("http://{}", common::unused_addr())).unwrap();
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    assert_eq!(
        get(proxy, "/ready").await,
        (StatusCode::SERVICE_UNAVAILABLE, "mcp-aggregator not ready".to_string())
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_not_ready_on_probe_timeout() {
    let upstream = common::start_silent_backend().await;
    let (telemetry, _) = common::recording_telemetry();
    let mut config = ProxyConfig::for_target(Role::Trace, &format!("http://{}", upstream)).unwrap();
    config.ready_timeout = Duration::from_millis(200);
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    assert_eq!(
        get(proxy, "/ready").await,
        (StatusCode::SERVICE_UNAVAILABLE, "mcp-aggregator not ready".to_string())
    );

    shutdown.trigger();
}

/// Forwarded calls carry a deadline: a hung upstream becomes a 502 once it
/// expires instead of holding the request open.
#[tokio::test]
async fn test_hung_upstream_hits_forward_deadline() {
    let upstream = common::start_silent_backend().await;
    let (telemetry, exporter) = common::recording_telemetry();
    let mut config = ProxyConfig::for_target(Role::Trace, &format!("http://{}", upstream)).unwrap();
    config.forward_timeout = Some(Duration::from_millis(300));
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    let (status, body) = get(proxy, "/slow").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "Bad Gateway");

    let spans = exporter.get_finished_spans().unwrap();
    assert!(spans[0]
        .attributes
        .iter()
        .any(|kv| kv.key.as_str() == "mcp.proxy.error"
            && kv.value.to_string().contains("did not respond")));

    shutdown.trigger();
}

/// With the deadline disabled the proxy waits on the upstream for as long
/// as it takes.
#[tokio::test]
async fn test_unbounded_forward_waits_on_hung_upstream() {
    let upstream = common::start_silent_backend().await;
    let (telemetry, _) = common::recording_telemetry();
    let mut config = ProxyConfig::for_target(Role::Trace, &format!("http://{}", upstream)).unwrap();
    config.forward_timeout = None;
    let (proxy, shutdown) = common::start_proxy(config, telemetry).await;

    let pending = tokio::time::timeout(Duration::from_secs(1), get(proxy, "/slow")).await;
    assert!(pending.is_err(), "Request should still be waiting on the upstream");

    shutdown.trigger();
}
