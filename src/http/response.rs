//! Response construction for proxy-generated replies.
//!
//! # Design Decisions
//! - Upstream responses are relayed untouched apart from hop-by-hop headers;
//!   only replies the proxy itself produces are built here
//! - Transport failures (including forward timeouts) map to 502 with a fixed
//!   body; no internal detail reaches the caller

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

pub const BAD_GATEWAY_BODY: &str = "Bad Gateway";

fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response {
    let mut response = (status, body.into()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn ok(body: &'static str) -> Response {
    plain_text(StatusCode::OK, body)
}

pub fn bad_gateway() -> Response {
    plain_text(StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY)
}

pub fn service_unavailable(body: String) -> Response {
    plain_text(StatusCode::SERVICE_UNAVAILABLE, body)
}

pub fn internal_error(body: &'static str) -> Response {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, body)
}
