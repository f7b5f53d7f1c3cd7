//! Mock bearer tokens for local development.
//!
//! Tokens have the shape of a JWT (`header.payload.signature`, each
//! segment base64url without padding) but the signature segment is random
//! bytes. Nothing can verify them and nothing should try; they only satisfy
//! upstreams that insist on an `Authorization` header being present.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::{CredentialError, CredentialSource};
use crate::http::response;
use crate::observability::metrics;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const SIGNATURE_LEN: usize = 32;
const LIFETIME_SECS: i64 = 3600;
const TOKEN_NOTE: &str = "This is a mock token for development purposes";

/// Claims carried in the payload segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub groups: Vec<String>,
    pub email: String,
    pub name: String,
}

impl MockClaims {
    /// The fixed development identity, valid for one hour from `issued_at`.
    pub fn issued_at(issued_at: i64) -> Self {
        Self {
            iss: "https://mock-oauth-provider.com".to_string(),
            sub: "mock-user-123".to_string(),
            aud: "mcp-services".to_string(),
            exp: issued_at + LIFETIME_SECS,
            iat: issued_at,
            groups: vec![
                "admin".to_string(),
                "developers".to_string(),
                "mcp-users".to_string(),
            ],
            email: "mock.user@example.com".to_string(),
            name: "Mock User".to_string(),
        }
    }
}

/// Mints a new mock token per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockIssuer;

impl MockIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Mint a token issued now, signed with bytes from the OS RNG.
    pub fn mint(&self) -> Result<String, CredentialError> {
        self.mint_with(&mut OsRng, unix_now())
    }

    pub fn mint_with<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        issued_at: i64,
    ) -> Result<String, CredentialError> {
        let claims = serde_json::to_vec(&MockClaims::issued_at(issued_at))?;

        let mut signature = [0u8; SIGNATURE_LEN];
        rng.try_fill_bytes(&mut signature)?;

        let token = format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims),
            URL_SAFE_NO_PAD.encode(signature)
        );
        metrics::record_token_minted();
        Ok(token)
    }
}

impl CredentialSource for MockIssuer {
    fn bearer_token(&self) -> Result<String, CredentialError> {
        self.mint()
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// `GET /token`: a freshly minted token for inspection while debugging.
pub async fn token_handler(State(source): State<Arc<dyn CredentialSource>>) -> Response {
    match source.bearer_token() {
        Ok(token) => Json(json!({ "token": token, "note": TOKEN_NOTE })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate mock token");
            response::internal_error("Failed to generate token")
        }
    }
}
