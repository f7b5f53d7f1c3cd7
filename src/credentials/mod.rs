//! Credentials attached to forwarded requests.
//!
//! The forwarder only knows the [`CredentialSource`] seam. The one
//! implementation, [`mock::MockIssuer`], mints unsigned development tokens
//! and is compiled only with the `mock-credential` feature.

use thiserror::Error;

#[cfg(feature = "mock-credential")]
pub mod mock;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to generate signature bytes: {0}")]
    Entropy(#[from] rand::Error),
    #[error("failed to encode claims: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Supplies the bearer token set on each forwarded request.
pub trait CredentialSource: Send + Sync {
    /// A fresh token. Called once per forwarded request.
    fn bearer_token(&self) -> Result<String, CredentialError>;
}
