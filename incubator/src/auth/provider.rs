//! Identity provider contract.
//!
//! The provider owns identities and issues opaque token pairs. Nothing here looks inside a token:
//! every identity check is a round-trip to the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A user as the identity provider knows them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_metadata: Value,
}

impl Identity {
    /// A non-empty string field from `user_metadata`
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Token pair plus the identity it belongs to, as returned by sign-in, refresh and code exchange
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Identity,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered and refused: bad credentials, expired or revoked token
    #[error("identity provider rejected the request (status {status})")]
    Rejected { status: u16 },

    /// The provider could not be reached
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    /// The provider answered with something we can't use (throttling, 5xx, malformed body)
    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. })
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate an access token and return its identity
    async fn get_user(&self, access_token: &str) -> ProviderResult<Identity>;

    /// Trade a refresh token for a new token pair
    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<AuthSession>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthSession>;

    /// Complete an OAuth/PKCE flow
    async fn exchange_code(&self, auth_code: &str, code_verifier: Option<&str>) -> ProviderResult<AuthSession>;

    /// Revoke the session the access token belongs to
    async fn sign_out(&self, access_token: &str) -> ProviderResult<()>;
}
