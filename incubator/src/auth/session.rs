//! Session resolution against the identity provider.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, info, instrument, warn};

use super::cookies::SessionCookies;
use super::provider::{Identity, IdentityProvider, ProviderError};
use crate::errors::Error;
use crate::types::abbrev_id;

/// The caller's validated identity and current token pair.
///
/// Inserted into request extensions by the session gate. Handlers and the profile resolver take
/// it explicitly instead of re-reading cookies.
#[derive(Clone)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })
    }
}

fn log_outage(operation: &str, err: &ProviderError) {
    warn!("Identity provider failed during {}, treating caller as signed out: {:#}", operation, err);
}

/// Resolve the caller's session from the jar.
///
/// The access token is validated with the provider. If the provider rejects it and a refresh token
/// is present, the session is refreshed and the new pair written to the jar. A rejected refresh
/// clears the session cookies. Provider outages leave the jar untouched and yield no session.
#[instrument(skip_all)]
pub async fn resolve_session(provider: &dyn IdentityProvider, cookies: &mut SessionCookies) -> Option<Session> {
    let access_token = cookies.access_token().map(str::to_owned);
    let refresh_token = cookies.refresh_token().map(str::to_owned);

    if let Some(access_token) = access_token {
        match provider.get_user(&access_token).await {
            Ok(identity) => {
                debug!(user_id = %abbrev_id(&identity.id), "Session valid");
                return Some(Session {
                    identity,
                    access_token,
                    refresh_token,
                });
            }
            Err(ProviderError::Rejected { status }) => {
                debug!(status, "Access token rejected");
            }
            Err(e) => {
                log_outage("token validation", &e);
                return None;
            }
        }
    }

    let refresh_token = refresh_token?;
    match provider.refresh_session(&refresh_token).await {
        Ok(session) => {
            info!(user_id = %abbrev_id(&session.user.id), "Session refreshed");
            cookies.set_session(&session.access_token, &session.refresh_token);
            Some(Session {
                identity: session.user,
                access_token: session.access_token,
                refresh_token: Some(session.refresh_token),
            })
        }
        Err(ProviderError::Rejected { status }) => {
            debug!(status, "Refresh token rejected, clearing session cookies");
            cookies.clear_session();
            None
        }
        Err(e) => {
            log_outage("session refresh", &e);
            None
        }
    }
}
