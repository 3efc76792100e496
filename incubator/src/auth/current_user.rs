use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{instrument, trace};

use super::{cookies::SessionCookies, resolver::resolve_profile, session::Session};
use crate::{
    AppState,
    api::models::profiles::{Profile, Role},
    config::IdentityConfig,
    db::models::profiles::ProfileDBResponse,
    errors::{Error, Result},
};

/// Profile resolved earlier in the request (by the authorization layer)
#[derive(Debug, Clone)]
pub struct ResolvedProfile(pub ProfileDBResponse);

/// The signed-in caller's active profile, created on first visit
#[derive(Debug, Clone)]
pub struct DashboardUser(pub Profile);

#[derive(Debug)]
pub enum AuthRejection {
    /// No usable session: send the browser to the login page
    LoginRedirect { location: String },
    /// Signed in with a deactivated profile. Answered with a 403 that also drops the session
    /// cookies, so the next visit lands on the login page instead of bouncing off it.
    Deactivated(SessionCookies),
    Failed(Error),
}

impl AuthRejection {
    pub fn deactivated(config: &IdentityConfig) -> Self {
        let mut cookies = SessionCookies::from_headers(&Default::default(), config);
        cookies.clear_session();
        AuthRejection::Deactivated(cookies)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRedirect { location } => Redirect::temporary(&location).into_response(),
            AuthRejection::Deactivated(cookies) => {
                let mut response = Error::AccountDeactivated.into_response();
                cookies.apply_to_response(response.headers_mut());
                response
            }
            AuthRejection::Failed(e) => e.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for DashboardUser {
    type Rejection = AuthRejection;

    #[instrument(skip_all, fields(path = %parts.uri.path()))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        if let Some(ResolvedProfile(profile)) = parts.extensions.get::<ResolvedProfile>() {
            trace!("Using profile resolved by the authorization layer");
            return Ok(DashboardUser(profile.clone().into()));
        }

        let login = || AuthRejection::LoginRedirect {
            location: state.routes.login_redirect_location(parts.uri.path()),
        };
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Err(login());
        };

        let profile = resolve_profile(state.identity.as_ref(), state.store.as_ref(), &session)
            .await
            .map_err(AuthRejection::Failed)?;

        match profile {
            Some(profile) if profile.is_active => {
                parts.extensions.insert(ResolvedProfile(profile.clone()));
                Ok(DashboardUser(profile.into()))
            }
            Some(_) => {
                trace!("Profile is deactivated");
                Err(AuthRejection::deactivated(&state.config.identity))
            }
            None => Err(login()),
        }
    }
}

/// Action-level role check
pub fn require_role(profile: &Profile, required: Role, action: &str) -> Result<()> {
    if profile.role.satisfies(required) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required,
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingProfileStore, ScriptedProvider, create_test_state, seed_profile, session_for};
    use crate::db::memory::InMemoryProfileStore;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use std::sync::Arc;

    fn parts(path: &str, session: Option<Session>) -> Parts {
        let (mut parts, _) = Request::builder().uri(path).body(()).unwrap().into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    fn profile(role: Role) -> Profile {
        Profile {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            full_name: None,
            avatar_url: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&profile(Role::Owner), Role::Owner, "change roles").is_ok());
        assert!(require_role(&profile(Role::Owner), Role::Viewer, "view").is_ok());
        let err = require_role(&profile(Role::Admin), Role::Owner, "change roles").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_no_session_redirects_to_login() {
        let state = create_test_state(ScriptedProvider::new(), Arc::new(InMemoryProfileStore::new()));
        let mut parts = parts("/showroom", None);

        let rejection = DashboardUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(
            rejection,
            AuthRejection::LoginRedirect { ref location } if location == "/login?redirect=%2Fshowroom"
        ));
    }

    #[tokio::test]
    async fn test_resolves_and_caches_profile() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let calls = provider.call_counter();
        let state = create_test_state(provider, Arc::new(InMemoryProfileStore::new()));
        let mut parts = parts("/showroom", Some(session_for("a1", "u1", "a@b.com")));

        let DashboardUser(first) = DashboardUser::from_request_parts(&mut parts, &state).await.unwrap();
        let DashboardUser(second) = DashboardUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.role, Role::Viewer);
        // Only the first extraction went to the provider
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inactive_profile_is_rejected() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = Arc::new(InMemoryProfileStore::new());
        seed_profile(&store, "u1", "a@b.com", Role::Admin, false);
        let state = create_test_state(provider, store);
        let mut parts = parts("/showroom", Some(session_for("a1", "u1", "a@b.com")));

        let rejection = DashboardUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(rejection, AuthRejection::Deactivated(_)));

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let cleared: Vec<_> = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().any(|c| c.starts_with("sb-access-token=;")));
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_store_error_is_surfaced() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let state = create_test_state(provider, Arc::new(FailingProfileStore::new()));
        let mut parts = parts("/showroom", Some(session_for("a1", "u1", "a@b.com")));

        let rejection = DashboardUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        let AuthRejection::Failed(err) = rejection else {
            panic!("expected a store failure");
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
