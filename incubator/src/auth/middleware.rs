use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, trace};

use super::{
    cookies::SessionCookies,
    current_user::{AuthRejection, ResolvedProfile},
    resolver::resolve_profile,
    routes::GateDecision,
    session::{Session, resolve_session},
};
use crate::{AppState, errors::Error};

/// Session gate. Runs on every request that is not excluded.
///
/// Resolves the caller's session, mirrors any cookie changes onto the request and the response,
/// and either lets the request through (with a [`Session`] extension when signed in) or redirects.
pub async fn session_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if state.routes.is_excluded(&path) {
        trace!(path, "Gate bypassed for excluded path");
        return next.run(request).await;
    }

    let mut cookies = SessionCookies::from_headers(request.headers(), &state.config.identity);
    let session = resolve_session(state.identity.as_ref(), &mut cookies).await;
    cookies.apply_to_request(request.headers_mut());

    let mut response = match state.routes.decide(&path, session.is_some()) {
        GateDecision::Allow => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        GateDecision::RedirectToLogin { location } | GateDecision::RedirectToLanding { location } => {
            Redirect::temporary(&location).into_response()
        }
    };

    cookies.apply_to_response(response.headers_mut());
    response
}

/// Enforces the capability table. Must run inside the session gate.
///
/// Paths without a rule pass straight through. For ruled paths the profile is resolved once and
/// cached in the request extensions for the dashboard extractor.
pub async fn authorize(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if state.routes.is_excluded(&path) {
        return next.run(request).await;
    }
    let Some(required) = state.routes.required_role(&path) else {
        return next.run(request).await;
    };

    let login = || Redirect::temporary(&state.routes.login_redirect_location(&path)).into_response();
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return login();
    };

    match resolve_profile(state.identity.as_ref(), state.store.as_ref(), &session).await {
        Ok(Some(profile)) if profile.is_active => {
            if !profile.role.satisfies(required) {
                return Error::InsufficientPermissions {
                    required,
                    action: format!("access {path}"),
                }
                .into_response();
            }
            debug!(path, role = %profile.role, "Authorized");
            request.extensions_mut().insert(ResolvedProfile(profile));
            next.run(request).await
        }
        Ok(Some(_)) => {
            debug!(path, "Profile is deactivated");
            AuthRejection::deactivated(&state.config.identity).into_response()
        }
        Ok(None) => login(),
        Err(e) => e.into_response(),
    }
}
