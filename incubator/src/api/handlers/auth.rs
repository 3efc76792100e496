//! Session endpoints: the public routes of the gate.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info, warn};

use crate::{
    AppState,
    api::models::{
        actions::{ActionFailure, ActionResponse},
        auth::{CallbackQuery, LoginInfo, LoginQuery, LoginRequest, LoginSuccess},
    },
    auth::{cookies::SessionCookies, provider::ProviderError},
    errors::Error,
    types::abbrev_id,
};

/// A post-login destination, if it is a local path. Anything else falls back.
pub fn safe_redirect(candidate: Option<&str>, fallback: &str) -> String {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => fallback.to_string(),
    }
}

fn with_cookies(cookies: &SessionCookies, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    cookies.apply_to_response(response.headers_mut());
    response
}

/// Get login page information
#[utoipa::path(
    get,
    path = "/login",
    tag = "session",
    params(LoginQuery),
    responses(
        (status = 200, description = "Sign-in options", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Json<LoginInfo> {
    Json(LoginInfo {
        providers: state.config.identity.oauth_providers.clone(),
        redirect: safe_redirect(query.redirect.as_deref(), state.routes.landing_path()),
    })
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "session",
    responses(
        (status = 200, description = "Signed in; session cookies set", body = ActionResponse<LoginSuccess>),
        (status = 400, description = "Missing fields or malformed body"),
        (status = 401, description = "Invalid credentials"),
        (status = 502, description = "Identity provider unavailable"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ActionFailure> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected login body: {}", rejection.body_text());
        Error::BadRequest {
            message: "Invalid request body".to_string(),
        }
    })?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(Error::BadRequest {
            message: "Email and password are required".to_string(),
        }
        .into());
    }

    let session = match state.identity.sign_in_with_password(request.email.trim(), &request.password).await {
        Ok(session) => session,
        Err(ProviderError::Rejected { .. }) => {
            return Err(Error::Unauthenticated {
                message: Some("Invalid email or password".to_string()),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %abbrev_id(&session.user.id), "Signed in with password");

    let mut cookies = SessionCookies::from_headers(&headers, &state.config.identity);
    cookies.set_session(&session.access_token, &session.refresh_token);

    let redirect = safe_redirect(request.redirect.as_deref(), state.routes.landing_path());
    Ok(with_cookies(&cookies, ActionResponse::ok(LoginSuccess { redirect })))
}

/// Complete an OAuth sign-in
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "session",
    params(CallbackQuery),
    responses(
        (status = 307, description = "Redirect to the requested page, or back to login on failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn auth_callback(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<CallbackQuery>) -> Response {
    let failed = || Redirect::temporary(&format!("{}?error=auth_callback_failed", state.routes.login_path())).into_response();

    if let Some(error) = &query.error {
        warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "OAuth provider returned an error"
        );
        return failed();
    }
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("OAuth callback without a code");
        return failed();
    };

    let mut cookies = SessionCookies::from_headers(&headers, &state.config.identity);
    let verifier = cookies.code_verifier().map(str::to_owned);
    match state.identity.exchange_code(code, verifier.as_deref()).await {
        Ok(session) => {
            info!(user_id = %abbrev_id(&session.user.id), "Signed in through OAuth callback");
            cookies.set_session(&session.access_token, &session.refresh_token);
            if verifier.is_some() {
                cookies.clear_code_verifier();
            }
            let next = safe_redirect(query.next.as_deref(), state.routes.landing_path());
            with_cookies(&cookies, Redirect::temporary(&next))
        }
        Err(e) => {
            warn!("Code exchange failed: {:#}", e);
            failed()
        }
    }
}

/// Sign out and clear the session cookies
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "session",
    responses(
        (status = 307, description = "Session cleared; redirect to login"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut cookies = SessionCookies::from_headers(&headers, &state.config.identity);
    if let Some(access_token) = cookies.access_token()
        && let Err(e) = state.identity.sign_out(access_token).await
    {
        // The cookies are cleared regardless; a stale provider session expires on its own
        warn!("Provider sign-out failed: {:#}", e);
    }
    cookies.clear_session();
    with_cookies(&cookies, Redirect::temporary(state.routes.login_path()))
}

/// Liveness probe
pub async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
