//! HTTP client for a GoTrue-compatible identity provider (Supabase Auth).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::provider::{AuthSession, Identity, IdentityProvider, ProviderError, ProviderResult};
use crate::config::IdentityConfig;

#[derive(Debug, Clone)]
pub struct GoTrueClient {
    client: Client,
    base_url: Url,
    anon_key: Option<String>,
}

/// Makes sure a url has a trailing slash, so that `join` appends instead of replacing the last
/// path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

/// Map a non-success status. Only statuses where the provider refuses the credentials themselves
/// count as a rejection; rate limits, timeouts and server errors are outages.
fn status_error(status: StatusCode) -> ProviderError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY => ProviderError::Rejected { status: status.as_u16() },
        _ => ProviderError::InvalidResponse(format!("status {status}")),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("failed to decode body: {e}")))
}

impl GoTrueClient {
    pub fn new(base_url: Url, anon_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            anon_key,
        })
    }

    pub fn from_config(config: &IdentityConfig) -> anyhow::Result<Self> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("identity.url is not configured"))?;
        Ok(Self::new(base_url, config.anon_key.clone())?)
    }

    fn endpoint(&self, path: &str) -> ProviderResult<Url> {
        ensure_slash(&self.base_url)
            .join(path)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid provider URL: {e}")))
    }

    fn token_endpoint(&self, grant_type: &str) -> ProviderResult<Url> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);
        match &self.anon_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> ProviderResult<AuthSession> {
        let url = self.token_endpoint(grant_type)?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Unavailable)?;
        read_json(response).await
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    #[instrument(skip_all, err)]
    async fn get_user(&self, access_token: &str) -> ProviderResult<Identity> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(reqwest::Method::GET, url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ProviderError::Unavailable)?;
        let identity: Identity = read_json(response).await?;
        debug!(user_id = %crate::types::abbrev_id(&identity.id), "Access token validated");
        Ok(identity)
    }

    #[instrument(skip_all, err)]
    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<AuthSession> {
        self.grant("refresh_token", json!({ "refresh_token": refresh_token })).await
    }

    #[instrument(skip_all, err)]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthSession> {
        self.grant("password", json!({ "email": email, "password": password })).await
    }

    #[instrument(skip_all, err)]
    async fn exchange_code(&self, auth_code: &str, code_verifier: Option<&str>) -> ProviderResult<AuthSession> {
        self.grant("pkce", json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .await
    }

    #[instrument(skip_all, err)]
    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .request(reqwest::Method::POST, url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ProviderError::Unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{cookies::SessionCookies, session::resolve_session};
    use crate::test_utils::install_crypto_provider;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoTrueClient {
        install_crypto_provider();
        GoTrueClient::new(Url::parse(&server.uri()).unwrap(), Some("anon".to_string())).unwrap()
    }

    fn session_body(access: &str, refresh: &str) -> serde_json::Value {
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": refresh,
            "user": { "id": "u1", "email": "a@b.com", "user_metadata": { "name": "Ada" } }
        })
    }

    #[tokio::test]
    async fn test_get_user_sends_token_and_apikey() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer tok"))
            .and(header("apikey", "anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "a@b.com",
                "user_metadata": { "full_name": "Ada Lovelace" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = client(&server).get_user("tok").await.unwrap();
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.metadata_str("full_name"), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
            .mount(&server)
            .await;

        let err = client(&server).get_user("expired").await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 401 }));
    }

    #[tokio::test]
    async fn test_server_error_is_not_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).get_user("tok").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_throttling_is_not_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(408))
            .mount(&server)
            .await;

        let provider = client(&server);
        let err = provider.get_user("tok").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        let err = provider.refresh_session("r1").await.unwrap_err();
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn test_rate_limited_provider_keeps_session_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            axum::http::HeaderValue::from_static("sb-access-token=valid; sb-refresh-token=valid"),
        );
        let mut cookies = SessionCookies::from_headers(&headers, &IdentityConfig::default());

        let session = resolve_session(&client(&server), &mut cookies).await;
        assert!(session.is_none());
        assert!(!cookies.is_modified());
        assert!(cookies.set_cookie_values().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).get_user("tok").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        install_crypto_provider();
        // Port 9 (discard) on localhost is not expected to be listening
        let client = GoTrueClient::new(Url::parse("http://127.0.0.1:9").unwrap(), None).unwrap();
        let err = client.get_user("tok").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_refresh_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({ "refresh_token": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("a2", "r2")))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server).refresh_session("r1").await.unwrap();
        assert_eq!(session.access_token, "a2");
        assert_eq!(session.refresh_token, "r2");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({ "email": "a@b.com", "password": "hunter2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("a1", "r1")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let provider = client(&server);
        let session = provider.sign_in_with_password("a@b.com", "hunter2").await.unwrap();
        assert_eq!(session.access_token, "a1");

        let err = provider.sign_in_with_password("a@b.com", "wrong").await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(body_json(json!({ "auth_code": "c1", "code_verifier": "v1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("a1", "r1")))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server).exchange_code("c1", Some("v1")).await.unwrap();
        assert_eq!(session.refresh_token, "r1");
    }

    #[tokio::test]
    async fn test_sign_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).sign_out("tok").await.unwrap();
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
            .expect(1)
            .mount(&server)
            .await;

        install_crypto_provider();
        let base = Url::parse(&format!("{}/project", server.uri())).unwrap();
        let provider = GoTrueClient::new(base, None).unwrap();
        provider.get_user("tok").await.unwrap();
    }
}
