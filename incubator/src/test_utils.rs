//! Test utilities (available with `test-utils` feature).

use crate::{
    AppState,
    api::models::profiles::Role,
    auth::{
        provider::{AuthSession, Identity, IdentityProvider, ProviderError, ProviderResult},
        routes::RouteTable,
        session::Session,
    },
    config::Config,
    db::{
        errors::{DbError, Result as DbResult},
        handlers::ProfileFilter,
        memory::InMemoryProfileStore,
        models::profiles::{
            ProfileAccessUpdateDBRequest, ProfileDBResponse, ProfileDetailsUpdateDBRequest, ProfileLookup, ProfileRow,
            ProfileUpsertDBRequest,
        },
        store::ProfileStore,
    },
};
use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::{
    Arc, Mutex, Once,
    atomic::{AtomicUsize, Ordering},
};
use url::Url;

/// Install the rustls crypto provider once per test binary
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.identity.url = Some(Url::parse("http://localhost:9999").expect("valid test url"));
    config.identity.anon_key = Some("test-anon-key".to_string());
    config.identity.oauth_providers = vec!["github".to_string()];
    config
}

fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: email.to_string(),
        user_metadata: serde_json::Value::Null,
    }
}

fn auth_session(access_token: &str, refresh_token: &str, user: Identity) -> AuthSession {
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        user,
    }
}

/// Identity provider that answers from fixed tables.
///
/// Unknown tokens, codes and credentials are rejected with a 401. An `unavailable` provider
/// fails every call as an outage would.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    users: Arc<DashMap<String, Identity>>,
    refreshes: Arc<DashMap<String, AuthSession>>,
    passwords: Arc<DashMap<(String, String), AuthSession>>,
    codes: Arc<DashMap<String, AuthSession>>,
    calls: Arc<AtomicUsize>,
    sign_outs: Arc<Mutex<Vec<String>>>,
    unavailable: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Accept `access_token` as belonging to the given identity
    pub fn with_user(self, access_token: &str, id: &str, email: &str) -> Self {
        self.users.insert(access_token.to_string(), identity(id, email));
        self
    }

    /// Accept `refresh_token`, handing out a new pair whose access token is also valid
    pub fn with_refresh(self, refresh_token: &str, new_access: &str, new_refresh: &str, id: &str, email: &str) -> Self {
        let session = auth_session(new_access, new_refresh, identity(id, email));
        self.refreshes.insert(refresh_token.to_string(), session);
        self.with_user(new_access, id, email)
    }

    pub fn with_password(self, email: &str, password: &str, access: &str, refresh: &str, id: &str) -> Self {
        let session = auth_session(access, refresh, identity(id, email));
        self.passwords.insert((email.to_string(), password.to_string()), session);
        self.with_user(access, id, email)
    }

    pub fn with_code(self, code: &str, access: &str, refresh: &str, id: &str, email: &str) -> Self {
        let session = auth_session(access, refresh, identity(id, email));
        self.codes.insert(code.to_string(), session);
        self.with_user(access, id, email)
    }

    /// Number of provider calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, usable after the provider has been moved into app state
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Access tokens passed to `sign_out`, in order
    pub fn sign_out_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sign_outs.clone()
    }

    fn begin(&self) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ProviderError::InvalidResponse("scripted outage".to_string()));
        }
        Ok(())
    }
}

fn rejected() -> ProviderError {
    ProviderError::Rejected { status: 401 }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn get_user(&self, access_token: &str) -> ProviderResult<Identity> {
        self.begin()?;
        self.users.get(access_token).map(|u| u.clone()).ok_or_else(rejected)
    }

    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<AuthSession> {
        self.begin()?;
        self.refreshes.get(refresh_token).map(|s| s.clone()).ok_or_else(rejected)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthSession> {
        self.begin()?;
        self.passwords
            .get(&(email.to_string(), password.to_string()))
            .map(|s| s.clone())
            .ok_or_else(rejected)
    }

    async fn exchange_code(&self, auth_code: &str, _code_verifier: Option<&str>) -> ProviderResult<AuthSession> {
        self.begin()?;
        self.codes.get(auth_code).map(|s| s.clone()).ok_or_else(rejected)
    }

    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        self.begin()?;
        self.sign_outs
            .lock()
            .expect("sign-out log poisoned")
            .push(access_token.to_string());
        Ok(())
    }
}

/// Store whose every operation fails as a lost database connection would
#[derive(Debug, Default)]
pub struct FailingProfileStore {
    upserts: AtomicUsize,
}

impl FailingProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

fn connection_lost() -> DbError {
    DbError::Other(anyhow::anyhow!("connection refused"))
}

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn find_by_id(&self, _id: &str) -> DbResult<ProfileLookup> {
        Err(connection_lost())
    }

    async fn upsert(&self, _request: &ProfileUpsertDBRequest) -> DbResult<ProfileDBResponse> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Err(connection_lost())
    }

    async fn update_details(&self, _id: &str, _request: &ProfileDetailsUpdateDBRequest) -> DbResult<ProfileDBResponse> {
        Err(connection_lost())
    }

    async fn update_access(&self, _id: &str, _request: &ProfileAccessUpdateDBRequest) -> DbResult<ProfileDBResponse> {
        Err(connection_lost())
    }

    async fn list(&self, _filter: &ProfileFilter) -> DbResult<Vec<ProfileDBResponse>> {
        Err(connection_lost())
    }
}

/// A session as the gate would have resolved it
pub fn session_for(access_token: &str, id: &str, email: &str) -> Session {
    Session {
        identity: identity(id, email),
        access_token: access_token.to_string(),
        refresh_token: None,
    }
}

pub fn seed_profile(store: &InMemoryProfileStore, id: &str, email: &str, role: Role, is_active: bool) {
    let now = Utc::now();
    store.insert_row(ProfileRow {
        id: id.to_string(),
        email: email.to_string(),
        full_name: None,
        avatar_url: None,
        role: role.as_str().to_string(),
        created_at: now,
        updated_at: now,
        is_active: Some(is_active),
    });
}

pub fn create_test_state<S: ProfileStore + 'static>(provider: ScriptedProvider, store: Arc<S>) -> AppState {
    let config = create_test_config();
    let routes = RouteTable::new(&config.gate, &config.authorization);
    AppState::builder()
        .config(config)
        .identity(Arc::new(provider))
        .store(store)
        .routes(Arc::new(routes))
        .build()
}

pub fn create_test_router<S: ProfileStore + 'static>(provider: ScriptedProvider, store: Arc<S>) -> Router {
    crate::build_router(create_test_state(provider, store))
}
