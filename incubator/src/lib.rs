//! # incubator: control service for the Incubator OS dashboard
//!
//! `incubator` sits in front of the dashboard and decides, for every request, who the caller is
//! and whether they may proceed. Identity is owned by an external GoTrue-compatible provider
//! (Supabase Auth); this service keeps only the application-level *profile* that hangs off each
//! identity: display name, avatar, role and an activation flag.
//!
//! ## Request Flow
//!
//! Every request that is not a static asset passes through the **session gate**
//! ([`auth::middleware::session_gate`]). The gate reads the session cookies, asks the provider
//! whether the access token is still good and refreshes the pair when it is not. Whatever the
//! gate changed is mirrored onto the request (so handlers see the fresh tokens) and onto the
//! response as `Set-Cookie` headers. Signed-out callers are redirected to `/login` with the
//! original path preserved; signed-in callers visiting `/login` are sent to the landing page.
//!
//! Paths listed in the capability table then go through the **authorization layer**
//! ([`auth::middleware::authorize`]), which resolves the caller's profile (creating a `Viewer`
//! profile on first visit) and compares roles.
//!
//! ## Core Components
//!
//! - [`api`]: session endpoints and profile actions, with their request/response models
//! - [`auth`]: gate, authorization, provider client and profile resolution
//! - [`db`]: the [`ProfileStore`](db::store::ProfileStore) seam, PostgreSQL and in-memory stores
//! - [`config`]: figment-layered configuration
//! - [`errors`]: the service error type and its HTTP mapping
//! - [`telemetry`]: tracing subscriber and optional OTLP export
//!
//! ## Getting Started
//!
//! ```no_run
//! use clap::Parser;
//! use incubator::{Application, Config, config::Args};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//! Application::new(config).await?.serve(std::future::pending()).await
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;

use crate::{
    api::handlers::{auth as session_handlers, profiles},
    auth::{
        gotrue::GoTrueClient,
        middleware::{authorize, session_gate},
        provider::IdentityProvider,
        routes::RouteTable,
    },
    db::{
        memory::InMemoryProfileStore,
        store::{PgProfileStore, ProfileStore},
    },
    openapi::ApiDoc,
};

pub use config::Config;

/// Application state shared by the middleware and every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .identity(Arc::new(provider))
///     .store(store)
///     .routes(Arc::new(routes))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ProfileStore>,
    pub routes: Arc<RouteTable>,
}

/// Get the incubator database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the profile store for the configured database.
///
/// For an external database this connects the pool and runs migrations; the pool is returned so
/// the caller can close it on shutdown.
pub async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn ProfileStore>, Option<PgPool>)> {
    let Some(url) = config.database.external_url() else {
        info!("Using in-memory profile store; profiles are lost on shutdown");
        return Ok((Arc::new(InMemoryProfileStore::new()), None));
    };

    info!("Using external database");
    let settings = config.database.pool_settings();
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
        .connect(url)
        .await?;
    migrator().run(&pool).await?;

    Ok((Arc::new(PgProfileStore::new(pool.clone())), Some(pool)))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Build the application router.
///
/// The session gate is the outermost application layer; the authorization layer runs inside it so
/// it can rely on the gate's [`Session`](auth::session::Session) extension.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/healthz", get(session_handlers::healthz))
        .route("/login", get(session_handlers::get_login_info).post(session_handlers::login))
        .route("/auth/callback", get(session_handlers::auth_callback))
        .route("/auth/logout", get(session_handlers::logout).post(session_handlers::logout))
        .route("/api/profile", get(profiles::get_own_profile).patch(profiles::update_own_profile))
        .route("/admin/api/profiles", get(profiles::list_profiles))
        .route("/admin/api/profiles/{id}", patch(profiles::update_profile_access))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(not_found);

    router
        .layer(from_fn_with_state(state.clone(), authorize))
        .layer(from_fn_with_state(state.clone(), session_gate))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting incubator with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;
        let identity = GoTrueClient::from_config(&config.identity)?;
        let routes = RouteTable::new(&config.gate, &config.authorization);

        let state = AppState::builder()
            .config(config.clone())
            .identity(Arc::new(identity))
            .store(store)
            .routes(Arc::new(routes))
            .build();

        Ok(Self {
            router: build_router(state),
            config,
            pool,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Incubator listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
