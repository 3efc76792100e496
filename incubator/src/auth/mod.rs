//! Authentication and authorization.
//!
//! Identity is owned by an external GoTrue-compatible provider; this service never inspects
//! tokens itself. Every request goes through two layers:
//!
//! 1. The **session gate** ([`middleware::session_gate`]) reads the session cookies, validates
//!    them with the provider (refreshing when the access token has expired), and either lets the
//!    request through or redirects it. Signed-in requests carry a [`session::Session`] extension.
//! 2. The **authorization layer** ([`middleware::authorize`]) looks the path up in the capability
//!    table and, for ruled paths, resolves the caller's profile and compares roles.
//!
//! Handlers take [`current_user::DashboardUser`] to get the caller's profile, which is created
//! on first visit by [`resolver::resolve_profile`].
//!
//! # Modules
//!
//! - [`cookies`]: request-scoped cookie jar mirrored onto request and response
//! - [`current_user`]: extractor for the caller's profile, plus action-level role checks
//! - [`gotrue`]: HTTP client for the identity provider
//! - [`middleware`]: gate and authorization middleware
//! - [`provider`]: the identity provider trait and its data types
//! - [`resolver`]: profile fetch-or-create
//! - [`routes`]: public routes, exclusions and the capability table
//! - [`session`]: session resolution and refresh

pub mod cookies;
pub mod current_user;
pub mod gotrue;
pub mod middleware;
pub mod provider;
pub mod resolver;
pub mod routes;
pub mod session;
