//! HTTP request handlers.
//!
//! - [`auth`]: login info, password sign-in, OAuth callback and sign-out
//! - [`profiles`]: the caller's own profile and profile administration
//!
//! Pages behind the gate take [`crate::auth::current_user::DashboardUser`], which resolves (and
//! on first visit creates) the caller's profile. Unauthenticated callers are redirected to the
//! login page rather than receiving an error status.

pub mod auth;
pub mod profiles;
