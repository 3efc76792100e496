//! API request and response data models.
//!
//! API models are kept separate from the database models in [`crate::db::models`] so the wire
//! format and the storage format can evolve independently.
//!
//! - [`profiles`]: profiles, roles, and profile update requests
//! - [`auth`]: login, callback, and logout payloads
//! - [`actions`]: the `{ success, message, data }` envelope returned by mutations
//! - [`pagination`]: `skip`/`limit` query parameters

pub mod actions;
pub mod auth;
pub mod pagination;
pub mod profiles;
