//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Session** (`/login`, `/auth/callback`, `/auth/logout`): sign-in, OAuth callback, sign-out.
//!   These are the public routes of the session gate.
//! - **Profile** (`/api/profile`): the caller's own profile.
//! - **Administration** (`/admin/api/profiles`): profile listing and access changes, guarded by
//!   the capability table.
//!
//! The OpenAPI document is served at `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
