//! Database layer for data persistence and access.
//!
//! ```text
//! ┌──────────────┐
//! │   Handlers   │  (resolver, API handlers)
//! └──────┬───────┘
//!        │ Arc<dyn ProfileStore>
//!        ↓
//! ┌──────────────┐      ┌──────────────────────┐
//! │ PgProfileStore│ ───→ │ Profiles repository  │ ───→ PostgreSQL
//! └──────────────┘      └──────────────────────┘
//!   or InMemoryProfileStore (development)
//! ```
//!
//! # Modules
//!
//! - [`store`]: the [`ProfileStore`](store::ProfileStore) seam and its PostgreSQL implementation
//! - [`handlers`]: repositories operating on a borrowed SQLx connection
//! - [`models`]: database record structures and request types
//! - [`memory`]: in-process store for development
//! - [`errors`]: database-specific error types
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded through [`crate::migrator`]. They run on
//! startup when an external database is configured.

pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod store;
