//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction and exposes strongly-typed operations
//! returning models from [`crate::db::models`].
//!
//! ```ignore
//! use incubator::db::handlers::Profiles;
//!
//! let mut conn = pool.acquire().await?;
//! let mut repo = Profiles::new(&mut conn);
//! let lookup = repo.get_by_id("c0ffee").await?;
//! ```

pub mod profiles;

pub use profiles::{ProfileFilter, Profiles};
