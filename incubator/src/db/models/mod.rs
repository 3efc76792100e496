//! Database record models matching table schemas.
//!
//! - [`profiles`]: the `profiles` table, plus the request types the store accepts
//!
//! Rows are read into a raw struct first and converted into validated response types, so that
//! values the application does not understand (unknown role strings) surface as
//! [`DbError::InvalidValue`](crate::db::errors::DbError::InvalidValue) at the store boundary.

pub mod profiles;
