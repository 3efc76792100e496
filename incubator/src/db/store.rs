//! The data store seam used by the profile resolver and the profile handlers.
//!
//! [`ProfileStore`] is implemented by [`PgProfileStore`] (PostgreSQL through the [`Profiles`]
//! repository) and by [`InMemoryProfileStore`](crate::db::memory::InMemoryProfileStore).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{
    errors::{DbError, Result},
    handlers::{ProfileFilter, Profiles},
    models::profiles::{
        ProfileAccessUpdateDBRequest, ProfileDBResponse, ProfileDetailsUpdateDBRequest, ProfileLookup, ProfileUpsertDBRequest,
    },
};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look a profile up by identity id
    async fn find_by_id(&self, id: &str) -> Result<ProfileLookup>;

    /// Insert a profile, or overwrite the non-key columns of the row with the same id.
    ///
    /// Must be atomic: concurrent upserts for one id converge on a single row.
    async fn upsert(&self, request: &ProfileUpsertDBRequest) -> Result<ProfileDBResponse>;

    /// Update display fields; [`DbError::NotFound`] when the profile does not exist
    async fn update_details(&self, id: &str, request: &ProfileDetailsUpdateDBRequest) -> Result<ProfileDBResponse>;

    /// Update role and activation; [`DbError::NotFound`] when the profile does not exist
    async fn update_access(&self, id: &str, request: &ProfileAccessUpdateDBRequest) -> Result<ProfileDBResponse>;

    /// List profiles ordered by creation time
    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileDBResponse>>;
}

/// [`ProfileStore`] backed by the `profiles` table
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_id(&self, id: &str) -> Result<ProfileLookup> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Profiles::new(&mut conn).get_by_id(id).await
    }

    async fn upsert(&self, request: &ProfileUpsertDBRequest) -> Result<ProfileDBResponse> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Profiles::new(&mut conn).upsert(request).await
    }

    async fn update_details(&self, id: &str, request: &ProfileDetailsUpdateDBRequest) -> Result<ProfileDBResponse> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Profiles::new(&mut conn).update_details(id, request).await
    }

    async fn update_access(&self, id: &str, request: &ProfileAccessUpdateDBRequest) -> Result<ProfileDBResponse> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Profiles::new(&mut conn).update_access(id, request).await
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileDBResponse>> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Profiles::new(&mut conn).list(filter).await
    }
}
