//! In-process profile store for local development without PostgreSQL.
//!
//! Selected with `database.type: memory`. Data lives for the lifetime of the process. Rows are
//! kept in their raw form and go through the same validation as PostgreSQL rows on the way out.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::ProfileFilter,
    models::profiles::{
        ProfileAccessUpdateDBRequest, ProfileDBResponse, ProfileDetailsUpdateDBRequest, ProfileLookup, ProfileRow,
        ProfileUpsertDBRequest,
    },
    store::ProfileStore,
};
use crate::types::ProfileId;

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: DashMap<ProfileId, ProfileRow>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw row as-is, bypassing validation
    pub fn insert_row(&self, row: ProfileRow) {
        self.rows.insert(row.id.clone(), row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_id(&self, id: &str) -> Result<ProfileLookup> {
        let row = self.rows.get(id).map(|r| r.value().clone());
        Ok(row.map(ProfileDBResponse::try_from).transpose()?.into())
    }

    async fn upsert(&self, request: &ProfileUpsertDBRequest) -> Result<ProfileDBResponse> {
        let now = Utc::now();
        // The entry guard holds the shard lock, which gives the same convergence as ON CONFLICT
        let row = self
            .rows
            .entry(request.id.clone())
            .and_modify(|row| {
                row.email = request.email.clone();
                row.full_name = request.full_name.clone();
                row.avatar_url = request.avatar_url.clone();
                row.role = request.role.as_str().to_string();
                row.updated_at = now;
            })
            .or_insert_with(|| ProfileRow {
                id: request.id.clone(),
                email: request.email.clone(),
                full_name: request.full_name.clone(),
                avatar_url: request.avatar_url.clone(),
                role: request.role.as_str().to_string(),
                created_at: now,
                updated_at: now,
                is_active: Some(true),
            })
            .value()
            .clone();

        ProfileDBResponse::try_from(row)
    }

    async fn update_details(&self, id: &str, request: &ProfileDetailsUpdateDBRequest) -> Result<ProfileDBResponse> {
        let row = {
            let mut row = self.rows.get_mut(id).ok_or(DbError::NotFound)?;
            if let Some(full_name) = &request.full_name {
                row.full_name = Some(full_name.clone());
            }
            if let Some(avatar_url) = &request.avatar_url {
                row.avatar_url = (!avatar_url.is_empty()).then(|| avatar_url.clone());
            }
            row.updated_at = Utc::now();
            row.clone()
        };
        ProfileDBResponse::try_from(row)
    }

    async fn update_access(&self, id: &str, request: &ProfileAccessUpdateDBRequest) -> Result<ProfileDBResponse> {
        let row = {
            let mut row = self.rows.get_mut(id).ok_or(DbError::NotFound)?;
            if let Some(role) = request.role {
                row.role = role.as_str().to_string();
            }
            if let Some(is_active) = request.is_active {
                row.is_active = Some(is_active);
            }
            row.updated_at = Utc::now();
            row.clone()
        };
        ProfileDBResponse::try_from(row)
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileDBResponse>> {
        let mut rows: Vec<ProfileRow> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        rows.into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(ProfileDBResponse::try_from)
            .collect()
    }
}
