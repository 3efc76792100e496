//! Database repository for profiles.

use crate::db::{
    errors::{DbError, Result},
    models::profiles::{
        ProfileAccessUpdateDBRequest, ProfileDBResponse, ProfileDetailsUpdateDBRequest, ProfileLookup, ProfileRow,
        ProfileUpsertDBRequest,
    },
};
use crate::types::abbrev_id;
use sqlx::PgConnection;
use tracing::instrument;

const PROFILE_COLUMNS: &str = "id, email, full_name, avatar_url, role, created_at, updated_at, is_active";

/// Filter for listing profiles
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub skip: i64,
    pub limit: i64,
}

impl ProfileFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct Profiles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_id(id)), err)]
    pub async fn get_by_id(&mut self, id: &str) -> Result<ProfileLookup> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        let profile = row.map(ProfileDBResponse::try_from).transpose()?;
        Ok(profile.into())
    }

    /// Insert the profile, or overwrite the non-key columns of an existing row with the same id.
    #[instrument(skip(self, request), fields(profile_id = %abbrev_id(&request.id), role = %request.role), err)]
    pub async fn upsert(&mut self, request: &ProfileUpsertDBRequest) -> Result<ProfileDBResponse> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (id, email, full_name, avatar_url, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                avatar_url = EXCLUDED.avatar_url,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&request.id)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(&request.avatar_url)
        .bind(request.role.as_str())
        .fetch_one(&mut *self.db)
        .await?;

        ProfileDBResponse::try_from(row)
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_id(id)), err)]
    pub async fn update_details(&mut self, id: &str, request: &ProfileDetailsUpdateDBRequest) -> Result<ProfileDBResponse> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles SET
                full_name = COALESCE($2, full_name),
                avatar_url = CASE WHEN $3::text IS NULL THEN avatar_url ELSE NULLIF($3, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.full_name)
        .bind(&request.avatar_url)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        ProfileDBResponse::try_from(row)
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_id(id)), err)]
    pub async fn update_access(&mut self, id: &str, request: &ProfileAccessUpdateDBRequest) -> Result<ProfileDBResponse> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles SET
                role = COALESCE($2, role),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.role.map(|r| r.as_str()))
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        ProfileDBResponse::try_from(row)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ProfileFilter) -> Result<Vec<ProfileDBResponse>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter().map(ProfileDBResponse::try_from).collect()
    }
}
