//! Database models for profiles.

use crate::api::models::profiles::{ProfileAccessUpdate, ProfileUpdate, Role};
use crate::db::errors::DbError;
use crate::types::ProfileId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Raw `profiles` row, before the role column is validated
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: Option<bool>,
}

/// Database request for inserting-or-replacing a profile keyed by id
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpsertDBRequest {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
}

/// Database request for updating display fields.
///
/// `None` leaves a column untouched. An empty `avatar_url` clears the column.
#[derive(Debug, Clone, Default)]
pub struct ProfileDetailsUpdateDBRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<ProfileUpdate> for ProfileDetailsUpdateDBRequest {
    fn from(api: ProfileUpdate) -> Self {
        Self {
            full_name: api.full_name,
            avatar_url: api.avatar_url,
        }
    }
}

/// Database request for changing role and activation
#[derive(Debug, Clone, Default)]
pub struct ProfileAccessUpdateDBRequest {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl From<ProfileAccessUpdate> for ProfileAccessUpdateDBRequest {
    fn from(api: ProfileAccessUpdate) -> Self {
        Self {
            role: api.role,
            is_active: api.is_active,
        }
    }
}

/// Database response for a profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDBResponse {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TryFrom<ProfileRow> for ProfileDBResponse {
    type Error = DbError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| DbError::InvalidValue {
            column: "role",
            value: e.0,
        })?;

        Ok(Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            // Column is nullable with a default; a NULL means the flag was never set
            is_active: row.is_active.unwrap_or(true),
        })
    }
}

/// Outcome of looking a profile up by id.
///
/// Store failures are reported through the surrounding `Result`, never as `NotFound`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found(ProfileDBResponse),
    NotFound,
}

impl From<Option<ProfileDBResponse>> for ProfileLookup {
    fn from(value: Option<ProfileDBResponse>) -> Self {
        match value {
            Some(profile) => ProfileLookup::Found(profile),
            None => ProfileLookup::NotFound,
        }
    }
}
