//! API request/response models for profiles.

use super::pagination::Pagination;
use crate::db::models::profiles::ProfileDBResponse;
use crate::types::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::{IntoParams, ToSchema};

/// Dashboard roles, ordered from least to most privileged.
///
/// The derived ordering is load-bearing: `Viewer < Admin < Owner`, and [`Role::satisfies`] compares
/// against it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
pub enum Role {
    Viewer,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "Viewer",
            Role::Admin => "Admin",
            Role::Owner => "Owner",
        }
    }

    /// Whether this role grants at least the access of `required`
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Viewer" => Ok(Role::Viewer),
            "Admin" => Ok(Role::Admin),
            "Owner" => Ok(Role::Owner),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Application-level profile of an authenticated identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<ProfileDBResponse> for Profile {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            full_name: db.full_name,
            avatar_url: db.avatar_url,
            role: db.role,
            created_at: db.created_at,
            updated_at: db.updated_at,
            is_active: db.is_active,
        }
    }
}

/// Editable display fields of the caller's own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Owner-only access changes for another profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileAccessUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Query parameters for listing profiles
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListProfilesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
