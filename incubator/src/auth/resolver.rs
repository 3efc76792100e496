//! Fetch-or-create of the application profile for an authenticated session.

use tracing::{info, instrument};

use super::provider::{Identity, IdentityProvider, ProviderError};
use super::session::Session;
use crate::api::models::profiles::Role;
use crate::db::{
    models::profiles::{ProfileDBResponse, ProfileLookup, ProfileUpsertDBRequest},
    store::ProfileStore,
};
use crate::errors::Result;
use crate::types::abbrev_id;

/// Display name for a new profile: metadata `full_name`, then `name`, then the email local part
pub fn default_full_name(identity: &Identity) -> Option<String> {
    identity
        .metadata_str("full_name")
        .or_else(|| identity.metadata_str("name"))
        .or_else(|| identity.email.split('@').next().filter(|local| !local.is_empty()))
        .map(str::to_owned)
}

/// Profile row for an identity seen for the first time. New profiles always start as viewers.
pub fn default_profile(identity: &Identity) -> ProfileUpsertDBRequest {
    ProfileUpsertDBRequest {
        id: identity.id.clone(),
        email: identity.email.clone(),
        full_name: default_full_name(identity),
        avatar_url: identity.metadata_str("avatar_url").map(str::to_owned),
        role: Role::Viewer,
    }
}

/// Return the caller's profile, creating it on first visit.
///
/// The identity is re-validated with the provider first; `Ok(None)` means there is no signed-in
/// user. Store failures propagate as errors and are never read as a missing profile.
#[instrument(skip_all, fields(user_id = %abbrev_id(&session.identity.id)), err)]
pub async fn resolve_profile(
    provider: &dyn IdentityProvider,
    store: &dyn ProfileStore,
    session: &Session,
) -> Result<Option<ProfileDBResponse>> {
    let identity = match provider.get_user(&session.access_token).await {
        Ok(identity) => identity,
        Err(ProviderError::Rejected { .. }) => return Ok(None),
        Err(e) => {
            tracing::warn!("Identity provider failed while resolving profile: {:#}", e);
            return Ok(None);
        }
    };

    match store.find_by_id(&identity.id).await? {
        ProfileLookup::Found(profile) => Ok(Some(profile)),
        ProfileLookup::NotFound => {
            let profile = store.upsert(&default_profile(&identity)).await?;
            info!(role = %profile.role, "Created profile on first visit");
            Ok(Some(profile))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryProfileStore;
    use crate::db::models::profiles::ProfileRow;
    use crate::errors::Error;
    use crate::db::errors::DbError;
    use crate::test_utils::{FailingProfileStore, ScriptedProvider, session_for};
    use chrono::Utc;
    use serde_json::json;

    fn identity(metadata: serde_json::Value) -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            user_metadata: metadata,
        }
    }

    #[test]
    fn test_full_name_fallbacks() {
        assert_eq!(
            default_full_name(&identity(json!({"full_name": "Ada Lovelace", "name": "ada"}))).as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(default_full_name(&identity(json!({"name": "Ada"}))).as_deref(), Some("Ada"));
        assert_eq!(default_full_name(&identity(json!({}))).as_deref(), Some("ada"));

        let mut no_email = identity(json!(null));
        no_email.email = String::new();
        assert_eq!(default_full_name(&no_email), None);
    }

    #[test]
    fn test_default_role_ignores_metadata() {
        let request = default_profile(&identity(json!({"role": "Owner", "avatar_url": "https://x/a.png"})));
        assert_eq!(request.role, Role::Viewer);
        assert_eq!(request.avatar_url.as_deref(), Some("https://x/a.png"));
    }

    #[tokio::test]
    async fn test_first_visit_creates_viewer_profile() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = InMemoryProfileStore::new();

        let profile = resolve_profile(&provider, &store, &session_for("a1", "u1", "a@b.com"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(profile.id, "u1");
        assert_eq!(profile.email, "a@b.com");
        assert_eq!(profile.role, Role::Viewer);
        assert_eq!(profile.full_name.as_deref(), Some("a"));
        assert!(profile.is_active);
        assert_eq!(store.find_by_id("u1").await.unwrap(), ProfileLookup::Found(profile));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = InMemoryProfileStore::new();
        let session = session_for("a1", "u1", "a@b.com");

        let first = resolve_profile(&provider, &store, &session).await.unwrap().unwrap();
        let second = resolve_profile(&provider, &store, &session).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_profile_is_returned_unchanged() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = InMemoryProfileStore::new();
        let now = Utc::now();
        store.insert_row(ProfileRow {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            full_name: Some("Founder".to_string()),
            avatar_url: None,
            role: "Owner".to_string(),
            created_at: now,
            updated_at: now,
            is_active: None,
        });

        let profile = resolve_profile(&provider, &store, &session_for("a1", "u1", "a@b.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.role, Role::Owner);
        assert_eq!(profile.full_name.as_deref(), Some("Founder"));
        assert!(profile.is_active);
    }

    #[tokio::test]
    async fn test_revoked_session_yields_no_user() {
        let provider = ScriptedProvider::new();
        let store = InMemoryProfileStore::new();

        let profile = resolve_profile(&provider, &store, &session_for("gone", "u1", "a@b.com"))
            .await
            .unwrap();
        assert!(profile.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_stored_role_is_an_error() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = InMemoryProfileStore::new();
        let now = Utc::now();
        store.insert_row(ProfileRow {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            full_name: None,
            avatar_url: None,
            role: "SuperAdmin".to_string(),
            created_at: now,
            updated_at: now,
            is_active: Some(true),
        });

        let err = resolve_profile(&provider, &store, &session_for("a1", "u1", "a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(DbError::InvalidValue { column: "role", .. })));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_absence() {
        let provider = ScriptedProvider::new().with_user("a1", "u1", "a@b.com");
        let store = FailingProfileStore::new();

        let err = resolve_profile(&provider, &store, &session_for("a1", "u1", "a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(DbError::Other(_))));
        assert_eq!(store.upsert_calls(), 0);
    }
}
