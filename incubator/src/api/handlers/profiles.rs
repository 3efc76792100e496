use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use url::Url;

use crate::{
    AppState,
    api::models::{
        actions::{ActionResponse, ActionResult},
        profiles::{ListProfilesQuery, Profile, ProfileAccessUpdate, ProfileUpdate, Role},
    },
    auth::current_user::{DashboardUser, require_role},
    db::{errors::DbError, handlers::ProfileFilter},
    errors::Error,
    types::{ProfileId, abbrev_id},
};

fn not_found(id: &str) -> impl FnOnce(DbError) -> Error + '_ {
    move |e| match e {
        DbError::NotFound => Error::NotFound {
            resource: "Profile".to_string(),
            id: id.to_string(),
        },
        other => other.into(),
    }
}

fn validate_update(update: &ProfileUpdate) -> Result<(), Error> {
    if let Some(full_name) = &update.full_name
        && full_name.trim().is_empty()
    {
        return Err(Error::BadRequest {
            message: "Full name cannot be empty".to_string(),
        });
    }
    if let Some(avatar_url) = update.avatar_url.as_deref().filter(|url| !url.is_empty()) {
        let valid = Url::parse(avatar_url)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            return Err(Error::BadRequest {
                message: "Avatar URL must be an http(s) URL".to_string(),
            });
        }
    }
    Ok(())
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profiles",
    responses(
        (status = 200, description = "The caller's profile", body = ActionResponse<Profile>),
        (status = 307, description = "Not signed in; redirect to login"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_own_profile(DashboardUser(profile): DashboardUser) -> ActionResponse<Profile> {
    ActionResponse::ok(profile)
}

/// Update the caller's display name and avatar
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = ProfileUpdate,
    tag = "profiles",
    responses(
        (status = 200, description = "Profile updated", body = ActionResponse<Profile>),
        (status = 400, description = "Invalid input"),
    )
)]
#[tracing::instrument(skip_all, fields(profile_id = %abbrev_id(&current.id)))]
pub async fn update_own_profile(
    State(state): State<AppState>,
    DashboardUser(current): DashboardUser,
    Json(mut update): Json<ProfileUpdate>,
) -> ActionResult<Profile> {
    validate_update(&update)?;
    update.full_name = update.full_name.map(|name| name.trim().to_string());

    let updated = state
        .store
        .update_details(&current.id, &update.into())
        .await
        .map_err(not_found(&current.id))?;
    Ok(ActionResponse::ok(Profile::from(updated)).with_message("Profile updated"))
}

/// List all profiles
#[utoipa::path(
    get,
    path = "/admin/api/profiles",
    tag = "profiles",
    params(ListProfilesQuery),
    responses(
        (status = 200, description = "Profiles ordered by creation time", body = ActionResponse<Vec<Profile>>),
        (status = 403, description = "Requires Admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_profiles(
    State(state): State<AppState>,
    DashboardUser(current): DashboardUser,
    Query(query): Query<ListProfilesQuery>,
) -> ActionResult<Vec<Profile>> {
    require_role(&current, Role::Admin, "list profiles")?;

    let filter = ProfileFilter::new(query.pagination.skip(), query.pagination.limit());
    let profiles = state.store.list(&filter).await?;
    Ok(ActionResponse::ok(profiles.into_iter().map(Profile::from).collect()))
}

/// Change another profile's role or activation
#[utoipa::path(
    patch,
    path = "/admin/api/profiles/{id}",
    request_body = ProfileAccessUpdate,
    tag = "profiles",
    params(("id" = String, Path, description = "Profile (identity) ID")),
    responses(
        (status = 200, description = "Access updated", body = ActionResponse<Profile>),
        (status = 400, description = "Owners cannot demote or deactivate themselves"),
        (status = 403, description = "Requires Owner"),
        (status = 404, description = "No such profile"),
    )
)]
#[tracing::instrument(skip_all, fields(target_id = %abbrev_id(&id)))]
pub async fn update_profile_access(
    State(state): State<AppState>,
    DashboardUser(current): DashboardUser,
    Path(id): Path<ProfileId>,
    Json(update): Json<ProfileAccessUpdate>,
) -> ActionResult<Profile> {
    require_role(&current, Role::Owner, "change profile access")?;

    if id == current.id {
        let demotes = update.role.is_some_and(|role| role != Role::Owner);
        let deactivates = update.is_active == Some(false);
        if demotes || deactivates {
            return Err(Error::BadRequest {
                message: "Owners cannot demote or deactivate themselves".to_string(),
            }
            .into());
        }
    }

    let updated = state
        .store
        .update_access(&id, &update.into())
        .await
        .map_err(not_found(&id))?;
    info!(role = %updated.role, is_active = updated.is_active, "Profile access changed");
    Ok(ActionResponse::ok(Profile::from(updated)).with_message("Profile access updated"))
}
