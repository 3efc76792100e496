//! OpenAPI documentation for the session and profile endpoints, served at
//! `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Incubator OS control service",
        description = "Session gate, role authorization and profile bootstrap for the incubator dashboard."
    ),
    paths(
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::auth_callback,
        api::handlers::auth::logout,
        api::handlers::profiles::get_own_profile,
        api::handlers::profiles::update_own_profile,
        api::handlers::profiles::list_profiles,
        api::handlers::profiles::update_profile_access,
    ),
    components(
        schemas(
            api::models::auth::LoginInfo,
            api::models::auth::LoginRequest,
            api::models::auth::LoginSuccess,
            api::models::profiles::Profile,
            api::models::profiles::Role,
            api::models::profiles::ProfileUpdate,
            api::models::profiles::ProfileAccessUpdate,
        )
    ),
    tags(
        (name = "session", description = "Sign-in, OAuth callback and sign-out. These routes are public."),
        (name = "profiles", description = "The caller's profile, and profile administration for admins and owners."),
    )
)]
pub struct ApiDoc;
