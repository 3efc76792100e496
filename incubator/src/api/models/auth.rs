//! API request/response models for the session endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Returned by `GET /login`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginInfo {
    /// OAuth providers offered next to email/password sign-in
    pub providers: Vec<String>,
    /// Where the browser goes after a successful sign-in
    pub redirect: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginSuccess {
    pub redirect: String,
}

/// Query parameters of the OAuth/PKCE callback
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
