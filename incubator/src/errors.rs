use crate::api::models::profiles::Role;
use crate::auth::provider::ProviderError;
use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Signed in, but the profile has been deactivated by an owner
    #[error("Account deactivated")]
    AccountDeactivated,

    /// Caller's role is below what the operation requires
    #[error("Insufficient permissions to {action}: requires {required}")]
    InsufficientPermissions { required: Role, action: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Identity provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::AccountDeactivated | Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::InvalidValue { .. } | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Provider(provider_err) => match provider_err {
                ProviderError::Rejected { .. } => StatusCode::UNAUTHORIZED,
                ProviderError::Unavailable(_) | ProviderError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::AccountDeactivated => "Account deactivated".to_string(),
            Error::InsufficientPermissions { action, .. } => format!("Insufficient permissions to {action}"),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::InvalidValue { .. } | DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Provider(ProviderError::Rejected { .. }) => "Authentication failed".to_string(),
            Error::Provider(_) => "Authentication service unavailable".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    /// Log full error details, at a level that depends on severity
    pub fn log(&self) {
        match self {
            Error::Database(DbError::NotFound) => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Database(DbError::Other(_) | DbError::InvalidValue { .. }) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Provider(ProviderError::Rejected { .. }) => {
                tracing::info!("Identity provider rejected request: {}", self);
            }
            Error::Provider(_) => {
                tracing::warn!("Identity provider error: {:#}", self);
            }
            Error::Unauthenticated { .. } | Error::AccountDeactivated | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), self.user_message()).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stored_value_is_a_server_error() {
        let err = Error::Database(DbError::InvalidValue {
            column: "role",
            value: "SuperAdmin".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("SuperAdmin"));
    }

    #[test]
    fn test_permission_message() {
        let err = Error::InsufficientPermissions {
            required: Role::Owner,
            action: "change roles".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Insufficient permissions to change roles");
        assert_eq!(err.to_string(), "Insufficient permissions to change roles: requires Owner");
    }

    #[test]
    fn test_provider_errors() {
        let rejected = Error::Provider(ProviderError::Rejected { status: 400 });
        assert_eq!(rejected.status_code(), StatusCode::UNAUTHORIZED);

        let broken = Error::Provider(ProviderError::InvalidResponse("missing user".to_string()));
        assert_eq!(broken.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(broken.user_message(), "Authentication service unavailable");
    }
}
