//! Structured results for mutating actions.
//!
//! Every mutation endpoint answers with an [`ActionResponse`]: a `success` flag, an optional
//! user-facing `message`, and the resulting `data` when there is one. Failures keep the status
//! code of the underlying error but still carry the same envelope, so no error details cross the
//! server/client boundary.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::Error;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ActionResponse<()> {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error wrapper that renders as a failed [`ActionResponse`].
#[derive(Debug)]
pub struct ActionFailure(pub Error);

impl<E> From<E> for ActionFailure
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ActionFailure {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        self.0.log();
        (status, Json(ActionResponse::failed(self.0.user_message()))).into_response()
    }
}

pub type ActionResult<T> = Result<ActionResponse<T>, ActionFailure>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_ok_envelope() {
        let json = serde_json::to_value(ActionResponse::ok(42)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 42 }));
    }

    #[tokio::test]
    async fn test_failure_keeps_status_and_hides_internals() {
        let failure = ActionFailure(Error::Internal {
            operation: "talk to the database at 10.0.0.3".to_string(),
        });
        let response = failure.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_bad_request_message_is_forwarded() {
        let failure: ActionFailure = Error::BadRequest {
            message: "full_name cannot be empty".to_string(),
        }
        .into();
        let response = failure.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "full_name cannot be empty");
    }
}
