use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::validators::ValidationError;

/// ApiError
///
/// The single error taxonomy surfaced by every handler. Client-facing variants
/// carry field-level detail; infrastructure variants are logged and collapsed
/// into a generic 500 body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// A username and/or email already claimed by another account.
    #[error("conflict on {0:?}")]
    Conflict(Vec<(&'static str, String)>),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Mail(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            field: err.field.to_string(),
            message: err.message,
        }
    }
}

/// A body that did not deserialize. Raised only after the caller passed the
/// permission gate, so a denied caller never learns about payload shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("non_field_errors", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation { field, message } => json!({ field: [message] }),
            ApiError::Conflict(fields) => {
                let mut body = Map::new();
                for (field, message) in fields {
                    body.insert(field.to_string(), json!([message]));
                }
                Value::Object(body)
            }
            ApiError::NotFound => json!({ "detail": "Not found." }),
            ApiError::Unauthorized => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            ApiError::Forbidden => {
                json!({ "detail": "You do not have permission to perform this action." })
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                json!({ "detail": "Internal server error" })
            }
            ApiError::Mail(msg) => {
                tracing::error!("Mail error: {}", msg);
                json!({ "detail": "Internal server error" })
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "detail": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    async fn response_json(err: ApiError) -> Value {
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(ApiError::validation("year", "too late")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflict_returns_400() {
        assert_eq!(
            response_status(ApiError::Conflict(vec![("email", "taken".into())])),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn policy_and_lookup_statuses() {
        assert_eq!(response_status(ApiError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(response_status(ApiError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            response_status(ApiError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(ApiError::Mail("smtp down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_body_is_keyed_by_field() {
        let body = response_json(ApiError::validation("score", "out of range")).await;
        assert_eq!(body, json!({ "score": ["out of range"] }));
    }

    #[tokio::test]
    async fn conflict_body_names_every_field() {
        let body = response_json(ApiError::Conflict(vec![
            ("username", "Username bob is already taken.".into()),
            ("email", "Email b@x.com is already taken.".into()),
        ]))
        .await;
        assert_eq!(body["username"][0], "Username bob is already taken.");
        assert_eq!(body["email"][0], "Email b@x.com is already taken.");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let body = response_json(ApiError::Internal("secret stack trace".into())).await;
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }
}
