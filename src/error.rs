use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// ApiError
///
/// Every failure a handler can answer with. Each variant maps to exactly one HTTP
/// status; the display text becomes the `message` field of the JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed field in the request body.
    #[error("{0}")]
    Validation(String),

    /// Well-formed request the current state refuses (duplicate cart entry, bad credentials).
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired bearer token.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Wrong role or not the owner of the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(&'static str),

    /// Store, hashing or token-signing failure. The detail is surfaced to the client.
    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorBody
///
/// JSON shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                ErrorBody {
                    message: self.to_string(),
                    error: Some(detail.clone()),
                }
            }
            _ => {
                tracing::debug!(status = %status, message = %self, "request rejected");
                ErrorBody {
                    message: self.to_string(),
                    error: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail(_) => ApiError::BadRequest("User already exists".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    /// Joins the per-field messages, sorted so the text is stable across runs.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        ApiError::Validation(messages.join("; "))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token error: {err}"))
    }
}

impl From<password_hash::Error> for ApiError {
    fn from(err: password_hash::Error) -> Self {
        ApiError::Internal(format!("password hashing error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_email_is_a_client_error() {
        let err: ApiError = RepositoryError::DuplicateEmail("a@b.c".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "User already exists");
    }

    #[test]
    fn validation_errors_become_one_bad_request() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "password",
            validator::ValidationError::new("length").with_message("too short".into()),
        );
        errors.add("email", validator::ValidationError::new("email"));

        let err: ApiError = errors.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "email is invalid; too short");
    }
}
