//! Error taxonomy and the response envelope shared by all auth endpoints.
//!
//! Recognized domain failures carry an explicit kind and surface verbatim.
//! Everything else (datastore, hashing, signing failures) is logged with full
//! context and downgraded to a generic internal error so backend detail never
//! reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TooManyRequests(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error envelope returned by every failing endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("internal error: {err:#}");
        }

        let message = match &self {
            // Never leak backend detail to the client.
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorBody {
            success: false,
            code: self.code().to_string(),
            message,
            details: None,
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn codes_and_statuses_match_taxonomy() {
        let cases: Vec<(AuthError, &str, StatusCode)> = vec![
            (
                AuthError::Validation("bad".into()),
                "VALIDATION_ERROR",
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::Unauthorized("nope".into()),
                "UNAUTHORIZED",
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthError::Forbidden("nope".into()),
                "FORBIDDEN",
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::NotFound("gone".into()),
                "NOT_FOUND",
                StatusCode::NOT_FOUND,
            ),
            (
                AuthError::Conflict("dup".into()),
                "CONFLICT",
                StatusCode::CONFLICT,
            ),
            (
                AuthError::TooManyRequests("slow down".into()),
                "TOO_MANY_REQUESTS",
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AuthError::Internal(anyhow!("boom")),
                "INTERNAL_ERROR",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn envelope_omits_empty_details() {
        let body = ErrorBody {
            success: false,
            code: "UNAUTHORIZED".to_string(),
            message: "Invalid token".to_string(),
            details: None,
        };
        let value = serde_json::to_value(&body).expect("envelope serializes");
        assert_eq!(value["success"], false);
        assert_eq!(value["code"], "UNAUTHORIZED");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = AuthError::Internal(anyhow!("connection pool exhausted"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
