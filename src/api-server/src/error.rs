//! API error type and status-code mapping
//!
//! The engine's typed results map onto the HTTP contract here: validation
//! failures become 422 with field-level detail, stale base revisions 409
//! with the current revision, policy-gate denials 403 with the full
//! forbidden payload, unknown resources 404, and store failures 5xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lattice_authz::diagnostics::DenialDiagnostics;
use lattice_authz::types::RevisionId;
use lattice_authz::AuthzError;
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("base revision {base} is stale, current revision is {current}")]
    Conflict { base: RevisionId, current: RevisionId },

    #[error("forbidden")]
    Forbidden {
        diagnostics: Box<DenialDiagnostics>,
        request_id: Option<String>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map an engine error onto the HTTP taxonomy, attaching the caller's
    /// correlation id so denial payloads can echo it verbatim.
    pub fn from_authz(err: AuthzError, request_id: Option<String>) -> Self {
        match err {
            AuthzError::Validation { field, message } => Self::Validation { field, message },
            AuthzError::Conflict { base, current } => Self::Conflict { base, current },
            AuthzError::Forbidden(diagnostics) => Self::Forbidden {
                diagnostics,
                request_id,
            },
            AuthzError::UnknownRevision(revision) => {
                Self::NotFound(format!("revision {revision} is not retained"))
            }
            AuthzError::RequestNotFound(id) => Self::NotFound(format!("access request {id}")),
            AuthzError::InvalidTransition(message) => Self::InvalidState(message),
            AuthzError::Store(message) => Self::Internal(message),
            AuthzError::Internal(message) => Self::Internal(message),
        }
    }

    /// Collect validator derive output into a single field-level error.
    pub fn from_validator(errors: validator::ValidationErrors) -> Self {
        let detail = errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let message = errors
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field}: {message}")
            })
            .collect::<Vec<_>>()
            .join("; ");
        Self::validation("body", detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "validation_failed",
                    "field": field,
                    "message": message,
                })),
            )
                .into_response(),
            ApiError::Conflict { base, current } => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "revision_conflict",
                    "message": "base revision is stale, refetch and re-stage",
                    "base_revision": base,
                    "current_revision": current,
                })),
            )
                .into_response(),
            ApiError::Forbidden {
                diagnostics,
                request_id,
            } => (
                StatusCode::FORBIDDEN,
                Json(diagnostics.to_forbidden_payload(request_id)),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "not_found",
                    "message": message,
                })),
            )
                .into_response(),
            ApiError::InvalidState(message) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "invalid_state",
                    "message": message,
                })),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}
