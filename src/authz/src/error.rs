//! Error types for the authorization engine

use crate::diagnostics::DenialDiagnostics;
use crate::types::RevisionId;
use thiserror::Error;
use uuid::Uuid;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed apply request or rule; recovered at the coordinator and
    /// surfaced with field-level detail.
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// Stale base revision on commit. The caller must re-fetch the current
    /// revision and re-stage; the engine never auto-retries.
    #[error("base revision {base} is stale, current revision is {current}")]
    Conflict { base: RevisionId, current: RevisionId },

    /// A policy-gated administrative operation was denied.
    #[error("permission denied: {} may not {} {} in {}", .0.subject, .0.action, .0.object, .0.domain)]
    Forbidden(Box<DenialDiagnostics>),

    /// Revision not retained by the store.
    #[error("unknown revision: {0}")]
    UnknownRevision(RevisionId),

    /// Access request does not exist.
    #[error("access request not found: {0}")]
    RequestNotFound(Uuid),

    /// Access request status transition is not allowed.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    /// Underlying storage failure; fatal to the current call, no partial
    /// state persists.
    #[error("store unavailable: {0}")]
    Store(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Build a validation error with field-level detail.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
