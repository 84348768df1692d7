//! Staged-batch apply coordination
//!
//! The coordinator validates a staged batch, checks that the acting subject
//! is itself authorized to administer policies in the target domain (the
//! recursive, security-critical property), and delegates the commit to the
//! store's compare-and-swap. A stale base revision is a hard stop: the
//! batch is never rebased, the caller must re-fetch and re-stage.

use crate::error::{AuthzError, Result};
use crate::evaluator::{Decision, Evaluator};
use crate::policy::PolicyStore;
use crate::types::{
    Change, RevisionId, GLOBAL_DOMAIN, POLICY_ADMIN_ACTION, POLICY_ADMIN_OBJECT,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A consumable batch of changes anchored to a base revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub base_revision: RevisionId,

    /// Actor performing the apply
    pub subject: String,

    /// Domain scope the batch targets
    pub domain: String,

    /// Free-text audit note
    pub reason: String,

    pub changes: Vec<Change>,
}

impl ApplyRequest {
    /// Build the revert request for this batch, anchored to the revision
    /// the original apply produced. Exact when the original batch applied
    /// without no-ops; for arbitrary batches build the inverse from the
    /// audit entry instead.
    pub fn inverse(&self, base_revision: RevisionId) -> ApplyRequest {
        ApplyRequest {
            base_revision,
            subject: self.subject.clone(),
            domain: self.domain.clone(),
            reason: format!("revert: {}", self.reason),
            changes: self.changes.iter().rev().map(Change::inverse).collect(),
        }
    }
}

/// Successful apply result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub revision: RevisionId,
}

/// Validates and commits staged batches. Sole writer path to the store.
pub struct ApplyCoordinator {
    store: Arc<dyn PolicyStore>,
    evaluator: Evaluator,
}

impl ApplyCoordinator {
    pub fn new(store: Arc<dyn PolicyStore>, evaluator: Evaluator) -> Self {
        Self { store, evaluator }
    }

    /// Apply a staged batch as one atomic transaction.
    pub async fn apply(&self, request: &ApplyRequest) -> Result<ApplyOutcome> {
        validate_request(request)?;

        // Policy administration is itself policy-gated.
        let gate = self
            .evaluator
            .decide(
                &request.subject,
                &request.domain,
                POLICY_ADMIN_OBJECT,
                POLICY_ADMIN_ACTION,
            )
            .await?;
        if let Decision::Deny(diagnostics) = gate {
            warn!(
                subject = %request.subject,
                domain = %request.domain,
                "apply rejected: actor is not a policy administrator"
            );
            return Err(AuthzError::Forbidden(Box::new(diagnostics)));
        }

        let revision = self
            .store
            .commit_if_current(
                request.base_revision,
                &request.changes,
                &request.subject,
                &request.reason,
            )
            .await?;

        info!(
            subject = %request.subject,
            domain = %request.domain,
            base_revision = request.base_revision,
            revision,
            changes = request.changes.len(),
            "apply committed"
        );

        Ok(ApplyOutcome { revision })
    }
}

fn validate_request(request: &ApplyRequest) -> Result<()> {
    if request.subject.trim().is_empty() {
        return Err(AuthzError::validation("subject", "must not be empty"));
    }
    if request.domain.trim().is_empty() {
        return Err(AuthzError::validation("domain", "must not be empty"));
    }
    if request.changes.is_empty() {
        return Err(AuthzError::validation(
            "changes",
            "at least one change is required",
        ));
    }

    for (index, change) in request.changes.iter().enumerate() {
        change.rule.validate().map_err(|err| match err {
            AuthzError::Validation { field, message } => AuthzError::Validation {
                field: format!("changes[{index}].{field}"),
                message,
            },
            other => other,
        })?;

        // Every staged rule must stay inside the scope the actor is
        // modifying; global rules are allowed from any domain scope the
        // actor administers globally.
        if change.rule.domain != request.domain && change.rule.domain != GLOBAL_DOMAIN {
            return Err(AuthzError::validation(
                format!("changes[{index}].domain"),
                format!(
                    "rule domain {:?} is outside the requested scope {:?}",
                    change.rule.domain, request.domain
                ),
            ));
        }
    }

    Ok(())
}
