//! Append-only audit trail for committed policy changes
//!
//! Every successful commit records one entry keyed by the revision it
//! produced. Entries carry the effective changes (those that actually
//! mutated the rule set), which is the only way to reconstruct why
//! revision N differs from N-1 and the input for building a revert batch.

use crate::types::{Change, RevisionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single committed batch, as recorded by the policy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier
    pub id: Uuid,

    /// Subject that performed the apply
    pub actor: String,

    /// Free-text audit note supplied with the apply
    pub reason: String,

    /// Effective changes: the subset of the submitted batch that mutated
    /// the rule set, in application order. Idempotent no-ops (duplicate
    /// adds, missing removes) are not recorded.
    pub changes: Vec<Change>,

    /// Revision the batch was applied on top of
    pub old_revision: RevisionId,

    /// Revision produced by the batch
    pub new_revision: RevisionId,

    /// Commit timestamp
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        reason: impl Into<String>,
        changes: Vec<Change>,
        old_revision: RevisionId,
        new_revision: RevisionId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            reason: reason.into(),
            changes,
            old_revision,
            new_revision,
            recorded_at: Utc::now(),
        }
    }

    /// Changes that undo this entry: inverted kinds in reverse order.
    /// Applying them on top of `new_revision` restores the rule set of
    /// `old_revision` exactly.
    pub fn inverse_changes(&self) -> Vec<Change> {
        self.changes.iter().rev().map(Change::inverse).collect()
    }
}
