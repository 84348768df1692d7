//! Client-held batch of proposed policy changes
//!
//! A workspace is anchored to the revision its edits were computed against
//! and is never persisted on its own; only the apply call that consumes it
//! has a durable effect. Staging the same change twice is a no-op and
//! staging the inverse of an already staged change cancels it, so the
//! batch always reflects the net edit the administrator sees.

use crate::apply::ApplyRequest;
use crate::types::{Change, PolicyRule, RevisionId};

#[derive(Debug, Clone, Default)]
pub struct StagingWorkspace {
    base_revision: RevisionId,
    changes: Vec<Change>,
}

impl StagingWorkspace {
    /// Open a workspace anchored to `base_revision`.
    pub fn new(base_revision: RevisionId) -> Self {
        Self {
            base_revision,
            changes: Vec::new(),
        }
    }

    pub fn base_revision(&self) -> RevisionId {
        self.base_revision
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Stage a change. Returns false when it was already staged or when it
    /// cancelled out a previously staged inverse.
    pub fn stage(&mut self, change: Change) -> bool {
        if self.changes.contains(&change) {
            return false;
        }
        let inverse = change.inverse();
        if let Some(position) = self.changes.iter().position(|c| *c == inverse) {
            self.changes.remove(position);
            return false;
        }
        self.changes.push(change);
        true
    }

    pub fn stage_add(&mut self, rule: PolicyRule) -> bool {
        self.stage(Change::add(rule))
    }

    pub fn stage_remove(&mut self, rule: PolicyRule) -> bool {
        self.stage(Change::remove(rule))
    }

    /// Drop a staged change.
    pub fn unstage(&mut self, change: &Change) -> bool {
        if let Some(position) = self.changes.iter().position(|c| c == change) {
            self.changes.remove(position);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Consume the workspace into an apply request for the coordinator.
    pub fn into_apply_request(
        self,
        subject: impl Into<String>,
        domain: impl Into<String>,
        reason: impl Into<String>,
    ) -> ApplyRequest {
        ApplyRequest {
            base_revision: self.base_revision,
            subject: subject.into(),
            domain: domain.into(),
            reason: reason.into(),
            changes: self.changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Effect;

    fn rule() -> PolicyRule {
        PolicyRule::permission("alice", "hr", "hrm.employees", "list", Effect::Allow)
    }

    #[test]
    fn test_stage_deduplicates() {
        let mut workspace = StagingWorkspace::new(3);
        assert!(workspace.stage_add(rule()));
        assert!(!workspace.stage_add(rule()));
        assert_eq!(workspace.len(), 1);
    }

    #[test]
    fn test_inverse_cancels_staged_change() {
        let mut workspace = StagingWorkspace::new(3);
        workspace.stage_add(rule());
        assert!(!workspace.stage_remove(rule()));
        assert!(workspace.is_empty());
    }

    #[test]
    fn test_unstage() {
        let mut workspace = StagingWorkspace::new(3);
        workspace.stage_add(rule());

        assert!(workspace.unstage(&Change::add(rule())));
        assert!(!workspace.unstage(&Change::add(rule())));
        assert!(workspace.is_empty());
    }

    #[test]
    fn test_into_apply_request_keeps_anchor_and_order() {
        let other = PolicyRule::permission("bob", "hr", "hrm.employees", "edit", Effect::Allow);

        let mut workspace = StagingWorkspace::new(5);
        workspace.stage_add(rule());
        workspace.stage_remove(other.clone());

        let request = workspace.into_apply_request("tenant:global:user:root", "hr", "hr rollout");
        assert_eq!(request.base_revision, 5);
        assert_eq!(request.changes.len(), 2);
        assert_eq!(request.changes[0], Change::add(rule()));
        assert_eq!(request.changes[1], Change::remove(other));
    }
}
