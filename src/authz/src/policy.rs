//! Versioned policy storage with compare-and-commit semantics
//!
//! The store owns the full history of rule sets as an append-only ledger of
//! immutable snapshots, one per revision. Readers clone an `Arc` to the
//! snapshot they need and are never affected by concurrent commits;
//! `commit_if_current` is the single mutating operation and holds the write
//! lock only for the duration of the compare-and-swap.

use crate::audit::AuditEntry;
use crate::error::{AuthzError, Result};
use crate::types::{Change, PolicyRule, RevisionId, StageKind};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// An immutable set of policy rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: HashSet<PolicyRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn contains(&self, rule: &PolicyRule) -> bool {
        self.rules.contains(rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyRule> {
        self.rules.iter()
    }

    /// Rules in a stable order, for listings and diffing.
    pub fn to_sorted_vec(&self) -> Vec<PolicyRule> {
        let mut rules: Vec<PolicyRule> = self.rules.iter().cloned().collect();
        rules.sort();
        rules
    }

    /// Apply a batch of changes, returning the resulting set together with
    /// the effective changes: adds of rules that were absent and removes of
    /// rules that were present, in application order. Duplicate adds and
    /// missing removes are silent per-rule no-ops.
    pub fn apply_batch(&self, changes: &[Change]) -> (RuleSet, Vec<Change>) {
        let mut rules = self.rules.clone();
        let mut effective = Vec::new();

        for change in changes {
            let mutated = match change.stage_kind {
                StageKind::Add => rules.insert(change.rule.clone()),
                StageKind::Remove => rules.remove(&change.rule),
            };
            if mutated {
                effective.push(change.clone());
            }
        }

        (RuleSet { rules }, effective)
    }
}

impl FromIterator<PolicyRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = PolicyRule>>(iter: T) -> Self {
        Self::from_rules(iter)
    }
}

/// A rule set paired with the revision it was read at. Snapshots are
/// immutable; a concurrent commit cannot invalidate one mid-evaluation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: RevisionId,
    pub rules: Arc<RuleSet>,
}

/// Policy store contract
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Latest committed revision.
    async fn current_revision(&self) -> Result<RevisionId>;

    /// Full rule set as of `revision`, or the current revision if omitted.
    /// Reading a retained historical revision returns the exact historical
    /// set; unknown revisions are an error.
    async fn rules_at(&self, revision: Option<RevisionId>) -> Result<Snapshot>;

    /// Atomic compare-and-swap: fails with [`AuthzError::Conflict`] when
    /// `base` is not the current revision at the instant of commit,
    /// otherwise applies the whole batch as one indivisible set, advances
    /// the revision, and records an audit entry.
    async fn commit_if_current(
        &self,
        base: RevisionId,
        changes: &[Change],
        actor: &str,
        reason: &str,
    ) -> Result<RevisionId>;

    /// Audit entries whose resulting revision lies in `[from, to]`.
    async fn audit_range(&self, from: RevisionId, to: RevisionId) -> Result<Vec<AuditEntry>>;
}

struct Ledger {
    /// Snapshot per revision; the index is the revision id.
    revisions: Vec<Arc<RuleSet>>,
    audit: Vec<AuditEntry>,
}

/// In-memory policy store: revision ledger plus audit log.
pub struct InMemoryPolicyStore {
    inner: RwLock<Ledger>,
}

impl InMemoryPolicyStore {
    /// Create an empty store at revision 0.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Ledger {
                revisions: vec![Arc::new(RuleSet::new())],
                audit: Vec::new(),
            }),
        }
    }

    /// Create a store seeded with bootstrap rules at revision 1, audited as
    /// actor `system`. Without a seed nothing can pass the policy-admin
    /// gate, so every deployment starts from one.
    pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let changes: Vec<Change> = rules.into_iter().map(Change::add).collect();
        let (seeded, effective) = RuleSet::new().apply_batch(&changes);

        Self {
            inner: RwLock::new(Ledger {
                revisions: vec![Arc::new(RuleSet::new()), Arc::new(seeded)],
                audit: vec![AuditEntry::new("system", "bootstrap policy seed", effective, 0, 1)],
            }),
        }
    }
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn current_revision(&self) -> Result<RevisionId> {
        let ledger = self.inner.read().await;
        Ok((ledger.revisions.len() - 1) as RevisionId)
    }

    async fn rules_at(&self, revision: Option<RevisionId>) -> Result<Snapshot> {
        let ledger = self.inner.read().await;
        let current = (ledger.revisions.len() - 1) as RevisionId;
        let revision = revision.unwrap_or(current);

        let rules = ledger
            .revisions
            .get(revision as usize)
            .cloned()
            .ok_or(AuthzError::UnknownRevision(revision))?;

        Ok(Snapshot { revision, rules })
    }

    async fn commit_if_current(
        &self,
        base: RevisionId,
        changes: &[Change],
        actor: &str,
        reason: &str,
    ) -> Result<RevisionId> {
        let mut ledger = self.inner.write().await;
        let current = (ledger.revisions.len() - 1) as RevisionId;

        if base != current {
            debug!(base, current, actor, "commit rejected: stale base revision");
            return Err(AuthzError::Conflict { base, current });
        }

        let (next, effective) = ledger.revisions[current as usize].apply_batch(changes);
        let new_revision = current + 1;

        ledger.revisions.push(Arc::new(next));
        ledger.audit.push(AuditEntry::new(
            actor,
            reason,
            effective,
            current,
            new_revision,
        ));

        info!(
            actor,
            old_revision = current,
            new_revision,
            changes = changes.len(),
            "policy batch committed"
        );

        Ok(new_revision)
    }

    async fn audit_range(&self, from: RevisionId, to: RevisionId) -> Result<Vec<AuditEntry>> {
        let ledger = self.inner.read().await;
        Ok(ledger
            .audit
            .iter()
            .filter(|entry| entry.new_revision >= from && entry.new_revision <= to)
            .cloned()
            .collect())
    }
}
