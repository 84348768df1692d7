//! Access decision evaluation over immutable revision snapshots
//!
//! `decide` resolves the transitive role closure of the subject, collects
//! matching permission rules from the snapshot read at call start, and
//! applies deny-overrides with a default-closed fallback. Because snapshots
//! are immutable, a concurrent commit cannot produce a partial result.
//!
//! Decisions are cached in an LRU keyed by (revision, subject, domain,
//! object, action); the revision in the key makes the cache self-invalidating
//! across commits.

use crate::diagnostics::{DenialDiagnostics, MissingPolicy};
use crate::error::Result;
use crate::policy::{PolicyStore, RuleSet, Snapshot};
use crate::types::{Effect, PolicyRule, RevisionId, RuleKind, GLOBAL_DOMAIN, WILDCARD};
use lru::LruCache;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Context attached to an allow decision.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowContext {
    /// Revision the decision was computed against
    pub revision: RevisionId,

    /// Allow rules that matched the request
    pub matched: Vec<PolicyRule>,

    /// Roles in the subject's transitive closure
    pub resolved_roles: Vec<String>,
}

/// Outcome of an access decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow(AllowContext),
    Deny(DenialDiagnostics),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn revision(&self) -> RevisionId {
        match self {
            Decision::Allow(ctx) => ctx.revision,
            Decision::Deny(diag) => diag.revision,
        }
    }
}

/// Full evaluation trace for operator troubleshooting (`GET /debug`).
#[derive(Debug, Clone)]
pub struct Inspection {
    pub allowed: bool,
    pub revision: RevisionId,
    pub resolved_roles: Vec<String>,
    pub matched: Vec<PolicyRule>,
    pub latency: Duration,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    revision: RevisionId,
    subject: String,
    domain: String,
    object: String,
    action: String,
}

/// Pure read-side evaluator over the policy store.
#[derive(Clone)]
pub struct Evaluator {
    store: Arc<dyn PolicyStore>,
    cache: Arc<Mutex<LruCache<CacheKey, Decision>>>,
}

impl Evaluator {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self::with_cache_capacity(store, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(store: Arc<dyn PolicyStore>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Decide whether `subject` may perform `action` on `object` in
    /// `domain`, against the current revision.
    pub async fn decide(
        &self,
        subject: &str,
        domain: &str,
        object: &str,
        action: &str,
    ) -> Result<Decision> {
        let snapshot = self.store.rules_at(None).await?;
        self.decide_with_snapshot(&snapshot, subject, domain, object, action)
    }

    /// Decide against a specific retained revision.
    pub async fn decide_at(
        &self,
        revision: RevisionId,
        subject: &str,
        domain: &str,
        object: &str,
        action: &str,
    ) -> Result<Decision> {
        let snapshot = self.store.rules_at(Some(revision)).await?;
        self.decide_with_snapshot(&snapshot, subject, domain, object, action)
    }

    /// Evaluate and return the full trace, for the debug endpoint.
    pub async fn inspect(
        &self,
        subject: &str,
        domain: &str,
        object: &str,
        action: &str,
    ) -> Result<Inspection> {
        let start = Instant::now();
        let snapshot = self.store.rules_at(None).await?;

        let closure = role_closure(&snapshot.rules, subject, domain);
        let matched = matching_rules(&snapshot.rules, &closure, domain, object, action);
        let allowed = !matched.iter().any(|r| r.effect == Effect::Deny)
            && matched.iter().any(|r| r.effect == Effect::Allow);

        Ok(Inspection {
            allowed,
            revision: snapshot.revision,
            resolved_roles: roles_of(&closure, subject),
            matched,
            latency: start.elapsed(),
        })
    }

    fn decide_with_snapshot(
        &self,
        snapshot: &Snapshot,
        subject: &str,
        domain: &str,
        object: &str,
        action: &str,
    ) -> Result<Decision> {
        let key = CacheKey {
            revision: snapshot.revision,
            subject: subject.to_string(),
            domain: domain.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        };

        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&key) {
                return Ok(hit.clone());
            }
        }

        let decision = evaluate(snapshot, subject, domain, object, action);

        debug!(
            subject,
            domain,
            object,
            action,
            revision = snapshot.revision,
            allowed = decision.is_allowed(),
            "access decision evaluated"
        );

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(key, decision.clone());
        Ok(decision)
    }
}

fn evaluate(
    snapshot: &Snapshot,
    subject: &str,
    domain: &str,
    object: &str,
    action: &str,
) -> Decision {
    let closure = role_closure(&snapshot.rules, subject, domain);
    let matched = matching_rules(&snapshot.rules, &closure, domain, object, action);

    let denied_by: Vec<PolicyRule> = matched
        .iter()
        .filter(|r| r.effect == Effect::Deny)
        .cloned()
        .collect();

    // Deny-overrides: any matching deny rule wins regardless of allows.
    if !denied_by.is_empty() {
        return Decision::Deny(DenialDiagnostics {
            subject: subject.to_string(),
            domain: domain.to_string(),
            object: object.to_string(),
            action: action.to_string(),
            revision: snapshot.revision,
            resolved_roles: roles_of(&closure, subject),
            missing_policies: Vec::new(),
            denied_by,
        });
    }

    if !matched.is_empty() {
        return Decision::Allow(AllowContext {
            revision: snapshot.revision,
            matched,
            resolved_roles: roles_of(&closure, subject),
        });
    }

    // Default-closed: nothing matched.
    Decision::Deny(DenialDiagnostics {
        subject: subject.to_string(),
        domain: domain.to_string(),
        object: object.to_string(),
        action: action.to_string(),
        revision: snapshot.revision,
        resolved_roles: roles_of(&closure, subject),
        missing_policies: vec![MissingPolicy {
            domain: domain.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        }],
        denied_by: Vec::new(),
    })
}

/// Transitive closure of role memberships for `subject` in `domain`,
/// breadth-first over the assignment graph. The first element is the
/// subject itself; the visited set tolerates cycles.
fn role_closure(rules: &RuleSet, subject: &str, domain: &str) -> Vec<String> {
    let mut closure: Vec<String> = vec![subject.to_string()];
    let mut visited: HashSet<String> = closure.iter().cloned().collect();
    let mut queue: VecDeque<String> = closure.iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        for rule in rules.iter() {
            if rule.kind == RuleKind::RoleAssignment
                && rule.subject == current
                && domain_matches(&rule.domain, domain)
                && visited.insert(rule.object.clone())
            {
                closure.push(rule.object.clone());
                queue.push_back(rule.object.clone());
            }
        }
    }

    closure
}

fn roles_of(closure: &[String], subject: &str) -> Vec<String> {
    closure.iter().filter(|m| *m != subject).cloned().collect()
}

fn matching_rules(
    rules: &RuleSet,
    closure: &[String],
    domain: &str,
    object: &str,
    action: &str,
) -> Vec<PolicyRule> {
    let members: HashSet<&str> = closure.iter().map(String::as_str).collect();

    let mut matched: Vec<PolicyRule> = rules
        .iter()
        .filter(|r| {
            r.kind == RuleKind::Permission
                && members.contains(r.subject.as_str())
                && domain_matches(&r.domain, domain)
                && token_matches(&r.object, object)
                && token_matches(&r.action, action)
        })
        .cloned()
        .collect();

    matched.sort();
    matched
}

fn domain_matches(rule_domain: &str, domain: &str) -> bool {
    rule_domain == domain || rule_domain == GLOBAL_DOMAIN
}

fn token_matches(rule_value: &str, value: &str) -> bool {
    rule_value == value || rule_value == WILDCARD
}
