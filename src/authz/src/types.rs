//! Core policy types and canonical identifier helpers

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};

/// Reserved domain value denoting the global (unscoped) domain.
pub const GLOBAL_DOMAIN: &str = "global";

/// Documented wildcard token. A rule whose object or action is `*` matches
/// any value; no other pattern expansion is performed.
pub const WILDCARD: &str = "*";

/// Object guarding policy administration itself.
pub const POLICY_ADMIN_OBJECT: &str = "core.policies";

/// Action guarding policy administration itself.
pub const POLICY_ADMIN_ACTION: &str = "apply";

/// Monotonically increasing snapshot identifier. Revision 0 is the empty
/// rule set; every committed batch advances it by one.
pub type RevisionId = u64;

/// Rule kind. Permission rules bind (subject, domain, object, action) to an
/// effect; role-assignment rules bind (subject, domain) to a role named by
/// `object`. Wire representations are `"p"` and `"g"` at the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Permission,
    RoleAssignment,
}

/// Rule effect. Deny rules take precedence over Allow rules matching the
/// same resolved tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// A single policy rule. Immutable once committed; a rule set is replaced
/// wholesale per revision, individual rules are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub kind: RuleKind,

    /// Principal or role identifier (opaque string).
    pub subject: String,

    /// Scoping domain; [`GLOBAL_DOMAIN`] applies everywhere.
    pub domain: String,

    /// Protected resource name for permission rules, granted role for
    /// role-assignment rules.
    pub object: String,

    /// Verb on the object. Role-assignment rules carry the wildcard.
    pub action: String,

    pub effect: Effect,
}

impl PolicyRule {
    /// Create a permission rule.
    pub fn permission(
        subject: impl Into<String>,
        domain: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
        effect: Effect,
    ) -> Self {
        Self {
            kind: RuleKind::Permission,
            subject: subject.into(),
            domain: domain.into(),
            object: object.into(),
            action: action.into(),
            effect,
        }
    }

    /// Create a role-assignment rule granting `role` to `member` in `domain`.
    pub fn role_assignment(
        member: impl Into<String>,
        domain: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            kind: RuleKind::RoleAssignment,
            subject: member.into(),
            domain: domain.into(),
            object: role.into(),
            action: WILDCARD.to_string(),
            effect: Effect::Allow,
        }
    }

    /// Check that all identifier fields are non-empty and printable.
    pub fn validate(&self) -> Result<()> {
        ensure_printable("subject", &self.subject)?;
        ensure_printable("domain", &self.domain)?;
        ensure_printable("object", &self.object)?;
        match self.kind {
            RuleKind::Permission => ensure_printable("action", &self.action),
            RuleKind::RoleAssignment => Ok(()),
        }
    }
}

fn ensure_printable(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AuthzError::validation(field, "must not be empty"));
    }
    if value.chars().any(char::is_control) {
        return Err(AuthzError::validation(field, "must not contain control characters"));
    }
    Ok(())
}

/// Direction of a staged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Add,
    Remove,
}

impl StageKind {
    /// The logical inverse, used when reverting an applied batch.
    pub fn inverse(self) -> Self {
        match self {
            StageKind::Add => StageKind::Remove,
            StageKind::Remove => StageKind::Add,
        }
    }
}

/// A single proposed rule change within a staged batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub stage_kind: StageKind,
    pub rule: PolicyRule,
}

impl Change {
    pub fn add(rule: PolicyRule) -> Self {
        Self { stage_kind: StageKind::Add, rule }
    }

    pub fn remove(rule: PolicyRule) -> Self {
        Self { stage_kind: StageKind::Remove, rule }
    }

    /// The change that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            stage_kind: self.stage_kind.inverse(),
            rule: self.rule.clone(),
        }
    }
}

/// Build a subject identifier in the form `tenant:{tenant}:user:{user}`.
///
/// Empty parts fall back to `global` / `anonymous`, matching what the
/// session layer produces for unauthenticated requests.
pub fn subject_for_user(tenant: &str, user: &str) -> String {
    let tenant = match tenant.trim() {
        "" => GLOBAL_DOMAIN,
        t => t,
    };
    let user = match user.trim() {
        "" => "anonymous",
        u => u,
    };
    format!("tenant:{}:user:{}", tenant.to_lowercase(), user)
}

/// Canonical identifier for a role-based subject (`role:{slug}`).
pub fn subject_for_role(slug: &str) -> String {
    let slug = slug.trim();
    if slug.is_empty() {
        return "role:unnamed".to_string();
    }
    if slug.starts_with("role:") {
        return slug.to_string();
    }
    format!("role:{}", slug.to_lowercase())
}

/// Canonical `module.resource` object name, lowercased.
pub fn object_name(module: &str, resource: &str) -> String {
    let module = module.trim().to_lowercase();
    let resource = resource.trim().to_lowercase();
    let module = if module.is_empty() { GLOBAL_DOMAIN } else { &module };
    let resource = if resource.is_empty() { "resource" } else { &resource };
    format!("{module}.{resource}")
}

/// Normalize an action string: trim, lowercase, empty becomes the wildcard.
pub fn normalize_action(action: &str) -> String {
    let action = action.trim().to_lowercase();
    if action.is_empty() {
        WILDCARD.to_string()
    } else {
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_for_user() {
        assert_eq!(subject_for_user("acme", "alice"), "tenant:acme:user:alice");
        assert_eq!(subject_for_user("", ""), "tenant:global:user:anonymous");
        assert_eq!(subject_for_user("ACME", "alice"), "tenant:acme:user:alice");
    }

    #[test]
    fn test_subject_for_role() {
        assert_eq!(subject_for_role("Manager"), "role:manager");
        assert_eq!(subject_for_role("role:admin"), "role:admin");
        assert_eq!(subject_for_role("  "), "role:unnamed");
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("HRM", "Employees"), "hrm.employees");
        assert_eq!(object_name("", ""), "global.resource");
    }

    #[test]
    fn test_normalize_action() {
        assert_eq!(normalize_action(" View "), "view");
        assert_eq!(normalize_action(""), "*");
    }

    #[test]
    fn test_rule_validation() {
        let rule = PolicyRule::permission("alice", "hr", "hrm.employees", "list", Effect::Allow);
        assert!(rule.validate().is_ok());

        let empty_action = PolicyRule::permission("alice", "hr", "hrm.employees", " ", Effect::Allow);
        assert!(empty_action.validate().is_err());

        let control = PolicyRule::permission("alice", "hr\n", "hrm.employees", "list", Effect::Allow);
        assert!(control.validate().is_err());

        // Role assignments do not require an action.
        let assignment = PolicyRule::role_assignment("alice", "hr", "role:manager");
        assert!(assignment.validate().is_ok());
    }

    #[test]
    fn test_change_inverse() {
        let rule = PolicyRule::permission("alice", "hr", "hrm.employees", "list", Effect::Allow);
        let change = Change::add(rule.clone());
        let inverse = change.inverse();

        assert_eq!(inverse.stage_kind, StageKind::Remove);
        assert_eq!(inverse.rule, rule);
        assert_eq!(inverse.inverse(), change);
    }
}
