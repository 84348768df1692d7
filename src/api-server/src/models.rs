//! Wire models for the HTTP contract
//!
//! JSON field names are part of the compatibility contract with the
//! business modules and the UI layer and must not change. String rule
//! kinds and effects are translated to the engine's closed enums here and
//! nowhere else.

use crate::error::ApiError;
use lattice_authz::requests::AccessRequest;
use lattice_authz::types::{normalize_action, Change, Effect, PolicyRule, RevisionId, RuleKind, StageKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single policy entry on the wire: `type` is `"p"` for permission rules
/// and `"g"` for role assignments (where `object` names the granted role).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PolicyEntry {
    #[serde(rename = "type")]
    pub entry_type: String,

    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub domain: String,

    #[validate(length(min = 1))]
    pub object: String,

    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub effect: String,
}

impl PolicyEntry {
    pub fn from_rule(rule: &PolicyRule) -> Self {
        match rule.kind {
            RuleKind::Permission => Self {
                entry_type: "p".to_string(),
                subject: rule.subject.clone(),
                domain: rule.domain.clone(),
                object: rule.object.clone(),
                action: rule.action.clone(),
                effect: match rule.effect {
                    Effect::Allow => "allow".to_string(),
                    Effect::Deny => "deny".to_string(),
                },
            },
            RuleKind::RoleAssignment => Self {
                entry_type: "g".to_string(),
                subject: rule.subject.clone(),
                domain: rule.domain.clone(),
                object: rule.object.clone(),
                action: String::new(),
                effect: String::new(),
            },
        }
    }

    pub fn into_rule(self) -> Result<PolicyRule, ApiError> {
        match self.entry_type.as_str() {
            "p" => {
                let effect = match self.effect.trim() {
                    "" | "allow" => Effect::Allow,
                    "deny" => Effect::Deny,
                    other => {
                        return Err(ApiError::validation(
                            "effect",
                            format!("unknown effect {other:?}, expected \"allow\" or \"deny\""),
                        ))
                    }
                };
                Ok(PolicyRule::permission(
                    self.subject,
                    self.domain,
                    self.object,
                    normalize_action(&self.action),
                    effect,
                ))
            }
            "g" => Ok(PolicyRule::role_assignment(
                self.subject,
                self.domain,
                self.object,
            )),
            other => Err(ApiError::validation(
                "type",
                format!("unknown rule type {other:?}, expected \"p\" or \"g\""),
            )),
        }
    }
}

/// Staged change entry within an apply body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangeEntry {
    pub stage_kind: String,

    #[serde(flatten)]
    #[validate(nested)]
    pub entry: PolicyEntry,
}

impl ChangeEntry {
    pub fn from_change(change: &Change) -> Self {
        Self {
            stage_kind: match change.stage_kind {
                StageKind::Add => "add".to_string(),
                StageKind::Remove => "remove".to_string(),
            },
            entry: PolicyEntry::from_rule(&change.rule),
        }
    }

    pub fn into_change(self) -> Result<Change, ApiError> {
        let stage_kind = match self.stage_kind.as_str() {
            "add" => StageKind::Add,
            "remove" => StageKind::Remove,
            other => {
                return Err(ApiError::validation(
                    "stage_kind",
                    format!("unknown stage kind {other:?}, expected \"add\" or \"remove\""),
                ))
            }
        };
        Ok(Change {
            stage_kind,
            rule: self.entry.into_rule()?,
        })
    }
}

/// `POST /policies/apply` request body.
#[derive(Debug, Deserialize, Validate)]
pub struct ApplyBody {
    pub base_revision: RevisionId,

    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub domain: String,

    #[serde(default)]
    pub reason: String,

    #[validate(length(min = 1, message = "at least one change is required"))]
    pub changes: Vec<ChangeEntry>,
}

/// `POST /policies/apply` success response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub revision: RevisionId,
}

/// `GET /policies` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyListResponse {
    pub revision: RevisionId,
    pub data: Vec<PolicyEntry>,
    pub total: usize,
}

/// `GET /debug` query parameters.
#[derive(Debug, Deserialize)]
pub struct DebugParams {
    pub subject: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub object: String,
    pub action: String,
}

/// `GET /debug` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebugResponse {
    pub allowed: bool,
    pub revision: RevisionId,
    pub latency_ms: u64,
    pub request: DebugRequest,
    pub resolved_roles: Vec<String>,
    pub matched_policies: Vec<PolicyEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebugRequest {
    pub subject: String,
    pub domain: String,
    pub object: String,
    pub action: String,
}

/// `POST /access/check` request body.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckBody {
    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub domain: String,

    #[validate(length(min = 1))]
    pub object: String,

    #[validate(length(min = 1))]
    pub action: String,

    /// Opt-in: record an access request when the decision is a deny.
    #[serde(default)]
    pub request_access: bool,
}

/// `POST /access/check` allow response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub revision: RevisionId,
    pub resolved_roles: Vec<String>,
}

/// `POST /requests` request body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccessRequestBody {
    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub domain: String,

    #[validate(length(min = 1))]
    pub object: String,

    #[validate(length(min = 1))]
    pub action: String,

    /// Revision the denial was observed at; defaults to the current one.
    #[serde(default)]
    pub base_revision: Option<RevisionId>,
}

/// Access request on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessRequestResponse {
    pub id: Uuid,
    pub subject: String,
    pub domain: String,
    pub object: String,
    pub action: String,
    pub base_revision: RevisionId,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<AccessRequest> for AccessRequestResponse {
    fn from(request: AccessRequest) -> Self {
        Self {
            id: request.id,
            subject: request.subject,
            domain: request.domain,
            object: request.object,
            action: request.action,
            base_revision: request.base_revision,
            status: match request.status {
                lattice_authz::AccessRequestStatus::Pending => "pending".to_string(),
                lattice_authz::AccessRequestStatus::Resolved => "resolved".to_string(),
            },
            created_at: request.created_at,
            resolved_at: request.resolved_at,
        }
    }
}

/// `GET /requests` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessRequestListResponse {
    pub data: Vec<AccessRequestResponse>,
    pub total: usize,
}

/// `POST /requests/{id}/resolve` request body.
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveBody {
    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub domain: String,
}

/// `GET /health` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
