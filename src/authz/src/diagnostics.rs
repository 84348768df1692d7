//! Denial diagnostics and the forbidden response payload
//!
//! On a deny decision the evaluator produces enough structured data for a
//! calling module or UI to explain the denial and to retry safely after
//! policies change: the evaluated tuple, the resolved subject, the missing
//! policy shapes that would flip the decision, and the revision the
//! decision was computed against.

use crate::types::{Effect, PolicyRule, RevisionId};
use serde::{Deserialize, Serialize};

/// A denied (domain, object, action) combination for the current subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingPolicy {
    pub domain: String,
    pub object: String,
    pub action: String,
}

/// A single allow rule that would fix a missing policy, ready to be staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySuggestion {
    pub subject: String,
    pub domain: String,
    pub object: String,
    pub action: String,
    pub effect: Effect,
}

/// Structured context for a deny decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialDiagnostics {
    /// The resolved subject the decision was evaluated for
    pub subject: String,

    pub domain: String,
    pub object: String,
    pub action: String,

    /// Revision the decision was computed against
    pub revision: RevisionId,

    /// Roles in the subject's transitive closure at that revision
    pub resolved_roles: Vec<String>,

    /// Permission tuples that, added with `effect=allow` for the subject,
    /// would flip the decision. Empty when a deny rule matched, because no
    /// allow addition can override it.
    pub missing_policies: Vec<MissingPolicy>,

    /// Deny rules that matched the request, if any.
    pub denied_by: Vec<PolicyRule>,
}

impl DenialDiagnostics {
    /// Suggestions that can be fed straight into a staging workspace: one
    /// allow rule per missing policy, bound to the denied subject.
    pub fn suggest_diff(&self) -> Vec<PolicySuggestion> {
        self.missing_policies
            .iter()
            .map(|missing| PolicySuggestion {
                subject: self.subject.clone(),
                domain: missing.domain.clone(),
                object: missing.object.clone(),
                action: missing.action.clone(),
                effect: Effect::Allow,
            })
            .collect()
    }

    /// Build the wire payload for a 403 response. `request_id` echoes the
    /// caller's correlation header verbatim when one was supplied.
    pub fn to_forbidden_payload(&self, request_id: Option<String>) -> ForbiddenPayload {
        ForbiddenPayload {
            error: "forbidden".to_string(),
            message: format!(
                "Forbidden: {} {}. Request access via {}.",
                self.object, self.action, REQUEST_URL
            ),
            object: self.object.clone(),
            action: self.action.clone(),
            domain: self.domain.clone(),
            subject: self.subject.clone(),
            base_revision: self.revision,
            missing_policies: self.missing_policies.clone(),
            suggest_diff: self.suggest_diff(),
            request_url: REQUEST_URL.to_string(),
            debug_url: self.debug_url(),
            request_id,
            access_request_id: None,
        }
    }

    fn debug_url(&self) -> String {
        format!(
            "{}?subject={}&domain={}&object={}&action={}",
            DEBUG_URL, self.subject, self.domain, self.object, self.action
        )
    }
}

const REQUEST_URL: &str = "/requests";
const DEBUG_URL: &str = "/debug";

/// Unified forbidden response contract returned by every protected endpoint
/// on denial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenPayload {
    pub error: String,
    pub message: String,
    pub object: String,
    pub action: String,
    pub domain: String,
    pub subject: String,
    pub base_revision: RevisionId,
    pub missing_policies: Vec<MissingPolicy>,
    pub suggest_diff: Vec<PolicySuggestion>,
    pub request_url: String,
    pub debug_url: String,

    /// Echo of the caller's correlation id, when supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Id of the access request recorded for this denial, when the caller
    /// opted in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_request_id: Option<uuid::Uuid>,
}
