//! Access request workflow
//!
//! A denied caller may opt in to recording a structured ticket for
//! asynchronous administrator review. The state machine is pending →
//! resolved only; resolution happens through an external administrative
//! action that ultimately results in a new apply, never automatically.

use crate::error::{AuthzError, Result};
use crate::types::RevisionId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Resolved,
}

/// A recorded request for access to a denied (domain, object, action).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub subject: String,
    pub domain: String,
    pub object: String,
    pub action: String,

    /// Revision the denial was computed against
    pub base_revision: RevisionId,

    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    /// Build a pending request for a denied tuple.
    pub fn pending(
        subject: impl Into<String>,
        domain: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
        base_revision: RevisionId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            domain: domain.into(),
            object: object.into(),
            action: action.into(),
            base_revision,
            status: AccessRequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// List filter for administrator review screens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessRequestFilter {
    pub status: Option<AccessRequestStatus>,
    pub subject: Option<String>,
    pub domain: Option<String>,
}

#[async_trait]
pub trait AccessRequestStore: Send + Sync {
    async fn create(&self, request: AccessRequest) -> Result<AccessRequest>;

    async fn get(&self, id: Uuid) -> Result<AccessRequest>;

    /// Requests matching the filter, newest first.
    async fn list(&self, filter: &AccessRequestFilter) -> Result<Vec<AccessRequest>>;

    /// Transition pending → resolved. Any other transition is rejected.
    async fn resolve(&self, id: Uuid) -> Result<AccessRequest>;
}

/// In-memory access request store.
#[derive(Default)]
pub struct InMemoryAccessRequestStore {
    requests: DashMap<Uuid, AccessRequest>,
}

impl InMemoryAccessRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessRequestStore for InMemoryAccessRequestStore {
    async fn create(&self, request: AccessRequest) -> Result<AccessRequest> {
        info!(
            id = %request.id,
            subject = %request.subject,
            domain = %request.domain,
            object = %request.object,
            action = %request.action,
            "access request recorded"
        );
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: Uuid) -> Result<AccessRequest> {
        self.requests
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(AuthzError::RequestNotFound(id))
    }

    async fn list(&self, filter: &AccessRequestFilter) -> Result<Vec<AccessRequest>> {
        let mut requests: Vec<AccessRequest> = self
            .requests
            .iter()
            .filter(|entry| {
                filter.status.map_or(true, |status| entry.status == status)
                    && filter
                        .subject
                        .as_ref()
                        .map_or(true, |subject| &entry.subject == subject)
                    && filter
                        .domain
                        .as_ref()
                        .map_or(true, |domain| &entry.domain == domain)
            })
            .map(|entry| entry.clone())
            .collect();

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn resolve(&self, id: Uuid) -> Result<AccessRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(AuthzError::RequestNotFound(id))?;

        if entry.status != AccessRequestStatus::Pending {
            return Err(AuthzError::InvalidTransition(format!(
                "access request {id} is already resolved"
            )));
        }

        entry.status = AccessRequestStatus::Resolved;
        entry.resolved_at = Some(Utc::now());
        info!(id = %id, "access request resolved");
        Ok(entry.clone())
    }
}
