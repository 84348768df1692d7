//! HTTP handlers for the authorization contract

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, Result};
use crate::middleware::RequestId;
use crate::models::*;
use crate::state::AppState;
use lattice_authz::apply::ApplyRequest;
use lattice_authz::evaluator::Decision;
use lattice_authz::requests::{AccessRequest, AccessRequestFilter};
use lattice_authz::types::{Change, GLOBAL_DOMAIN, POLICY_ADMIN_ACTION, POLICY_ADMIN_OBJECT};
use lattice_authz::AuthzError;

/// `POST /policies/apply` - commit a staged batch against a base revision.
pub async fn apply_policies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<ApplyBody>,
) -> Result<Json<ApplyResponse>> {
    body.validate().map_err(ApiError::from_validator)?;

    let mut changes: Vec<Change> = Vec::with_capacity(body.changes.len());
    for (index, entry) in body.changes.into_iter().enumerate() {
        let change = entry.into_change().map_err(|err| match err {
            ApiError::Validation { field, message } => ApiError::Validation {
                field: format!("changes[{index}].{field}"),
                message,
            },
            other => other,
        })?;
        changes.push(change);
    }

    let request = ApplyRequest {
        base_revision: body.base_revision,
        subject: body.subject,
        domain: body.domain,
        reason: body.reason,
        changes,
    };

    let outcome = state.coordinator.apply(&request).await;
    match &outcome {
        Ok(_) => state.metrics.record_commit().await,
        Err(AuthzError::Conflict { .. }) => state.metrics.record_conflict().await,
        Err(_) => {}
    }
    let outcome = outcome.map_err(|err| ApiError::from_authz(err, request_id.0.clone()))?;

    Ok(Json(ApplyResponse {
        revision: outcome.revision,
    }))
}

/// `GET /policies` - current rule set and revision, for re-staging clients.
pub async fn list_policies(State(state): State<AppState>) -> Result<Json<PolicyListResponse>> {
    let snapshot = state
        .store
        .rules_at(None)
        .await
        .map_err(|err| ApiError::from_authz(err, None))?;

    let data: Vec<PolicyEntry> = snapshot
        .rules
        .to_sorted_vec()
        .iter()
        .map(PolicyEntry::from_rule)
        .collect();
    let total = data.len();

    Ok(Json(PolicyListResponse {
        revision: snapshot.revision,
        data,
        total,
    }))
}

/// `GET /debug` - resolved role closure and matching rules for a tuple.
pub async fn debug_decision(
    State(state): State<AppState>,
    Query(params): Query<DebugParams>,
) -> Result<Json<DebugResponse>> {
    if params.subject.trim().is_empty() {
        return Err(ApiError::validation("subject", "must not be empty"));
    }
    if params.object.trim().is_empty() || params.action.trim().is_empty() {
        return Err(ApiError::validation(
            "object",
            "object and action are required",
        ));
    }
    let domain = params
        .domain
        .clone()
        .unwrap_or_else(|| GLOBAL_DOMAIN.to_string());

    let inspection = state
        .evaluator
        .inspect(&params.subject, &domain, &params.object, &params.action)
        .await
        .map_err(|err| ApiError::from_authz(err, None))?;

    Ok(Json(DebugResponse {
        allowed: inspection.allowed,
        revision: inspection.revision,
        latency_ms: inspection.latency.as_millis() as u64,
        request: DebugRequest {
            subject: params.subject,
            domain,
            object: params.object,
            action: params.action,
        },
        resolved_roles: inspection.resolved_roles,
        matched_policies: inspection.matched.iter().map(PolicyEntry::from_rule).collect(),
    }))
}

/// `POST /access/check` - the protected-access decision endpoint. Allows
/// return 200; denials return 403 with the full diagnostics payload and
/// optionally record an access request when the caller opts in.
pub async fn check_access(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<CheckBody>,
) -> Result<Response> {
    body.validate().map_err(ApiError::from_validator)?;

    let start = Instant::now();
    let decision = state
        .evaluator
        .decide(&body.subject, &body.domain, &body.object, &body.action)
        .await
        .map_err(|err| ApiError::from_authz(err, request_id.0.clone()))?;

    state.metrics.record_decision(decision.is_allowed()).await;
    state.metrics.record_latency(start.elapsed()).await;

    match decision {
        Decision::Allow(ctx) => Ok(Json(CheckResponse {
            allowed: true,
            revision: ctx.revision,
            resolved_roles: ctx.resolved_roles,
        })
        .into_response()),
        Decision::Deny(diagnostics) => {
            let mut payload = diagnostics.to_forbidden_payload(request_id.0.clone());

            // A denial is not a fault: record the opt-in ticket and answer 403.
            if body.request_access {
                let ticket = state
                    .requests
                    .create(AccessRequest::pending(
                        diagnostics.subject.clone(),
                        diagnostics.domain.clone(),
                        diagnostics.object.clone(),
                        diagnostics.action.clone(),
                        diagnostics.revision,
                    ))
                    .await
                    .map_err(|err| ApiError::from_authz(err, None))?;
                payload.access_request_id = Some(ticket.id);
            }

            Ok((StatusCode::FORBIDDEN, Json(payload)).into_response())
        }
    }
}

/// `POST /requests` - record an access request from the "request access"
/// UI action.
pub async fn create_request(
    State(state): State<AppState>,
    Json(body): Json<CreateAccessRequestBody>,
) -> Result<(StatusCode, Json<AccessRequestResponse>)> {
    body.validate().map_err(ApiError::from_validator)?;

    let base_revision = match body.base_revision {
        Some(revision) => revision,
        None => state
            .store
            .current_revision()
            .await
            .map_err(|err| ApiError::from_authz(err, None))?,
    };

    let ticket = state
        .requests
        .create(AccessRequest::pending(
            body.subject,
            body.domain,
            body.object,
            body.action,
            base_revision,
        ))
        .await
        .map_err(|err| ApiError::from_authz(err, None))?;

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

/// `GET /requests` - list access requests for administrator review.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<AccessRequestFilter>,
) -> Result<Json<AccessRequestListResponse>> {
    let requests = state
        .requests
        .list(&filter)
        .await
        .map_err(|err| ApiError::from_authz(err, None))?;

    let data: Vec<AccessRequestResponse> = requests.into_iter().map(Into::into).collect();
    let total = data.len();

    Ok(Json(AccessRequestListResponse { data, total }))
}

/// `POST /requests/{id}/resolve` - administrator resolution. Gated by the
/// same policy-admin permission as apply, since resolving ultimately
/// results in a new apply.
pub async fn resolve_request(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<AccessRequestResponse>> {
    body.validate().map_err(ApiError::from_validator)?;

    let gate = state
        .evaluator
        .decide(
            &body.subject,
            &body.domain,
            POLICY_ADMIN_OBJECT,
            POLICY_ADMIN_ACTION,
        )
        .await
        .map_err(|err| ApiError::from_authz(err, request_id.0.clone()))?;
    if let Decision::Deny(diagnostics) = gate {
        return Err(ApiError::Forbidden {
            diagnostics: Box::new(diagnostics),
            request_id: request_id.0.clone(),
        });
    }

    let resolved = state
        .requests
        .resolve(id)
        .await
        .map_err(|err| ApiError::from_authz(err, request_id.0.clone()))?;

    Ok(Json(resolved.into()))
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: lattice_authz::VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// `GET /metrics` - Prometheus text format.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    let metrics = state.metrics.export_prometheus().await;
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics,
    )
        .into_response()
}
