//! Black-box tests for the HTTP contract consumed by the business modules.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use lattice_api_server::{create_router, AppState};
use lattice_authz::policy::InMemoryPolicyStore;
use lattice_authz::types::{
    Effect, PolicyRule, GLOBAL_DOMAIN, POLICY_ADMIN_ACTION, POLICY_ADMIN_OBJECT,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN: &str = "tenant:global:user:root";

fn app() -> Router {
    let store = InMemoryPolicyStore::with_rules([PolicyRule::permission(
        ADMIN,
        GLOBAL_DOMAIN,
        POLICY_ADMIN_OBJECT,
        POLICY_ADMIN_ACTION,
        Effect::Allow,
    )]);
    create_router(AppState::new(Arc::new(store)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn grant_change(subject: &str) -> Value {
    json!({
        "stage_kind": "add",
        "type": "p",
        "subject": subject,
        "domain": "logging",
        "object": "logging.logs",
        "action": "view",
        "effect": "allow"
    })
}

fn apply_body(base: u64, changes: Vec<Value>) -> Value {
    json!({
        "base_revision": base,
        "subject": ADMIN,
        "domain": "logging",
        "reason": "test grant",
        "changes": changes,
    })
}

#[tokio::test]
async fn apply_success_returns_new_revision() {
    let app = app();

    let response = app
        .oneshot(post_json(
            "/policies/apply",
            apply_body(1, vec![grant_change("alice")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["revision"], 2);
}

#[tokio::test]
async fn apply_stale_base_returns_conflict() {
    let app = app();

    let ok = app
        .clone()
        .oneshot(post_json(
            "/policies/apply",
            apply_body(1, vec![grant_change("alice")]),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let stale = app
        .oneshot(post_json(
            "/policies/apply",
            apply_body(1, vec![grant_change("bob")]),
        ))
        .await
        .unwrap();

    assert_eq!(stale.status(), StatusCode::CONFLICT);
    let body = body_json(stale).await;
    assert_eq!(body["error"], "revision_conflict");
    assert_eq!(body["current_revision"], 2);
}

#[tokio::test]
async fn apply_empty_changes_is_unprocessable() {
    let app = app();

    let response = app
        .oneshot(post_json("/policies/apply", apply_body(1, vec![])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn apply_unknown_rule_type_is_unprocessable() {
    let app = app();
    let bad = json!({
        "stage_kind": "add",
        "type": "x",
        "subject": "alice",
        "domain": "logging",
        "object": "logging.logs",
        "action": "view",
        "effect": "allow"
    });

    let response = app
        .oneshot(post_json("/policies/apply", apply_body(1, vec![bad])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["field"].as_str().unwrap().starts_with("changes[0]"));
}

#[tokio::test]
async fn apply_by_unauthorized_actor_is_forbidden() {
    let app = app();
    let mut body = apply_body(1, vec![grant_change("alice")]);
    body["subject"] = json!("tenant:global:user:mallory");

    let response = app.oneshot(post_json("/policies/apply", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["object"], POLICY_ADMIN_OBJECT);
}

#[tokio::test]
async fn denial_payload_carries_diagnostics_and_echoes_request_id() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/access/check")
        .header("content-type", "application/json")
        .header("x-request-id", "corr-7")
        .body(Body::from(
            json!({
                "subject": "tenant:global:user:alice",
                "domain": "logging",
                "object": "logging.logs",
                "action": "view"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "corr-7");

    let body = body_json(response).await;
    assert_eq!(body["object"], "logging.logs");
    assert_eq!(body["action"], "view");
    assert_eq!(body["domain"], "logging");
    assert_eq!(body["subject"], "tenant:global:user:alice");
    assert_eq!(body["base_revision"], 1);
    assert_eq!(body["request_id"], "corr-7");
    assert_eq!(body["missing_policies"][0]["object"], "logging.logs");
    assert!(body["debug_url"].as_str().unwrap().starts_with("/debug?"));
}

#[tokio::test]
async fn grant_flips_check_to_allow() {
    let app = app();

    let check = json!({
        "subject": "tenant:global:user:alice",
        "domain": "logging",
        "object": "logging.logs",
        "action": "view"
    });

    let denied = app
        .clone()
        .oneshot(post_json("/access/check", check.clone()))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let applied = app
        .clone()
        .oneshot(post_json(
            "/policies/apply",
            apply_body(1, vec![grant_change("tenant:global:user:alice")]),
        ))
        .await
        .unwrap();
    assert_eq!(applied.status(), StatusCode::OK);

    let allowed = app
        .oneshot(post_json("/access/check", check))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    let body = body_json(allowed).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["revision"], 2);
}

#[tokio::test]
async fn opt_in_denial_records_access_request() {
    let app = app();

    let denied = app
        .clone()
        .oneshot(post_json(
            "/access/check",
            json!({
                "subject": "tenant:global:user:alice",
                "domain": "logging",
                "object": "logging.logs",
                "action": "view",
                "request_access": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let body = body_json(denied).await;
    let ticket_id = body["access_request_id"].as_str().unwrap().to_string();

    let listed = app
        .oneshot(
            Request::builder()
                .uri("/requests?status=pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let body = body_json(listed).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["id"], ticket_id.as_str());
    assert_eq!(body["data"][0]["status"], "pending");
}

#[tokio::test]
async fn access_request_lifecycle_over_http() {
    let app = app();

    let created = app
        .clone()
        .oneshot(post_json(
            "/requests",
            json!({
                "subject": "tenant:global:user:alice",
                "domain": "logging",
                "object": "logging.logs",
                "action": "view"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["base_revision"], 1);

    // Resolution is policy-gated: a non-admin is refused.
    let refused = app
        .clone()
        .oneshot(post_json(
            &format!("/requests/{id}/resolve"),
            json!({"subject": "tenant:global:user:alice", "domain": "logging"}),
        ))
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let resolved = app
        .clone()
        .oneshot(post_json(
            &format!("/requests/{id}/resolve"),
            json!({"subject": ADMIN, "domain": "logging"}),
        ))
        .await
        .unwrap();
    assert_eq!(resolved.status(), StatusCode::OK);
    let body = body_json(resolved).await;
    assert_eq!(body["status"], "resolved");

    // Resolving twice is an invalid transition.
    let again = app
        .oneshot(post_json(
            &format!("/requests/{id}/resolve"),
            json!({"subject": ADMIN, "domain": "logging"}),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn policies_listing_reflects_commits() {
    let app = app();

    app.clone()
        .oneshot(post_json(
            "/policies/apply",
            apply_body(1, vec![grant_change("alice")]),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/policies")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["revision"], 2);
    assert_eq!(body["total"], 2);
    let objects: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["object"].as_str().unwrap())
        .collect();
    assert!(objects.contains(&"logging.logs"));
}

#[tokio::test]
async fn debug_endpoint_reports_role_closure() {
    let app = app();

    let changes = vec![
        json!({
            "stage_kind": "add",
            "type": "g",
            "subject": "tenant:global:user:alice",
            "domain": "logging",
            "object": "role:auditor"
        }),
        json!({
            "stage_kind": "add",
            "type": "p",
            "subject": "role:auditor",
            "domain": "logging",
            "object": "logging.logs",
            "action": "view",
            "effect": "allow"
        }),
    ];
    let applied = app
        .clone()
        .oneshot(post_json("/policies/apply", apply_body(1, changes)))
        .await
        .unwrap();
    assert_eq!(applied.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/debug?subject=tenant:global:user:alice&domain=logging&object=logging.logs&action=view")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["revision"], 2);
    assert_eq!(body["resolved_roles"][0], "role:auditor");
    assert_eq!(body["matched_policies"][0]["subject"], "role:auditor");
}

#[tokio::test]
async fn debug_requires_object_and_action() {
    let app = app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/debug?subject=alice&object=logging.logs&action=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
