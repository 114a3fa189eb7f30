// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Authorization Integration Tests
//!
//! End-to-end tests for the authorization models, driven through the full
//! router with all middleware attached:
//!
//! - RBAC checks and role management
//! - ABAC rules
//! - PBAC policies
//! - ACL entries
//! - OAuth-style scopes
//! - Multi-tenant checks
//!
//! ## Test Categories
//!
//! - `test_rbac_*`: Role checks and role administration
//! - `test_abac_*` / `test_pbac_*` / `test_acl_*`: Rule and policy models
//! - `test_scope_*` / `test_tenant_*`: Scopes and tenant membership

use axum::http::StatusCode;
use keyrack_tests::prelude::*;
use serde_json::json;

// =============================================================================
// RBAC
// =============================================================================

#[tokio::test]
async fn test_rbac_check_uses_caller_roles() {
    init_test_logging();
    let app = TestApp::spawn();

    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;
    let allowed = app
        .post(
            "/api/v1/authz/rbac/check",
            Some(&admin),
            json!({ "permission": "policy:write" }),
        )
        .await;
    allowed.assert_status(StatusCode::OK);
    assert_eq!(allowed.data()["allowed"], true);

    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;
    let denied = app
        .post(
            "/api/v1/authz/rbac/check",
            Some(&viewer),
            json!({ "permission": "policy:write" }),
        )
        .await;
    denied.assert_status(StatusCode::OK);
    assert_eq!(denied.data()["allowed"], false);
}

#[tokio::test]
async fn test_rbac_check_accepts_explicit_roles() {
    let app = TestApp::spawn();
    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    // A viewer may ask hypothetical questions about other role sets
    let response = app
        .post(
            "/api/v1/authz/rbac/check",
            Some(&viewer),
            json!({ "roles": ["admin"], "permission": "user:admin" }),
        )
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.data()["allowed"], true);
}

#[tokio::test]
async fn test_rbac_check_rejects_unknown_permission() {
    let app = TestApp::spawn();
    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    let response = app
        .post(
            "/api/v1/authz/rbac/check",
            Some(&viewer),
            json!({ "permission": "warp:core" }),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rbac_roles_listing_is_gated() {
    let app = TestApp::spawn();

    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;
    let response = app.get("/api/v1/authz/rbac/roles", Some(&admin)).await;
    response.assert_status(StatusCode::OK);

    // Viewers lack policy:read
    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;
    let response = app.get("/api/v1/authz/rbac/roles", Some(&viewer)).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rbac_role_assignment() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let username = unique_username("promotee");
    app.register(&username, VALID_PASSWORD).await;
    let token = app.login(&username, VALID_PASSWORD).await;
    let me = app.get("/api/v1/auth/me", Some(&token)).await;
    let user_id = me.data()["user_id"].as_str().unwrap().to_string();

    let path = format!("/api/v1/authz/rbac/users/{}/roles", user_id);

    // New accounts get the default role
    let current = app.get(&path, Some(&admin)).await;
    current.assert_status(StatusCode::OK);
    assert_eq!(current.data()["roles"], json!(["member"]));

    // The list is replaced wholesale
    let updated = app
        .put(&path, Some(&admin), json!({ "roles": ["admin", "viewer"] }))
        .await;
    updated.assert_status(StatusCode::OK);
    assert_eq!(updated.data()["roles"], json!(["admin", "viewer"]));

    // Unknown roles are refused
    let rejected = app
        .put(&path, Some(&admin), json!({ "roles": ["wizard"] }))
        .await;
    rejected.assert_status(StatusCode::BAD_REQUEST);

    // Assignment needs user:admin; reading only needs user:read
    let member_token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    app.get(&path, Some(&member_token))
        .await
        .assert_status(StatusCode::OK);
    app.put(&path, Some(&member_token), json!({ "roles": ["viewer"] }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// =============================================================================
// ABAC
// =============================================================================

#[tokio::test]
async fn test_abac_rule_lifecycle_and_check() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let created = app
        .post(
            "/api/v1/authz/abac/rules",
            Some(&admin),
            json!({
                "description": "Engineers may read documents",
                "effect": "allow",
                "action": "document:read",
                "subject_match": { "department": "engineering" },
            }),
        )
        .await;
    created.assert_status(StatusCode::CREATED);
    let rule_id = created.data()["id"].as_str().unwrap().to_string();

    // Matching request allows
    let allowed = app
        .post(
            "/api/v1/authz/abac/check",
            Some(&admin),
            json!({
                "subject": { "department": "engineering" },
                "action": "document:read",
            }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);

    // Different department does not match: default deny
    let denied = app
        .post(
            "/api/v1/authz/abac/check",
            Some(&admin),
            json!({
                "subject": { "department": "sales" },
                "action": "document:read",
            }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);

    // Fetch, update, delete
    let path = format!("/api/v1/authz/abac/rules/{}", rule_id);
    app.get(&path, Some(&admin)).await.assert_status(StatusCode::OK);

    let updated = app
        .put(
            &path,
            Some(&admin),
            json!({
                "effect": "allow",
                "action": "document:write",
                "subject_match": { "department": "engineering" },
            }),
        )
        .await;
    updated.assert_status(StatusCode::OK);
    assert_eq!(updated.data()["action"], "document:write");

    app.delete(&path, Some(&admin)).await.assert_status(StatusCode::OK);
    app.get(&path, Some(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_abac_deny_overrides_allow() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/abac/rules",
        Some(&admin),
        json!({ "effect": "allow", "action": "*" }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    app.post(
        "/api/v1/authz/abac/rules",
        Some(&admin),
        json!({
            "effect": "deny",
            "action": "document:delete",
            "conditions": [
                { "op": "eq", "attribute": "environment", "value": "production" }
            ],
        }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    // The deny matches in production even though the allow matches too
    let denied = app
        .post(
            "/api/v1/authz/abac/check",
            Some(&admin),
            json!({
                "action": "document:delete",
                "context": { "environment": "production" },
            }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);

    // Outside production only the allow applies
    let allowed = app
        .post(
            "/api/v1/authz/abac/check",
            Some(&admin),
            json!({
                "action": "document:delete",
                "context": { "environment": "staging" },
            }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);
}

#[tokio::test]
async fn test_abac_rule_listing_paginates() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    for action in ["document:read", "document:write", "document:delete"] {
        app.post(
            "/api/v1/authz/abac/rules",
            Some(&admin),
            json!({ "effect": "allow", "action": action }),
        )
        .await
        .assert_status(StatusCode::CREATED);
    }

    let first = app
        .get("/api/v1/authz/abac/rules?page=1&per_page=2", Some(&admin))
        .await;
    first.assert_status(StatusCode::OK);
    assert_eq!(first.data().as_array().unwrap().len(), 2);
    assert_eq!(first.body["meta"]["total"], 3);
    assert_eq!(first.body["meta"]["total_pages"], 2);

    let second = app
        .get("/api/v1/authz/abac/rules?page=2&per_page=2", Some(&admin))
        .await;
    assert_eq!(second.data().as_array().unwrap().len(), 1);

    // Page numbering is 1-indexed
    let invalid = app
        .get("/api/v1/authz/abac/rules?page=0", Some(&admin))
        .await;
    invalid.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_abac_writes_require_policy_write() {
    let app = TestApp::spawn();
    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    let response = app
        .post(
            "/api/v1/authz/abac/rules",
            Some(&viewer),
            json!({ "effect": "allow", "action": "*" }),
        )
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

// =============================================================================
// PBAC
// =============================================================================

#[tokio::test]
async fn test_pbac_policy_lifecycle_and_check() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let created = app
        .post(
            "/api/v1/authz/pbac/policies",
            Some(&admin),
            json!({
                "name": "user-readers",
                "effect": "allow",
                "actions": ["user:*"],
                "resources": ["users/*"],
            }),
        )
        .await;
    created.assert_status(StatusCode::CREATED);
    let policy_id = created.data()["id"].as_str().unwrap().to_string();

    // The wildcard action covers user:read on a matching resource
    let allowed = app
        .post(
            "/api/v1/authz/pbac/check",
            Some(&admin),
            json!({
                "principal": "alice",
                "action": "user:read",
                "resource": "users/bob",
            }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);

    // A non-matching resource falls through to default deny
    let denied = app
        .post(
            "/api/v1/authz/pbac/check",
            Some(&admin),
            json!({
                "principal": "alice",
                "action": "user:read",
                "resource": "tenants/acme",
            }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);

    let path = format!("/api/v1/authz/pbac/policies/{}", policy_id);
    app.get(&path, Some(&admin)).await.assert_status(StatusCode::OK);
    app.delete(&path, Some(&admin)).await.assert_status(StatusCode::OK);
    app.get(&path, Some(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pbac_explicit_deny_wins() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/pbac/policies",
        Some(&admin),
        json!({
            "name": "allow-everything",
            "effect": "allow",
            "actions": ["*"],
            "resources": ["*"],
        }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    app.post(
        "/api/v1/authz/pbac/policies",
        Some(&admin),
        json!({
            "name": "protect-billing",
            "effect": "deny",
            "actions": ["*"],
            "resources": ["billing/*"],
        }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let denied = app
        .post(
            "/api/v1/authz/pbac/check",
            Some(&admin),
            json!({
                "principal": "alice",
                "action": "user:read",
                "resource": "billing/invoices",
            }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);
    assert!(denied.data()["reason"]
        .as_str()
        .unwrap()
        .contains("protect-billing"));

    let allowed = app
        .post(
            "/api/v1/authz/pbac/check",
            Some(&admin),
            json!({
                "principal": "alice",
                "action": "user:read",
                "resource": "users/bob",
            }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);
}

// =============================================================================
// ACL
// =============================================================================

#[tokio::test]
async fn test_acl_entry_lifecycle_and_check() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let me = app.get("/api/v1/auth/me", Some(&admin)).await;
    let admin_id = me.data()["user_id"].as_str().unwrap().to_string();

    let created = app
        .post(
            "/api/v1/authz/acl/entries",
            Some(&admin),
            json!({
                "resource": "reports/q3",
                "subject": format!("user:{}", admin_id),
                "permissions": ["read", "write"],
            }),
        )
        .await;
    created.assert_status(StatusCode::CREATED);
    let entry_id = created.data()["id"].as_str().unwrap().to_string();

    // Granted permission allows
    let allowed = app
        .post(
            "/api/v1/authz/acl/check",
            Some(&admin),
            json!({ "resource": "reports/q3", "permission": "write" }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);

    // Ungranted permission denies
    let denied = app
        .post(
            "/api/v1/authz/acl/check",
            Some(&admin),
            json!({ "resource": "reports/q3", "permission": "delete" }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);

    // Listing filters by resource
    let listed = app
        .get("/api/v1/authz/acl/entries?resource=reports/q3", Some(&admin))
        .await;
    listed.assert_status(StatusCode::OK);
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let other = app
        .get("/api/v1/authz/acl/entries?resource=reports/q4", Some(&admin))
        .await;
    assert!(other.data().as_array().unwrap().is_empty());

    app.delete(&format!("/api/v1/authz/acl/entries/{}", entry_id), Some(&admin))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_acl_role_grant_and_deny_entry() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/acl/entries",
        Some(&admin),
        json!({
            "resource": "wiki/home",
            "subject": "role:member",
            "permissions": ["read"],
        }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let member = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let allowed = app
        .post(
            "/api/v1/authz/acl/check",
            Some(&member),
            json!({ "resource": "wiki/home", "permission": "read" }),
        )
        .await;
    assert_eq!(allowed.data()["allowed"], true);

    // A deny entry for the member's user overrides the role grant
    let me = app.get("/api/v1/auth/me", Some(&member)).await;
    let member_id = me.data()["user_id"].as_str().unwrap().to_string();

    app.post(
        "/api/v1/authz/acl/entries",
        Some(&admin),
        json!({
            "resource": "wiki/home",
            "subject": format!("user:{}", member_id),
            "permissions": ["read"],
            "deny": true,
        }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let denied = app
        .post(
            "/api/v1/authz/acl/check",
            Some(&member),
            json!({ "resource": "wiki/home", "permission": "read" }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);
}

#[tokio::test]
async fn test_acl_entry_requires_permissions() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let response = app
        .post(
            "/api/v1/authz/acl/entries",
            Some(&admin),
            json!({
                "resource": "wiki/home",
                "subject": "role:member",
                "permissions": [],
            }),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// Scopes
// =============================================================================

#[tokio::test]
async fn test_scope_check_with_explicit_scopes() {
    let app = TestApp::spawn();
    let token = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    // All required scopes covered
    let allowed = app
        .post(
            "/api/v1/authz/scopes/check",
            Some(&token),
            json!({
                "scopes": ["read:users", "write:users"],
                "required": ["read:users"],
            }),
        )
        .await;
    allowed.assert_status(StatusCode::OK);
    assert_eq!(allowed.data()["allowed"], true);

    // A missing scope denies
    let denied = app
        .post(
            "/api/v1/authz/scopes/check",
            Some(&token),
            json!({
                "scopes": ["read:users"],
                "required": ["read:users", "write:users"],
            }),
        )
        .await;
    assert_eq!(denied.data()["allowed"], false);
}

#[tokio::test]
async fn test_scope_wildcard_covers_family() {
    let app = TestApp::spawn();
    let token = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    let response = app
        .post(
            "/api/v1/authz/scopes/check",
            Some(&token),
            json!({
                "scopes": ["read:*"],
                "required": ["read:users", "read:reports"],
            }),
        )
        .await;
    assert_eq!(response.data()["allowed"], true);
}

#[tokio::test]
async fn test_scope_check_defaults_to_token_scopes() {
    let app = TestApp::spawn();
    let token = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    // Password logins carry no scopes, so the check falls through to deny
    let response = app
        .post(
            "/api/v1/authz/scopes/check",
            Some(&token),
            json!({ "required": ["read:users"] }),
        )
        .await;
    assert_eq!(response.data()["allowed"], false);
}

// =============================================================================
// Tenants
// =============================================================================

#[tokio::test]
async fn test_tenant_lifecycle() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let created = app
        .post(
            "/api/v1/authz/tenants",
            Some(&admin),
            json!({ "id": "acme", "name": "Acme Corp" }),
        )
        .await;
    created.assert_status(StatusCode::CREATED);
    assert_eq!(created.data()["id"], "acme");

    // Duplicate IDs conflict
    let duplicate = app
        .post(
            "/api/v1/authz/tenants",
            Some(&admin),
            json!({ "id": "acme", "name": "Acme Again" }),
        )
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let fetched = app.get("/api/v1/authz/tenants/acme", Some(&admin)).await;
    fetched.assert_status(StatusCode::OK);
    assert_eq!(fetched.data()["name"], "Acme Corp");

    app.delete("/api/v1/authz/tenants/acme", Some(&admin))
        .await
        .assert_status(StatusCode::OK);
    app.get("/api/v1/authz/tenants/acme", Some(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tenant_writes_require_tenant_admin() {
    let app = TestApp::spawn();
    let viewer = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    let response = app
        .post(
            "/api/v1/authz/tenants",
            Some(&viewer),
            json!({ "id": "rogue", "name": "Rogue" }),
        )
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenant_membership_management() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/tenants",
        Some(&admin),
        json!({ "id": "globex", "name": "Globex" }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let member = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let me = app.get("/api/v1/auth/me", Some(&member)).await;
    let member_id = me.data()["user_id"].as_str().unwrap().to_string();

    let path = format!("/api/v1/authz/tenants/globex/members/{}", member_id);

    // Membership role must be a defined role
    app.put(&path, Some(&admin), json!({ "role": "overlord" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let set = app.put(&path, Some(&admin), json!({ "role": "viewer" })).await;
    set.assert_status(StatusCode::OK);
    assert_eq!(set.data()["role"], "viewer");

    let members = app
        .get("/api/v1/authz/tenants/globex/members", Some(&admin))
        .await;
    assert_eq!(members.data().as_array().unwrap().len(), 1);

    app.delete(&path, Some(&admin)).await.assert_status(StatusCode::OK);
    app.delete(&path, Some(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tenant_check_uses_tenant_role_not_global() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/tenants",
        Some(&admin),
        json!({ "id": "initech", "name": "Initech" }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let member = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let me = app.get("/api/v1/auth/me", Some(&member)).await;
    let member_id = me.data()["user_id"].as_str().unwrap().to_string();

    // Not a member yet: denied despite global roles
    let outside = app
        .post(
            "/api/v1/authz/tenants/initech/check",
            Some(&member),
            json!({ "permission": "user:read" }),
        )
        .await;
    assert_eq!(outside.data()["allowed"], false);

    // Joined as viewer: tenant role decides, not the global member role
    app.put(
        &format!("/api/v1/authz/tenants/initech/members/{}", member_id),
        Some(&admin),
        json!({ "role": "viewer" }),
    )
    .await
    .assert_status(StatusCode::OK);

    let read = app
        .post(
            "/api/v1/authz/tenants/initech/check",
            Some(&member),
            json!({ "permission": "user:read" }),
        )
        .await;
    assert_eq!(read.data()["allowed"], true);

    let write = app
        .post(
            "/api/v1/authz/tenants/initech/check",
            Some(&member),
            json!({ "permission": "user:write" }),
        )
        .await;
    assert_eq!(write.data()["allowed"], false);
}

#[tokio::test]
async fn test_tenant_check_superadmin_bypass() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    app.post(
        "/api/v1/authz/tenants",
        Some(&admin),
        json!({ "id": "umbrella", "name": "Umbrella" }),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let username = unique_username("root");
    app.register(&username, VALID_PASSWORD).await;
    let token = app.login(&username, VALID_PASSWORD).await;
    let me = app.get("/api/v1/auth/me", Some(&token)).await;
    let user_id = me.data()["user_id"].as_str().unwrap().to_string();

    app.put(
        &format!("/api/v1/authz/rbac/users/{}/roles", user_id),
        Some(&admin),
        json!({ "roles": ["superadmin"] }),
    )
    .await
    .assert_status(StatusCode::OK);

    // Superadmin is checked by user_id, so the caller's own (stale) token
    // does not matter here
    let response = app
        .post(
            "/api/v1/authz/tenants/umbrella/check",
            Some(&admin),
            json!({ "user_id": user_id, "permission": "tenant:admin" }),
        )
        .await;
    assert_eq!(response.data()["allowed"], true);
}

#[tokio::test]
async fn test_tenant_check_unknown_tenant_denies() {
    let app = TestApp::spawn();
    let admin = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let response = app
        .post(
            "/api/v1/authz/tenants/missing/check",
            Some(&admin),
            json!({ "permission": "user:read" }),
        )
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.data()["allowed"], false);
}
