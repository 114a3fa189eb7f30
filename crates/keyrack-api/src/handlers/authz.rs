// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authorization model handlers.
//!
//! One handler group per model: RBAC, ABAC, PBAC, ACL, scopes, and tenants.
//! Every check endpoint answers with a [`DecisionResponse`]; a decision of
//! "not applicable" is reported as a deny, since all models default-deny.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};
use keyrack_core::UserId;

use crate::authz::{
    AbacRequest, AclEntry, AclPermission, AttributeRule, Decision, PbacRequest, Permission,
    PolicyDocument, Tenant,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, Pagination, PaginationParams};
use crate::response::{ApiResponse, DecisionResponse, ResponseMeta};
use crate::state::AppState;

/// Applies page/per_page slicing to a listing and builds its metadata.
fn paginate<T>(items: Vec<T>, params: &PaginationParams) -> (Vec<T>, ResponseMeta) {
    let total = items.len() as u64;
    let start = (params.offset() as usize).min(items.len());
    let end = (start + params.limit() as usize).min(items.len());

    let page: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
    let meta = ResponseMeta::pagination(total, params.page, params.per_page);

    (page, meta)
}

fn decision_response(decision: Decision) -> Json<ApiResponse<DecisionResponse>> {
    let response = match decision {
        Decision::Allow => DecisionResponse::allow("Access granted"),
        Decision::Deny { reason } => DecisionResponse::deny(reason),
        Decision::NotApplicable => DecisionResponse::deny("No applicable rule"),
    };
    Json(ApiResponse::success(response))
}

fn parse_permission(s: &str) -> ApiResult<Permission> {
    Permission::parse(s)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown permission '{}'", s)))
}

// =============================================================================
// RBAC
// =============================================================================

/// RBAC check request body. Roles default to the caller's own.
#[derive(Debug, Deserialize)]
pub struct RbacCheckRequest {
    /// Roles to evaluate. Omit to check the caller.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    /// Permission name, e.g. `user:read`.
    pub permission: String,
}

/// POST /api/v1/authz/rbac/check
pub async fn rbac_check(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<RbacCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let permission = parse_permission(&request.permission)?;
    let roles = request.roles.unwrap_or_else(|| auth_ctx.roles.clone());

    Ok(decision_response(state.rbac().check(&roles, permission)))
}

/// GET /api/v1/authz/rbac/roles
///
/// Lists the defined roles and their permission sets.
pub async fn rbac_roles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::success(state.rbac().role_definitions())))
}

/// GET /api/v1/authz/rbac/users/{user_id}/roles
pub async fn get_user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = UserId::parse(&user_id).ok_or_else(|| ApiError::not_found("User"))?;
    let user = state.users().get(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "user_id": user_id,
        "roles": user.roles
    }))))
}

/// Role assignment request body.
#[derive(Debug, Deserialize)]
pub struct SetRolesRequest {
    /// The complete replacement role list.
    pub roles: Vec<String>,
}

/// PUT /api/v1/authz/rbac/users/{user_id}/roles
///
/// Replaces a user's role list. Every role must already be defined in the
/// policy. Takes effect immediately for session callers and at the next
/// refresh for JWT callers.
pub async fn set_user_roles(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Path(user_id): Path<String>,
    Json(request): Json<SetRolesRequest>,
) -> ApiResult<impl IntoResponse> {
    let defined = state.rbac().roles();
    if let Some(unknown) = request.roles.iter().find(|r| !defined.contains(r)) {
        return Err(ApiError::bad_request(format!(
            "Unknown role '{}'",
            unknown
        )));
    }

    let id = UserId::parse(&user_id).ok_or_else(|| ApiError::not_found("User"))?;
    let mut user = state.users().get(id).await?;
    let old_roles = std::mem::replace(&mut user.roles, request.roles.clone());
    let user = state.users().update(user).await?;

    let audit_log = AuditLog::new(
        AuditAction::RoleChange,
        AuditResource::user(&user_id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip)
    .with_details(serde_json::json!({
        "old_roles": old_roles,
        "new_roles": user.roles,
    }));
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log role change");
        }
    });

    tracing::info!(target_user = %user_id, actor = %auth_ctx.user_id, "Roles changed");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "user_id": user_id,
        "roles": user.roles
    }))))
}

// =============================================================================
// ABAC
// =============================================================================

/// GET /api/v1/authz/abac/rules
pub async fn list_abac_rules(
    State(state): State<AppState>,
    Pagination(pagination): Pagination,
) -> ApiResult<impl IntoResponse> {
    let rules = state.abac_engine.rules();
    let (page, meta) = paginate(rules, &pagination);

    Ok(Json(ApiResponse::success(page).with_meta(meta)))
}

/// POST /api/v1/authz/abac/rules
pub async fn create_abac_rule(
    State(state): State<AppState>,
    Json(rule): Json<AttributeRule>,
) -> ApiResult<impl IntoResponse> {
    let id = state.abac_engine.add_rule(rule);
    let rule = state
        .abac_engine
        .get_rule(id)
        .ok_or_else(|| ApiError::internal("Rule vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(rule))))
}

/// GET /api/v1/authz/abac/rules/{id}
pub async fn get_abac_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let rule = state
        .abac_engine
        .get_rule(id)
        .ok_or_else(|| ApiError::not_found("ABAC rule"))?;

    Ok(Json(ApiResponse::success(rule)))
}

/// PUT /api/v1/authz/abac/rules/{id}
pub async fn update_abac_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(rule): Json<AttributeRule>,
) -> ApiResult<impl IntoResponse> {
    if !state.abac_engine.update_rule(id, rule) {
        return Err(ApiError::not_found("ABAC rule"));
    }
    let rule = state
        .abac_engine
        .get_rule(id)
        .ok_or_else(|| ApiError::not_found("ABAC rule"))?;

    Ok(Json(ApiResponse::success(rule)))
}

/// DELETE /api/v1/authz/abac/rules/{id}
pub async fn delete_abac_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.abac_engine.remove_rule(id) {
        return Err(ApiError::not_found("ABAC rule"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Rule deleted"
    }))))
}

/// POST /api/v1/authz/abac/check
pub async fn abac_check(
    State(state): State<AppState>,
    Json(request): Json<AbacRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(decision_response(state.abac_engine.check(&request)))
}

// =============================================================================
// PBAC
// =============================================================================

/// GET /api/v1/authz/pbac/policies
pub async fn list_pbac_policies(
    State(state): State<AppState>,
    Pagination(pagination): Pagination,
) -> ApiResult<impl IntoResponse> {
    let policies = state.policy_set.policies();
    let (page, meta) = paginate(policies, &pagination);

    Ok(Json(ApiResponse::success(page).with_meta(meta)))
}

/// POST /api/v1/authz/pbac/policies
pub async fn create_pbac_policy(
    State(state): State<AppState>,
    Json(policy): Json<PolicyDocument>,
) -> ApiResult<impl IntoResponse> {
    if policy.actions.is_empty() || policy.resources.is_empty() {
        return Err(ApiError::bad_request(
            "A policy needs at least one action and one resource",
        ));
    }

    let id = state.policy_set.add_policy(policy);
    let policy = state
        .policy_set
        .get_policy(id)
        .ok_or_else(|| ApiError::internal("Policy vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(policy))))
}

/// GET /api/v1/authz/pbac/policies/{id}
pub async fn get_pbac_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let policy = state
        .policy_set
        .get_policy(id)
        .ok_or_else(|| ApiError::not_found("Policy"))?;

    Ok(Json(ApiResponse::success(policy)))
}

/// PUT /api/v1/authz/pbac/policies/{id}
pub async fn update_pbac_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(policy): Json<PolicyDocument>,
) -> ApiResult<impl IntoResponse> {
    if !state.policy_set.update_policy(id, policy) {
        return Err(ApiError::not_found("Policy"));
    }
    let policy = state
        .policy_set
        .get_policy(id)
        .ok_or_else(|| ApiError::not_found("Policy"))?;

    Ok(Json(ApiResponse::success(policy)))
}

/// DELETE /api/v1/authz/pbac/policies/{id}
pub async fn delete_pbac_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.policy_set.remove_policy(id) {
        return Err(ApiError::not_found("Policy"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Policy deleted"
    }))))
}

/// POST /api/v1/authz/pbac/check
pub async fn pbac_check(
    State(state): State<AppState>,
    Json(request): Json<PbacRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(decision_response(state.policy_set.check(&request)))
}

// =============================================================================
// ACL
// =============================================================================

/// Entry list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AclListParams {
    /// Restrict to entries for one resource.
    #[serde(default)]
    pub resource: Option<String>,
}

/// GET /api/v1/authz/acl/entries
pub async fn list_acl_entries(
    State(state): State<AppState>,
    Query(params): Query<AclListParams>,
    Pagination(pagination): Pagination,
) -> ApiResult<impl IntoResponse> {
    let entries = state.acl_registry.entries(params.resource.as_deref());
    let (page, meta) = paginate(entries, &pagination);

    Ok(Json(ApiResponse::success(page).with_meta(meta)))
}

/// POST /api/v1/authz/acl/entries
pub async fn create_acl_entry(
    State(state): State<AppState>,
    Json(entry): Json<AclEntry>,
) -> ApiResult<impl IntoResponse> {
    if entry.permissions.is_empty() {
        return Err(ApiError::bad_request(
            "An ACL entry needs at least one permission",
        ));
    }

    let id = state.acl_registry.add_entry(entry);
    let entry = state
        .acl_registry
        .entries(None)
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| ApiError::internal("Entry vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}

/// DELETE /api/v1/authz/acl/entries/{id}
pub async fn delete_acl_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.acl_registry.remove_entry(id) {
        return Err(ApiError::not_found("ACL entry"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Entry deleted"
    }))))
}

/// ACL check request body. Subject defaults to the caller.
#[derive(Debug, Deserialize)]
pub struct AclCheckRequest {
    /// The resource to check.
    pub resource: String,
    /// Read, write, delete, or admin.
    pub permission: AclPermission,
    /// User to evaluate. Omit to check the caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Roles to evaluate. Omit to use the caller's roles.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// POST /api/v1/authz/acl/check
pub async fn acl_check(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<AclCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = request.user_id.unwrap_or_else(|| auth_ctx.user_id.clone());
    let roles = request.roles.unwrap_or_else(|| auth_ctx.roles.clone());

    Ok(decision_response(state.acl_registry.check(
        &user_id,
        &roles,
        &request.resource,
        request.permission,
    )))
}

// =============================================================================
// Scopes
// =============================================================================

/// Scope check request body. Granted scopes default to the caller's token.
#[derive(Debug, Deserialize)]
pub struct ScopeCheckRequest {
    /// Granted scopes. Omit to use the caller's.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Scopes the operation requires. All must be covered.
    pub required: Vec<String>,
}

/// POST /api/v1/authz/scopes/check
pub async fn scope_check(
    Auth(auth_ctx): Auth,
    Json(request): Json<ScopeCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let scopes = request.scopes.unwrap_or_else(|| auth_ctx.scopes.clone());
    let set = crate::authz::ScopeSet::new(scopes);

    Ok(decision_response(set.check(&request.required)))
}

// =============================================================================
// Tenants
// =============================================================================

/// GET /api/v1/authz/tenants
pub async fn list_tenants(
    State(state): State<AppState>,
    Pagination(pagination): Pagination,
) -> ApiResult<impl IntoResponse> {
    let tenants = state.tenant_registry.tenants();
    let (page, meta) = paginate(tenants, &pagination);

    Ok(Json(ApiResponse::success(page).with_meta(meta)))
}

/// Tenant creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    /// Tenant ID (slug).
    pub id: String,
    /// Display name.
    pub name: String,
}

/// POST /api/v1/authz/tenants
pub async fn create_tenant(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<CreateTenantRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.id.trim().is_empty() {
        return Err(ApiError::bad_request("Tenant ID is required"));
    }

    let tenant = Tenant::new(request.id.trim(), request.name);
    if !state.tenant_registry.create_tenant(tenant.clone()) {
        return Err(ApiError::conflict(format!(
            "Tenant '{}' already exists",
            tenant.id
        )));
    }

    let audit_log = AuditLog::new(
        AuditAction::TenantChange,
        AuditResource::tenant(&tenant.id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log tenant creation");
        }
    });

    Ok((StatusCode::CREATED, Json(ApiResponse::success(tenant))))
}

/// GET /api/v1/authz/tenants/{id}
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tenant = state
        .tenant_registry
        .get_tenant(&id)
        .ok_or_else(|| ApiError::not_found("Tenant"))?;

    Ok(Json(ApiResponse::success(tenant)))
}

/// DELETE /api/v1/authz/tenants/{id}
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.tenant_registry.delete_tenant(&id) {
        return Err(ApiError::not_found("Tenant"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Tenant deleted"
    }))))
}

/// GET /api/v1/authz/tenants/{id}/members
pub async fn list_tenant_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if state.tenant_registry.get_tenant(&id).is_none() {
        return Err(ApiError::not_found("Tenant"));
    }

    Ok(Json(ApiResponse::success(
        state.tenant_registry.members(&id),
    )))
}

/// Membership request body.
#[derive(Debug, Deserialize)]
pub struct SetMembershipRequest {
    /// The user's role inside this tenant.
    pub role: String,
}

/// PUT /api/v1/authz/tenants/{id}/members/{user_id}
pub async fn set_tenant_membership(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    Json(request): Json<SetMembershipRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.rbac().roles().contains(&request.role) {
        return Err(ApiError::bad_request(format!(
            "Unknown role '{}'",
            request.role
        )));
    }

    if !state
        .tenant_registry
        .set_membership(&id, &user_id, &request.role)
    {
        return Err(ApiError::not_found("Tenant"));
    }

    let membership = state
        .tenant_registry
        .get_membership(&id, &user_id)
        .ok_or_else(|| ApiError::internal("Membership vanished after insert"))?;

    Ok(Json(ApiResponse::success(membership)))
}

/// DELETE /api/v1/authz/tenants/{id}/members/{user_id}
pub async fn remove_tenant_membership(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    if !state.tenant_registry.remove_membership(&id, &user_id) {
        return Err(ApiError::not_found("Tenant membership"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Membership removed"
    }))))
}

/// Tenant check request body. Subject defaults to the caller.
#[derive(Debug, Deserialize)]
pub struct TenantCheckRequest {
    /// User to evaluate. Omit to check the caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Permission name, e.g. `user:read`.
    pub permission: String,
}

/// POST /api/v1/authz/tenants/{id}/check
///
/// Evaluates a permission inside a tenant. Global roles do not cross the
/// tenant boundary, so the caller's global roles only matter for the
/// superadmin bypass.
pub async fn tenant_check(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Path(id): Path<String>,
    Json(request): Json<TenantCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let permission = parse_permission(&request.permission)?;

    let (user_id, global_roles) = match request.user_id {
        Some(user_id) => {
            let roles = match UserId::parse(&user_id) {
                Some(id) => state
                    .users()
                    .get(id)
                    .await
                    .map(|u| u.roles)
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            (user_id, roles)
        }
        None => (auth_ctx.user_id.clone(), auth_ctx.roles.clone()),
    };

    Ok(decision_response(state.tenant_registry.check(
        state.rbac(),
        &id,
        &user_id,
        &global_roles,
        permission,
    )))
}
