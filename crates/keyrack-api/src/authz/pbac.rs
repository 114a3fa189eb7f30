// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Policy-Based Access Control (PBAC).
//!
//! Policies are small documents listing the actions and resources they
//! cover, with `*`-suffix wildcards. An explicit deny wins over any allow;
//! with no matching policy the request is denied.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::abac::Condition;
use super::Decision;

// =============================================================================
// Policy Effect
// =============================================================================

/// Whether a matching policy grants or denies access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Grant access when the policy matches.
    Allow,
    /// Deny access when the policy matches. Explicit deny wins.
    Deny,
}

// =============================================================================
// Policy Document
// =============================================================================

/// A policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy ID.
    #[serde(default = "new_policy_id")]
    pub id: Uuid,
    /// Human-readable policy name.
    pub name: String,
    /// Whether a match allows or denies.
    pub effect: PolicyEffect,
    /// Action patterns. `user:*` matches `user:read`; `*` matches anything.
    pub actions: Vec<String>,
    /// Resource patterns, same wildcard rules as actions.
    pub resources: Vec<String>,
    /// Conditions over the request context. All must hold.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn new_policy_id() -> Uuid {
    Uuid::now_v7()
}

impl PolicyDocument {
    /// Creates a new policy.
    pub fn new(
        name: impl Into<String>,
        effect: PolicyEffect,
        actions: Vec<String>,
        resources: Vec<String>,
    ) -> Self {
        Self {
            id: new_policy_id(),
            name: name.into(),
            effect,
            actions,
            resources,
            conditions: Vec::new(),
        }
    }

    /// Adds a context condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns `true` if the policy applies to the given request.
    pub fn matches(&self, request: &PbacRequest) -> bool {
        self.actions.iter().any(|p| pattern_matches(p, &request.action))
            && self
                .resources
                .iter()
                .any(|p| pattern_matches(p, &request.resource))
            && self.conditions.iter().all(|c| c.matches(&request.context))
    }
}

/// Matches a pattern against a value. Patterns are literal except for a
/// trailing `*`, which matches any suffix; a bare `*` matches everything.
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

// =============================================================================
// PBAC Request
// =============================================================================

/// An access request evaluated against the policy set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PbacRequest {
    /// Who is asking.
    pub principal: String,
    /// The requested action, e.g. `user:read`.
    pub action: String,
    /// The target resource, e.g. `users/alice`.
    pub resource: String,
    /// Environment context.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Policy Set
// =============================================================================

/// Policy store and evaluator.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: Arc<RwLock<Vec<PolicyDocument>>>,
}

impl PolicySet {
    /// Creates an empty policy set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a policy, returning its ID.
    pub fn add_policy(&self, policy: PolicyDocument) -> Uuid {
        let id = policy.id;
        self.policies.write().push(policy);
        id
    }

    /// Returns a policy by ID.
    pub fn get_policy(&self, id: Uuid) -> Option<PolicyDocument> {
        self.policies.read().iter().find(|p| p.id == id).cloned()
    }

    /// Replaces a policy in place. Returns `false` if the ID is unknown.
    pub fn update_policy(&self, id: Uuid, mut policy: PolicyDocument) -> bool {
        let mut policies = self.policies.write();
        match policies.iter_mut().find(|p| p.id == id) {
            Some(slot) => {
                policy.id = id;
                *slot = policy;
                true
            }
            None => false,
        }
    }

    /// Removes a policy by ID. Returns `true` if it existed.
    pub fn remove_policy(&self, id: Uuid) -> bool {
        let mut policies = self.policies.write();
        let before = policies.len();
        policies.retain(|p| p.id != id);
        policies.len() != before
    }

    /// Returns all policies.
    pub fn policies(&self) -> Vec<PolicyDocument> {
        self.policies.read().clone()
    }

    /// Evaluates a request. Explicit deny wins, then any matching allow,
    /// else not applicable.
    pub fn check(&self, request: &PbacRequest) -> Decision {
        let policies = self.policies.read();
        let matching: Vec<&PolicyDocument> =
            policies.iter().filter(|p| p.matches(request)).collect();

        if let Some(deny) = matching.iter().find(|p| p.effect == PolicyEffect::Deny) {
            return Decision::deny(format!("Denied by policy '{}'", deny.name));
        }

        if matching.iter().any(|p| p.effect == PolicyEffect::Allow) {
            return Decision::Allow;
        }

        Decision::NotApplicable
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(action: &str, resource: &str) -> PbacRequest {
        PbacRequest {
            principal: "alice".to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            context: HashMap::new(),
        }
    }

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("user:*", "user:read"));
        assert!(pattern_matches("user:read", "user:read"));
        assert!(!pattern_matches("user:read", "user:write"));
        assert!(!pattern_matches("user:*", "policy:read"));
    }

    #[test]
    fn test_empty_set_is_not_applicable() {
        let set = PolicySet::new();
        assert_eq!(
            set.check(&request("user:read", "users/alice")),
            Decision::NotApplicable
        );
    }

    #[test]
    fn test_allow_policy() {
        let set = PolicySet::new();
        set.add_policy(PolicyDocument::new(
            "readers",
            PolicyEffect::Allow,
            vec!["user:read".to_string()],
            vec!["users/*".to_string()],
        ));

        assert!(set.check(&request("user:read", "users/alice")).is_allowed());
        assert!(!set.check(&request("user:write", "users/alice")).is_allowed());
        assert!(!set.check(&request("user:read", "tenants/demo")).is_allowed());
    }

    #[test]
    fn test_explicit_deny_wins() {
        let set = PolicySet::new();
        set.add_policy(PolicyDocument::new(
            "everything",
            PolicyEffect::Allow,
            vec!["*".to_string()],
            vec!["*".to_string()],
        ));
        set.add_policy(PolicyDocument::new(
            "protect-admins",
            PolicyEffect::Deny,
            vec!["user:delete".to_string()],
            vec!["users/admin".to_string()],
        ));

        assert!(set.check(&request("user:delete", "users/bob")).is_allowed());

        let decision = set.check(&request("user:delete", "users/admin"));
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("protect-admins"));
    }

    #[test]
    fn test_policy_conditions() {
        let set = PolicySet::new();
        set.add_policy(
            PolicyDocument::new(
                "mfa-only",
                PolicyEffect::Allow,
                vec!["user:read".to_string()],
                vec!["*".to_string()],
            )
            .with_condition(Condition::Eq {
                attribute: "mfa".to_string(),
                value: json!(true),
            }),
        );

        let mut req = request("user:read", "users/alice");
        assert!(!set.check(&req).is_allowed());

        req.context.insert("mfa".to_string(), json!(true));
        assert!(set.check(&req).is_allowed());
    }

    #[test]
    fn test_policy_crud() {
        let set = PolicySet::new();
        let id = set.add_policy(PolicyDocument::new(
            "p",
            PolicyEffect::Allow,
            vec!["*".to_string()],
            vec!["*".to_string()],
        ));

        assert!(set.get_policy(id).is_some());

        let replacement = PolicyDocument::new(
            "p2",
            PolicyEffect::Deny,
            vec!["*".to_string()],
            vec!["*".to_string()],
        );
        assert!(set.update_policy(id, replacement));
        assert_eq!(set.get_policy(id).unwrap().name, "p2");

        assert!(set.remove_policy(id));
        assert!(set.get_policy(id).is_none());
    }
}
