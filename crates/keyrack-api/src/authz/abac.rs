// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Attribute-Based Access Control (ABAC).
//!
//! Rules match on subject and resource attributes plus optional conditions
//! over the request context. Any matching deny rule denies the request;
//! otherwise the first matching allow rule allows it; no match is a deny.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Decision;

// =============================================================================
// Rule Effect
// =============================================================================

/// Whether a matching rule grants or denies access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    /// Grant access when the rule matches.
    Allow,
    /// Deny access when the rule matches. Deny rules win over allow rules.
    Deny,
}

// =============================================================================
// Condition
// =============================================================================

/// A condition evaluated against the request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    /// Context attribute equals the value.
    Eq {
        /// Context attribute name.
        attribute: String,
        /// Expected value.
        value: serde_json::Value,
    },
    /// Context attribute does not equal the value.
    Ne {
        /// Context attribute name.
        attribute: String,
        /// Excluded value.
        value: serde_json::Value,
    },
    /// Context attribute is one of the listed values.
    In {
        /// Context attribute name.
        attribute: String,
        /// Accepted values.
        values: Vec<serde_json::Value>,
    },
    /// Context attribute is a number greater than the value.
    Gt {
        /// Context attribute name.
        attribute: String,
        /// Lower bound (exclusive).
        value: f64,
    },
    /// Context attribute is a number less than the value.
    Lt {
        /// Context attribute name.
        attribute: String,
        /// Upper bound (exclusive).
        value: f64,
    },
}

impl Condition {
    /// Evaluates the condition against a context map.
    ///
    /// A missing attribute never satisfies the condition, including `Ne`.
    pub fn matches(&self, context: &HashMap<String, serde_json::Value>) -> bool {
        match self {
            Condition::Eq { attribute, value } => {
                context.get(attribute).is_some_and(|v| v == value)
            }
            Condition::Ne { attribute, value } => {
                context.get(attribute).is_some_and(|v| v != value)
            }
            Condition::In { attribute, values } => context
                .get(attribute)
                .is_some_and(|v| values.contains(v)),
            Condition::Gt { attribute, value } => context
                .get(attribute)
                .and_then(|v| v.as_f64())
                .is_some_and(|n| n > *value),
            Condition::Lt { attribute, value } => context
                .get(attribute)
                .and_then(|v| v.as_f64())
                .is_some_and(|n| n < *value),
        }
    }
}

// =============================================================================
// Attribute Rule
// =============================================================================

/// An ABAC rule.
///
/// `subject_match` and `resource_match` are attribute equality maps: every
/// entry must be present with an equal value for the rule to apply. An empty
/// map matches everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeRule {
    /// Rule ID.
    #[serde(default = "new_rule_id")]
    pub id: Uuid,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a match allows or denies.
    pub effect: RuleEffect,
    /// Action the rule applies to. `"*"` matches any action.
    pub action: String,
    /// Required subject attributes.
    #[serde(default)]
    pub subject_match: HashMap<String, serde_json::Value>,
    /// Required resource attributes.
    #[serde(default)]
    pub resource_match: HashMap<String, serde_json::Value>,
    /// Conditions over the request context. All must hold.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn new_rule_id() -> Uuid {
    Uuid::now_v7()
}

impl AttributeRule {
    /// Creates a new rule with the given effect and action.
    pub fn new(effect: RuleEffect, action: impl Into<String>) -> Self {
        Self {
            id: new_rule_id(),
            description: None,
            effect,
            action: action.into(),
            subject_match: HashMap::new(),
            resource_match: HashMap::new(),
            conditions: Vec::new(),
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Requires a subject attribute.
    pub fn match_subject(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.subject_match.insert(key.into(), value);
        self
    }

    /// Requires a resource attribute.
    pub fn match_resource(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.resource_match.insert(key.into(), value);
        self
    }

    /// Adds a context condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns `true` if the rule applies to the given request.
    pub fn matches(&self, request: &AbacRequest) -> bool {
        if self.action != "*" && self.action != request.action {
            return false;
        }
        if !attributes_match(&self.subject_match, &request.subject) {
            return false;
        }
        if !attributes_match(&self.resource_match, &request.resource) {
            return false;
        }
        self.conditions.iter().all(|c| c.matches(&request.context))
    }
}

fn attributes_match(
    required: &HashMap<String, serde_json::Value>,
    actual: &HashMap<String, serde_json::Value>,
) -> bool {
    required
        .iter()
        .all(|(key, value)| actual.get(key).is_some_and(|v| v == value))
}

// =============================================================================
// ABAC Request
// =============================================================================

/// An access request evaluated against the rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbacRequest {
    /// Subject attributes (who is asking).
    #[serde(default)]
    pub subject: HashMap<String, serde_json::Value>,
    /// Resource attributes (what is being accessed).
    #[serde(default)]
    pub resource: HashMap<String, serde_json::Value>,
    /// The requested action.
    pub action: String,
    /// Environment context (time, IP, request metadata).
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

// =============================================================================
// ABAC Engine
// =============================================================================

/// Rule store and evaluator.
///
/// Rules keep insertion order: the first matching allow rule wins once no
/// deny rule matches.
#[derive(Debug, Clone, Default)]
pub struct AbacEngine {
    rules: Arc<RwLock<Vec<AttributeRule>>>,
}

impl AbacEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, returning its ID.
    pub fn add_rule(&self, rule: AttributeRule) -> Uuid {
        let id = rule.id;
        self.rules.write().push(rule);
        id
    }

    /// Returns a rule by ID.
    pub fn get_rule(&self, id: Uuid) -> Option<AttributeRule> {
        self.rules.read().iter().find(|r| r.id == id).cloned()
    }

    /// Replaces a rule in place. Returns `false` if the ID is unknown.
    pub fn update_rule(&self, id: Uuid, mut rule: AttributeRule) -> bool {
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.id == id) {
            Some(slot) => {
                rule.id = id;
                *slot = rule;
                true
            }
            None => false,
        }
    }

    /// Removes a rule by ID. Returns `true` if it existed.
    pub fn remove_rule(&self, id: Uuid) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        rules.len() != before
    }

    /// Returns all rules in evaluation order.
    pub fn rules(&self) -> Vec<AttributeRule> {
        self.rules.read().clone()
    }

    /// Evaluates a request. Deny wins, then first matching allow, else
    /// not applicable.
    pub fn check(&self, request: &AbacRequest) -> Decision {
        let rules = self.rules.read();
        let matching: Vec<&AttributeRule> =
            rules.iter().filter(|r| r.matches(request)).collect();

        if let Some(deny) = matching.iter().find(|r| r.effect == RuleEffect::Deny) {
            return Decision::deny(format!(
                "Denied by rule {}{}",
                deny.id,
                deny.description
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            ));
        }

        if matching.iter().any(|r| r.effect == RuleEffect::Allow) {
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

    fn request(action: &str) -> AbacRequest {
        AbacRequest {
            subject: HashMap::from([("department".to_string(), json!("engineering"))]),
            resource: HashMap::from([("owner".to_string(), json!("alice"))]),
            action: action.to_string(),
            context: HashMap::from([("hour".to_string(), json!(14))]),
        }
    }

    #[test]
    fn test_no_rules_is_not_applicable() {
        let engine = AbacEngine::new();
        assert_eq!(engine.check(&request("read")), Decision::NotApplicable);
    }

    #[test]
    fn test_allow_rule_matches() {
        let engine = AbacEngine::new();
        engine.add_rule(
            AttributeRule::new(RuleEffect::Allow, "read")
                .match_subject("department", json!("engineering")),
        );

        assert!(engine.check(&request("read")).is_allowed());
        assert!(!engine.check(&request("write")).is_allowed());
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let engine = AbacEngine::new();
        engine.add_rule(AttributeRule::new(RuleEffect::Allow, "*"));
        engine.add_rule(
            AttributeRule::new(RuleEffect::Deny, "delete")
                .with_description("deletes are forbidden"),
        );

        assert!(engine.check(&request("read")).is_allowed());

        let decision = engine.check(&request("delete"));
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("forbidden"));
    }

    #[test]
    fn test_subject_mismatch_does_not_apply() {
        let engine = AbacEngine::new();
        engine.add_rule(
            AttributeRule::new(RuleEffect::Allow, "read")
                .match_subject("department", json!("finance")),
        );

        assert_eq!(engine.check(&request("read")), Decision::NotApplicable);
    }

    #[test]
    fn test_conditions() {
        let engine = AbacEngine::new();
        engine.add_rule(
            AttributeRule::new(RuleEffect::Allow, "read")
                .with_condition(Condition::Gt {
                    attribute: "hour".to_string(),
                    value: 9.0,
                })
                .with_condition(Condition::Lt {
                    attribute: "hour".to_string(),
                    value: 18.0,
                }),
        );

        assert!(engine.check(&request("read")).is_allowed());

        let mut after_hours = request("read");
        after_hours.context.insert("hour".to_string(), json!(22));
        assert!(!engine.check(&after_hours).is_allowed());
    }

    #[test]
    fn test_missing_attribute_fails_ne() {
        let condition = Condition::Ne {
            attribute: "ip".to_string(),
            value: json!("10.0.0.1"),
        };

        assert!(!condition.matches(&HashMap::new()));
        assert!(condition.matches(&HashMap::from([(
            "ip".to_string(),
            json!("192.168.0.1")
        )])));
    }

    #[test]
    fn test_rule_crud() {
        let engine = AbacEngine::new();
        let id = engine.add_rule(AttributeRule::new(RuleEffect::Allow, "read"));

        assert!(engine.get_rule(id).is_some());

        let updated = AttributeRule::new(RuleEffect::Deny, "read");
        assert!(engine.update_rule(id, updated));
        assert_eq!(engine.get_rule(id).unwrap().effect, RuleEffect::Deny);

        assert!(engine.remove_rule(id));
        assert!(engine.get_rule(id).is_none());
        assert!(!engine.remove_rule(id));
    }
}
