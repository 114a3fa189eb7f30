// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OAuth-style scope checks.
//!
//! Scopes are `resource:action` strings. A granted `resource:*` covers every
//! action on the resource, and a bare `*` covers everything. A check passes
//! only when every required scope is covered by some granted scope.

use serde::{Deserialize, Serialize};

use super::Decision;

/// A set of granted scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet {
    scopes: Vec<String>,
}

impl ScopeSet {
    /// Creates a scope set from granted scope strings.
    pub fn new(scopes: Vec<String>) -> Self {
        Self { scopes }
    }

    /// Returns the granted scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns `true` if a single required scope is covered.
    pub fn covers(&self, required: &str) -> bool {
        self.scopes.iter().any(|granted| scope_covers(granted, required))
    }

    /// Returns `true` if every required scope is covered.
    pub fn satisfies(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.covers(scope))
    }

    /// Evaluates a check request to a decision.
    pub fn check(&self, required: &[String]) -> Decision {
        match required.iter().find(|scope| !self.covers(scope)) {
            None => Decision::Allow,
            Some(missing) => Decision::deny(format!("Missing required scope '{}'", missing)),
        }
    }
}

impl FromIterator<String> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Returns `true` if a granted scope covers a required one.
fn scope_covers(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }
    match granted.strip_suffix(":*") {
        Some(resource) => required
            .strip_prefix(resource)
            .is_some_and(|rest| rest.starts_with(':')),
        None => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn set(scopes: &[&str]) -> ScopeSet {
        scopes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_scope() {
        let granted = set(&["user:read"]);

        assert!(granted.covers("user:read"));
        assert!(!granted.covers("user:write"));
    }

    #[test]
    fn test_resource_wildcard() {
        let granted = set(&["user:*"]);

        assert!(granted.covers("user:read"));
        assert!(granted.covers("user:write"));
        assert!(!granted.covers("policy:read"));
        // the wildcard must not bleed into longer resource names
        assert!(!granted.covers("userdata:read"));
    }

    #[test]
    fn test_global_wildcard() {
        let granted = set(&["*"]);

        assert!(granted.covers("user:read"));
        assert!(granted.covers("anything:at_all"));
    }

    #[test]
    fn test_satisfies_requires_all() {
        let granted = set(&["user:read", "policy:*"]);

        assert!(granted.satisfies(&["user:read".to_string(), "policy:write".to_string()]));
        assert!(!granted.satisfies(&["user:read".to_string(), "tenant:read".to_string()]));
    }

    #[test]
    fn test_check_names_missing_scope() {
        let granted = set(&["user:read"]);

        let decision = granted.check(&["user:read".to_string(), "audit:read".to_string()]);
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("audit:read"));
    }

    #[test]
    fn test_empty_required_allows() {
        assert!(set(&[]).check(&[]).is_allowed());
    }
}
