// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use keyrack_core::{
    AuditLogger, InMemoryUserStore, NoOpAuditLogger, PasswordHasher, UserStore,
};

use crate::auth::{
    JwtManager, MagicLinkManager, OAuthManager, PasskeyManager, SessionManager, TotpManager,
};
use crate::authz::{AbacEngine, AclRegistry, PolicySet, RbacPolicy, TenantRegistry};
use crate::config::ApiConfig;
use crate::error::ApiResult;

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
///
/// This is the central state container that is passed to all handlers via
/// Axum's state extraction mechanism.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// User account store.
    pub user_store: Arc<dyn UserStore>,
    /// Password hasher.
    pub password_hasher: Arc<PasswordHasher>,
    /// JWT manager for token operations.
    pub jwt_manager: Arc<JwtManager>,
    /// Server-side session manager.
    pub session_manager: Arc<SessionManager>,
    /// TOTP enrollment manager.
    pub totp_manager: Arc<TotpManager>,
    /// Magic link manager.
    pub magic_link_manager: Arc<MagicLinkManager>,
    /// Passkey manager.
    pub passkey_manager: Arc<PasskeyManager>,
    /// OAuth provider manager.
    pub oauth_manager: Arc<OAuthManager>,
    /// RBAC policy for authorization.
    pub rbac_policy: Arc<RbacPolicy>,
    /// ABAC rule engine.
    pub abac_engine: Arc<AbacEngine>,
    /// PBAC policy set.
    pub policy_set: Arc<PolicySet>,
    /// ACL registry.
    pub acl_registry: Arc<AclRegistry>,
    /// Tenant registry.
    pub tenant_registry: Arc<TenantRegistry>,
    /// Audit logger.
    pub audit_logger: Arc<dyn AuditLogger>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the JWT manager.
    pub fn jwt(&self) -> &JwtManager {
        &self.jwt_manager
    }

    /// Returns the RBAC policy.
    pub fn rbac(&self) -> &RbacPolicy {
        &self.rbac_policy
    }

    /// Returns the user store.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.user_store
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.session_manager
    }

    /// Returns the audit logger.
    pub fn audit(&self) -> &Arc<dyn AuditLogger> {
        &self.audit_logger
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
///
/// Components left unset are constructed from the configuration, so the
/// common path is `AppState::builder().config(config).build()?`.
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    user_store: Option<Arc<dyn UserStore>>,
    password_hasher: Option<Arc<PasswordHasher>>,
    jwt_manager: Option<Arc<JwtManager>>,
    session_manager: Option<Arc<SessionManager>>,
    totp_manager: Option<Arc<TotpManager>>,
    magic_link_manager: Option<Arc<MagicLinkManager>>,
    passkey_manager: Option<Arc<PasskeyManager>>,
    oauth_manager: Option<Arc<OAuthManager>>,
    rbac_policy: Option<Arc<RbacPolicy>>,
    audit_logger: Option<Arc<dyn AuditLogger>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            user_store: None,
            password_hasher: None,
            jwt_manager: None,
            session_manager: None,
            totp_manager: None,
            magic_link_manager: None,
            passkey_manager: None,
            oauth_manager: None,
            rbac_policy: None,
            audit_logger: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the user store.
    pub fn user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.user_store = Some(store);
        self
    }

    /// Sets the password hasher.
    pub fn password_hasher(mut self, hasher: Arc<PasswordHasher>) -> Self {
        self.password_hasher = Some(hasher);
        self
    }

    /// Sets the JWT manager.
    pub fn jwt_manager(mut self, manager: Arc<JwtManager>) -> Self {
        self.jwt_manager = Some(manager);
        self
    }

    /// Sets the session manager.
    pub fn session_manager(mut self, manager: Arc<SessionManager>) -> Self {
        self.session_manager = Some(manager);
        self
    }

    /// Sets the TOTP manager.
    pub fn totp_manager(mut self, manager: Arc<TotpManager>) -> Self {
        self.totp_manager = Some(manager);
        self
    }

    /// Sets the magic link manager.
    pub fn magic_link_manager(mut self, manager: Arc<MagicLinkManager>) -> Self {
        self.magic_link_manager = Some(manager);
        self
    }

    /// Sets the passkey manager.
    pub fn passkey_manager(mut self, manager: Arc<PasskeyManager>) -> Self {
        self.passkey_manager = Some(manager);
        self
    }

    /// Sets the OAuth manager.
    pub fn oauth_manager(mut self, manager: Arc<OAuthManager>) -> Self {
        self.oauth_manager = Some(manager);
        self
    }

    /// Sets the RBAC policy.
    pub fn rbac_policy(mut self, policy: Arc<RbacPolicy>) -> Self {
        self.rbac_policy = Some(policy);
        self
    }

    /// Sets the audit logger.
    pub fn audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    /// Builds the AppState.
    pub fn build(self) -> ApiResult<AppState> {
        let config = self.config.unwrap_or_default();

        let password_hasher = self
            .password_hasher
            .unwrap_or_else(|| Arc::new(PasswordHasher::new()));

        let user_store: Arc<dyn UserStore> = match self.user_store {
            Some(store) => store,
            None if config.seed_demo_users => {
                InMemoryUserStore::with_demo_users(&password_hasher)
                    .map_err(keyrack_core::CoreError::Store)?
            }
            None => Arc::new(InMemoryUserStore::new()),
        };

        let jwt_manager = match self.jwt_manager {
            Some(manager) => manager,
            None => Arc::new(JwtManager::new(config.jwt.clone())?),
        };

        let session_manager = self
            .session_manager
            .unwrap_or_else(|| Arc::new(SessionManager::new(config.session.clone())));

        let totp_manager = self
            .totp_manager
            .unwrap_or_else(|| Arc::new(TotpManager::new(config.totp.clone())));

        let magic_link_manager = match self.magic_link_manager {
            Some(manager) => manager,
            None => Arc::new(MagicLinkManager::new(config.magic_link.clone())?),
        };

        let passkey_manager = self
            .passkey_manager
            .unwrap_or_else(|| Arc::new(PasskeyManager::new(config.passkey.clone())));

        let oauth_manager = self
            .oauth_manager
            .unwrap_or_else(|| Arc::new(OAuthManager::new(config.oauth.clone())));

        let rbac_policy = self
            .rbac_policy
            .unwrap_or_else(|| Arc::new(RbacPolicy::new()));

        let audit_logger = self
            .audit_logger
            .unwrap_or_else(|| Arc::new(NoOpAuditLogger));

        Ok(AppState {
            config: Arc::new(config),
            user_store,
            password_hasher,
            jwt_manager,
            session_manager,
            totp_manager,
            magic_link_manager,
            passkey_manager,
            oauth_manager,
            rbac_policy,
            abac_engine: Arc::new(AbacEngine::new()),
            policy_set: Arc::new(PolicySet::new()),
            acl_registry: Arc::new(AclRegistry::new()),
            tenant_registry: Arc::new(TenantRegistry::new()),
            audit_logger,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// FromRef implementations for extracting parts of state
// =============================================================================

impl axum::extract::FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<RbacPolicy> {
    fn from_ref(state: &AppState) -> Self {
        state.rbac_policy.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<ApiConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;

    fn test_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.jwt = JwtConfig::new("test-secret-key-that-is-long-enough-for-testing");
        config.magic_link.secret = "test-magic-link-signing-key".to_string();
        config
    }

    #[test]
    fn test_app_state_builder() {
        let state = AppState::builder()
            .config(test_config())
            .rbac_policy(Arc::new(RbacPolicy::new()))
            .build()
            .unwrap();

        assert!(state.config.seed_demo_users);
    }

    #[test]
    fn test_build_fails_without_magic_link_secret() {
        let mut config = ApiConfig::default();
        config.jwt = JwtConfig::new("test-secret-key-that-is-long-enough-for-testing");
        // magic_link.secret left empty

        assert!(AppState::builder().config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_demo_users_seeded_by_default() {
        let state = AppState::builder().config(test_config()).build().unwrap();
        assert!(state.users().find_by_username("admin").await.is_ok());
    }

    #[tokio::test]
    async fn test_seeding_disabled() {
        let mut config = test_config();
        config.seed_demo_users = false;

        let state = AppState::builder().config(config).build().unwrap();
        assert_eq!(state.users().count().await, 0);
    }
}
