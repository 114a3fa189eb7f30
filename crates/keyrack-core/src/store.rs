// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! User record store.
//!
//! The store is a trait so a database-backed implementation can replace the
//! in-memory one without touching the API layer. The in-memory store keeps
//! secondary indexes for username and email so lookups used on every login
//! are O(1).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{StoreError, StoreResult};
use crate::password::PasswordHasher;
use crate::types::{User, UserId};

// =============================================================================
// UserStore Trait
// =============================================================================

/// Trait for user record stores.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user. Fails with `Conflict` if the username or email is taken.
    async fn create(&self, user: User) -> StoreResult<User>;

    /// Fetches a user by ID.
    async fn get(&self, id: UserId) -> StoreResult<User>;

    /// Fetches a user by username.
    async fn find_by_username(&self, username: &str) -> StoreResult<User>;

    /// Fetches a user by email.
    async fn find_by_email(&self, email: &str) -> StoreResult<User>;

    /// Replaces an existing user record.
    async fn update(&self, user: User) -> StoreResult<User>;

    /// Deletes a user.
    async fn delete(&self, id: UserId) -> StoreResult<()>;

    /// Lists all users.
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Returns the number of stored users.
    async fn count(&self) -> usize;
}

// =============================================================================
// InMemoryUserStore
// =============================================================================

/// Thread-safe in-memory user store.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<UserId, User>,
    by_username: DashMap<String, UserId>,
    by_email: DashMap<String, UserId>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the playground demo accounts.
    ///
    /// Demo credentials (playground only, never reuse):
    /// - `admin` / `admin-pass-1234` with the `admin` role
    /// - `member` / `member-pass-1234` with the `member` role
    /// - `viewer` / `viewer-pass-1234` with the `viewer` role
    pub fn with_demo_users(hasher: &PasswordHasher) -> StoreResult<Arc<Self>> {
        let store = Arc::new(Self::new());

        let seeds = [
            ("admin", "admin@keyrack.dev", "admin-pass-1234", "admin"),
            ("member", "member@keyrack.dev", "member-pass-1234", "member"),
            ("viewer", "viewer@keyrack.dev", "viewer-pass-1234", "viewer"),
        ];

        for (username, email, password, role) in seeds {
            let hash = hasher
                .hash(password)
                .map_err(|e| StoreError::backend_with("failed to seed demo user", e))?;

            let user = User::new(username, email)
                .with_password_hash(hash)
                .with_role(role)
                .with_tenant("demo");

            store.insert_unchecked(user);
        }

        Ok(store)
    }

    fn insert_unchecked(&self, user: User) {
        self.by_username.insert(user.username.clone(), user.id);
        self.by_email.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: User) -> StoreResult<User> {
        if self.by_username.contains_key(&user.username) {
            return Err(StoreError::conflict("user", &user.username));
        }
        if self.by_email.contains_key(&user.email) {
            return Err(StoreError::conflict("user", &user.email));
        }

        self.insert_unchecked(user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> StoreResult<User> {
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("user", id.to_string()))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let id = self
            .by_username
            .get(username)
            .map(|entry| *entry.value())
            .ok_or_else(|| StoreError::not_found("user", username))?;
        self.get(id).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let id = self
            .by_email
            .get(email)
            .map(|entry| *entry.value())
            .ok_or_else(|| StoreError::not_found("user", email))?;
        self.get(id).await
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let previous = self.get(user.id).await?;

        // Keep secondary indexes consistent on rename.
        if previous.username != user.username {
            if self.by_username.contains_key(&user.username) {
                return Err(StoreError::conflict("user", &user.username));
            }
            self.by_username.remove(&previous.username);
            self.by_username.insert(user.username.clone(), user.id);
        }
        if previous.email != user.email {
            if self.by_email.contains_key(&user.email) {
                return Err(StoreError::conflict("user", &user.email));
            }
            self.by_email.remove(&previous.email);
            self.by_email.insert(user.email.clone(), user.id);
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> StoreResult<()> {
        let (_, user) = self
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("user", id.to_string()))?;

        self.by_username.remove(&user.username);
        self.by_email.remove(&user.email);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn count(&self) -> usize {
        self.users.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
