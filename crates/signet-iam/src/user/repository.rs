//! User Store
//!
//! Email lookups are case-insensitive; the in-memory implementation indexes
//! by lowercased email the way the relational store indexes a lowered
//! expression.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::User;
use crate::shared::error::{IamError, Result};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_remember_me_token(&self, token: &str) -> Result<Option<User>>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails on a (case-insensitive) email collision.
    async fn save(&self, user: &User) -> Result<()>;

    /// Update an existing user by id.
    async fn update(&self, user: &User) -> Result<()>;

    /// Test support: wipe the store.
    async fn delete_all(&self) -> Result<()>;
}

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUserStore {
    records: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let needle = email.to_lowercase();
        Ok(self
            .records
            .read()
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_by_remember_me_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|u| u.remember_me_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|u| u.password_reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut records = self.records.write();
        let needle = user.email.to_lowercase();
        if records.values().any(|u| u.email.to_lowercase() == needle) {
            return Err(IamError::duplicate("User", "email", &user.email));
        }
        records.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut records = self.records.write();
        if !records.contains_key(&user.id) {
            return Err(IamError::not_found("User", user.id.to_string()));
        }
        records.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().clear();
        Ok(())
    }
}
