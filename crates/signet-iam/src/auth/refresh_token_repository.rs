//! Refresh Token Store
//!
//! The rotation-critical operation is `mark_replaced`: it must behave as a
//! compare-and-set so that two concurrent rotations of the same presented
//! credential resolve to exactly one winner. Relational deployments get
//! this from a conditional UPDATE guarded by the unique `token_hash`; the
//! in-memory implementation checks and sets under one write lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::refresh_token::RefreshToken;
use crate::shared::error::{IamError, Result};

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a new record. Fails on a `token_hash` collision.
    async fn insert(&self, token: &RefreshToken) -> Result<()>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshToken>>;

    /// Non-revoked, non-expired records for a user.
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>>;

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool>;

    /// Revoke every non-revoked record for the user. Returns the count.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64>;

    /// Revoke every member of a family. Returns the count.
    async fn revoke_family(&self, family_id: Uuid) -> Result<u64>;

    /// Record the successor of a rotated token. Returns false when the
    /// record is missing or already has a successor; exactly one concurrent
    /// caller observes true.
    async fn mark_replaced(&self, token_hash: &str, successor: Uuid) -> Result<bool>;

    async fn touch_last_used(&self, id: Uuid) -> Result<bool>;

    /// Cleanup job support: drop expired records. Returns the count.
    async fn delete_expired(&self) -> Result<u64>;
}

/// In-memory refresh token store, keyed by token hash.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, token: &RefreshToken) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&token.token_hash) {
            return Err(IamError::duplicate("RefreshToken", "tokenHash", "<redacted>"));
        }
        records.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        Ok(self.records.read().get(token_hash).cloned())
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshToken>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|t| t.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .values()
            .filter(|t| t.user_id == user_id && t.revoked_at.is_none() && !t.is_expired(now))
            .cloned()
            .collect())
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool> {
        let mut records = self.records.write();
        match records.get_mut(token_hash) {
            Some(token) if token.revoked_at.is_none() => {
                token.revoke();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut records = self.records.write();
        let mut revoked = 0;
        for token in records.values_mut() {
            if token.user_id == user_id && token.revoked_at.is_none() {
                token.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<u64> {
        let mut records = self.records.write();
        let mut revoked = 0;
        for token in records.values_mut() {
            if token.family_id == family_id && token.revoked_at.is_none() {
                token.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn mark_replaced(&self, token_hash: &str, successor: Uuid) -> Result<bool> {
        let mut records = self.records.write();
        match records.get_mut(token_hash) {
            Some(token) if token.replaced_by.is_none() => {
                token.mark_replaced(successor);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.write();
        match records.values_mut().find(|t| t.id == id) {
            Some(token) => {
                token.mark_used();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, t| !t.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}
