//! ABAC Policy Store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::AbacPolicy;
use crate::shared::error::{IamError, Result};

#[async_trait]
pub trait AbacPolicyStore: Send + Sync {
    /// Every policy with `is_active = true`.
    async fn find_active(&self) -> Result<Vec<AbacPolicy>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AbacPolicy>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<AbacPolicy>>;

    async fn save(&self, policy: &AbacPolicy) -> Result<()>;

    async fn update(&self, policy: &AbacPolicy) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// In-memory policy store.
#[derive(Default)]
pub struct InMemoryAbacPolicyStore {
    records: RwLock<HashMap<Uuid, AbacPolicy>>,
}

impl InMemoryAbacPolicyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl AbacPolicyStore for InMemoryAbacPolicyStore {
    async fn find_active(&self) -> Result<Vec<AbacPolicy>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AbacPolicy>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<AbacPolicy>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn save(&self, policy: &AbacPolicy) -> Result<()> {
        let mut records = self.records.write();
        if records.values().any(|p| p.name == policy.name && p.id != policy.id) {
            return Err(IamError::duplicate("AbacPolicy", "name", &policy.name));
        }
        records.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn update(&self, policy: &AbacPolicy) -> Result<()> {
        let mut records = self.records.write();
        if !records.contains_key(&policy.id) {
            return Err(IamError::not_found("AbacPolicy", policy.id.to_string()));
        }
        records.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }
}
