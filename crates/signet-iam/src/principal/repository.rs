//! Principal Store
//!
//! Persistence seam for principals. The production deployment binds this to
//! its relational store; the in-memory implementation backs tests and dev
//! wiring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::{Principal, PrincipalKind};
use crate::shared::error::{IamError, Result};

/// Store contract for principals.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>>;

    async fn find_by_kind_and_external_id(
        &self,
        kind: PrincipalKind,
        external_id: &str,
    ) -> Result<Option<Principal>>;

    /// Insert a new principal. Fails on a `(kind, external_id)` collision.
    async fn save(&self, principal: &Principal) -> Result<()>;

    /// Update an existing principal by id.
    async fn update(&self, principal: &Principal) -> Result<()>;
}

/// In-memory principal store.
#[derive(Default)]
pub struct InMemoryPrincipalStore {
    records: RwLock<HashMap<Uuid, Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_kind_and_external_id(
        &self,
        kind: PrincipalKind,
        external_id: &str,
    ) -> Result<Option<Principal>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|p| p.kind == kind && p.external_id == external_id)
            .cloned())
    }

    async fn save(&self, principal: &Principal) -> Result<()> {
        let mut records = self.records.write();
        let collision = records
            .values()
            .any(|p| p.kind == principal.kind && p.external_id == principal.external_id);
        if collision {
            return Err(IamError::duplicate(
                "Principal",
                "externalId",
                &principal.external_id,
            ));
        }
        records.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> Result<()> {
        let mut records = self.records.write();
        if !records.contains_key(&principal.id) {
            return Err(IamError::not_found("Principal", principal.id.to_string()));
        }
        records.insert(principal.id, principal.clone());
        Ok(())
    }
}
