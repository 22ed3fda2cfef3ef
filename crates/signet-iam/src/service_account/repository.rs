//! Service Credential Store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::ServiceCredential;
use crate::shared::error::{IamError, Result};

#[async_trait]
pub trait ServiceCredentialStore: Send + Sync {
    async fn find_by_service_id(&self, service_id: &str) -> Result<Option<ServiceCredential>>;

    async fn find_by_principal_id(&self, principal_id: Uuid)
        -> Result<Option<ServiceCredential>>;

    async fn save(&self, credential: &ServiceCredential) -> Result<()>;

    async fn update(&self, credential: &ServiceCredential) -> Result<()>;
}

/// In-memory service credential store, keyed by service id.
#[derive(Default)]
pub struct InMemoryServiceCredentialStore {
    records: RwLock<HashMap<String, ServiceCredential>>,
}

impl InMemoryServiceCredentialStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ServiceCredentialStore for InMemoryServiceCredentialStore {
    async fn find_by_service_id(&self, service_id: &str) -> Result<Option<ServiceCredential>> {
        Ok(self.records.read().get(service_id).cloned())
    }

    async fn find_by_principal_id(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<ServiceCredential>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|c| c.principal_id == principal_id)
            .cloned())
    }

    async fn save(&self, credential: &ServiceCredential) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&credential.service_id) {
            return Err(IamError::duplicate(
                "ServiceCredential",
                "serviceId",
                &credential.service_id,
            ));
        }
        records.insert(credential.service_id.clone(), credential.clone());
        Ok(())
    }

    async fn update(&self, credential: &ServiceCredential) -> Result<()> {
        let mut records = self.records.write();
        if !records.contains_key(&credential.service_id) {
            return Err(IamError::not_found(
                "ServiceCredential",
                &credential.service_id,
            ));
        }
        records.insert(credential.service_id.clone(), credential.clone());
        Ok(())
    }
}
