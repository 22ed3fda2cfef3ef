//! Role, Permission Catalog, and Role Assignment Stores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::{Permission, Role, RoleAssignment};
use crate::shared::error::{IamError, Result};

/// Catalog of grantable permission names.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>>;

    async fn list(&self) -> Result<Vec<Permission>>;

    async fn save(&self, permission: &Permission) -> Result<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;

    async fn save(&self, role: &Role) -> Result<()>;
}

#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>>;

    async fn save(&self, assignment: &RoleAssignment) -> Result<()>;
}

/// In-memory permission catalog, keyed by permission name.
#[derive(Default)]
pub struct InMemoryPermissionCatalog {
    records: RwLock<HashMap<String, Permission>>,
}

impl InMemoryPermissionCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed the catalog with a set of permission names (dev wiring, tests).
    pub fn seeded(names: &[&str]) -> Arc<Self> {
        let catalog = Self::default();
        {
            let mut records = catalog.records.write();
            for name in names {
                records.insert((*name).to_string(), Permission::new(*name));
            }
        }
        Arc::new(catalog)
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryPermissionCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>> {
        Ok(self.records.read().get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Permission>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn save(&self, permission: &Permission) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&permission.name) {
            return Err(IamError::duplicate("Permission", "name", &permission.name));
        }
        records.insert(permission.name.clone(), permission.clone());
        Ok(())
    }
}

/// In-memory role store.
#[derive(Default)]
pub struct InMemoryRoleStore {
    records: RwLock<HashMap<Uuid, Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>> {
        let records = self.records.read();
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn save(&self, role: &Role) -> Result<()> {
        let mut records = self.records.write();
        if records.values().any(|r| r.name == role.name && r.id != role.id) {
            return Err(IamError::duplicate("Role", "name", &role.name));
        }
        records.insert(role.id, role.clone());
        Ok(())
    }
}

/// In-memory role assignment store.
#[derive(Default)]
pub struct InMemoryRoleAssignmentStore {
    records: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryRoleAssignmentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RoleAssignmentStore for InMemoryRoleAssignmentStore {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, assignment: &RoleAssignment) -> Result<()> {
        self.records.write().push(assignment.clone());
        Ok(())
    }
}
