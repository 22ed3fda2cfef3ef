//! Group, Membership, and Group Role Assignment Stores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::entity::{Group, GroupMembership, GroupRoleAssignment};
use crate::shared::error::{IamError, Result};

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>>;

    async fn save(&self, group: &Group) -> Result<()>;
}

#[async_trait]
pub trait GroupMembershipStore: Send + Sync {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<GroupMembership>>;

    async fn save(&self, membership: &GroupMembership) -> Result<()>;
}

#[async_trait]
pub trait GroupRoleAssignmentStore: Send + Sync {
    async fn find_by_group_id(&self, group_id: Uuid) -> Result<Vec<GroupRoleAssignment>>;

    async fn find_by_group_ids(&self, group_ids: &[Uuid]) -> Result<Vec<GroupRoleAssignment>>;

    async fn save(&self, assignment: &GroupRoleAssignment) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryGroupStore {
    records: RwLock<HashMap<Uuid, Group>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn save(&self, group: &Group) -> Result<()> {
        let mut records = self.records.write();
        if records.values().any(|g| g.name == group.name && g.id != group.id) {
            return Err(IamError::duplicate("Group", "name", &group.name));
        }
        records.insert(group.id, group.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryGroupMembershipStore {
    records: RwLock<Vec<GroupMembership>>,
}

impl InMemoryGroupMembershipStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl GroupMembershipStore for InMemoryGroupMembershipStore {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<GroupMembership>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, membership: &GroupMembership) -> Result<()> {
        self.records.write().push(membership.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryGroupRoleAssignmentStore {
    records: RwLock<Vec<GroupRoleAssignment>>,
}

impl InMemoryGroupRoleAssignmentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl GroupRoleAssignmentStore for InMemoryGroupRoleAssignmentStore {
    async fn find_by_group_id(&self, group_id: Uuid) -> Result<Vec<GroupRoleAssignment>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|a| a.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn find_by_group_ids(&self, group_ids: &[Uuid]) -> Result<Vec<GroupRoleAssignment>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|a| group_ids.contains(&a.group_id))
            .cloned()
            .collect())
    }

    async fn save(&self, assignment: &GroupRoleAssignment) -> Result<()> {
        self.records.write().push(assignment.clone());
        Ok(())
    }
}
