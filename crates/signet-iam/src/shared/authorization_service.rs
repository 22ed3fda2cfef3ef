//! Authorization Service
//!
//! Assembles the effective role and permission sets for a user: direct
//! assignments union roles inherited through current group memberships,
//! both filtered by their validity windows. Store failures degrade to empty
//! collections so a transient glitch can neither escalate privileges nor
//! produce a null-shaped claim.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::group::repository::{GroupMembershipStore, GroupRoleAssignmentStore};
use crate::role::entity::Role;
use crate::role::repository::{RoleAssignmentStore, RoleStore};
use crate::user::entity::User;

/// Authorization context for a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,

    pub email: String,

    pub display_name: Option<String>,

    /// Effective role names, deduplicated and sorted
    pub roles: Vec<String>,

    /// Effective permission names, deduplicated and sorted
    pub permissions: Vec<String>,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Direct match, `resource:*` wildcard, or the `*:*` superuser grant.
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.permissions.iter().any(|p| p == permission) {
            return true;
        }

        if self.permissions.iter().any(|p| p == "*:*") {
            return true;
        }

        if let Some(resource) = permission.split(':').next() {
            let wildcard = format!("{}:*", resource);
            if self.permissions.iter().any(|p| *p == wildcard) {
                return true;
            }
        }

        false
    }

    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        required.iter().any(|p| self.has_permission(p))
    }

    pub fn has_all_permissions(&self, required: &[&str]) -> bool {
        required.iter().all(|p| self.has_permission(p))
    }
}

/// Effective role/permission resolution over the RBAC graph.
pub struct AuthorizationService {
    role_store: Arc<dyn RoleStore>,
    role_assignments: Arc<dyn RoleAssignmentStore>,
    group_memberships: Arc<dyn GroupMembershipStore>,
    group_role_assignments: Arc<dyn GroupRoleAssignmentStore>,
}

impl AuthorizationService {
    pub fn new(
        role_store: Arc<dyn RoleStore>,
        role_assignments: Arc<dyn RoleAssignmentStore>,
        group_memberships: Arc<dyn GroupMembershipStore>,
        group_role_assignments: Arc<dyn GroupRoleAssignmentStore>,
    ) -> Self {
        Self {
            role_store,
            role_assignments,
            group_memberships,
            group_role_assignments,
        }
    }

    /// Build the authorization context for a user. Infallible by contract:
    /// resolution failures leave the affected dimension empty.
    pub async fn build_context(&self, user: &User) -> AuthContext {
        let roles = self.effective_roles(user.id).await;

        let mut role_names: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
        role_names.sort();
        role_names.dedup();

        let mut permissions: Vec<String> = roles
            .iter()
            .flat_map(|r| r.permissions.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        permissions.sort();

        AuthContext {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            roles: role_names,
            permissions,
        }
    }

    /// Effective role names for a user, deduplicated and sorted.
    pub async fn effective_role_names(&self, user_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = self
            .effective_roles(user_id)
            .await
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Effective permission names for a user, deduplicated and sorted.
    pub async fn effective_permissions(&self, user_id: Uuid) -> Vec<String> {
        let mut permissions: Vec<String> = self
            .effective_roles(user_id)
            .await
            .into_iter()
            .flat_map(|r| r.permissions.into_iter())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        permissions.sort();
        permissions
    }

    /// Batch form: role names per user id. Ids with no grants map to empty
    /// lists rather than going missing.
    pub async fn effective_role_names_for(&self, user_ids: &[Uuid]) -> HashMap<Uuid, Vec<String>> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for &user_id in user_ids {
            out.insert(user_id, self.effective_role_names(user_id).await);
        }
        out
    }

    /// Batch form: permission names per user id.
    pub async fn effective_permissions_for(&self, user_ids: &[Uuid]) -> HashMap<Uuid, Vec<String>> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for &user_id in user_ids {
            out.insert(user_id, self.effective_permissions(user_id).await);
        }
        out
    }

    /// All currently-valid roles for a user, direct and group-inherited.
    async fn effective_roles(&self, user_id: Uuid) -> Vec<Role> {
        let now = Utc::now();
        let mut role_ids: HashSet<Uuid> = HashSet::new();

        match self.role_assignments.find_by_user_id(user_id).await {
            Ok(assignments) => {
                role_ids.extend(
                    assignments
                        .iter()
                        .filter(|a| a.is_valid_at(now))
                        .map(|a| a.role_id),
                );
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "direct role lookup failed; treating as no direct roles");
            }
        }

        role_ids.extend(self.inherited_role_ids(user_id).await);

        if role_ids.is_empty() {
            return Vec::new();
        }

        let ids: Vec<Uuid> = role_ids.into_iter().collect();
        match self.role_store.find_by_ids(&ids).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "role load failed; treating as no roles");
                Vec::new()
            }
        }
    }

    /// Role ids reaching the user through currently-valid group membership.
    async fn inherited_role_ids(&self, user_id: Uuid) -> HashSet<Uuid> {
        let now = Utc::now();

        let memberships = match self.group_memberships.find_by_user_id(user_id).await {
            Ok(memberships) => memberships,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "group membership lookup failed; treating as no groups");
                return HashSet::new();
            }
        };

        let group_ids: Vec<Uuid> = memberships
            .iter()
            .filter(|m| m.is_valid_at(now))
            .map(|m| m.group_id)
            .collect();

        if group_ids.is_empty() {
            return HashSet::new();
        }

        match self
            .group_role_assignments
            .find_by_group_ids(&group_ids)
            .await
        {
            Ok(assignments) => assignments
                .iter()
                .filter(|a| a.is_valid_at(now))
                .map(|a| a.role_id)
                .collect(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "group role lookup failed; treating as no inherited roles");
                HashSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::entity::{GroupMembership, GroupRoleAssignment};
    use crate::group::repository::{InMemoryGroupMembershipStore, InMemoryGroupRoleAssignmentStore};
    use crate::role::entity::{Role, RoleAssignment};
    use crate::role::repository::{InMemoryRoleAssignmentStore, InMemoryRoleStore};
    use chrono::Duration;

    struct Fixture {
        service: AuthorizationService,
        roles: Arc<InMemoryRoleStore>,
        assignments: Arc<InMemoryRoleAssignmentStore>,
        memberships: Arc<InMemoryGroupMembershipStore>,
        group_roles: Arc<InMemoryGroupRoleAssignmentStore>,
    }

    fn fixture() -> Fixture {
        let roles = InMemoryRoleStore::new();
        let assignments = InMemoryRoleAssignmentStore::new();
        let memberships = InMemoryGroupMembershipStore::new();
        let group_roles = InMemoryGroupRoleAssignmentStore::new();

        Fixture {
            service: AuthorizationService::new(
                roles.clone(),
                assignments.clone(),
                memberships.clone(),
                group_roles.clone(),
            ),
            roles,
            assignments,
            memberships,
            group_roles,
        }
    }

    #[tokio::test]
    async fn direct_and_inherited_roles_union() {
        let f = fixture();
        let user_id = Uuid::new_v4();

        let editor = Role::new("editor").with_permission("articles:write");
        let viewer = Role::new("viewer").with_permission("articles:read");
        f.roles.save(&editor).await.unwrap();
        f.roles.save(&viewer).await.unwrap();

        f.assignments
            .save(&RoleAssignment::new(user_id, editor.id))
            .await
            .unwrap();

        let group_id = Uuid::new_v4();
        f.memberships
            .save(&GroupMembership::new(user_id, group_id))
            .await
            .unwrap();
        f.group_roles
            .save(&GroupRoleAssignment::new(group_id, viewer.id))
            .await
            .unwrap();

        let names = f.service.effective_role_names(user_id).await;
        assert_eq!(names, vec!["editor".to_string(), "viewer".to_string()]);

        let permissions = f.service.effective_permissions(user_id).await;
        assert_eq!(
            permissions,
            vec!["articles:read".to_string(), "articles:write".to_string()]
        );
    }

    #[tokio::test]
    async fn duplicate_roles_across_paths_deduplicate() {
        let f = fixture();
        let user_id = Uuid::new_v4();

        let editor = Role::new("editor").with_permission("articles:write");
        f.roles.save(&editor).await.unwrap();

        f.assignments
            .save(&RoleAssignment::new(user_id, editor.id))
            .await
            .unwrap();

        let group_id = Uuid::new_v4();
        f.memberships
            .save(&GroupMembership::new(user_id, group_id))
            .await
            .unwrap();
        f.group_roles
            .save(&GroupRoleAssignment::new(group_id, editor.id))
            .await
            .unwrap();

        assert_eq!(f.service.effective_role_names(user_id).await, vec!["editor"]);
        assert_eq!(
            f.service.effective_permissions(user_id).await,
            vec!["articles:write"]
        );
    }

    #[tokio::test]
    async fn lapsed_windows_grant_nothing() {
        let f = fixture();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let editor = Role::new("editor");
        f.roles.save(&editor).await.unwrap();

        f.assignments
            .save(
                &RoleAssignment::new(user_id, editor.id)
                    .with_window(None, Some(now - Duration::days(1))),
            )
            .await
            .unwrap();

        let group_id = Uuid::new_v4();
        f.memberships
            .save(
                &GroupMembership::new(user_id, group_id)
                    .with_window(Some(now + Duration::days(1)), None),
            )
            .await
            .unwrap();
        f.group_roles
            .save(&GroupRoleAssignment::new(group_id, editor.id))
            .await
            .unwrap();

        assert!(f.service.effective_role_names(user_id).await.is_empty());
    }

    #[tokio::test]
    async fn no_grants_resolve_to_empty_lists_not_absence() {
        let f = fixture();
        let user = User::new("empty@example.com");

        let ctx = f.service.build_context(&user).await;
        assert!(ctx.roles.is_empty());
        assert!(ctx.permissions.is_empty());

        let batch = f
            .service
            .effective_permissions_for(&[user.id])
            .await;
        assert_eq!(batch.get(&user.id), Some(&Vec::new()));
    }

    #[test]
    fn wildcard_permission_matching() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            email: "t@x.io".to_string(),
            display_name: None,
            roles: vec!["admin".to_string()],
            permissions: vec!["reports:*".to_string()],
        };

        assert!(ctx.has_permission("reports:read"));
        assert!(ctx.has_permission("reports:write"));
        assert!(!ctx.has_permission("users:read"));
        assert!(ctx.has_role("admin"));

        let superuser = AuthContext {
            user_id: Uuid::new_v4(),
            email: "root@x.io".to_string(),
            display_name: None,
            roles: vec![],
            permissions: vec!["*:*".to_string()],
        };
        assert!(superuser.has_permission("anything:at-all"));
        assert!(superuser.has_all_permissions(&["a:b", "c:d"]));
    }
}
