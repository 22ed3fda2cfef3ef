//! Group Entities
//!
//! Groups let roles flow to users indirectly: a user's memberships and the
//! group's role grants are both window-bounded, and a role is inherited only
//! while both windows are open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::entity::window_contains;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,

    /// Group name, unique
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A user's window-bounded membership in a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl GroupMembership {
    pub fn new(user_id: Uuid, group_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            valid_from: None,
            valid_to: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_window(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        window_contains(now, self.valid_from, self.valid_to)
    }
}

/// A window-bounded role grant to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRoleAssignment {
    pub id: Uuid,
    pub group_id: Uuid,
    pub role_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl GroupRoleAssignment {
    pub fn new(group_id: Uuid, role_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            role_id,
            valid_from: None,
            valid_to: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_window(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        window_contains(now, self.valid_from, self.valid_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn membership_window_is_honored() {
        let now = Utc::now();
        let current = GroupMembership::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(current.is_valid_at(now));

        let lapsed = GroupMembership::new(Uuid::new_v4(), Uuid::new_v4())
            .with_window(None, Some(now - Duration::days(1)));
        assert!(!lapsed.is_valid_at(now));
    }

    #[test]
    fn group_role_window_is_honored() {
        let now = Utc::now();
        let pending = GroupRoleAssignment::new(Uuid::new_v4(), Uuid::new_v4())
            .with_window(Some(now + Duration::days(1)), None);
        assert!(!pending.is_valid_at(now));
    }
}
