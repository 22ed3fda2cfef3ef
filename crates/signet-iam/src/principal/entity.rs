//! Principal Entity
//!
//! The unifying identity record: every authenticated subject, human or
//! machine, is a principal. The `enabled` flag gates every authenticated
//! operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalKind {
    /// Human user
    User,
    /// Machine service
    Service,
}

/// Principal entity
///
/// `(kind, external_id)` is unique: for users the external id is the user id,
/// for services it is the caller-chosen service id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,

    pub kind: PrincipalKind,

    /// User id (USER) or service id (SERVICE)
    pub external_id: String,

    /// Disabled principals fail every authenticated operation
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped on every update
    pub version: i64,
}

impl Principal {
    fn new(kind: PrincipalKind, external_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            external_id: external_id.into(),
            enabled: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Create an enabled USER principal for a user record.
    pub fn new_user(user_id: Uuid) -> Self {
        Self::new(PrincipalKind::User, user_id.to_string())
    }

    /// Create an enabled SERVICE principal for a registered service.
    pub fn new_service(service_id: impl Into<String>) -> Self {
        Self::new(PrincipalKind::Service, service_id)
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.touch();
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.touch();
    }

    pub fn is_user(&self) -> bool {
        self.kind == PrincipalKind::User
    }

    pub fn is_service(&self) -> bool {
        self.kind == PrincipalKind::Service
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_principal_is_enabled_and_keyed_by_user_id() {
        let user_id = Uuid::new_v4();
        let principal = Principal::new_user(user_id);

        assert_eq!(principal.kind, PrincipalKind::User);
        assert_eq!(principal.external_id, user_id.to_string());
        assert!(principal.enabled);
        assert_eq!(principal.version, 0);
    }

    #[test]
    fn disable_bumps_version() {
        let mut principal = Principal::new_service("svc-1");
        principal.disable();

        assert!(!principal.enabled);
        assert_eq!(principal.version, 1);

        principal.enable();
        assert!(principal.enabled);
        assert_eq!(principal.version, 2);
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&PrincipalKind::Service).unwrap(),
            "\"SERVICE\""
        );
        assert_eq!(
            serde_json::to_string(&PrincipalKind::User).unwrap(),
            "\"USER\""
        );
    }
}
