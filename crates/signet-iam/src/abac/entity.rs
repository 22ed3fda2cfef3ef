//! ABAC Policy Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Effect a matched policy contributes to the combined decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyEffect {
    Allow,
    Deny,
}

/// An attribute-based policy: a JSON condition over subject/resource/context
/// attributes plus the effect applied when the condition matches. Only
/// active policies participate in evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbacPolicy {
    pub id: Uuid,

    /// Unique policy name
    pub name: String,

    pub effect: PolicyEffect,

    /// JSON condition text; parsed fresh on every evaluation
    pub condition: String,

    pub is_active: bool,

    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AbacPolicy {
    pub fn new(
        name: impl Into<String>,
        effect: PolicyEffect,
        condition: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            effect,
            condition: condition.into(),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn set_condition(&mut self, condition: impl Into<String>) {
        self.condition = condition.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}
