//! ABAC Policy Engine
//!
//! Evaluates every active policy against the subject/resource/context
//! attribute triple and combines matches with explicit-DENY override.
//! Policies are isolated from each other: one malformed, oversized, or
//! too-deep condition only disqualifies its own policy. Diagnostics name
//! the policy by id and name, never by condition text.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::condition::{AttributeContext, Condition};
use super::entity::{AbacPolicy, PolicyEffect};
use super::repository::AbacPolicyStore;
use crate::shared::error::Result;

pub const REASON_DENIED: &str = "Access denied by ABAC policy";
pub const REASON_GRANTED: &str = "Access granted by ABAC policy";
pub const REASON_NO_MATCH: &str = "No matching ABAC policies";

/// A policy whose condition matched the attribute triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPolicy {
    pub id: Uuid,
    pub name: String,
    pub effect: PolicyEffect,
}

/// Combined evaluation outcome. `decision` is absent when nothing matched.
#[derive(Debug, Clone)]
pub struct AbacDecision {
    pub decision: Option<PolicyEffect>,
    pub matched_policies: Vec<MatchedPolicy>,
    pub reason: String,
}

impl AbacDecision {
    pub fn is_denied(&self) -> bool {
        self.decision == Some(PolicyEffect::Deny)
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Some(PolicyEffect::Allow)
    }
}

/// Policy evaluation over the active policy set.
pub struct AbacEngine {
    policies: Arc<dyn AbacPolicyStore>,
}

impl AbacEngine {
    pub fn new(policies: Arc<dyn AbacPolicyStore>) -> Self {
        Self { policies }
    }

    /// Load the active policies and evaluate them against the attribute
    /// triple. The policy set is read once; concurrent policy changes apply
    /// to later evaluations.
    pub async fn evaluate(
        &self,
        subject: Map<String, Value>,
        resource: Map<String, Value>,
        context: Map<String, Value>,
    ) -> Result<AbacDecision> {
        let policies = self.policies.find_active().await?;
        let attributes = AttributeContext::new(subject, resource, context);
        Ok(evaluate_policies(&policies, &attributes))
    }
}

/// Pure combination step, usable without a store.
pub fn evaluate_policies(policies: &[AbacPolicy], attributes: &AttributeContext) -> AbacDecision {
    let matched: Vec<MatchedPolicy> = policies
        .iter()
        .filter(|policy| policy_matches(policy, attributes))
        .map(|policy| MatchedPolicy {
            id: policy.id,
            name: policy.name.clone(),
            effect: policy.effect,
        })
        .collect();

    let denied = matched.iter().any(|p| p.effect == PolicyEffect::Deny);
    let allowed = matched.iter().any(|p| p.effect == PolicyEffect::Allow);

    let (decision, reason) = if denied {
        (Some(PolicyEffect::Deny), REASON_DENIED)
    } else if allowed {
        (Some(PolicyEffect::Allow), REASON_GRANTED)
    } else {
        (None, REASON_NO_MATCH)
    };

    AbacDecision {
        decision,
        matched_policies: matched,
        reason: reason.to_string(),
    }
}

/// Evaluate one policy's condition, failing closed on every error.
fn policy_matches(policy: &AbacPolicy, attributes: &AttributeContext) -> bool {
    let condition = match Condition::parse_str(&policy.condition) {
        Ok(condition) => condition,
        Err(error) => {
            debug!(policy_id = %policy.id, policy_name = %policy.name, %error,
                "ABAC condition rejected; policy skipped");
            return false;
        }
    };

    match condition.evaluate(attributes) {
        Ok(matched) => matched,
        Err(error) => {
            debug!(policy_id = %policy.id, policy_name = %policy.name, %error,
                "ABAC condition evaluation failed; policy skipped");
            false
        }
    }
}
