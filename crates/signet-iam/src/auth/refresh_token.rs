//! Refresh Token Entity
//!
//! Server-side record of an opaque refresh credential. Only the SHA-256 of
//! the signed credential is stored; the cleartext is returned to the client
//! exactly once. Every rotation of one initial issuance shares a family id,
//! and a record with a successor (`replaced_by`) is never consumable again:
//! presenting it is a reuse event that burns the whole family.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub id: Uuid,

    pub user_id: Uuid,

    /// SHA-256 of the signed credential, unique
    pub token_hash: String,

    /// Shared by every rotation derived from one initial issuance
    pub family_id: Uuid,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,

    /// Id of the record that replaced this one during rotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Create a record in a fresh family.
    pub fn new(user_id: Uuid, token_hash: impl Into<String>, ttl: Duration) -> Self {
        Self::in_family(user_id, token_hash, Uuid::new_v4(), ttl)
    }

    /// Create a record inside an existing family (rotation).
    pub fn in_family(
        user_id: Uuid,
        token_hash: impl Into<String>,
        family_id: Uuid,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.into(),
            family_id,
            issued_at: now,
            expires_at: now + ttl,
            revoked_at: None,
            replaced_by: None,
            last_used_at: None,
        }
    }

    /// Valid iff not revoked, not expired, and not yet rotated away.
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.replaced_by.is_none() && now < self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A replaced record being presented again is a reuse event.
    pub fn was_replaced(&self) -> bool {
        self.replaced_by.is_some()
    }

    pub fn revoke(&mut self) {
        self.revoked_at = Some(Utc::now());
    }

    pub fn mark_replaced(&mut self, successor: Uuid) {
        self.replaced_by = Some(successor);
    }

    pub fn mark_used(&mut self) {
        self.last_used_at = Some(Utc::now());
    }

    /// Hash a presented credential for storage or lookup.
    pub fn hash_token(cleartext: &str) -> String {
        use base64::Engine;
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(cleartext.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic_and_collision_free_for_distinct_inputs() {
        let h1 = RefreshToken::hash_token("credential-a");
        let h2 = RefreshToken::hash_token("credential-a");
        let h3 = RefreshToken::hash_token("credential-b");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn fresh_record_is_consumable() {
        let token = RefreshToken::new(Uuid::new_v4(), "h", Duration::days(30));
        assert!(token.is_consumable(Utc::now()));
        assert!(!token.was_replaced());
    }

    #[test]
    fn revoked_expired_or_replaced_records_are_not_consumable() {
        let now = Utc::now();

        let mut revoked = RefreshToken::new(Uuid::new_v4(), "h1", Duration::days(30));
        revoked.revoke();
        assert!(!revoked.is_consumable(now));

        let expired = RefreshToken::new(Uuid::new_v4(), "h2", Duration::seconds(-1));
        assert!(expired.is_expired(now));
        assert!(!expired.is_consumable(now));

        let mut replaced = RefreshToken::new(Uuid::new_v4(), "h3", Duration::days(30));
        replaced.mark_replaced(Uuid::new_v4());
        assert!(replaced.was_replaced());
        assert!(!replaced.is_consumable(now));
    }

    #[test]
    fn rotation_keeps_the_family() {
        let first = RefreshToken::new(Uuid::new_v4(), "h1", Duration::days(30));
        let second =
            RefreshToken::in_family(first.user_id, "h2", first.family_id, Duration::days(30));
        assert_eq!(first.family_id, second.family_id);
        assert_ne!(first.id, second.id);
    }
}
