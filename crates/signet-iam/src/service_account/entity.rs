//! Service Credential Entity
//!
//! Secret material for SERVICE-kind principals. The clear secret exists
//! exactly once, at registration; only its Argon2id hash is stored.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCredential {
    /// The SERVICE principal this credential belongs to (1-1)
    pub principal_id: Uuid,

    /// Caller-chosen service id, unique across services
    pub service_id: String,

    /// Argon2id hash of the client secret (same KDF as passwords)
    pub client_secret_hash: String,

    /// Permission names granted at registration
    pub permissions: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceCredential {
    pub fn new(
        principal_id: Uuid,
        service_id: impl Into<String>,
        client_secret_hash: impl Into<String>,
        permissions: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            principal_id,
            service_id: service_id.into(),
            client_secret_hash: client_secret_hash.into(),
            permissions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rotate_secret(&mut self, new_hash: impl Into<String>) {
        self.client_secret_hash = new_hash.into();
        self.updated_at = Utc::now();
    }
}

/// Generate a client secret with the `sg_` prefix.
///
/// 32 bytes of randomness, URL-safe base64 without padding.
pub fn generate_client_secret() -> String {
    use base64::Engine;

    let bytes: [u8; 32] = rand::thread_rng().gen();
    format!(
        "sg_{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    )
}
