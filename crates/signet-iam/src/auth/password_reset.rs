//! Password Reset Attempts
//!
//! Rolling-window rate limiting for reset requests. Attempts are keyed by
//! the requested email (lowercased) so enumeration probes against unknown
//! addresses are throttled the same as real ones.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::shared::error::Result;

/// Reset flow configuration.
#[derive(Debug, Clone)]
pub struct PasswordResetConfig {
    /// Reset token lifetime in seconds
    pub token_ttl_secs: i64,

    /// Attempts allowed per identifier per rolling window
    pub max_attempts: u32,

    /// Rolling window length in seconds
    pub attempt_window_secs: i64,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3600,
            max_attempts: 3,
            attempt_window_secs: 3600,
        }
    }
}

impl PasswordResetConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_secs)
    }

    pub fn attempt_window(&self) -> Duration {
        Duration::seconds(self.attempt_window_secs)
    }
}

/// One recorded reset request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetAttempt {
    /// Lowercased email the request targeted
    pub identifier: String,
    pub attempted_at: DateTime<Utc>,
}

impl PasswordResetAttempt {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into().to_lowercase(),
            attempted_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PasswordResetAttemptStore: Send + Sync {
    async fn record(&self, attempt: &PasswordResetAttempt) -> Result<()>;

    /// Attempts for the identifier at or after `since`.
    async fn count_since(&self, identifier: &str, since: DateTime<Utc>) -> Result<u32>;

    /// Cleanup job support: drop attempts older than `cutoff`.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// In-memory attempt store.
#[derive(Default)]
pub struct InMemoryPasswordResetAttemptStore {
    records: RwLock<Vec<PasswordResetAttempt>>,
}

impl InMemoryPasswordResetAttemptStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PasswordResetAttemptStore for InMemoryPasswordResetAttemptStore {
    async fn record(&self, attempt: &PasswordResetAttempt) -> Result<()> {
        self.records.write().push(attempt.clone());
        Ok(())
    }

    async fn count_since(&self, identifier: &str, since: DateTime<Utc>) -> Result<u32> {
        let needle = identifier.to_lowercase();
        Ok(self
            .records
            .read()
            .iter()
            .filter(|a| a.identifier == needle && a.attempted_at >= since)
            .count() as u32)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|a| a.attempted_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// Generate an opaque reset token: 32 random bytes, URL-safe base64.
pub fn generate_reset_token() -> String {
    use base64::Engine;

    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
