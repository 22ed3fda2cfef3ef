//! User Entity
//!
//! Profile record for USER-kind principals. A user with no password hash is
//! federated-only and can never authenticate by password.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Unique, compared case-insensitively
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// None for federated-only users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Legacy opaque token, unrelated to the refresh-token lifecycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    /// Once set this never goes back to None for the same token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: None,
            password_hash: None,
            remember_me_token: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            password_reset_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Start a password reset: installs the new token, invalidating any
    /// prior one, and clears the used marker.
    pub fn begin_password_reset(&mut self, token: impl Into<String>, expires_at: DateTime<Utc>) {
        self.password_reset_token = Some(token.into());
        self.password_reset_expires_at = Some(expires_at);
        self.password_reset_used_at = None;
        self.touch();
    }

    /// True while the current reset token can still be redeemed.
    pub fn reset_token_usable(&self, now: DateTime<Utc>) -> bool {
        if self.password_reset_token.is_none() || self.password_reset_used_at.is_some() {
            return false;
        }
        match self.password_reset_expires_at {
            Some(expires_at) => now < expires_at,
            None => false,
        }
    }

    /// Complete a reset: install the new hash, stamp the used marker, and
    /// drop the token so it can never be redeemed again.
    pub fn complete_password_reset(&mut self, new_hash: impl Into<String>) {
        self.password_hash = Some(new_hash.into());
        self.password_reset_used_at = Some(Utc::now());
        self.password_reset_token = None;
        self.password_reset_expires_at = None;
        self.touch();
    }

    pub fn set_remember_me_token(&mut self, token: impl Into<String>) {
        self.remember_me_token = Some(token.into());
        self.touch();
    }

    pub fn clear_remember_me_token(&mut self) {
        self.remember_me_token = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
