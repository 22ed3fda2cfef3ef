//! Refresh Token Service
//!
//! Rotation flow over the refresh-token store. A presented credential is
//! located by its hash; a record that already has a successor is a reuse
//! event and burns its whole family. Rotation itself is a compare-and-set
//! on the old record, so concurrent rotations of one credential produce
//! exactly one winner and the loser is handled as reuse.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::refresh_token::RefreshToken;
use super::refresh_token_repository::RefreshTokenStore;
use super::token_service::TokenService;
use crate::principal::registry::PrincipalRegistry;
use crate::shared::authorization_service::AuthorizationService;
use crate::shared::error::{IamError, Result};

/// Access/refresh pair returned to clients.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

pub struct RefreshTokenService {
    tokens: Arc<TokenService>,
    store: Arc<dyn RefreshTokenStore>,
    registry: Arc<PrincipalRegistry>,
    authorization: Arc<AuthorizationService>,
}

impl RefreshTokenService {
    pub fn new(
        tokens: Arc<TokenService>,
        store: Arc<dyn RefreshTokenStore>,
        registry: Arc<PrincipalRegistry>,
        authorization: Arc<AuthorizationService>,
    ) -> Self {
        Self {
            tokens,
            store,
            registry,
            authorization,
        }
    }

    fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.tokens.config().refresh_token_ttl_secs)
    }

    /// Issue a fresh access/refresh pair for a user, starting a new family.
    pub async fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair> {
        let permissions = self.authorization.effective_permissions(user_id).await;
        let access_token = self.tokens.issue_access(user_id, email, permissions)?;

        let refresh_token = self.tokens.issue_refresh(user_id)?;
        let record = RefreshToken::new(
            user_id,
            RefreshToken::hash_token(&refresh_token),
            self.refresh_ttl(),
        );
        self.store.insert(&record).await?;

        debug!(user_id = %user_id, family_id = %record.family_id, "refresh family started");
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.config().access_token_ttl_secs,
        })
    }

    /// Rotate a presented refresh credential into a new pair.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair> {
        let presented_hash = RefreshToken::hash_token(presented);

        let record = self
            .store
            .find_by_hash(&presented_hash)
            .await?
            .ok_or_else(|| IamError::authentication_required("Refresh token not recognized"))?;

        // A record with a successor was already spent once: reuse.
        if record.was_replaced() {
            warn!(family_id = %record.family_id, user_id = %record.user_id,
                "refresh token reuse detected; revoking family");
            self.store.revoke_family(record.family_id).await?;
            return Err(IamError::authentication_required("Refresh token reuse detected"));
        }

        let now = Utc::now();
        if record.revoked_at.is_some() {
            return Err(IamError::authentication_required("Refresh token revoked"));
        }
        if record.is_expired(now) {
            return Err(IamError::authentication_required("Refresh token expired"));
        }

        let user = self
            .registry
            .load_enabled_user(record.user_id)
            .await?
            .ok_or_else(|| IamError::authentication_required("Account is not active"))?;

        let new_refresh = self.tokens.issue_refresh(user.id)?;
        let new_record = RefreshToken::in_family(
            user.id,
            RefreshToken::hash_token(&new_refresh),
            record.family_id,
            self.refresh_ttl(),
        );
        self.store.insert(&new_record).await?;

        // Exactly one concurrent rotation of this credential wins the CAS;
        // a loser means the credential was spent in parallel: reuse.
        let rotated = self.store.mark_replaced(&presented_hash, new_record.id).await?;
        if !rotated {
            warn!(family_id = %record.family_id, user_id = %record.user_id,
                "concurrent refresh rotation detected; revoking family");
            self.store.revoke_family(record.family_id).await?;
            return Err(IamError::authentication_required("Refresh token reuse detected"));
        }
        self.store.touch_last_used(record.id).await?;

        let permissions = self.authorization.effective_permissions(user.id).await;
        let access_token = self.tokens.issue_access(user.id, &user.email, permissions)?;

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.config().access_token_ttl_secs,
        })
    }

    /// Revoke a presented refresh credential.
    pub async fn revoke(&self, presented: &str) -> Result<bool> {
        self.store
            .revoke_by_hash(&RefreshToken::hash_token(presented))
            .await
    }

    /// Revoke every outstanding refresh token for a user (logout
    /// everywhere). Returns the count.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        self.store.revoke_all_for_user(user_id).await
    }

    /// Revoke a whole family.
    pub async fn revoke_family(&self, family_id: Uuid) -> Result<u64> {
        self.store.revoke_family(family_id).await
    }
}
