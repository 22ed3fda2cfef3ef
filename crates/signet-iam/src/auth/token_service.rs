//! Token Service
//!
//! Issues and verifies the signed compact tokens (header.payload.signature)
//! used across the platform: short-lived access tokens, refresh credentials
//! (whose real validity lives server-side in the refresh-token store), and
//! service tokens for machine-to-machine calls.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::shared::error::{IamError, Result};

/// Type claim values.
pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";
pub const TOKEN_TYPE_SERVICE: &str = "service";

/// Signing configuration for the process-wide key.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret; below 32 bytes triggers a startup warning
    pub secret: String,

    /// Issuer claim stamped on and required from every token
    pub issuer: String,

    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,

    /// Refresh credential lifetime in seconds
    pub refresh_token_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "signet-dev-signing-secret-change-me".to_string(),
            issuer: "signet".to_string(),
            access_token_ttl_secs: 900,          // 15 minutes
            refresh_token_ttl_secs: 86400 * 30,  // 30 days
        }
    }
}

/// Claims carried by every Signet token. Optional fields are present only
/// on the token types that define them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id (users) or service id (service tokens)
    pub sub: String,

    pub iss: String,

    #[serde(rename = "type")]
    pub token_type: String,

    /// Unique token id; keeps two same-second issuances distinct
    pub jti: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Mandatory on access tokens: always an array, possibly empty, so
    /// consumers never branch on absence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Propagated user context on service tokens
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(rename = "userPermissions", skip_serializing_if = "Option::is_none")]
    pub user_permissions: Option<Vec<String>>,

    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn is_access(&self) -> bool {
        self.token_type == TOKEN_TYPE_ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TOKEN_TYPE_REFRESH
    }

    pub fn is_service(&self) -> bool {
        self.token_type == TOKEN_TYPE_SERVICE
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Token issuance and verification over a single process-wide HS256 key.
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        if config.secret.len() < 32 {
            warn!(
                secret_len = config.secret.len(),
                "signing secret is shorter than 32 bytes; acceptable for dev only"
            );
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| IamError::internal(format!("Failed to encode token: {}", e)))
    }

    /// Issue an access token carrying identity and effective permissions.
    /// The permissions claim is always present, possibly empty.
    pub fn issue_access(
        &self,
        principal_id: Uuid,
        email: &str,
        permissions: Vec<String>,
    ) -> Result<String> {
        let now = Utc::now();
        self.sign(&TokenClaims {
            sub: principal_id.to_string(),
            iss: self.config.issuer.clone(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            permissions: Some(permissions),
            aud: None,
            user_id: None,
            user_permissions: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.access_token_ttl_secs)).timestamp(),
        })
    }

    /// Issue a refresh credential. The signature only makes the value
    /// opaque and reproducibly hashable; validity is decided by the
    /// refresh-token store, never by the signature alone.
    pub fn issue_refresh(&self, principal_id: Uuid) -> Result<String> {
        let now = Utc::now();
        self.sign(&TokenClaims {
            sub: principal_id.to_string(),
            iss: self.config.issuer.clone(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: None,
            permissions: None,
            aud: None,
            user_id: None,
            user_permissions: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.refresh_token_ttl_secs)).timestamp(),
        })
    }

    /// Issue a service token for machine-to-machine calls.
    pub fn issue_service(
        &self,
        service_id: &str,
        audience: &str,
        permissions: Vec<String>,
    ) -> Result<String> {
        self.issue_service_claims(service_id, audience, permissions, None, None)
    }

    /// Service token variant propagating the calling user's context.
    pub fn issue_service_for_user(
        &self,
        service_id: &str,
        audience: &str,
        permissions: Vec<String>,
        user_id: Uuid,
        user_permissions: Vec<String>,
    ) -> Result<String> {
        self.issue_service_claims(
            service_id,
            audience,
            permissions,
            Some(user_id.to_string()),
            Some(user_permissions),
        )
    }

    fn issue_service_claims(
        &self,
        service_id: &str,
        audience: &str,
        permissions: Vec<String>,
        user_id: Option<String>,
        user_permissions: Option<Vec<String>>,
    ) -> Result<String> {
        let now = Utc::now();
        self.sign(&TokenClaims {
            sub: service_id.to_string(),
            iss: self.config.issuer.clone(),
            token_type: TOKEN_TYPE_SERVICE.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: None,
            permissions: Some(permissions),
            aud: Some(audience.to_string()),
            user_id,
            user_permissions,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.access_token_ttl_secs)).timestamp(),
        })
    }

    /// Verify a token: signature, expiry (no leeway), issuer, and presence
    /// of the type claim. Every failure mode collapses to `None`; callers
    /// branch only on presence.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.config.issuer]);

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) if !data.claims.token_type.is_empty() => Some(data.claims),
            _ => None,
        }
    }

    /// True iff the token verifies and its type claim is `access`.
    pub fn is_access(&self, token: &str) -> bool {
        self.verify(token).map(|c| c.is_access()).unwrap_or(false)
    }

    /// True iff the token verifies and its type claim is `refresh`.
    pub fn is_refresh(&self, token: &str) -> bool {
        self.verify(token).map(|c| c.is_refresh()).unwrap_or(false)
    }

    /// Subject of a valid token, or None.
    pub fn subject(&self, token: &str) -> Option<String> {
        self.verify(token).map(|c| c.sub)
    }

    /// Permissions of a valid token. Access and service tokens always yield
    /// a list (possibly empty); other valid tokens yield an empty list.
    pub fn permissions(&self, token: &str) -> Option<Vec<String>> {
        self.verify(token)
            .map(|c| c.permissions.unwrap_or_default())
    }

    /// Expiry instant of a valid token, or None.
    pub fn expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        self.verify(token).and_then(|c| c.expires_at())
    }
}
