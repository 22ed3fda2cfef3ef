//! Authentication Service
//!
//! The façade a transport layer talks to. Orchestrates the password
//! hasher, token codec, refresh-token store, principal registry, federated
//! identity adapters, authorization resolver, and the ABAC engine behind
//! the operations of the public contract. Token verification always
//! precedes the principal-enabled check, which always precedes any
//! authorization decision.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::refresh_token_service::{RefreshTokenService, TokenPair};
use super::token_service::TokenService;
use crate::abac::engine::{AbacDecision, AbacEngine};
use crate::principal::entity::Principal;
use crate::principal::registry::{PrincipalRegistry, ServiceRegistration};
use crate::shared::authorization_service::{AuthContext, AuthorizationService};
use crate::shared::error::Result;
use crate::user::entity::User;

pub struct AuthenticationService {
    registry: Arc<PrincipalRegistry>,
    tokens: Arc<TokenService>,
    refresh_tokens: Arc<RefreshTokenService>,
    authorization: Arc<AuthorizationService>,
    abac: Arc<AbacEngine>,
}

impl AuthenticationService {
    pub fn new(
        registry: Arc<PrincipalRegistry>,
        tokens: Arc<TokenService>,
        refresh_tokens: Arc<RefreshTokenService>,
        authorization: Arc<AuthorizationService>,
        abac: Arc<AbacEngine>,
    ) -> Self {
        Self {
            registry,
            tokens,
            refresh_tokens,
            authorization,
            abac,
        }
    }

    /// The token codec, for request-principal extraction at the edge.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    // ------------------------------------------------------------------
    // Registration and login
    // ------------------------------------------------------------------

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        self.registry.register_user(name, email, password).await
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.registry.authenticate(email, password).await
    }

    pub async fn authenticate_with_oauth(
        &self,
        provider: &str,
        assertion: &str,
    ) -> Result<Option<User>> {
        self.registry.authenticate_with_oauth(provider, assertion).await
    }

    // ------------------------------------------------------------------
    // Token lifecycle
    // ------------------------------------------------------------------

    /// Issue an access/refresh pair for an authenticated user.
    pub async fn issue_token_pair(&self, user: &User) -> Result<TokenPair> {
        self.refresh_tokens.issue_pair(user.id, &user.email).await
    }

    /// Rotate a refresh credential. Raises authentication-required on any
    /// misuse, including reuse of a spent credential.
    pub async fn refresh_token_pair(&self, refresh_token: &str) -> Result<TokenPair> {
        self.refresh_tokens.refresh(refresh_token).await
    }

    /// Validate a bearer access token down to an enabled user. Every
    /// failure mode is `None`.
    pub async fn validate_access_token(&self, token: &str) -> Result<Option<User>> {
        let claims = match self.tokens.verify(token) {
            Some(claims) if claims.is_access() => claims,
            _ => return Ok(None),
        };

        let user_id = match claims.sub.parse::<Uuid>() {
            Ok(user_id) => user_id,
            Err(_) => return Ok(None),
        };

        self.registry.load_enabled_user(user_id).await
    }

    /// Revoke one refresh credential (single-session logout).
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        self.refresh_tokens.revoke(refresh_token).await
    }

    /// Revoke every refresh credential for a user (logout everywhere).
    pub async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64> {
        self.refresh_tokens.revoke_all_for_user(user_id).await
    }

    // ------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------

    /// Always returns true; see the registry for the enumeration-safe
    /// internals.
    pub async fn request_password_reset(&self, email: &str, locale: &str) -> Result<bool> {
        self.registry.request_password_reset(email, locale).await
    }

    pub async fn validate_reset_token(&self, token: &str) -> Result<bool> {
        self.registry.validate_reset_token(token).await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        self.registry.reset_password(token, new_password).await
    }

    // ------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------

    pub async fn register_service(
        &self,
        service_id: &str,
        permission_names: &[String],
    ) -> Result<ServiceRegistration> {
        self.registry.register_service(service_id, permission_names).await
    }

    pub async fn validate_service_credentials(
        &self,
        service_id: &str,
        client_secret: &str,
    ) -> Result<Option<Principal>> {
        self.registry
            .validate_service_credentials(service_id, client_secret)
            .await
    }

    /// Issue a service token carrying the permissions granted at
    /// registration. The caller must already have validated the service's
    /// credentials.
    pub async fn issue_service_token(&self, service_id: &str, audience: &str) -> Result<String> {
        let permissions = self.registry.service_permissions(service_id).await?;
        self.tokens.issue_service(service_id, audience, permissions)
    }

    /// Service token variant propagating the calling user's identity and
    /// effective permissions.
    pub async fn issue_service_token_for_user(
        &self,
        service_id: &str,
        audience: &str,
        user: &User,
    ) -> Result<String> {
        let service_permissions = self.registry.service_permissions(service_id).await?;
        let user_permissions = self.authorization.effective_permissions(user.id).await;
        self.tokens.issue_service_for_user(
            service_id,
            audience,
            service_permissions,
            user.id,
            user_permissions,
        )
    }

    // ------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------

    /// Assemble the RBAC context for a user.
    pub async fn authorization_context(&self, user: &User) -> AuthContext {
        self.authorization.build_context(user).await
    }

    /// Evaluate the active ABAC policies against an attribute triple.
    /// Absent maps evaluate as empty.
    pub async fn evaluate_abac(
        &self,
        subject: Option<Map<String, Value>>,
        resource: Option<Map<String, Value>>,
        context: Option<Map<String, Value>>,
    ) -> Result<AbacDecision> {
        self.abac
            .evaluate(
                subject.unwrap_or_default(),
                resource.unwrap_or_default(),
                context.unwrap_or_default(),
            )
            .await
    }
}
