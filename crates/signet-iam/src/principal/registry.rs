//! Principal Registry
//!
//! Lifecycle operations for users and services: registration, password and
//! federated authentication, service credential validation, password reset,
//! and the legacy remember-me token. Every operation that authenticates
//! finishes with the principal-enabled check, and failure paths never
//! reveal which precondition broke.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::password_reset::{
    generate_reset_token, PasswordResetAttempt, PasswordResetAttemptStore, PasswordResetConfig,
};
use crate::auth::password_service::PasswordService;
use crate::idp::IdentityProviderRegistry;
use crate::principal::entity::{Principal, PrincipalKind};
use crate::principal::repository::PrincipalStore;
use crate::role::repository::PermissionCatalog;
use crate::service_account::entity::{generate_client_secret, ServiceCredential};
use crate::service_account::repository::ServiceCredentialStore;
use crate::shared::email::EmailSender;
use crate::shared::error::{IamError, Result};
use crate::user::entity::User;
use crate::user::repository::UserStore;

/// Result of a successful service registration. The clear secret appears
/// here and nowhere else, ever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistration {
    pub principal_id: Uuid,
    pub service_id: String,
    pub client_secret: String,
    pub permissions: Vec<String>,
}

pub struct PrincipalRegistry {
    users: Arc<dyn UserStore>,
    principals: Arc<dyn PrincipalStore>,
    service_credentials: Arc<dyn ServiceCredentialStore>,
    permission_catalog: Arc<dyn PermissionCatalog>,
    passwords: Arc<PasswordService>,
    identity_providers: Arc<IdentityProviderRegistry>,
    email: Arc<dyn EmailSender>,
    reset_attempts: Arc<dyn PasswordResetAttemptStore>,
    reset_config: PasswordResetConfig,
}

impl PrincipalRegistry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        principals: Arc<dyn PrincipalStore>,
        service_credentials: Arc<dyn ServiceCredentialStore>,
        permission_catalog: Arc<dyn PermissionCatalog>,
        passwords: Arc<PasswordService>,
        identity_providers: Arc<IdentityProviderRegistry>,
        email: Arc<dyn EmailSender>,
        reset_attempts: Arc<dyn PasswordResetAttemptStore>,
        reset_config: PasswordResetConfig,
    ) -> Self {
        Self {
            users,
            principals,
            service_credentials,
            permission_catalog,
            passwords,
            identity_providers,
            email,
            reset_attempts,
            reset_config,
        }
    }

    // ------------------------------------------------------------------
    // User registration and authentication
    // ------------------------------------------------------------------

    /// Register a user with password credentials.
    pub async fn register_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IamError::validation("Display name must not be blank"));
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(IamError::validation("Email is already registered"));
        }

        self.passwords.validate_policy(password)?;
        let hash = self.passwords.hash_password(password)?;

        let user = User::new(email)
            .with_display_name(name)
            .with_password_hash(hash);
        self.users.save(&user).await?;
        self.principals.save(&Principal::new_user(user.id)).await?;

        debug!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Authenticate by email and password. Unknown email, missing password
    /// hash, wrong password, and disabled principal are indistinguishable.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        // A blank password can never match; reject before any store work.
        if password.trim().is_empty() {
            return Ok(None);
        }

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let hash = match user.password_hash.as_deref() {
            Some(hash) => hash,
            None => return Ok(None),
        };

        if !self.passwords.verify_password(password, hash) {
            return Ok(None);
        }

        if !self.user_principal_enabled(user.id).await? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Authenticate by a federated identity assertion. Unknown providers
    /// and invalid assertions are caller mistakes (validation errors); a
    /// disabled principal is the usual silent None.
    pub async fn authenticate_with_oauth(
        &self,
        provider: &str,
        assertion: &str,
    ) -> Result<Option<User>> {
        let adapter = self
            .identity_providers
            .get(provider)
            .ok_or_else(|| IamError::validation(format!("Unsupported identity provider: {}", provider)))?;

        let claims = adapter
            .validate_and_extract(assertion)
            .await?
            .ok_or_else(|| IamError::validation("Invalid identity assertion"))?;

        match self.users.find_by_email(&claims.email).await? {
            Some(mut user) => {
                if !self.user_principal_enabled(user.id).await? {
                    return Ok(None);
                }
                if user.display_name.is_none() {
                    if let Some(name) = claims.name.clone() {
                        user.display_name = Some(name);
                        self.users.update(&user).await?;
                    }
                }
                Ok(Some(user))
            }
            None => {
                let mut user = User::new(claims.email.as_str());
                user.display_name = claims.name.clone();
                self.users.save(&user).await?;
                self.principals.save(&Principal::new_user(user.id)).await?;
                debug!(user_id = %user.id, provider, "federated user provisioned");
                Ok(Some(user))
            }
        }
    }

    /// Load a user by id, enforcing the enabled flag. Used by token
    /// validation paths.
    pub async fn load_enabled_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = match self.users.find_by_id(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        if !self.user_principal_enabled(user.id).await? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    // ------------------------------------------------------------------
    // Service registration and validation
    // ------------------------------------------------------------------

    /// Register a service principal. The returned clear secret is shown
    /// exactly once; only its hash survives.
    pub async fn register_service(
        &self,
        service_id: &str,
        permission_names: &[String],
    ) -> Result<ServiceRegistration> {
        let service_id = service_id.trim();
        if service_id.is_empty() {
            return Err(IamError::validation("Service id must not be blank"));
        }

        let existing = self
            .principals
            .find_by_kind_and_external_id(PrincipalKind::Service, service_id)
            .await?;
        if existing.is_some() {
            return Err(IamError::validation("Service id is already registered"));
        }

        for name in permission_names {
            if self.permission_catalog.find_by_name(name).await?.is_none() {
                return Err(IamError::validation(format!("Unknown permission: {}", name)));
            }
        }

        let secret = generate_client_secret();
        let hash = self.passwords.hash_password(&secret)?;

        let principal = Principal::new_service(service_id);
        self.principals.save(&principal).await?;

        let credential = ServiceCredential::new(
            principal.id,
            service_id,
            hash,
            permission_names.to_vec(),
        );
        self.service_credentials.save(&credential).await?;

        debug!(principal_id = %principal.id, service_id, "service registered");
        Ok(ServiceRegistration {
            principal_id: principal.id,
            service_id: service_id.to_string(),
            client_secret: secret,
            permissions: permission_names.to_vec(),
        })
    }

    /// Validate service credentials. Same silent-failure contract as
    /// password authentication.
    pub async fn validate_service_credentials(
        &self,
        service_id: &str,
        client_secret: &str,
    ) -> Result<Option<Principal>> {
        if client_secret.trim().is_empty() {
            return Ok(None);
        }

        let credential = match self.service_credentials.find_by_service_id(service_id).await? {
            Some(credential) => credential,
            None => return Ok(None),
        };

        if !self
            .passwords
            .verify_password(client_secret, &credential.client_secret_hash)
        {
            return Ok(None);
        }

        let principal = match self
            .principals
            .find_by_kind_and_external_id(PrincipalKind::Service, service_id)
            .await?
        {
            Some(principal) if principal.enabled => principal,
            _ => return Ok(None),
        };

        Ok(Some(principal))
    }

    /// Permission names granted to a service at registration.
    pub async fn service_permissions(&self, service_id: &str) -> Result<Vec<String>> {
        Ok(self
            .service_credentials
            .find_by_service_id(service_id)
            .await?
            .map(|c| c.permissions)
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Principal administration
    // ------------------------------------------------------------------

    /// Enable or disable a principal.
    pub async fn set_enabled(&self, principal_id: Uuid, enabled: bool) -> Result<Principal> {
        let mut principal = self
            .principals
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| IamError::not_found("Principal", principal_id.to_string()))?;

        if enabled {
            principal.enable();
        } else {
            principal.disable();
        }
        self.principals.update(&principal).await?;
        Ok(principal)
    }

    // ------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------

    /// Request a password reset. Always reports success so callers cannot
    /// probe which addresses exist; rate-limited identifiers and unknown
    /// emails simply skip the mail.
    pub async fn request_password_reset(&self, email: &str, locale: &str) -> Result<bool> {
        let identifier = email.to_lowercase();
        let window_start = Utc::now() - self.reset_config.attempt_window();

        let attempts = self
            .reset_attempts
            .count_since(&identifier, window_start)
            .await?;
        if attempts >= self.reset_config.max_attempts {
            debug!("password reset rate limit reached; skipping mail");
            return Ok(true);
        }
        self.reset_attempts
            .record(&PasswordResetAttempt::new(&identifier))
            .await?;

        let mut user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(true),
        };

        let token = generate_reset_token();
        user.begin_password_reset(token.as_str(), Utc::now() + self.reset_config.token_ttl());
        self.users.update(&user).await?;

        // Fire-and-forget: delivery problems are the mail collaborator's to
        // retry, and must not reveal anything to the requester.
        if let Err(e) = self
            .email
            .send_password_reset_mail(&user.email, &token, locale)
            .await
        {
            warn!(error = %e, "password reset mail delivery failed");
        }

        Ok(true)
    }

    /// True iff the token identifies a user and is unexpired and unused.
    pub async fn validate_reset_token(&self, token: &str) -> Result<bool> {
        if token.trim().is_empty() {
            return Ok(false);
        }
        Ok(self
            .users
            .find_by_reset_token(token)
            .await?
            .map(|u| u.reset_token_usable(Utc::now()))
            .unwrap_or(false))
    }

    /// Redeem a reset token. The password update, the used-at stamp, and
    /// clearing the token land in one store update.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        let mut user = match self.users.find_by_reset_token(token).await? {
            Some(user) if user.reset_token_usable(Utc::now()) => user,
            _ => return Err(IamError::validation("Invalid or expired reset token")),
        };

        self.passwords.validate_policy(new_password)?;
        let hash = self.passwords.hash_password(new_password)?;

        user.complete_password_reset(hash);
        self.users.update(&user).await?;

        debug!(user_id = %user.id, "password reset completed");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Remember-me (legacy opaque token)
    // ------------------------------------------------------------------

    /// Issue a fresh remember-me token for a user, replacing any prior one.
    pub async fn issue_remember_me(&self, user_id: Uuid) -> Result<String> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| IamError::not_found("User", user_id.to_string()))?;

        let token = loop {
            let candidate = random_opaque_token();
            if self
                .users
                .find_by_remember_me_token(&candidate)
                .await?
                .is_none()
            {
                break candidate;
            }
        };

        user.set_remember_me_token(token.as_str());
        self.users.update(&user).await?;
        Ok(token)
    }

    /// Authenticate by a remember-me token, with the usual enabled check.
    pub async fn authenticate_by_remember_me(&self, token: &str) -> Result<Option<User>> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        let user = match self.users.find_by_remember_me_token(token).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        if !self.user_principal_enabled(user.id).await? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn clear_remember_me(&self, user_id: Uuid) -> Result<()> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| IamError::not_found("User", user_id.to_string()))?;
        user.clear_remember_me_token();
        self.users.update(&user).await
    }

    // ------------------------------------------------------------------

    async fn user_principal_enabled(&self, user_id: Uuid) -> Result<bool> {
        Ok(self
            .principals
            .find_by_kind_and_external_id(PrincipalKind::User, &user_id.to_string())
            .await?
            .map(|p| p.enabled)
            .unwrap_or(false))
    }
}

fn random_opaque_token() -> String {
    use base64::Engine;

    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password_reset::InMemoryPasswordResetAttemptStore;
    use crate::auth::password_service::{Argon2Config, PasswordPolicy};
    use crate::idp::testing::StaticAssertionProvider;
    use crate::idp::{FederatedClaims, IdentityProvider};
    use crate::principal::repository::InMemoryPrincipalStore;
    use crate::role::repository::InMemoryPermissionCatalog;
    use crate::service_account::repository::InMemoryServiceCredentialStore;
    use crate::user::repository::InMemoryUserStore;
    use async_trait::async_trait;
    use parking_lot::RwLock;

    /// Records deliveries so tests can count them; never sees tokens again.
    #[derive(Default)]
    struct RecordingEmailSender {
        sent: RwLock<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send_password_reset_mail(
            &self,
            to_address: &str,
            reset_token: &str,
            _locale: &str,
        ) -> Result<()> {
            self.sent
                .write()
                .push((to_address.to_string(), reset_token.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        registry: PrincipalRegistry,
        users: Arc<InMemoryUserStore>,
        principals: Arc<InMemoryPrincipalStore>,
        email: Arc<RecordingEmailSender>,
    }

    fn fixture_with(providers: Vec<Arc<dyn IdentityProvider>>) -> Fixture {
        let users = InMemoryUserStore::new();
        let principals = InMemoryPrincipalStore::new();
        let email = Arc::new(RecordingEmailSender::default());

        let registry = PrincipalRegistry::new(
            users.clone(),
            principals.clone(),
            InMemoryServiceCredentialStore::new(),
            InMemoryPermissionCatalog::seeded(&["reports:read", "reports:write"]),
            Arc::new(
                PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap(),
            ),
            Arc::new(IdentityProviderRegistry::new(providers)),
            email.clone(),
            InMemoryPasswordResetAttemptStore::new(),
            PasswordResetConfig::default(),
        );

        Fixture {
            registry,
            users,
            principals,
            email,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(vec![])
    }

    async fn disable_user_principal(f: &Fixture, user_id: Uuid) {
        let mut principal = f
            .principals
            .find_by_kind_and_external_id(PrincipalKind::User, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        principal.disable();
        f.principals.update(&principal).await.unwrap();
    }

    #[tokio::test]
    async fn registration_and_password_authentication_round_trip() {
        let f = fixture();

        let user = f
            .registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        let authenticated = f
            .registry
            .authenticate("t@x.io", "TestPassword123!")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authenticated.id, user.id);

        assert!(f
            .registry
            .authenticate("t@x.io", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(f.registry.authenticate("t@x.io", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_password_short_circuits_before_the_store() {
        struct UntouchableUserStore;

        #[async_trait]
        impl UserStore for UntouchableUserStore {
            async fn find_by_id(&self, _: Uuid) -> Result<Option<User>> {
                panic!("store must not be consulted")
            }
            async fn find_by_email(&self, _: &str) -> Result<Option<User>> {
                panic!("store must not be consulted")
            }
            async fn find_by_remember_me_token(&self, _: &str) -> Result<Option<User>> {
                panic!("store must not be consulted")
            }
            async fn find_by_reset_token(&self, _: &str) -> Result<Option<User>> {
                panic!("store must not be consulted")
            }
            async fn save(&self, _: &User) -> Result<()> {
                panic!("store must not be consulted")
            }
            async fn update(&self, _: &User) -> Result<()> {
                panic!("store must not be consulted")
            }
            async fn delete_all(&self) -> Result<()> {
                panic!("store must not be consulted")
            }
        }

        let registry = PrincipalRegistry::new(
            Arc::new(UntouchableUserStore),
            InMemoryPrincipalStore::new(),
            InMemoryServiceCredentialStore::new(),
            InMemoryPermissionCatalog::new(),
            Arc::new(
                PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap(),
            ),
            Arc::new(IdentityProviderRegistry::empty()),
            Arc::new(RecordingEmailSender::default()),
            InMemoryPasswordResetAttemptStore::new(),
            PasswordResetConfig::default(),
        );

        assert!(registry.authenticate("t@x.io", "").await.unwrap().is_none());
        assert!(registry.authenticate("t@x.io", "   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_and_weak_password_are_validation_errors() {
        let f = fixture();
        f.registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        let err = f
            .registry
            .register_user("T2", "T@X.IO", "TestPassword123!")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        let err = f
            .registry
            .register_user("T3", "t3@x.io", "weak")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        let err = f
            .registry
            .register_user("  ", "t4@x.io", "TestPassword123!")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));
    }

    #[tokio::test]
    async fn disabled_principal_blocks_every_authentication_path() {
        let f = fixture();
        let user = f
            .registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();
        let remember_me = f.registry.issue_remember_me(user.id).await.unwrap();

        disable_user_principal(&f, user.id).await;

        assert!(f
            .registry
            .authenticate("t@x.io", "TestPassword123!")
            .await
            .unwrap()
            .is_none());
        assert!(f
            .registry
            .authenticate_by_remember_me(&remember_me)
            .await
            .unwrap()
            .is_none());
        assert!(f.registry.load_enabled_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn federated_login_provisions_and_backfills() {
        let provider = StaticAssertionProvider::new("google");
        provider.accept(
            "good-assertion",
            FederatedClaims {
                email: "fed@x.io".to_string(),
                name: Some("Fed Name".to_string()),
                picture: None,
                email_verified: true,
            },
        );
        let f = fixture_with(vec![Arc::new(provider) as Arc<dyn IdentityProvider>]);

        // Unknown provider is a caller error, not a silent None.
        let err = f
            .registry
            .authenticate_with_oauth("github", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        // Invalid assertion likewise.
        let err = f
            .registry
            .authenticate_with_oauth("google", "forged")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        // First valid login provisions a password-less user.
        let user = f
            .registry
            .authenticate_with_oauth("google", "good-assertion")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.email, "fed@x.io");
        assert!(!user.has_password());
        assert_eq!(user.display_name.as_deref(), Some("Fed Name"));

        // Password login stays impossible for federated-only users.
        assert!(f
            .registry
            .authenticate("fed@x.io", "TestPassword123!")
            .await
            .unwrap()
            .is_none());

        // Second login resolves to the same user.
        let again = f
            .registry
            .authenticate_with_oauth("google", "good-assertion")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, user.id);

        // A disabled principal blocks federated login like any other path.
        disable_user_principal(&f, user.id).await;
        assert!(f
            .registry
            .authenticate_with_oauth("google", "good-assertion")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn federated_login_backfills_missing_display_name() {
        let provider = StaticAssertionProvider::new("google");
        provider.accept(
            "assertion",
            FederatedClaims {
                email: "t@x.io".to_string(),
                name: Some("From Provider".to_string()),
                picture: None,
                email_verified: true,
            },
        );
        let f = fixture_with(vec![Arc::new(provider) as Arc<dyn IdentityProvider>]);

        // Pre-existing user without a display name.
        let user = User::new("t@x.io");
        f.users.save(&user).await.unwrap();
        f.principals
            .save(&Principal::new_user(user.id))
            .await
            .unwrap();

        let updated = f
            .registry
            .authenticate_with_oauth("google", "assertion")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("From Provider"));
    }

    #[tokio::test]
    async fn service_registration_is_unique_and_checks_the_catalog() {
        let f = fixture();

        let registration = f
            .registry
            .register_service("svc", &[])
            .await
            .unwrap();
        assert!(registration.client_secret.starts_with("sg_"));

        let err = f.registry.register_service("svc", &[]).await.unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        let err = f
            .registry
            .register_service("svc2", &["nonexistent:permission".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));
    }

    #[tokio::test]
    async fn service_credentials_validate_once_and_only_with_the_right_secret() {
        let f = fixture();
        let registration = f
            .registry
            .register_service("svc", &["reports:read".to_string()])
            .await
            .unwrap();

        let principal = f
            .registry
            .validate_service_credentials("svc", &registration.client_secret)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.id, registration.principal_id);

        assert!(f
            .registry
            .validate_service_credentials("svc", "sg_wrong")
            .await
            .unwrap()
            .is_none());
        assert!(f
            .registry
            .validate_service_credentials("unknown", &registration.client_secret)
            .await
            .unwrap()
            .is_none());
        assert!(f
            .registry
            .validate_service_credentials("svc", "")
            .await
            .unwrap()
            .is_none());

        assert_eq!(
            f.registry.service_permissions("svc").await.unwrap(),
            vec!["reports:read".to_string()]
        );

        // Disabled service principal stops validating.
        f.registry
            .set_enabled(registration.principal_id, false)
            .await
            .unwrap();
        assert!(f
            .registry
            .validate_service_credentials("svc", &registration.client_secret)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn password_reset_flow_is_single_use() {
        let f = fixture();
        f.registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        assert!(f
            .registry
            .request_password_reset("t@x.io", "en")
            .await
            .unwrap());
        let token = f.email.sent.read().last().unwrap().1.clone();

        assert!(f.registry.validate_reset_token(&token).await.unwrap());

        let user = f
            .registry
            .reset_password(&token, "NewPassword456!")
            .await
            .unwrap();
        assert!(user.password_reset_used_at.is_some());

        // Old password out, new password in.
        assert!(f
            .registry
            .authenticate("t@x.io", "TestPassword123!")
            .await
            .unwrap()
            .is_none());
        assert!(f
            .registry
            .authenticate("t@x.io", "NewPassword456!")
            .await
            .unwrap()
            .is_some());

        // The token is spent.
        assert!(!f.registry.validate_reset_token(&token).await.unwrap());
        let err = f
            .registry
            .reset_password(&token, "AnotherPass789!")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));
    }

    #[tokio::test]
    async fn reset_requests_always_report_success_and_rate_limit_silently() {
        let f = fixture();
        f.registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        // Unknown email: success, no mail.
        assert!(f
            .registry
            .request_password_reset("ghost@x.io", "en")
            .await
            .unwrap());
        assert_eq!(f.email.sent.read().len(), 0);

        // Three requests pass, the fourth is swallowed.
        for _ in 0..3 {
            assert!(f
                .registry
                .request_password_reset("t@x.io", "en")
                .await
                .unwrap());
        }
        assert_eq!(f.email.sent.read().len(), 3);

        assert!(f
            .registry
            .request_password_reset("t@x.io", "en")
            .await
            .unwrap());
        assert_eq!(f.email.sent.read().len(), 3);
    }

    #[tokio::test]
    async fn newer_reset_token_invalidates_the_previous_one() {
        let f = fixture();
        f.registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        f.registry
            .request_password_reset("t@x.io", "en")
            .await
            .unwrap();
        let first = f.email.sent.read()[0].1.clone();

        f.registry
            .request_password_reset("t@x.io", "en")
            .await
            .unwrap();
        let second = f.email.sent.read()[1].1.clone();

        assert!(!f.registry.validate_reset_token(&first).await.unwrap());
        assert!(f.registry.validate_reset_token(&second).await.unwrap());
    }

    #[tokio::test]
    async fn reset_password_enforces_the_policy() {
        let f = fixture();
        f.registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();
        f.registry
            .request_password_reset("t@x.io", "en")
            .await
            .unwrap();
        let token = f.email.sent.read()[0].1.clone();

        let err = f.registry.reset_password(&token, "weak").await.unwrap_err();
        assert!(matches!(err, IamError::Validation { .. }));

        // The failed attempt did not consume the token.
        assert!(f.registry.validate_reset_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn remember_me_round_trip() {
        let f = fixture();
        let user = f
            .registry
            .register_user("T", "t@x.io", "TestPassword123!")
            .await
            .unwrap();

        let token = f.registry.issue_remember_me(user.id).await.unwrap();
        let found = f
            .registry
            .authenticate_by_remember_me(&token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        f.registry.clear_remember_me(user.id).await.unwrap();
        assert!(f
            .registry
            .authenticate_by_remember_me(&token)
            .await
            .unwrap()
            .is_none());
        assert!(f
            .registry
            .authenticate_by_remember_me("")
            .await
            .unwrap()
            .is_none());
    }
}
