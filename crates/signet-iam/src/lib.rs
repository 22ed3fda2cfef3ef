//! Signet IAM
//!
//! Security and identity core for the Signet platform:
//! - Credential lifecycle: Argon2id password hashing, federated identity
//!   claim ingestion, service credential registration, password reset with
//!   rate limiting
//! - Token lifecycle: signed short-lived access tokens, opaque-by-hash
//!   refresh tokens with family rotation and reuse detection
//! - Authorization: RBAC (direct and group-inherited roles) combined with
//!   an ABAC policy engine over JSON condition expressions, explicit-DENY
//!   override
//! - A single `Principal` concept spanning users and services, gated by an
//!   `enabled` flag on every authenticated operation
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Store traits plus in-memory implementations
//! - services where the aggregate owns behavior

// Core aggregates
pub mod group;
pub mod principal;
pub mod role;
pub mod service_account;
pub mod user;

// Authentication & authorization
pub mod abac;
pub mod auth;
pub mod idp;

// Shared infrastructure
pub mod shared;

// Re-export common types from shared
pub use shared::error::{IamError, Result};

// Process-level logging setup lives in signet-common; re-exported so
// embedders initialize it without a second dependency.
pub use signet_common::logging;

// Re-export main entity types for convenience
pub use abac::entity::{AbacPolicy, PolicyEffect};
pub use auth::refresh_token::RefreshToken;
pub use group::entity::{Group, GroupMembership, GroupRoleAssignment};
pub use principal::entity::{Principal, PrincipalKind};
pub use role::entity::{Permission, Role, RoleAssignment};
pub use service_account::entity::ServiceCredential;
pub use user::entity::User;

// Re-export store traits
pub use abac::repository::AbacPolicyStore;
pub use auth::password_reset::{
    PasswordResetAttempt, PasswordResetAttemptStore, PasswordResetConfig,
};
pub use auth::refresh_token_repository::RefreshTokenStore;
pub use group::repository::{GroupMembershipStore, GroupRoleAssignmentStore, GroupStore};
pub use principal::repository::PrincipalStore;
pub use role::repository::{PermissionCatalog, RoleAssignmentStore, RoleStore};
pub use service_account::repository::ServiceCredentialStore;
pub use user::repository::UserStore;

// Re-export services
pub use abac::engine::{AbacDecision, AbacEngine, MatchedPolicy};
pub use auth::authentication_service::AuthenticationService;
pub use auth::password_service::{Argon2Config, PasswordPolicy, PasswordService};
pub use auth::refresh_token_service::{RefreshTokenService, TokenPair};
pub use auth::token_service::{TokenClaims, TokenConfig, TokenService};
pub use idp::{FederatedClaims, IdentityProvider, IdentityProviderRegistry};
pub use principal::registry::{PrincipalRegistry, ServiceRegistration};
pub use shared::authorization_service::{AuthContext, AuthorizationService};
pub use shared::config::SecurityConfig;
pub use shared::email::{EmailSender, LoggingEmailSender};
pub use shared::request_context::{extract_bearer_token, RequestContext, RequestPrincipal};
