//! Request Principal Extraction
//!
//! A request-scoped wrapper around the bearer credential. The principal is
//! extracted at most once per request and cached on the context, so
//! downstream authorization code never re-parses the token. The context is
//! created per request and must never be shared across requests.

use std::sync::OnceLock;

use uuid::Uuid;

use crate::auth::token_service::TokenService;
use crate::shared::error::{IamError, Result};

/// Strip the `Bearer ` scheme from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// The authenticated caller of one request, as proven by its access token.
#[derive(Debug, Clone)]
pub struct RequestPrincipal {
    pub user_id: Uuid,

    /// The verified access token, kept for downstream propagation
    pub token: String,

    /// Permissions claim carried by the token
    pub permissions: Vec<String>,
}

/// Per-request context carrying the raw bearer credential and the cached
/// extraction result.
pub struct RequestContext {
    bearer: Option<String>,
    principal: OnceLock<RequestPrincipal>,
}

impl RequestContext {
    pub fn new(bearer: Option<String>) -> Self {
        Self {
            bearer,
            principal: OnceLock::new(),
        }
    }

    /// Build from a raw Authorization header value, if any.
    pub fn from_authorization_header(header: Option<&str>) -> Self {
        Self::new(header.and_then(extract_bearer_token).map(String::from))
    }

    /// Resolve the request principal, verifying the access token on first
    /// call and serving the cached value afterwards. Missing, non-access,
    /// and invalid credentials all surface as the same
    /// authentication-required error.
    pub fn principal(&self, tokens: &TokenService) -> Result<&RequestPrincipal> {
        if let Some(principal) = self.principal.get() {
            return Ok(principal);
        }

        let token = self
            .bearer
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| IamError::authentication_required("Missing authentication token"))?;

        let claims = tokens
            .verify(token)
            .filter(|c| c.is_access())
            .ok_or_else(|| IamError::authentication_required("Invalid authentication token"))?;

        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| IamError::authentication_required("Invalid authentication token"))?;

        let principal = RequestPrincipal {
            user_id,
            token: token.to_string(),
            permissions: claims.permissions.unwrap_or_default(),
        };

        // A concurrent caller may have won the race; either value came from
        // the same token.
        Ok(self.principal.get_or_init(|| principal))
    }
}
