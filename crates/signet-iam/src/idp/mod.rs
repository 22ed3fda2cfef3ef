//! Federated Identity Providers
//!
//! The single seam for external identity protocols. Each adapter validates
//! a provider-specific assertion and extracts normalized claims; the
//! registry is a closed map assembled once at process startup from
//! configuration, never mutated at call time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::Result;

/// Normalized claims extracted from a validated identity assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedClaims {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default)]
    pub email_verified: bool,
}

/// Adapter for one external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stable provider name the registry keys on (e.g. "google").
    fn provider_name(&self) -> &str;

    /// Validate an assertion and extract normalized claims. `None` means
    /// the assertion did not validate; errors are reserved for
    /// infrastructure failures reaching the provider.
    async fn validate_and_extract(&self, assertion: &str) -> Result<Option<FederatedClaims>>;
}

/// Closed provider-name → adapter map.
pub struct IdentityProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl IdentityProviderRegistry {
    /// Build the registry from the providers wired at startup. Later
    /// entries with a duplicate name replace earlier ones.
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn IdentityProvider>>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.provider_name().to_string(), p))
                .collect(),
        }
    }

    /// Registry with no providers (password-only deployments).
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn get(&self, provider_name: &str) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers.get(provider_name)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted provider for exercising the federated login path.

    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    /// Accepts the assertions it was seeded with and rejects the rest.
    pub struct StaticAssertionProvider {
        name: String,
        assertions: RwLock<HashMap<String, FederatedClaims>>,
    }

    impl StaticAssertionProvider {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                assertions: RwLock::new(HashMap::new()),
            }
        }

        pub fn accept(&self, assertion: impl Into<String>, claims: FederatedClaims) {
            self.assertions.write().insert(assertion.into(), claims);
        }
    }

    #[async_trait]
    impl IdentityProvider for StaticAssertionProvider {
        fn provider_name(&self) -> &str {
            &self.name
        }

        async fn validate_and_extract(
            &self,
            assertion: &str,
        ) -> Result<Option<FederatedClaims>> {
            Ok(self.assertions.read().get(assertion).cloned())
        }
    }
}
