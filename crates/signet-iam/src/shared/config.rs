//! Security Configuration
//!
//! Aggregates the per-concern config structs with production defaults and
//! an environment loader. Every knob reads `SIGNET_*` variables and falls
//! back to its default, so a bare process still starts in dev shape.

use std::str::FromStr;

use tracing::warn;

use crate::auth::password_reset::PasswordResetConfig;
use crate::auth::password_service::{Argon2Config, PasswordPolicy};
use crate::auth::token_service::TokenConfig;

/// Full configuration for the IAM core.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    pub token: TokenConfig,
    pub argon2: Argon2Config,
    pub password_policy: PasswordPolicy,
    pub reset: PasswordResetConfig,
}

impl SecurityConfig {
    /// Load configuration from the environment, keeping defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secret) = env_string("SIGNET_TOKEN_SECRET") {
            config.token.secret = secret;
        }
        if let Some(issuer) = env_string("SIGNET_TOKEN_ISSUER") {
            config.token.issuer = issuer;
        }
        if let Some(ttl) = env_parse("SIGNET_ACCESS_TOKEN_TTL_SECS") {
            config.token.access_token_ttl_secs = ttl;
        }
        if let Some(ttl) = env_parse("SIGNET_REFRESH_TOKEN_TTL_SECS") {
            config.token.refresh_token_ttl_secs = ttl;
        }

        if let Some(memory) = env_parse("SIGNET_ARGON2_MEMORY_KIB") {
            config.argon2.memory_cost = memory;
        }
        if let Some(iterations) = env_parse("SIGNET_ARGON2_ITERATIONS") {
            config.argon2.time_cost = iterations;
        }
        if let Some(parallelism) = env_parse("SIGNET_ARGON2_PARALLELISM") {
            config.argon2.parallelism = parallelism;
        }

        if let Some(min_length) = env_parse("SIGNET_PASSWORD_MIN_LENGTH") {
            config.password_policy.min_length = min_length;
        }

        if let Some(ttl) = env_parse("SIGNET_RESET_TOKEN_TTL_SECS") {
            config.reset.token_ttl_secs = ttl;
        }
        if let Some(max) = env_parse("SIGNET_RESET_MAX_ATTEMPTS") {
            config.reset.max_attempts = max;
        }
        if let Some(window) = env_parse("SIGNET_RESET_WINDOW_SECS") {
            config.reset.attempt_window_secs = window;
        }

        config
    }
}

fn env_string(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, "unparsable configuration value ignored");
            None
        }
    }
}
