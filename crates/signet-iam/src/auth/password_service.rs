//! Password Service
//!
//! Argon2id hashing and the password composition policy. The policy is
//! enforced by registration and reset paths, never by the hasher itself.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::debug;

use crate::shared::error::{IamError, Result};

/// Password composition policy.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    /// Any non-alphanumeric character satisfies the special requirement
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// Validate a password, collecting every failed rule.
    pub fn validate(&self, password: &str) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if password.chars().count() < self.min_length {
            errors.push(format!(
                "Password must be at least {} characters",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one digit".to_string());
        }
        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            errors.push("Password must contain at least one special character".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Relaxed policy for tests and dev seeding.
    pub fn lenient() -> Self {
        Self {
            min_length: 1,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        }
    }
}

/// Argon2id tuning parameters.
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    pub parallelism: u32,
    /// Digest length in bytes
    pub output_len: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
            output_len: 32,
        }
    }
}

impl Argon2Config {
    /// Low-cost profile so test suites stay fast.
    pub fn testing() -> Self {
        Self {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        }
    }

    fn to_params(&self) -> Result<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| IamError::internal(format!("Invalid Argon2 params: {}", e)))
    }
}

/// Argon2id password hashing with a configured composition policy.
pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl PasswordService {
    pub fn new(config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = config.to_params()?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
        })
    }

    /// Hash a password. Every call salts freshly, so identical inputs yield
    /// distinct PHC strings. Empty input hashes fine; composition rules are
    /// the callers' job via [`PasswordService::validate_policy`].
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IamError::internal(format!("Failed to hash password: {}", e)))?;

        debug!("password hashed");
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    ///
    /// Digest comparison is constant-time inside the argon2 crate. Any
    /// parse or derivation failure is reported as a mismatch, never as an
    /// error the caller must branch on.
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// True when a stored hash predates the current algorithm choice and
    /// should be re-derived on next successful login.
    pub fn needs_rehash(&self, encoded: &str) -> bool {
        match PasswordHash::new(encoded) {
            Ok(parsed) => parsed.algorithm != Algorithm::Argon2id.ident(),
            Err(_) => true,
        }
    }

    /// Apply the composition policy, mapping failures to a validation error.
    pub fn validate_policy(&self, password: &str) -> Result<()> {
        self.policy
            .validate(password)
            .map_err(|errors| IamError::validation(errors.join("; ")))
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }
}
