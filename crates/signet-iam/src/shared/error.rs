//! IAM Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IamError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate entity: {entity_type} with {field}={value}")]
    Duplicate {
        entity_type: String,
        field: String,
        value: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication required: {message}")]
    AuthenticationRequired { message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IamError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for the error family a transport layer maps to HTTP 401.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }
}

pub type Result<T> = std::result::Result<T, IamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_helpers_build_expected_variants() {
        let err = IamError::not_found("User", "abc");
        assert!(matches!(err, IamError::NotFound { .. }));
        assert_eq!(err.to_string(), "Entity not found: User with id abc");

        let err = IamError::duplicate("Principal", "externalId", "svc-1");
        assert_eq!(
            err.to_string(),
            "Duplicate entity: Principal with externalId=svc-1"
        );

        let err = IamError::authentication_required("token expired");
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn validation_is_not_an_authentication_failure() {
        assert!(!IamError::validation("weak password").is_authentication_failure());
    }
}
