//! Error types for security policy operations

use thiserror::Error;

use crate::domain::NetworkError;
use crate::provider::ProviderError;

/// Errors that can occur while calculating or applying security policies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Malformed request (protocol, action, IP, port, direction, empty fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unregistered resource kind, unresolvable IP or missing provider record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource kind lacks a capability required by the operation
    #[error("Capability error: {0}")]
    Capability(String),

    /// Remote provider call failed or was rejected
    #[error("Provider error: {0}")]
    Provider(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Apply pass finished with failed entries
    #[error("{failed} policies failed to apply, check the per-policy report")]
    PartialFailure { failed: usize },

    /// Apply failed and undoing the rules it had committed failed too
    #[error("{cause}; rollback failed: {failures}")]
    RollbackFailed {
        cause: Box<PolicyError>,
        failures: String,
    },

    /// Several independent errors collected from one calculation
    #[error("{0}")]
    Aggregate(String),
}

/// Result type for security policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

impl PolicyError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, PolicyError::NotFound(_))
    }

    /// Check if this error came from request validation
    pub fn is_validation(&self) -> bool {
        matches!(self, PolicyError::Validation(_))
    }

    /// Attach rollback failures to the error that triggered the rollback
    pub fn with_rollback_failures(self, failures: Vec<String>) -> Self {
        if failures.is_empty() {
            return self;
        }
        PolicyError::RollbackFailed {
            cause: Box::new(self),
            failures: failures.join("; "),
        }
    }

    /// Fold a list of errors into one, keeping every message
    pub fn aggregate(errors: Vec<PolicyError>) -> Option<PolicyError> {
        match errors.len() {
            0 => None,
            1 => errors.into_iter().next(),
            _ => Some(PolicyError::Aggregate(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
        }
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Serialization(err.to_string())
    }
}

impl From<NetworkError> for PolicyError {
    fn from(err: NetworkError) -> Self {
        PolicyError::Validation(err.to_string())
    }
}

impl From<ProviderError> for PolicyError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound { .. } => PolicyError::NotFound(err.to_string()),
            ProviderError::Timeout(msg) => PolicyError::Timeout(msg),
            other => PolicyError::Provider(other.to_string()),
        }
    }
}
