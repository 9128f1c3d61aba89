//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use crate::types::DomainId;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Domain name not found
    #[error("Domain not found: {0}")]
    DomainNotFound(DomainId),

    /// Domain name already registered for monitoring
    #[error("Domain already exists: {0}")]
    DomainAlreadyExists(String),

    /// Another check currently holds the domain's execution lock
    #[error("A check is already running for domain {0}")]
    CheckInProgress(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The monitor has been shut down
    #[error("Monitor is shutting down")]
    ShuttingDown,
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::DomainNotFound(_)
            | Self::DomainAlreadyExists(_)
            | Self::CheckInProgress(_)
            | Self::ValidationError(_)
            | Self::ShuttingDown => true,
            Self::ConfigError(_)
            | Self::SerializationError(_)
            | Self::StorageError(_)
            | Self::NetworkError(_) => false,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_is_expected() {
        assert!(CoreError::CheckInProgress("example.fr".into()).is_expected());
        assert!(CoreError::DomainNotFound(7).is_expected());
    }

    #[test]
    fn storage_failure_is_not_expected() {
        assert!(!CoreError::StorageError("disk full".into()).is_expected());
        assert!(!CoreError::NetworkError("reset".into()).is_expected());
    }

    #[test]
    fn serializes_with_code_tag() {
        let json = serde_json::to_value(CoreError::DomainNotFound(3)).unwrap_or_default();
        assert_eq!(json["code"], "DomainNotFound");
        assert_eq!(json["details"], 3);
    }
}
