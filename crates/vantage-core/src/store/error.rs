//! Credential store error types.

use crate::capability::InvalidCapability;
use thiserror::Error;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while loading or saving the principal table.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// sled backend error.
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    /// The persisted table could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Operation targeted an identifier that is not registered.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// Capability name failed validation.
    #[error(transparent)]
    InvalidCapability(#[from] InvalidCapability),

    /// Backend refuses writes.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UnknownPrincipal("alice".to_string());
        assert_eq!(err.to_string(), "unknown principal: alice");

        let err = StoreError::from(InvalidCapability("bad".to_string()));
        assert!(err.to_string().contains("invalid capability format"));
    }
}
