use crate::store::StoreError;
use thiserror::Error;

/// Authentication error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier or wrong secret. The two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session expired")]
    SessionExpired,

    #[error("identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("credential store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidIdentifier(reason) => AuthError::InvalidIdentifier(reason),
            other => AuthError::Store(other),
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;
