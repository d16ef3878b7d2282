//! Crate-level error type.

use thiserror::Error;

/// Error returned when opening an [`Assistant`](crate::Assistant).
#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("audit error: {0}")]
    Audit(#[from] crate::audit::AuditError),

    #[error("auth error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    #[error("report error: {0}")]
    Report(#[from] crate::report::ReportError),

    #[error(transparent)]
    Orchestrator(#[from] crate::orchestrator::OrchestratorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
