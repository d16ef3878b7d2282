use crate::orchestrator::OrchestratorError;
use thiserror::Error;

/// Report construction and persistence errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A required parameter was absent or blank.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("unknown report type: {0}")]
    UnknownReportType(String),

    /// The session ended before or during the build.
    #[error("report aborted: {0}")]
    Session(OrchestratorError),

    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ReportError::InvalidParameter {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for report operations.
pub type ReportResult<T> = std::result::Result<T, ReportError>;
