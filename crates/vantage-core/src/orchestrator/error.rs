//! Orchestration error types.

use crate::capability::Capability;
use thiserror::Error;

/// Why a gated action never reached its provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// The principal lacks the required capability.
    #[error("permission denied: requires capability '{capability}'")]
    PermissionDenied {
        /// Capability the action requires.
        capability: Capability,
    },

    /// The session was logged out or idled out.
    #[error("session expired")]
    SessionExpired,
}
