//! Principal records as persisted by a [`PrincipalBackend`](super::PrincipalBackend).

use super::error::{StoreError, StoreResult};
use crate::capability::CapabilitySet;
use crate::secret::CredentialDigest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum identifier length.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Persisted state for one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Salted one-way digest of the principal's secret.
    pub digest: CredentialDigest,
    /// Granted capabilities.
    #[serde(default)]
    pub capabilities: CapabilitySet,
    /// Last successful verification.
    #[serde(default)]
    pub last_authenticated: Option<DateTime<Utc>>,
}

/// The whole principal table, keyed by identifier.
pub type PrincipalTable = BTreeMap<String, PrincipalRecord>;

/// Read-only view of a principal without its credential digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Unique identifier.
    pub identifier: String,
    /// Granted capabilities.
    pub capabilities: CapabilitySet,
    /// Last successful verification.
    pub last_authenticated: Option<DateTime<Utc>>,
}

impl Principal {
    pub(crate) fn from_record(identifier: &str, record: &PrincipalRecord) -> Self {
        Self {
            identifier: identifier.to_string(),
            capabilities: record.capabilities.clone(),
            last_authenticated: record.last_authenticated,
        }
    }
}

/// Validate a principal identifier.
///
/// Identifiers are 1..=64 characters of ASCII letters, digits, `_`, `-`,
/// `.` or `@`.
pub fn validate_identifier(identifier: &str) -> StoreResult<()> {
    if identifier.is_empty() {
        return Err(StoreError::InvalidIdentifier(
            "identifier is empty".to_string(),
        ));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(StoreError::InvalidIdentifier(format!(
            "identifier exceeds {} characters",
            MAX_IDENTIFIER_LEN
        )));
    }
    if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
    {
        return Err(StoreError::InvalidIdentifier(format!(
            "identifier {:?} contains unsupported characters",
            identifier
        )));
    }
    Ok(())
}
