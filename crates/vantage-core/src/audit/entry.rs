//! Audit entries.

use crate::auth::SessionId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a gated action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Provider ran and returned data.
    Completed,
    /// Provider ran and reported an error. Still a completed action.
    ProviderError,
    /// Authorization failed; the provider was never invoked.
    Denied,
}

impl AuditOutcome {
    /// Whether the provider was invoked.
    pub fn dispatched(&self) -> bool {
        !matches!(self, AuditOutcome::Denied)
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Completed => write!(f, "completed"),
            AuditOutcome::ProviderError => write!(f, "provider_error"),
            AuditOutcome::Denied => write!(f, "denied"),
        }
    }
}

/// One gated action. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position within the session, starting at 1.
    pub seq: u64,
    /// Session that performed the action.
    pub session: SessionId,
    /// Time the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Principal identifier.
    pub principal: String,
    /// Action name, e.g. `analyze_ticker`.
    pub action: String,
    /// Outcome of the action.
    pub outcome: AuditOutcome,
    /// Redacted parameter snapshot.
    pub parameters: serde_json::Value,
}

impl AuditEntry {
    /// Format the entry as a human-readable log line.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} session={} seq={} principal={} action={} outcome={} params={}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.session,
            self.seq,
            self.principal,
            self.action,
            self.outcome,
            self.parameters
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(outcome: AuditOutcome) -> AuditEntry {
        AuditEntry {
            seq: 3,
            session: SessionId::new(),
            timestamp: Utc::now(),
            principal: "alice".to_string(),
            action: "whois".to_string(),
            outcome,
            parameters: json!({ "domain": "example.com" }),
        }
    }

    #[test]
    fn test_log_line() {
        let line = entry(AuditOutcome::Completed).to_log_line();
        assert!(line.contains("principal=alice"));
        assert!(line.contains("action=whois"));
        assert!(line.contains("outcome=completed"));
        assert!(line.contains("seq=3"));
        assert!(line.contains("example.com"));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(entry(AuditOutcome::ProviderError)).unwrap();
        assert_eq!(json["outcome"], "provider_error");
    }

    #[test]
    fn test_denied_is_not_dispatched() {
        assert!(AuditOutcome::Completed.dispatched());
        assert!(AuditOutcome::ProviderError.dispatched());
        assert!(!AuditOutcome::Denied.dispatched());
    }
}
