//! Session audit trail.
//!
//! Every gated action produces exactly one [`AuditEntry`]. The entry is
//! written to the process-wide [`AuditSink`] first and then appended to the
//! session's in-memory trail, both while holding the session's trail lock,
//! so per-session order is append order in both places. Order across
//! sessions is timestamp order only, on a best-effort basis.

mod entry;
mod redact;
mod sink;

pub use entry::{AuditEntry, AuditOutcome};
pub use redact::{redact, REDACTED};
pub use sink::{AuditError, AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink};

use crate::auth::Session;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Per-session trail storage, owned by [`Session`].
#[derive(Debug, Default)]
pub(crate) struct SessionTrail {
    entries: Vec<AuditEntry>,
    next_seq: u64,
}

impl SessionTrail {
    pub(crate) fn take(&mut self) -> Vec<AuditEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Append-only audit log.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    /// Create a log that mirrors entries to `sink`.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Log that keeps session trails only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullAuditSink))
    }

    /// Append a completed action.
    pub fn append(&self, session: &Session, action: &str, parameters: Value) -> AuditEntry {
        self.record(session, action, parameters, AuditOutcome::Completed)
    }

    /// Append an entry with an explicit outcome.
    ///
    /// A sink failure is reported through `tracing` and does not prevent the
    /// entry from reaching the session trail.
    pub fn record(
        &self,
        session: &Session,
        action: &str,
        parameters: Value,
        outcome: AuditOutcome,
    ) -> AuditEntry {
        let mut trail = session.trail();
        trail.next_seq += 1;

        let entry = AuditEntry {
            seq: trail.next_seq,
            session: session.id(),
            timestamp: Utc::now(),
            principal: session.principal().to_string(),
            action: action.to_string(),
            outcome,
            parameters: redact(parameters),
        };

        if let Err(e) = self.sink.record(&entry) {
            tracing::error!(
                session = %entry.session,
                seq = entry.seq,
                action,
                error = %e,
                "failed to write audit entry to sink"
            );
        }
        trail.entries.push(entry.clone());

        tracing::debug!(
            session = %entry.session,
            seq = entry.seq,
            principal = %entry.principal,
            action,
            outcome = %outcome,
            "audit entry appended"
        );
        entry
    }

    /// Snapshot of the session's trail in append order.
    pub fn entries(&self, session: &Session) -> Vec<AuditEntry> {
        session.trail().entries.clone()
    }

    /// Discard the session's in-memory trail.
    ///
    /// The sink is untouched and sequence numbers keep increasing.
    /// Returns the number of entries discarded.
    pub fn clear(&self, session: &Session) -> usize {
        let discarded = session.trail().take().len();
        tracing::info!(session = %session.id(), discarded, "session audit trail cleared");
        discarded
    }

    /// Flush the sink.
    pub fn flush(&self) -> Result<(), AuditError> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}
