//! Login sessions.

use crate::audit::{AuditEntry, SessionTrail};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated session.
///
/// Refers to its principal by identifier only; capabilities are looked up
/// in the credential store whenever they are needed. Once expired a session
/// never becomes active again.
pub struct Session {
    id: SessionId,
    principal: String,
    created_at: DateTime<Utc>,
    last_activity: AtomicU64,
    idle_timeout: Option<Duration>,
    active: AtomicBool,
    closed: AtomicBool,
    trail: Mutex<SessionTrail>,
}

impl Session {
    pub(crate) fn new(principal: &str, idle_timeout: Option<Duration>) -> Self {
        Self {
            id: SessionId::new(),
            principal: principal.to_string(),
            created_at: Utc::now(),
            last_activity: AtomicU64::new(now_millis()),
            idle_timeout,
            active: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            trail: Mutex::new(SessionTrail::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Identifier of the authenticated principal.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the session can still be used.
    ///
    /// False after logout, or once the idle timeout has elapsed since the
    /// last gated action.
    pub fn is_active(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        if self.is_idle_expired() {
            self.active.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Record activity, pushing back the idle deadline.
    pub fn touch(&self) {
        self.last_activity.store(now_millis(), Ordering::SeqCst);
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        let last = self.last_activity.load(Ordering::SeqCst);
        Duration::from_millis(now_millis().saturating_sub(last))
    }

    fn is_idle_expired(&self) -> bool {
        match self.idle_timeout {
            Some(timeout) => self.idle_for() > timeout,
            None => false,
        }
    }

    /// Close the session for good. Returns `false` if it was already closed.
    ///
    /// An idle-expired session can still be closed once, so its trail is
    /// released through logout.
    pub(crate) fn close(&self) -> bool {
        self.active.store(false, Ordering::SeqCst);
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn trail(&self) -> MutexGuard<'_, SessionTrail> {
        self.trail.lock()
    }

    /// Remove and return the whole in-memory trail.
    pub(crate) fn take_trail(&self) -> Vec<AuditEntry> {
        self.trail.lock().take()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("principal", &self.principal)
            .field("created_at", &self.created_at)
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active() {
        let session = Session::new("alice", None);
        assert!(session.is_active());
        assert_eq!(session.principal(), "alice");
    }

    #[test]
    fn test_close_is_permanent() {
        let session = Session::new("alice", None);
        assert!(session.close());
        assert!(!session.close());
        session.touch();
        assert!(!session.is_active());
    }

    #[test]
    fn test_idle_timeout() {
        let session = Session::new("alice", Some(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!session.is_active());

        session.touch();
        assert!(!session.is_active());
    }

    #[test]
    fn test_idle_expired_session_can_be_closed_once() {
        let session = Session::new("alice", Some(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!session.is_active());
        assert!(session.close());
        assert!(!session.close());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
