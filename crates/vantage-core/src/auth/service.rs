//! Registration, login and logout.

use super::error::{AuthError, AuthResult};
use super::session::{Session, SessionId};
use crate::audit::AuditEntry;
use crate::secret::Secret;
use crate::store::CredentialStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Issues and tracks sessions for principals in a [`CredentialStore`].
pub struct AuthenticationService {
    store: Arc<CredentialStore>,
    sessions: DashMap<SessionId, Arc<Session>>,
    session_timeout: Option<Duration>,
}

impl AuthenticationService {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            session_timeout: None,
        }
    }

    /// Expire sessions idle for longer than `timeout`.
    pub fn with_session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Register a principal. Does not log it in.
    pub fn register(&self, identifier: &str, secret: &Secret) -> AuthResult<()> {
        if self.store.register(identifier, secret)? {
            Ok(())
        } else {
            tracing::info!(identifier, "registration rejected: identifier taken");
            Err(AuthError::DuplicateIdentifier(identifier.to_string()))
        }
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown identifiers and wrong secrets fail identically.
    pub fn login(&self, identifier: &str, secret: &Secret) -> AuthResult<Arc<Session>> {
        if !self.store.verify(identifier, secret)? {
            tracing::warn!(identifier, "authentication failed");
            return Err(AuthError::InvalidCredentials);
        }

        let session = Arc::new(Session::new(identifier, self.session_timeout));
        self.sessions.insert(session.id(), session.clone());
        tracing::info!(identifier, session = %session.id(), "session opened");
        Ok(session)
    }

    /// Close a session and hand its audit trail to the caller.
    ///
    /// A session that idled out is still closed here and its trail returned.
    /// Every later use of the session, including a second logout, fails with
    /// `SessionExpired`.
    pub fn logout(&self, session: &Session) -> AuthResult<Vec<AuditEntry>> {
        self.sessions.remove(&session.id());

        if !session.close() {
            return Err(AuthError::SessionExpired);
        }

        let trail = session.take_trail();
        tracing::info!(
            identifier = session.principal(),
            session = %session.id(),
            entries = trail.len(),
            "session closed"
        );
        Ok(trail)
    }

    /// Whether `session` was issued here and is still usable.
    pub fn is_active(&self, session: &Session) -> bool {
        self.sessions.contains_key(&session.id()) && session.is_active()
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.iter().filter(|entry| entry.value().is_active()).count()
    }

    /// Drop idle-expired sessions from the registry.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_active());
        let cleaned = before - self.sessions.len();
        if cleaned > 0 {
            tracing::info!("Cleaned up {} expired sessions", cleaned);
        }
        cleaned
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }
}
