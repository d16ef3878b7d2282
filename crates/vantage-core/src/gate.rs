//! Capability gate.
//!
//! Capabilities are read from the credential store on every check, so
//! grants and revocations apply to sessions that are already open.

use crate::auth::Session;
use crate::capability::Capability;
use crate::orchestrator::OrchestratorError;
use crate::store::CredentialStore;
use std::sync::Arc;

/// Decides whether a session may exercise a capability.
#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<CredentialStore>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// True iff the session is active and its principal holds `capability`.
    pub fn check(&self, session: &Session, capability: &Capability) -> bool {
        session.is_active() && self.store.capabilities_of(session.principal()).contains(capability)
    }

    /// Like [`check`](Self::check), but says why access was refused.
    pub fn require(&self, session: &Session, capability: &Capability) -> Result<(), OrchestratorError> {
        if !session.is_active() {
            return Err(OrchestratorError::SessionExpired);
        }
        if !self.store.capabilities_of(session.principal()).contains(capability) {
            tracing::debug!(
                principal = session.principal(),
                capability = %capability,
                "capability check failed"
            );
            return Err(OrchestratorError::PermissionDenied {
                capability: capability.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticationService;
    use crate::secret::Secret;

    fn setup() -> (AuthenticationService, AuthorizationGate) {
        let store = Arc::new(CredentialStore::in_memory());
        let gate = AuthorizationGate::new(store.clone());
        let auth = AuthenticationService::new(store);
        auth.register("alice", &Secret::from("pw123")).unwrap();
        (auth, gate)
    }

    #[test]
    fn test_new_principal_has_no_capabilities() {
        let (auth, gate) = setup();
        let session = auth.login("alice", &Secret::from("pw123")).unwrap();
        for name in Capability::WELL_KNOWN {
            let cap: Capability = name.parse().unwrap();
            assert!(!gate.check(&session, &cap));
        }
    }

    #[test]
    fn test_grant_applies_to_live_session() {
        let (auth, gate) = setup();
        let session = auth.login("alice", &Secret::from("pw123")).unwrap();
        let cap = Capability::financial_analysis();

        assert!(!gate.check(&session, &cap));
        auth.store().grant("alice", cap.clone()).unwrap();
        assert!(gate.check(&session, &cap));
        assert!(!gate.check(&session, &Capability::network_scanning()));

        auth.store().revoke("alice", &cap).unwrap();
        assert!(!gate.check(&session, &cap));
    }

    #[test]
    fn test_expired_session_is_denied() {
        let (auth, gate) = setup();
        auth.store().grant("alice", Capability::domain_analysis()).unwrap();
        let session = auth.login("alice", &Secret::from("pw123")).unwrap();
        auth.logout(&session).unwrap();

        assert!(!gate.check(&session, &Capability::domain_analysis()));
        assert_eq!(
            gate.require(&session, &Capability::domain_analysis()),
            Err(OrchestratorError::SessionExpired)
        );
    }

    #[test]
    fn test_require_reports_missing_capability() {
        let (auth, gate) = setup();
        let session = auth.login("alice", &Secret::from("pw123")).unwrap();
        assert_eq!(
            gate.require(&session, &Capability::vulnerability_scanning()),
            Err(OrchestratorError::PermissionDenied {
                capability: Capability::vulnerability_scanning()
            })
        );
    }
}
