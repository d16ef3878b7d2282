//! Gated, audited dispatch of provider operations.
//!
//! A request moves `received -> authorized -> dispatched -> logged ->
//! returned`, or `received -> denied -> returned`. The provider is never
//! invoked before the gate passes, and every dispatched call produces
//! exactly one audit entry whatever the provider returns.

mod action;
mod error;

pub use action::Action;
pub use error::OrchestratorError;

use crate::audit::{AuditLog, AuditOutcome};
use crate::auth::Session;
use crate::capability::Capability;
use crate::gate::AuthorizationGate;
use crate::provider::{
    FinancialProvider, ProviderError, ProviderPayload, ProviderResult, ScanningProvider,
    Unconfigured,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What to do with actions refused by the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Append an entry with outcome `denied`.
    #[default]
    Record,
    /// Leave the trail untouched.
    Ignore,
}

impl FromStr for DenialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(DenialPolicy::Record),
            "ignore" => Ok(DenialPolicy::Ignore),
            other => Err(format!("unknown denial policy '{other}' (expected record or ignore)")),
        }
    }
}

/// Routes actions through the gate to providers and into the audit log.
pub struct ActionOrchestrator {
    gate: AuthorizationGate,
    audit: AuditLog,
    financial: Arc<dyn FinancialProvider>,
    scanning: Arc<dyn ScanningProvider>,
    denial_policy: DenialPolicy,
    provider_timeout: Option<Duration>,
}

impl ActionOrchestrator {
    /// Orchestrator with no providers configured.
    pub fn new(gate: AuthorizationGate, audit: AuditLog) -> Self {
        Self {
            gate,
            audit,
            financial: Arc::new(Unconfigured),
            scanning: Arc::new(Unconfigured),
            denial_policy: DenialPolicy::default(),
            provider_timeout: None,
        }
    }

    pub fn with_financial(mut self, provider: Arc<dyn FinancialProvider>) -> Self {
        self.financial = provider;
        self
    }

    pub fn with_scanning(mut self, provider: Arc<dyn ScanningProvider>) -> Self {
        self.scanning = provider;
        self
    }

    pub fn with_denial_policy(mut self, policy: DenialPolicy) -> Self {
        self.denial_policy = policy;
        self
    }

    /// Bound every provider call. Elapsed calls fail with
    /// [`ProviderError::Timeout`] and are audited like any provider error.
    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn denial_policy(&self) -> DenialPolicy {
        self.denial_policy
    }

    /// Run `call` if `session` holds `capability`.
    ///
    /// The outer `Result` is the gate's verdict; the inner one is whatever
    /// the provider returned. Expired sessions are refused without an audit
    /// entry. Denials are audited according to the [`DenialPolicy`].
    pub async fn dispatch<T, F, Fut>(
        &self,
        session: &Session,
        capability: &Capability,
        action: &str,
        parameters: Value,
        call: F,
    ) -> Result<Result<T, ProviderError>, OrchestratorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if let Err(refusal) = self.gate.require(session, capability) {
            if matches!(refusal, OrchestratorError::PermissionDenied { .. }) {
                tracing::warn!(
                    principal = session.principal(),
                    action,
                    capability = %capability,
                    "action denied"
                );
                if self.denial_policy == DenialPolicy::Record {
                    self.audit
                        .record(session, action, parameters, AuditOutcome::Denied);
                }
            }
            return Err(refusal);
        }

        session.touch();
        let started = Instant::now();
        let result = match self.provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(limit.as_millis() as u64)),
            },
            None => call().await,
        };

        let outcome = match &result {
            Ok(_) => AuditOutcome::Completed,
            Err(e) => {
                tracing::warn!(action, error = %e, "provider returned an error");
                AuditOutcome::ProviderError
            }
        };
        self.audit.record(session, action, parameters, outcome);

        tracing::info!(
            principal = session.principal(),
            action,
            outcome = %outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "action dispatched"
        );
        Ok(result)
    }

    /// Dispatch a typed [`Action`] to the provider that serves it.
    pub async fn execute(
        &self,
        session: &Session,
        action: &Action,
    ) -> Result<ProviderResult, OrchestratorError> {
        let capability = action.required_capability();
        let name = action.name();
        let parameters = action.parameters();

        match action {
            Action::AnalyzeTicker { ticker, period } => {
                self.dispatch(session, &capability, name, parameters, || async move {
                    self.financial
                        .analyze(ticker, period)
                        .await
                        .map(ProviderPayload::Analysis)
                })
                .await
            }
            Action::AnalyzePortfolio { tickers, weights } => {
                self.dispatch(session, &capability, name, parameters, || async move {
                    self.financial
                        .portfolio_analyze(tickers, weights)
                        .await
                        .map(ProviderPayload::Portfolio)
                })
                .await
            }
            Action::NetworkScan { target, ports } => {
                self.dispatch(session, &capability, name, parameters, || async move {
                    self.scanning
                        .network_scan(target, ports)
                        .await
                        .map(ProviderPayload::NetworkScan)
                })
                .await
            }
            Action::Whois { domain } => {
                self.dispatch(session, &capability, name, parameters, || async move {
                    self.scanning.whois(domain).await.map(ProviderPayload::Whois)
                })
                .await
            }
            Action::WebVulnerabilityScan { url } => {
                self.dispatch(session, &capability, name, parameters, || async move {
                    self.scanning
                        .web_vulnerability_scan(url)
                        .await
                        .map(ProviderPayload::WebScan)
                })
                .await
            }
        }
    }
}

impl std::fmt::Debug for ActionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionOrchestrator")
            .field("denial_policy", &self.denial_policy)
            .field("provider_timeout", &self.provider_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticationService;
    use crate::provider::{FixtureProvider, FixtureSet};
    use crate::secret::Secret;
    use crate::store::CredentialStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        auth: AuthenticationService,
        orchestrator: ActionOrchestrator,
        provider: Arc<FixtureProvider>,
    }

    fn harness(policy: DenialPolicy) -> Harness {
        let store = Arc::new(CredentialStore::in_memory());
        let provider = Arc::new(FixtureProvider::new(FixtureSet::default()));
        let orchestrator =
            ActionOrchestrator::new(AuthorizationGate::new(store.clone()), AuditLog::in_memory())
                .with_financial(provider.clone())
                .with_scanning(provider.clone())
                .with_denial_policy(policy);
        let auth = AuthenticationService::new(store);
        auth.register("alice", &Secret::from("pw123")).unwrap();
        Harness { auth, orchestrator, provider }
    }

    fn whois() -> Action {
        Action::Whois { domain: "example.com".to_string() }
    }

    #[tokio::test]
    async fn test_denied_action_never_reaches_provider() {
        let h = harness(DenialPolicy::Record);
        let session = h.auth.login("alice", &Secret::from("pw123")).unwrap();

        let err = h.orchestrator.execute(&session, &whois()).await.unwrap_err();
        assert_eq!(
            err,
            OrchestratorError::PermissionDenied { capability: Capability::domain_analysis() }
        );
        assert_eq!(h.provider.calls(), 0);

        let entries = h.orchestrator.audit().entries(&session);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, AuditOutcome::Denied);
    }

    #[tokio::test]
    async fn test_ignore_policy_writes_nothing() {
        let h = harness(DenialPolicy::Ignore);
        let session = h.auth.login("alice", &Secret::from("pw123")).unwrap();

        assert!(h.orchestrator.execute(&session, &whois()).await.is_err());
        assert!(h.orchestrator.audit().entries(&session).is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_audited_once() {
        let h = harness(DenialPolicy::Record);
        h.auth.store().grant("alice", Capability::domain_analysis()).unwrap();
        let session = h.auth.login("alice", &Secret::from("pw123")).unwrap();

        let result = h.orchestrator.execute(&session, &whois()).await.unwrap();
        assert!(matches!(result, Err(ProviderError::NoData(_))));
        assert_eq!(h.provider.calls(), 1);

        let entries = h.orchestrator.audit().entries(&session);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "whois");
        assert_eq!(entries[0].outcome, AuditOutcome::ProviderError);
        assert_eq!(entries[0].parameters["domain"], "example.com");
    }

    #[tokio::test]
    async fn test_expired_session_is_not_audited() {
        let h = harness(DenialPolicy::Record);
        h.auth.store().grant("alice", Capability::domain_analysis()).unwrap();
        let session = h.auth.login("alice", &Secret::from("pw123")).unwrap();
        h.auth.logout(&session).unwrap();

        let err = h.orchestrator.execute(&session, &whois()).await.unwrap_err();
        assert_eq!(err, OrchestratorError::SessionExpired);
        assert_eq!(h.provider.calls(), 0);
        assert!(h.orchestrator.audit().entries(&session).is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_invokes_closure_once() {
        let h = harness(DenialPolicy::Record);
        h.auth.store().grant("alice", Capability::network_scanning()).unwrap();
        let session = h.auth.login("alice", &Secret::from("pw123")).unwrap();
        let calls = AtomicUsize::new(0);

        let result = h
            .orchestrator
            .dispatch(
                &session,
                &Capability::network_scanning(),
                "custom",
                serde_json::json!({}),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ProviderError>(7)
                },
            )
            .await
            .unwrap();

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.orchestrator.audit().entries(&session)[0].outcome, AuditOutcome::Completed);
    }

    #[tokio::test]
    async fn test_timeout_is_a_provider_error() {
        let store = Arc::new(CredentialStore::in_memory());
        let slow = Arc::new(
            FixtureProvider::new(FixtureSet::default()).with_latency(Duration::from_millis(200)),
        );
        let orchestrator =
            ActionOrchestrator::new(AuthorizationGate::new(store.clone()), AuditLog::in_memory())
                .with_scanning(slow)
                .with_provider_timeout(Some(Duration::from_millis(10)));
        let auth = AuthenticationService::new(store);
        auth.register("alice", &Secret::from("pw123")).unwrap();
        auth.store().grant("alice", Capability::domain_analysis()).unwrap();
        let session = auth.login("alice", &Secret::from("pw123")).unwrap();

        let result = orchestrator.execute(&session, &whois()).await.unwrap();
        assert_eq!(result, Err(ProviderError::Timeout(10)));
        assert_eq!(
            orchestrator.audit().entries(&session)[0].outcome,
            AuditOutcome::ProviderError
        );
    }

    #[test]
    fn test_denial_policy_parse() {
        assert_eq!("Record".parse::<DenialPolicy>().unwrap(), DenialPolicy::Record);
        assert_eq!("ignore".parse::<DenialPolicy>().unwrap(), DenialPolicy::Ignore);
        assert!("drop".parse::<DenialPolicy>().is_err());
    }
}
