//! Top-level wiring of store, authentication, gate, audit and providers.

use crate::audit::{AuditLog, AuditSink, FileAuditSink, NullAuditSink};
use crate::auth::{AuthenticationService, Session};
use crate::config::{StoreBackendKind, VantageConfig};
use crate::error::Result;
use crate::gate::AuthorizationGate;
use crate::orchestrator::{Action, ActionOrchestrator, OrchestratorError};
use crate::provider::{FinancialProvider, ProviderResult, ScanningProvider};
use crate::report::{Report, ReportAssembler, ReportResult};
use crate::store::{CredentialStore, JsonFileBackend, SledBackend};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fully wired assistant.
pub struct Assistant {
    config: VantageConfig,
    auth: AuthenticationService,
    orchestrator: Arc<ActionOrchestrator>,
    reports: ReportAssembler,
}

impl Assistant {
    /// Open the store and audit log described by `config`.
    pub fn open(
        config: VantageConfig,
        financial: Arc<dyn FinancialProvider>,
        scanning: Arc<dyn ScanningProvider>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let store = match config.backend {
            StoreBackendKind::Json => CredentialStore::open(JsonFileBackend::new(config.store_path()))?,
            StoreBackendKind::Sled => CredentialStore::open(SledBackend::open(config.store_path())?)?,
        };
        let sink = FileAuditSink::open(config.audit_log_path())?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            backend = %config.backend,
            principals = store.len(),
            "assistant opened"
        );
        Ok(Self::assemble(config, store, Arc::new(sink), financial, scanning))
    }

    /// Assistant with a memory-only store and no durable audit sink.
    pub fn in_memory(
        config: VantageConfig,
        financial: Arc<dyn FinancialProvider>,
        scanning: Arc<dyn ScanningProvider>,
    ) -> Self {
        Self::assemble(
            config,
            CredentialStore::in_memory(),
            Arc::new(NullAuditSink),
            financial,
            scanning,
        )
    }

    fn assemble(
        config: VantageConfig,
        store: CredentialStore,
        sink: Arc<dyn AuditSink>,
        financial: Arc<dyn FinancialProvider>,
        scanning: Arc<dyn ScanningProvider>,
    ) -> Self {
        let store = Arc::new(store.with_default_capabilities(config.default_capabilities.clone()));
        let auth = AuthenticationService::new(store.clone()).with_session_timeout(config.session_timeout);

        let orchestrator = Arc::new(
            ActionOrchestrator::new(AuthorizationGate::new(store), AuditLog::new(sink))
                .with_financial(financial)
                .with_scanning(scanning)
                .with_denial_policy(config.denial_policy)
                .with_provider_timeout(config.provider_timeout),
        );
        let reports = ReportAssembler::new(orchestrator.clone());

        Self {
            config,
            auth,
            orchestrator,
            reports,
        }
    }

    pub fn config(&self) -> &VantageConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.auth.store()
    }

    pub fn auth(&self) -> &AuthenticationService {
        &self.auth
    }

    pub fn orchestrator(&self) -> &ActionOrchestrator {
        &self.orchestrator
    }

    pub fn audit(&self) -> &AuditLog {
        self.orchestrator.audit()
    }

    pub fn reports(&self) -> &ReportAssembler {
        &self.reports
    }

    /// Run one gated action.
    pub async fn execute(
        &self,
        session: &Session,
        action: &Action,
    ) -> std::result::Result<ProviderResult, OrchestratorError> {
        self.orchestrator.execute(session, action).await
    }

    /// Build a report of kind `type_tag`.
    pub async fn build_report(
        &self,
        type_tag: &str,
        parameters: &BTreeMap<String, String>,
        session: &Session,
    ) -> ReportResult<Report> {
        self.reports.build(type_tag, parameters, session).await
    }

    /// Flush the audit sink.
    pub fn shutdown(&self) -> Result<()> {
        self.audit().flush()?;
        tracing::info!(active_sessions = self.auth.active_sessions(), "assistant shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
