//! Typed reports assembled from orchestrated dispatches.

mod error;
mod request;

pub use error::{ReportError, ReportResult};
pub use request::{
    FinancialReportRequest, ReportKind, ReportRequest, SecurityCheck, SecurityReportRequest,
    DEFAULT_PERIOD, DEFAULT_PORTS,
};

use crate::auth::Session;
use crate::capability::Capability;
use crate::orchestrator::{Action, ActionOrchestrator, OrchestratorError};
use crate::provider::{ProviderError, ProviderPayload};
use crate::store::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How one sub-request ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotOutcome {
    Completed { payload: ProviderPayload },
    Failed { error: ProviderError },
    /// The principal lacked the capability; the provider was not called.
    Denied { capability: Capability },
}

/// One sub-request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSlot {
    pub request: Action,
    pub outcome: SlotOutcome,
}

/// A rendered file attached to a report, e.g. a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

/// Slot counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub completed: usize,
    pub failed: usize,
    pub denied: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} denied",
            self.completed, self.failed, self.denied
        )
    }
}

/// An assembled report. Held in memory until explicitly persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub built_at: DateTime<Utc>,
    pub parameters: BTreeMap<String, String>,
    /// One slot per sub-request, in dispatch order.
    pub results: Vec<ReportSlot>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Report {
    /// Attach a rendered artifact.
    pub fn with_artifact(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(Artifact {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    pub fn summary(&self) -> ReportSummary {
        self.results
            .iter()
            .fold(ReportSummary::default(), |mut summary, slot| {
                match slot.outcome {
                    SlotOutcome::Completed { .. } => summary.completed += 1,
                    SlotOutcome::Failed { .. } => summary.failed += 1,
                    SlotOutcome::Denied { .. } => summary.denied += 1,
                }
                summary
            })
    }

    /// Write the report as pretty JSON. The destination is replaced
    /// atomically; on error any previous file there is left intact.
    pub fn persist(&self, destination: impl AsRef<Path>) -> ReportResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(destination.as_ref(), &bytes)?;
        tracing::info!(
            kind = %self.kind,
            path = %destination.as_ref().display(),
            "report saved"
        );
        Ok(())
    }

    /// Read a report written by [`persist`](Self::persist).
    pub fn load(path: impl AsRef<Path>) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Builds reports by dispatching each sub-request through the orchestrator.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    orchestrator: Arc<ActionOrchestrator>,
}

impl ReportAssembler {
    pub fn new(orchestrator: Arc<ActionOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Validate `parameters` for `type_tag` and build the report.
    ///
    /// Nothing is dispatched if validation fails.
    pub async fn build(
        &self,
        type_tag: &str,
        parameters: &BTreeMap<String, String>,
        session: &Session,
    ) -> ReportResult<Report> {
        let request = ReportRequest::from_parameters(type_tag, parameters)?;
        self.build_request(&request, session).await
    }

    /// Build a report from an already validated request.
    ///
    /// Provider failures and denials are recorded per slot and the build
    /// continues; an expired session aborts it.
    pub async fn build_request(
        &self,
        request: &ReportRequest,
        session: &Session,
    ) -> ReportResult<Report> {
        if !session.is_active() {
            return Err(ReportError::Session(OrchestratorError::SessionExpired));
        }

        let actions = request.actions();
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let outcome = match self.orchestrator.execute(session, &action).await {
                Ok(Ok(payload)) => SlotOutcome::Completed { payload },
                Ok(Err(error)) => SlotOutcome::Failed { error },
                Err(OrchestratorError::PermissionDenied { capability }) => {
                    SlotOutcome::Denied { capability }
                }
                Err(e @ OrchestratorError::SessionExpired) => return Err(ReportError::Session(e)),
            };
            results.push(ReportSlot {
                request: action,
                outcome,
            });
        }

        let report = Report {
            kind: request.kind(),
            built_at: Utc::now(),
            parameters: request.parameters(),
            results,
            artifacts: Vec::new(),
        };
        tracing::info!(
            kind = %report.kind,
            principal = session.principal(),
            summary = %report.summary(),
            "report built"
        );
        Ok(report)
    }
}
