//! Vantage Core - Access control, session audit and action orchestration.
//!
//! This crate authenticates principals, gates every provider action on a
//! capability, audits each gated action exactly once and assembles provider
//! results into typed reports.

pub mod assistant;
pub mod audit;
pub mod auth;
pub mod capability;
pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod secret;
pub mod store;

pub use assistant::Assistant;
pub use capability::{Capability, CapabilitySet, InvalidCapability};
pub use config::{StoreBackendKind, VantageConfig};
pub use error::{Error, Result};
pub use gate::AuthorizationGate;
pub use secret::{CredentialDigest, Secret};

// Store exports
pub use store::{
    CredentialStore, JsonFileBackend, MemoryBackend, Principal, PrincipalBackend, SledBackend,
    StoreError,
};

// Session and audit exports
pub use audit::{
    AuditEntry, AuditError, AuditLog, AuditOutcome, AuditSink, FileAuditSink, MemoryAuditSink,
    NullAuditSink,
};
pub use auth::{AuthError, AuthenticationService, Session, SessionId};

// Orchestration exports
pub use orchestrator::{Action, ActionOrchestrator, DenialPolicy, OrchestratorError};
pub use provider::{
    FinancialProvider, FixtureProvider, ProviderError, ProviderPayload, ProviderResult,
    ScanningProvider,
};
pub use report::{Report, ReportAssembler, ReportError, ReportKind, ReportRequest, SlotOutcome};
