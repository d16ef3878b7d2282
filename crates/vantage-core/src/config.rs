//! Assistant configuration.

use crate::capability::CapabilitySet;
use crate::orchestrator::DenialPolicy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "./vantage-data";

/// Default provider timeout in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// File name of the JSON principal table inside the data directory.
pub const PRINCIPALS_FILE: &str = "principals.json";

/// Directory name of the sled principal table inside the data directory.
pub const PRINCIPALS_SLED_DIR: &str = "principals.sled";

/// File name of the audit log inside the data directory.
pub const AUDIT_LOG_FILE: &str = "audit.log";

/// Persistence backend for the principal table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackendKind {
    /// Pretty-printed JSON file.
    #[default]
    Json,
    /// Embedded sled database.
    Sled,
}

impl fmt::Display for StoreBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackendKind::Json => write!(f, "json"),
            StoreBackendKind::Sled => write!(f, "sled"),
        }
    }
}

impl FromStr for StoreBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackendKind::Json),
            "sled" => Ok(StoreBackendKind::Sled),
            other => Err(format!("unknown store backend '{other}' (expected json or sled)")),
        }
    }
}

/// Vantage configuration.
#[derive(Debug, Clone)]
pub struct VantageConfig {
    /// Directory holding the principal table, audit log and reports.
    pub data_dir: PathBuf,

    /// Principal table backend.
    pub backend: StoreBackendKind,

    /// Audit log path. Defaults to `audit.log` in the data directory.
    pub audit_path: Option<PathBuf>,

    /// Capabilities granted to newly registered principals.
    pub default_capabilities: CapabilitySet,

    /// Whether denied actions are audited.
    pub denial_policy: DenialPolicy,

    /// Bound on each provider call. None waits indefinitely.
    pub provider_timeout: Option<Duration>,

    /// Idle time after which a session expires. None disables expiry.
    pub session_timeout: Option<Duration>,
}

impl VantageConfig {
    /// Create a configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend: StoreBackendKind::default(),
            audit_path: None,
            default_capabilities: CapabilitySet::new(),
            denial_policy: DenialPolicy::default(),
            provider_timeout: Some(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS)),
            session_timeout: None,
        }
    }

    pub fn with_backend(mut self, backend: StoreBackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_path = Some(path.into());
        self
    }

    pub fn with_default_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.default_capabilities = capabilities;
        self
    }

    pub fn with_denial_policy(mut self, policy: DenialPolicy) -> Self {
        self.denial_policy = policy;
        self
    }

    /// Set the provider timeout.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    /// Let provider calls run without a bound.
    pub fn without_provider_timeout(mut self) -> Self {
        self.provider_timeout = None;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Path of the principal table for the configured backend.
    pub fn store_path(&self) -> PathBuf {
        match self.backend {
            StoreBackendKind::Json => self.data_dir.join(PRINCIPALS_FILE),
            StoreBackendKind::Sled => self.data_dir.join(PRINCIPALS_SLED_DIR),
        }
    }

    /// Effective audit log path.
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(AUDIT_LOG_FILE))
    }

    /// Default directory for saved reports.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Where a report saved as `destination` is written.
    ///
    /// A bare file name lands in [`reports_dir`](Self::reports_dir); any
    /// path with a directory component is used as given.
    pub fn report_path(&self, destination: &Path) -> PathBuf {
        match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => destination.to_path_buf(),
            _ => self.reports_dir().join(destination),
        }
    }
}

impl Default for VantageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
