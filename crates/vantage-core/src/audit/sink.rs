//! Durable audit sinks.

use super::entry::AuditEntry;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Audit sink error.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Writing to the sink failed.
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry could not be encoded.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for audit sink backends.
///
/// Sinks are append-only: nothing in this crate rewrites or truncates a sink.
pub trait AuditSink: Send + Sync {
    /// Record one entry.
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Flush any buffered entries to durable storage.
    fn flush(&self) -> Result<(), AuditError>;
}

/// Append-only JSON-lines file.
///
/// Each entry is written and flushed before `record` returns.
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open (or create) the log at `path` in append mode.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back from a log file.
    pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.file.lock().sync_data()?;
        Ok(())
    }
}

/// In-memory audit sink for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    /// Create a new memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Get entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// No-op audit sink that discards all entries.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}
