//! Durable backends for the principal table.

use super::error::{StoreError, StoreResult};
use super::principal::PrincipalTable;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Explicit load/save lifecycle for the principal table.
pub trait PrincipalBackend: Send + Sync {
    /// Read the persisted table. A missing table is empty, not an error.
    fn load(&self) -> StoreResult<PrincipalTable>;

    /// Persist the whole table atomically.
    ///
    /// On error the previously persisted snapshot must still be readable.
    fn save(&self, table: &PrincipalTable) -> StoreResult<()>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

impl<T: PrincipalBackend + ?Sized> PrincipalBackend for Arc<T> {
    fn load(&self) -> StoreResult<PrincipalTable> {
        (**self).load()
    }

    fn save(&self, table: &PrincipalTable) -> StoreResult<()> {
        (**self).save(table)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Pretty-printed JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrincipalBackend for JsonFileBackend {
    fn load(&self) -> StoreResult<PrincipalTable> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PrincipalTable::new())
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(PrincipalTable::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, table: &PrincipalTable) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(table)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// In-memory backend for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    table: Mutex<PrincipalTable>,
    read_only: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse (or accept again) all subsequent saves.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Copy of the last saved table.
    pub fn snapshot(&self) -> PrincipalTable {
        self.table.lock().clone()
    }
}

impl PrincipalBackend for MemoryBackend {
    fn load(&self) -> StoreResult<PrincipalTable> {
        Ok(self.table.lock().clone())
    }

    fn save(&self, table: &PrincipalTable) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        *self.table.lock() = table.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Write `bytes` to `path` through a temp file in the same directory.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let temp = tempfile::NamedTempFile::new_in(&parent)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(temp.path(), perms);
    }

    {
        let mut file = temp.as_file();
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
