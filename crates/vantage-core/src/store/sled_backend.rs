//! Principal table persisted in a sled tree, one key per principal.

use super::backend::PrincipalBackend;
use super::error::StoreResult;
use super::principal::{PrincipalRecord, PrincipalTable};
use std::path::Path;

const PRINCIPAL_TREE_NAME: &[u8] = b"vantage:principals";

/// sled-backed principal table.
///
/// Saves are applied as a single batch, so a crash mid-save leaves either
/// the old table or the new one.
pub struct SledBackend {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledBackend {
    /// Open (or create) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Use an already opened database.
    pub fn from_db(db: sled::Db) -> StoreResult<Self> {
        let tree = db.open_tree(PRINCIPAL_TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Open a temporary database that is removed on drop.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn serialize_record(record: &PrincipalRecord) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }

    fn deserialize_record(bytes: &[u8]) -> StoreResult<PrincipalRecord> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl PrincipalBackend for SledBackend {
    fn load(&self) -> StoreResult<PrincipalTable> {
        let mut table = PrincipalTable::new();
        for result in self.tree.iter() {
            let (key, value) = result?;
            let identifier = String::from_utf8_lossy(&key).into_owned();
            table.insert(identifier, Self::deserialize_record(&value)?);
        }
        Ok(table)
    }

    fn save(&self, table: &PrincipalTable) -> StoreResult<()> {
        let mut batch = sled::Batch::default();

        for result in self.tree.iter().keys() {
            let key = result?;
            let identifier = String::from_utf8_lossy(&key);
            if !table.contains_key(identifier.as_ref()) {
                batch.remove(key);
            }
        }
        for (identifier, record) in table {
            batch.insert(identifier.as_bytes(), Self::serialize_record(record)?);
        }

        self.tree.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        "sled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use crate::secret::{CredentialDigest, Secret};

    fn record(caps: &[&str]) -> PrincipalRecord {
        PrincipalRecord {
            digest: CredentialDigest::generate(&Secret::from("pw")),
            capabilities: CapabilitySet::from_strings(caps).unwrap(),
            last_authenticated: None,
        }
    }

    #[test]
    fn test_empty_tree_loads_empty_table() {
        let backend = SledBackend::temporary().unwrap();
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_table() {
        let backend = SledBackend::temporary().unwrap();

        let mut table = PrincipalTable::new();
        table.insert("alice".to_string(), record(&["financial_analysis"]));
        table.insert("bob".to_string(), record(&[]));
        backend.save(&table).unwrap();
        assert_eq!(backend.load().unwrap(), table);

        table.remove("bob");
        backend.save(&table).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("alice"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("principals.db");

        let mut table = PrincipalTable::new();
        table.insert("carol".to_string(), record(&["network_scanning"]));
        {
            let backend = SledBackend::open(&path).unwrap();
            backend.save(&table).unwrap();
        }

        let backend = SledBackend::open(&path).unwrap();
        assert_eq!(backend.load().unwrap(), table);
    }
}
