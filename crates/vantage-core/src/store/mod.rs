//! Credential store.
//!
//! Durable mapping of principal identifier to credential digest, capability
//! set and last-authenticated timestamp. The table lives in memory behind a
//! mutex; every mutation runs load-modify-persist inside that one critical
//! section, and a failed persist rolls the in-memory change back so memory
//! never runs ahead of the durable snapshot.

mod backend;
mod error;
mod principal;
mod sled_backend;

pub use backend::{write_atomic, JsonFileBackend, MemoryBackend, PrincipalBackend};
pub use error::{StoreError, StoreResult};
pub use principal::{validate_identifier, Principal, PrincipalRecord, PrincipalTable};
pub use sled_backend::SledBackend;

use crate::capability::{Capability, CapabilitySet};
use crate::secret::{CredentialDigest, Secret};
use chrono::Utc;
use parking_lot::Mutex;

/// Principal table with an injectable persistence backend.
pub struct CredentialStore {
    backend: Box<dyn PrincipalBackend>,
    table: Mutex<PrincipalTable>,
    default_capabilities: CapabilitySet,
    /// Digest checked for unknown identifiers so that a miss costs the same
    /// as a wrong secret.
    decoy: CredentialDigest,
}

impl CredentialStore {
    /// Open a store over `backend` and load its table.
    pub fn open(backend: impl PrincipalBackend + 'static) -> StoreResult<Self> {
        let store = Self {
            backend: Box::new(backend),
            table: Mutex::new(PrincipalTable::new()),
            default_capabilities: CapabilitySet::new(),
            decoy: CredentialDigest::generate(&Secret::from("decoy")),
        };
        store.load()?;
        Ok(store)
    }

    /// Empty store backed by memory only.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            table: Mutex::new(PrincipalTable::new()),
            default_capabilities: CapabilitySet::new(),
            decoy: CredentialDigest::generate(&Secret::from("decoy")),
        }
    }

    /// Capabilities granted to newly registered principals.
    pub fn with_default_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.default_capabilities = capabilities;
        self
    }

    /// Replace the in-memory table with the persisted one.
    ///
    /// Returns the number of principals loaded.
    pub fn load(&self) -> StoreResult<usize> {
        let loaded = self.backend.load()?;
        let count = loaded.len();
        *self.table.lock() = loaded;
        tracing::debug!(backend = %self.backend.describe(), principals = count, "principal table loaded");
        Ok(count)
    }

    /// Persist the current table.
    pub fn save(&self) -> StoreResult<()> {
        let table = self.table.lock();
        self.backend.save(&table)
    }

    /// Register a new principal.
    ///
    /// Returns `false` if the identifier is already taken; the existing
    /// principal is left untouched. The existence check and the write happen
    /// under the same lock, so concurrent registrations of one identifier
    /// produce exactly one winner.
    pub fn register(&self, identifier: &str, secret: &Secret) -> StoreResult<bool> {
        validate_identifier(identifier)?;

        let mut table = self.table.lock();
        if table.contains_key(identifier) {
            return Ok(false);
        }

        table.insert(
            identifier.to_string(),
            PrincipalRecord {
                digest: CredentialDigest::generate(secret),
                capabilities: self.default_capabilities.clone(),
                last_authenticated: None,
            },
        );

        if let Err(e) = self.backend.save(&table) {
            table.remove(identifier);
            tracing::error!(identifier, error = %e, "failed to persist new principal");
            return Err(e);
        }

        tracing::info!(identifier, "principal registered");
        Ok(true)
    }

    /// Deterministic one-way digest of `secret` under `salt`.
    pub fn digest(secret: &Secret, salt: &[u8]) -> String {
        CredentialDigest::derive(secret, salt).as_str().to_string()
    }

    /// Verify a secret.
    ///
    /// On success the last-authenticated timestamp is updated and persisted.
    /// Unknown identifiers and wrong secrets both return `Ok(false)`.
    pub fn verify(&self, identifier: &str, secret: &Secret) -> StoreResult<bool> {
        let mut table = self.table.lock();

        let Some(record) = table.get_mut(identifier) else {
            let _ = self.decoy.verify(secret);
            return Ok(false);
        };
        if !record.digest.verify(secret) {
            return Ok(false);
        }

        let previous = record.last_authenticated.replace(Utc::now());
        if let Err(e) = self.backend.save(&table) {
            if let Some(record) = table.get_mut(identifier) {
                record.last_authenticated = previous;
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Capabilities held by `identifier`. Unknown identifiers hold none.
    pub fn capabilities_of(&self, identifier: &str) -> CapabilitySet {
        self.table
            .lock()
            .get(identifier)
            .map(|record| record.capabilities.clone())
            .unwrap_or_default()
    }

    /// Grant a capability, returning the new set.
    pub fn grant(&self, identifier: &str, capability: Capability) -> StoreResult<CapabilitySet> {
        let name = capability.to_string();
        let caps = self.replace_capabilities(identifier, |caps| caps.with(capability))?;
        tracing::info!(identifier, capability = %name, "capability granted");
        Ok(caps)
    }

    /// Revoke a capability, returning the new set.
    pub fn revoke(&self, identifier: &str, capability: &Capability) -> StoreResult<CapabilitySet> {
        let caps = self.replace_capabilities(identifier, |caps| caps.without(capability))?;
        tracing::info!(identifier, capability = %capability, "capability revoked");
        Ok(caps)
    }

    fn replace_capabilities(
        &self,
        identifier: &str,
        next: impl FnOnce(&CapabilitySet) -> CapabilitySet,
    ) -> StoreResult<CapabilitySet> {
        let mut table = self.table.lock();
        let record = table
            .get_mut(identifier)
            .ok_or_else(|| StoreError::UnknownPrincipal(identifier.to_string()))?;

        let updated = next(&record.capabilities);
        let previous = std::mem::replace(&mut record.capabilities, updated.clone());

        if let Err(e) = self.backend.save(&table) {
            if let Some(record) = table.get_mut(identifier) {
                record.capabilities = previous;
            }
            return Err(e);
        }
        Ok(updated)
    }

    /// Redacted view of one principal.
    pub fn principal(&self, identifier: &str) -> Option<Principal> {
        self.table
            .lock()
            .get(identifier)
            .map(|record| Principal::from_record(identifier, record))
    }

    /// All principals in identifier order.
    pub fn principals(&self) -> Vec<Principal> {
        self.table
            .lock()
            .iter()
            .map(|(id, record)| Principal::from_record(id, record))
            .collect()
    }

    /// All registered identifiers in order.
    pub fn identifiers(&self) -> Vec<String> {
        self.table.lock().keys().cloned().collect()
    }

    /// Number of registered principals.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Check if no principal is registered.
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_and_verify() {
        let store = CredentialStore::in_memory();
        assert!(store.register("alice", &Secret::from("pw123")).unwrap());

        assert!(store.verify("alice", &Secret::from("pw123")).unwrap());
        assert!(!store.verify("alice", &Secret::from("pw123x")).unwrap());
        assert!(!store.verify("mallory", &Secret::from("pw123")).unwrap());
    }

    #[test]
    fn test_duplicate_registration_keeps_first_principal() {
        let store = CredentialStore::in_memory();
        assert!(store.register("alice", &Secret::from("first")).unwrap());
        store.grant("alice", Capability::financial_analysis()).unwrap();

        assert!(!store.register("alice", &Secret::from("second")).unwrap());
        assert!(store.verify("alice", &Secret::from("first")).unwrap());
        assert!(!store.verify("alice", &Secret::from("second")).unwrap());
        assert!(store.capabilities_of("alice").has("financial_analysis"));
    }

    #[test]
    fn test_register_rejects_invalid_identifier() {
        let store = CredentialStore::in_memory();
        assert!(matches!(
            store.register("not valid", &Secret::from("pw")),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_default_capabilities_applied() {
        let store = CredentialStore::in_memory().with_default_capabilities(
            CapabilitySet::from_strings(&["domain_analysis"]).unwrap(),
        );
        store.register("bob", &Secret::from("pw")).unwrap();
        assert!(store.capabilities_of("bob").has("domain_analysis"));
    }

    #[test]
    fn test_unknown_identifier_has_no_capabilities() {
        let store = CredentialStore::in_memory();
        assert!(store.capabilities_of("ghost").is_empty());
    }

    #[test]
    fn test_verify_updates_last_authenticated() {
        let store = CredentialStore::in_memory();
        store.register("alice", &Secret::from("pw")).unwrap();
        assert!(store.principal("alice").unwrap().last_authenticated.is_none());

        store.verify("alice", &Secret::from("pw")).unwrap();
        assert!(store.principal("alice").unwrap().last_authenticated.is_some());
    }

    #[test]
    fn test_failed_verify_does_not_touch_timestamp() {
        let store = CredentialStore::in_memory();
        store.register("alice", &Secret::from("pw")).unwrap();
        store.verify("alice", &Secret::from("nope")).unwrap();
        assert!(store.principal("alice").unwrap().last_authenticated.is_none());
    }

    #[test]
    fn test_grant_and_revoke() {
        let store = CredentialStore::in_memory();
        store.register("alice", &Secret::from("pw")).unwrap();

        let caps = store.grant("alice", Capability::network_scanning()).unwrap();
        assert!(caps.has("network_scanning"));

        let caps = store.revoke("alice", &Capability::network_scanning()).unwrap();
        assert!(caps.is_empty());
        assert!(store.capabilities_of("alice").is_empty());

        assert!(matches!(
            store.grant("ghost", Capability::network_scanning()),
            Err(StoreError::UnknownPrincipal(_))
        ));
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::open(Arc::clone(&backend)).unwrap();
        store.register("alice", &Secret::from("pw")).unwrap();

        backend.set_read_only(true);

        assert!(matches!(
            store.register("bob", &Secret::from("pw")),
            Err(StoreError::ReadOnly)
        ));
        assert!(store.principal("bob").is_none());

        assert!(store.grant("alice", Capability::financial_analysis()).is_err());
        assert!(store.capabilities_of("alice").is_empty());

        assert!(store.verify("alice", &Secret::from("pw")).is_err());
        assert!(store.principal("alice").unwrap().last_authenticated.is_none());

        assert_eq!(backend.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_registration_has_one_winner() {
        let store = Arc::new(CredentialStore::in_memory());

        let wins: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        store
                            .register("bob", &Secret::new(format!("pw-{i}")))
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reload_from_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("principals.json");
        {
            let store = CredentialStore::open(JsonFileBackend::new(&path)).unwrap();
            store.register("alice", &Secret::from("pw123")).unwrap();
            store.grant("alice", Capability::domain_analysis()).unwrap();
        }

        let store = CredentialStore::open(JsonFileBackend::new(&path)).unwrap();
        assert_eq!(store.identifiers(), vec!["alice".to_string()]);
        assert!(store.verify("alice", &Secret::from("pw123")).unwrap());
        assert!(store.capabilities_of("alice").has("domain_analysis"));
    }

    #[test]
    fn test_digest_is_deterministic() {
        let secret = Secret::from("pw123");
        let a = CredentialStore::digest(&secret, b"salt");
        let b = CredentialStore::digest(&secret, b"salt");
        assert_eq!(a, b);
        assert_ne!(a, "pw123");
    }
}
