//! Secrets and one-way credential digests.
//!
//! A [`Secret`] holds plaintext only for as long as it takes to derive or
//! verify a [`CredentialDigest`]; its buffer is zeroized on drop and its
//! `Debug` output is redacted. Digests are salted, stretched BLAKE3 hashes
//! encoded as `blake3$<rounds>$<salt-hex>$<hash-hex>`.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Scheme tag at the start of every digest string.
pub const DIGEST_SCHEME: &str = "blake3";

/// Key-derivation context for credential digests.
const DIGEST_CONTEXT: &str = "vantage 2026-01 credential digest v1";

/// Stretching rounds applied after the initial keyed hash.
pub const DIGEST_ROUNDS: u32 = 10_000;

/// Upper bound accepted when parsing a stored digest.
const MAX_DIGEST_ROUNDS: u32 = 1_000_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Plaintext credential. Zeroized on drop.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wrap a plaintext secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the plaintext. Never log the returned value.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Check if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Salted one-way digest of a [`Secret`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialDigest(String);

impl CredentialDigest {
    /// Derive a digest with a fresh random salt.
    pub fn generate(secret: &Secret) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::derive(secret, &salt)
    }

    /// Derive a digest with the given salt. Deterministic for a fixed salt.
    pub fn derive(secret: &Secret, salt: &[u8]) -> Self {
        let hash = stretch(secret, salt, DIGEST_ROUNDS);
        Self(format!(
            "{}${}${}${}",
            DIGEST_SCHEME,
            DIGEST_ROUNDS,
            hex::encode(salt),
            hex::encode(hash)
        ))
    }

    /// Check a secret against this digest in constant time.
    ///
    /// A malformed digest never verifies.
    pub fn verify(&self, secret: &Secret) -> bool {
        let Some((rounds, salt, expected)) = self.parts() else {
            return false;
        };
        let actual = stretch(secret, &salt, rounds);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// The encoded digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> Option<(u32, Vec<u8>, Vec<u8>)> {
        let mut fields = self.0.split('$');
        if fields.next()? != DIGEST_SCHEME {
            return None;
        }
        let rounds: u32 = fields.next()?.parse().ok()?;
        if rounds > MAX_DIGEST_ROUNDS {
            return None;
        }
        let salt = hex::decode(fields.next()?).ok()?;
        let hash = hex::decode(fields.next()?).ok()?;
        if fields.next().is_some() || hash.len() != blake3::OUT_LEN {
            return None;
        }
        Some((rounds, salt, hash))
    }
}

impl fmt::Debug for CredentialDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialDigest({}$…)", DIGEST_SCHEME)
    }
}

fn stretch(secret: &Secret, salt: &[u8], rounds: u32) -> [u8; blake3::OUT_LEN] {
    let mut hasher = blake3::Hasher::new_derive_key(DIGEST_CONTEXT);
    hasher.update(&(salt.len() as u64).to_le_bytes());
    hasher.update(salt);
    hasher.update(secret.expose().as_bytes());
    let mut hash = *hasher.finalize().as_bytes();

    for _ in 0..rounds {
        let mut round = blake3::Hasher::new_keyed(&hash);
        round.update(salt);
        hash = *round.finalize().as_bytes();
    }
    hash
}
