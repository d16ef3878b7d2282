//! Capability-based access control.
//!
//! Capabilities are opaque permission names compared by equality. There is
//! no hierarchy: holding `network_scanning` says nothing about
//! `vulnerability_scanning`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of a capability name.
pub const MAX_CAPABILITY_LEN: usize = 64;

/// A capability name failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid capability format: {0}")]
pub struct InvalidCapability(pub String);

/// A named permission token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capability(String);

impl Capability {
    /// Run technical and portfolio analysis.
    pub const FINANCIAL_ANALYSIS: &'static str = "financial_analysis";
    /// Scan hosts and ports.
    pub const NETWORK_SCANNING: &'static str = "network_scanning";
    /// Look up domain registration records.
    pub const DOMAIN_ANALYSIS: &'static str = "domain_analysis";
    /// Probe web applications for weaknesses.
    pub const VULNERABILITY_SCANNING: &'static str = "vulnerability_scanning";

    /// Names the orchestrator knows how to gate.
    pub const WELL_KNOWN: [&'static str; 4] = [
        Self::FINANCIAL_ANALYSIS,
        Self::NETWORK_SCANNING,
        Self::DOMAIN_ANALYSIS,
        Self::VULNERABILITY_SCANNING,
    ];

    /// Parse a capability from a string.
    ///
    /// Names are trimmed and must be 1..=64 characters drawn from
    /// lowercase ASCII letters, digits, `_`, `-` and `:`.
    pub fn parse(s: &str) -> Result<Self, InvalidCapability> {
        let name = s.trim();
        if name.is_empty() {
            return Err(InvalidCapability("capability name is empty".to_string()));
        }
        if name.len() > MAX_CAPABILITY_LEN {
            return Err(InvalidCapability(format!(
                "capability name exceeds {} characters",
                MAX_CAPABILITY_LEN
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | ':')))
        {
            return Err(InvalidCapability(format!(
                "unexpected character {:?} in {:?}",
                bad, name
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Capability gating financial analysis.
    pub fn financial_analysis() -> Self {
        Self(Self::FINANCIAL_ANALYSIS.to_string())
    }

    /// Capability gating network scans.
    pub fn network_scanning() -> Self {
        Self(Self::NETWORK_SCANNING.to_string())
    }

    /// Capability gating WHOIS lookups.
    pub fn domain_analysis() -> Self {
        Self(Self::DOMAIN_ANALYSIS.to_string())
    }

    /// Capability gating web vulnerability scans.
    pub fn vulnerability_scanning() -> Self {
        Self(Self::VULNERABILITY_SCANNING.to_string())
    }

    /// The capability name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Capability {
    type Err = InvalidCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Capability {
    type Error = InvalidCapability;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Capability> for String {
    fn from(cap: Capability) -> Self {
        cap.0
    }
}

/// An immutable set of capabilities.
///
/// Grants and revocations produce a new set; nothing mutates a set that a
/// session may already be looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capability set from a list of capabilities.
    pub fn from_capabilities(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: caps.into_iter().collect(),
        }
    }

    /// Parse capabilities from string representations.
    pub fn from_strings(strings: &[&str]) -> Result<Self, InvalidCapability> {
        let capabilities: Result<BTreeSet<Capability>, InvalidCapability> =
            strings.iter().map(|s| Capability::parse(s)).collect();
        Ok(Self {
            capabilities: capabilities?,
        })
    }

    /// Return a new set that also contains `cap`.
    pub fn with(&self, cap: Capability) -> Self {
        let mut capabilities = self.capabilities.clone();
        capabilities.insert(cap);
        Self { capabilities }
    }

    /// Return a new set without `cap`.
    pub fn without(&self, cap: &Capability) -> Self {
        let mut capabilities = self.capabilities.clone();
        capabilities.remove(cap);
        Self { capabilities }
    }

    /// Check if the set contains a specific capability.
    pub fn contains(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Check by name without constructing a [`Capability`].
    pub fn has(&self, name: &str) -> bool {
        self.capabilities.iter().any(|cap| cap.as_str() == name)
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Get all capabilities as strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.capabilities.iter().map(|c| c.to_string()).collect()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Get the number of capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.to_strings().join(", "))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self::from_capabilities(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_parse() {
        assert_eq!(
            Capability::parse("financial_analysis").unwrap(),
            Capability::financial_analysis()
        );
        assert_eq!(
            Capability::parse("  network_scanning ").unwrap().as_str(),
            "network_scanning"
        );
        assert!(Capability::parse("").is_err());
        assert!(Capability::parse("Admin").is_err());
        assert!(Capability::parse("read *").is_err());
        assert!(Capability::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_well_known_names_parse() {
        for name in Capability::WELL_KNOWN {
            assert_eq!(Capability::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_equality_has_no_hierarchy() {
        let caps = CapabilitySet::from_strings(&["network_scanning"]).unwrap();
        assert!(caps.contains(&Capability::network_scanning()));
        assert!(!caps.contains(&Capability::vulnerability_scanning()));
        assert!(!caps.has("network"));
    }

    #[test]
    fn test_with_and_without_leave_original_untouched() {
        let base = CapabilitySet::new();
        let granted = base.with(Capability::financial_analysis());

        assert!(base.is_empty());
        assert!(granted.has("financial_analysis"));

        let revoked = granted.without(&Capability::financial_analysis());
        assert!(revoked.is_empty());
        assert_eq!(granted.len(), 1);
    }

    #[test]
    fn test_set_serializes_as_sorted_list() {
        let caps =
            CapabilitySet::from_strings(&["network_scanning", "domain_analysis"]).unwrap();
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"["domain_analysis","network_scanning"]"#);

        let back: CapabilitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }

    #[test]
    fn test_deserialize_rejects_malformed_names() {
        let result: Result<CapabilitySet, _> = serde_json::from_str(r#"["Not Valid"]"#);
        assert!(result.is_err());
    }
}
