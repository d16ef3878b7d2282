//! Offline provider backed by canned JSON responses.
//!
//! Used by the CLI's `--fixtures` mode and throughout the tests. Each map is
//! keyed by the request's natural key; a missing key yields
//! [`ProviderError::NoData`].

use super::types::{NetworkScan, PortfolioAnalysis, TickerAnalysis, WebScanReport, WhoisRecord};
use super::{FinancialProvider, ProviderError, ScanningProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Fixture file error.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fixture file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A canned response: either data or a provider failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Canned<T> {
    Failure { error: ProviderError },
    Success(T),
}

impl<T: Clone> Canned<T> {
    fn resolve(&self) -> Result<T, ProviderError> {
        match self {
            Canned::Failure { error } => Err(error.clone()),
            Canned::Success(value) => Ok(value.clone()),
        }
    }
}

/// Contents of a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Keyed by upper-case ticker.
    #[serde(default)]
    pub analyses: BTreeMap<String, Canned<TickerAnalysis>>,
    /// Keyed by comma-joined upper-case tickers, e.g. `AAPL,MSFT`.
    #[serde(default)]
    pub portfolios: BTreeMap<String, Canned<PortfolioAnalysis>>,
    /// Keyed by target.
    #[serde(default)]
    pub network_scans: BTreeMap<String, Canned<NetworkScan>>,
    /// Keyed by lower-case domain.
    #[serde(default)]
    pub whois: BTreeMap<String, Canned<WhoisRecord>>,
    /// Keyed by URL.
    #[serde(default)]
    pub web_scans: BTreeMap<String, Canned<WebScanReport>>,
    /// Artificial delay applied to every call.
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

/// Provider that answers from a [`FixtureSet`] and counts its calls.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    fixtures: FixtureSet,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn new(fixtures: FixtureSet) -> Self {
        let latency = fixtures.latency_ms.map(Duration::from_millis);
        Self {
            fixtures,
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    /// Load fixtures from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixtures: FixtureSet = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "provider fixtures loaded");
        Ok(Self::new(fixtures))
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of provider calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    async fn begin(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn lookup<T: Clone>(
    map: &BTreeMap<String, Canned<T>>,
    key: &str,
    what: &str,
) -> Result<T, ProviderError> {
    map.get(key)
        .ok_or_else(|| ProviderError::NoData(format!("no {what} data for '{key}'")))?
        .resolve()
}

fn require_non_empty(value: &str, what: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::InvalidInput(format!("{what} is empty")));
    }
    Ok(())
}

#[async_trait]
impl FinancialProvider for FixtureProvider {
    async fn analyze(&self, ticker: &str, period: &str) -> Result<TickerAnalysis, ProviderError> {
        self.begin().await;
        require_non_empty(ticker, "ticker")?;

        let key = ticker.trim().to_ascii_uppercase();
        let mut analysis = lookup(&self.fixtures.analyses, &key, "ticker")?;
        analysis.period = period.to_string();
        Ok(analysis)
    }

    async fn portfolio_analyze(
        &self,
        tickers: &[String],
        weights: &[f64],
    ) -> Result<PortfolioAnalysis, ProviderError> {
        self.begin().await;
        if tickers.is_empty() {
            return Err(ProviderError::InvalidInput("no tickers given".to_string()));
        }
        if tickers.len() != weights.len() {
            return Err(ProviderError::InvalidInput(format!(
                "{} tickers but {} weights",
                tickers.len(),
                weights.len()
            )));
        }

        let key = tickers
            .iter()
            .map(|t| t.trim().to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let mut analysis = lookup(&self.fixtures.portfolios, &key, "portfolio")?;
        analysis.weights = weights.to_vec();
        Ok(analysis)
    }
}

#[async_trait]
impl ScanningProvider for FixtureProvider {
    async fn network_scan(&self, target: &str, ports: &str) -> Result<NetworkScan, ProviderError> {
        self.begin().await;
        require_non_empty(target, "target")?;

        let mut scan = lookup(&self.fixtures.network_scans, target.trim(), "scan")?;
        scan.ports = ports.to_string();
        Ok(scan)
    }

    async fn whois(&self, domain: &str) -> Result<WhoisRecord, ProviderError> {
        self.begin().await;
        require_non_empty(domain, "domain")?;
        lookup(
            &self.fixtures.whois,
            &domain.trim().to_ascii_lowercase(),
            "whois",
        )
    }

    async fn web_vulnerability_scan(&self, url: &str) -> Result<WebScanReport, ProviderError> {
        self.begin().await;
        require_non_empty(url, "url")?;
        lookup(&self.fixtures.web_scans, url.trim(), "web scan")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = r#"{
        "analyses": {
            "AAPL": {
                "ticker": "AAPL", "period": "1y", "price": 189.5,
                "trend": "bullish", "indicators": { "rsi_14": 61.2 },
                "signals": ["golden cross"], "recommendation": "buy"
            },
            "EMPTY": { "error": { "kind": "no_data", "detail": "empty price series" } }
        },
        "whois": {
            "example.com": { "domain": "example.com", "registrar": "IANA", "name_servers": ["a.iana-servers.net"] }
        }
    }"#;

    fn provider() -> FixtureProvider {
        FixtureProvider::new(serde_json::from_str(FIXTURES).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_hit_uses_requested_period() {
        let provider = provider();
        let analysis = provider.analyze("aapl", "6mo").await.unwrap();
        assert_eq!(analysis.ticker, "AAPL");
        assert_eq!(analysis.period, "6mo");
        assert_eq!(analysis.indicators["rsi_14"], 61.2);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_canned_failure() {
        let err = provider().analyze("EMPTY", "1y").await.unwrap_err();
        assert_eq!(err, ProviderError::NoData("empty price series".to_string()));
    }

    #[tokio::test]
    async fn test_missing_entry_is_no_data() {
        let provider = provider();
        assert!(matches!(
            provider.whois("unknown.org").await,
            Err(ProviderError::NoData(_))
        ));
        assert!(matches!(
            provider.network_scan("10.0.0.1", "22").await,
            Err(ProviderError::NoData(_))
        ));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_whois_is_case_insensitive() {
        let record = provider().whois("EXAMPLE.com").await.unwrap();
        assert_eq!(record.registrar.as_deref(), Some("IANA"));
    }

    #[tokio::test]
    async fn test_portfolio_weight_mismatch() {
        let err = provider()
            .portfolio_analyze(&["AAPL".to_string()], &[0.5, 0.5])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidInput(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures.json");
        std::fs::write(&path, FIXTURES).unwrap();
        let provider = FixtureProvider::from_file(&path).unwrap();
        assert_eq!(provider.fixtures().analyses.len(), 2);

        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            FixtureProvider::from_file(&path),
            Err(FixtureError::Parse(_))
        ));
    }
}
