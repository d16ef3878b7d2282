//! Provider interfaces.
//!
//! Providers are external collaborators: the core only knows the shape of
//! their results. Failures come back as [`ProviderError`] values and are
//! carried inside results rather than aborting the caller.

mod fixture;
mod types;

pub use fixture::{Canned, FixtureError, FixtureProvider, FixtureSet};
pub use types::{
    HostScan, NetworkScan, PortState, PortfolioAnalysis, PortfolioMetrics, Recommendation,
    TickerAnalysis, Trend, WebScanReport, WhoisRecord,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider failure, passed through to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderError {
    /// The provider had nothing for the request, e.g. an empty price series.
    #[error("no data: {0}")]
    NoData(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within the configured timeout (milliseconds).
    #[error("provider timed out after {0} ms")]
    Timeout(u64),

    #[error("provider error: {0}")]
    Other(String),
}

/// Financial analysis provider.
#[async_trait]
pub trait FinancialProvider: Send + Sync {
    /// Analyse one ticker over `period` (e.g. `1y`, `6mo`).
    async fn analyze(&self, ticker: &str, period: &str) -> Result<TickerAnalysis, ProviderError>;

    /// Analyse a weighted portfolio. `weights` matches `tickers` in length.
    async fn portfolio_analyze(
        &self,
        tickers: &[String],
        weights: &[f64],
    ) -> Result<PortfolioAnalysis, ProviderError>;
}

/// Security reconnaissance provider.
#[async_trait]
pub trait ScanningProvider: Send + Sync {
    async fn network_scan(&self, target: &str, ports: &str) -> Result<NetworkScan, ProviderError>;

    async fn whois(&self, domain: &str) -> Result<WhoisRecord, ProviderError>;

    async fn web_vulnerability_scan(&self, url: &str) -> Result<WebScanReport, ProviderError>;
}

/// Successful provider result of any action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ProviderPayload {
    Analysis(TickerAnalysis),
    Portfolio(PortfolioAnalysis),
    NetworkScan(NetworkScan),
    Whois(WhoisRecord),
    WebScan(WebScanReport),
}

/// Outcome of a dispatched provider call.
pub type ProviderResult = Result<ProviderPayload, ProviderError>;

/// Placeholder for a domain with no provider wired in.
///
/// Every call fails with [`ProviderError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl FinancialProvider for Unconfigured {
    async fn analyze(&self, _ticker: &str, _period: &str) -> Result<TickerAnalysis, ProviderError> {
        Err(ProviderError::Unavailable("no financial provider configured".to_string()))
    }

    async fn portfolio_analyze(
        &self,
        _tickers: &[String],
        _weights: &[f64],
    ) -> Result<PortfolioAnalysis, ProviderError> {
        Err(ProviderError::Unavailable("no financial provider configured".to_string()))
    }
}

#[async_trait]
impl ScanningProvider for Unconfigured {
    async fn network_scan(&self, _target: &str, _ports: &str) -> Result<NetworkScan, ProviderError> {
        Err(ProviderError::Unavailable("no scanning provider configured".to_string()))
    }

    async fn whois(&self, _domain: &str) -> Result<WhoisRecord, ProviderError> {
        Err(ProviderError::Unavailable("no scanning provider configured".to_string()))
    }

    async fn web_vulnerability_scan(&self, _url: &str) -> Result<WebScanReport, ProviderError> {
        Err(ProviderError::Unavailable("no scanning provider configured".to_string()))
    }
}
