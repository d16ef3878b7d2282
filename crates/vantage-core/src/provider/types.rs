//! Result shapes returned by providers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price direction over the analysed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

/// Single-ticker analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub period: String,
    /// Last close.
    pub price: f64,
    pub trend: Trend,
    /// Indicator name to latest value, e.g. `rsi_14`.
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
    /// Human-readable trading signals.
    #[serde(default)]
    pub signals: Vec<String>,
    pub recommendation: Recommendation,
}

/// Aggregate metrics for a weighted portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Annualised expected return as a fraction.
    pub expected_return: f64,
    /// Annualised volatility as a fraction.
    pub volatility: f64,
    #[serde(default)]
    pub sharpe_ratio: Option<f64>,
    #[serde(default)]
    pub max_drawdown: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    /// Per-asset results in ticker order.
    pub assets: Vec<TickerAnalysis>,
    pub weights: Vec<f64>,
    pub metrics: PortfolioMetrics,
}

/// State of one probed port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// `open`, `closed` or `filtered`.
    pub state: String,
    #[serde(default)]
    pub service: Option<String>,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostScan {
    pub address: String,
    #[serde(default)]
    pub hostname: Option<String>,
    /// `up` or `down`.
    pub status: String,
    #[serde(default)]
    pub ports: Vec<PortState>,
}

impl HostScan {
    /// Ports reported open.
    pub fn open_ports(&self) -> impl Iterator<Item = &PortState> {
        self.ports.iter().filter(|p| p.state == "open")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkScan {
    pub target: String,
    /// Port specification that was scanned, e.g. `1-1024`.
    pub ports: String,
    #[serde(default)]
    pub hosts: Vec<HostScan>,
}

/// Registration data for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisRecord {
    pub domain: String,
    #[serde(default)]
    pub registrar: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub updated_date: Option<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebScanReport {
    pub url: String,
    /// Findings, one line each.
    #[serde(default)]
    pub vulnerabilities: Vec<String>,
}
