//! Gated provider operations.

use crate::capability::Capability;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// One provider operation together with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    AnalyzeTicker { ticker: String, period: String },
    AnalyzePortfolio { tickers: Vec<String>, weights: Vec<f64> },
    NetworkScan { target: String, ports: String },
    Whois { domain: String },
    WebVulnerabilityScan { url: String },
}

impl Action {
    /// Stable name used in audit entries.
    pub fn name(&self) -> &'static str {
        match self {
            Action::AnalyzeTicker { .. } => "analyze_ticker",
            Action::AnalyzePortfolio { .. } => "analyze_portfolio",
            Action::NetworkScan { .. } => "network_scan",
            Action::Whois { .. } => "whois",
            Action::WebVulnerabilityScan { .. } => "web_vulnerability_scan",
        }
    }

    /// Capability the principal must hold.
    pub fn required_capability(&self) -> Capability {
        match self {
            Action::AnalyzeTicker { .. } | Action::AnalyzePortfolio { .. } => {
                Capability::financial_analysis()
            }
            Action::NetworkScan { .. } => Capability::network_scanning(),
            Action::Whois { .. } => Capability::domain_analysis(),
            Action::WebVulnerabilityScan { .. } => Capability::vulnerability_scanning(),
        }
    }

    /// Parameter snapshot for the audit trail.
    pub fn parameters(&self) -> Value {
        match self {
            Action::AnalyzeTicker { ticker, period } => json!({ "ticker": ticker, "period": period }),
            Action::AnalyzePortfolio { tickers, weights } => {
                json!({ "tickers": tickers, "weights": weights })
            }
            Action::NetworkScan { target, ports } => json!({ "target": target, "ports": ports }),
            Action::Whois { domain } => json!({ "domain": domain }),
            Action::WebVulnerabilityScan { url } => json!({ "url": url }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AnalyzeTicker { ticker, period } => write!(f, "analyze {ticker} ({period})"),
            Action::AnalyzePortfolio { tickers, .. } => {
                write!(f, "portfolio {}", tickers.join(","))
            }
            Action::NetworkScan { target, ports } => write!(f, "scan {target} ports {ports}"),
            Action::Whois { domain } => write!(f, "whois {domain}"),
            Action::WebVulnerabilityScan { url } => write!(f, "webscan {url}"),
        }
    }
}
