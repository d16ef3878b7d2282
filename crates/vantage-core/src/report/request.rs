//! Report kinds and their parameter schemas.
//!
//! Parameters arrive as untyped key/value pairs and are validated here,
//! before any dispatch happens.

use super::error::{ReportError, ReportResult};
use crate::orchestrator::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default analysis period.
pub const DEFAULT_PERIOD: &str = "1y";

/// Default port specification for network scans.
pub const DEFAULT_PORTS: &str = "1-1024";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Financial,
    Security,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Financial => write!(f, "financial"),
            ReportKind::Security => write!(f, "security"),
        }
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "financial" => Ok(ReportKind::Financial),
            "security" => Ok(ReportKind::Security),
            _ => Err(ReportError::UnknownReportType(s.to_string())),
        }
    }
}

/// One probe of a security report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheck {
    Network,
    Whois,
    Web,
}

impl SecurityCheck {
    pub const ALL: [SecurityCheck; 3] = [SecurityCheck::Network, SecurityCheck::Whois, SecurityCheck::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCheck::Network => "network",
            SecurityCheck::Whois => "whois",
            SecurityCheck::Web => "web",
        }
    }
}

impl FromStr for SecurityCheck {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(SecurityCheck::Network),
            "whois" => Ok(SecurityCheck::Whois),
            "web" => Ok(SecurityCheck::Web),
            other => Err(ReportError::invalid(
                "checks",
                format!("unknown check '{other}' (expected network, whois or web)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReportRequest {
    /// Upper-case tickers in request order.
    pub tickers: Vec<String>,
    pub period: String,
    /// Portfolio weights, one per ticker.
    pub weights: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReportRequest {
    pub target: String,
    pub ports: String,
    pub url: String,
    pub checks: Vec<SecurityCheck>,
}

/// A validated report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRequest {
    Financial(FinancialReportRequest),
    Security(SecurityReportRequest),
}

impl ReportRequest {
    /// Validate raw parameters against the schema of `type_tag`.
    pub fn from_parameters(
        type_tag: &str,
        parameters: &BTreeMap<String, String>,
    ) -> ReportResult<Self> {
        match type_tag.parse::<ReportKind>()? {
            ReportKind::Financial => Self::financial(parameters),
            ReportKind::Security => Self::security(parameters),
        }
    }

    fn financial(parameters: &BTreeMap<String, String>) -> ReportResult<Self> {
        let tickers: Vec<String> = split_list(required(parameters, "tickers")?)
            .map(|t| t.to_ascii_uppercase())
            .collect();
        if tickers.is_empty() {
            return Err(ReportError::invalid("tickers", "no tickers given"));
        }

        let period = optional(parameters, "period").unwrap_or(DEFAULT_PERIOD).to_string();

        let weights = match optional(parameters, "weights") {
            Some(raw) => {
                let weights = split_list(raw)
                    .map(|w| {
                        w.parse::<f64>()
                            .ok()
                            .filter(|w| w.is_finite())
                            .ok_or_else(|| ReportError::invalid("weights", format!("'{w}' is not a number")))
                    })
                    .collect::<ReportResult<Vec<_>>>()?;
                if weights.len() != tickers.len() {
                    return Err(ReportError::invalid(
                        "weights",
                        format!("{} weights for {} tickers", weights.len(), tickers.len()),
                    ));
                }
                Some(weights)
            }
            None => None,
        };

        Ok(ReportRequest::Financial(FinancialReportRequest {
            tickers,
            period,
            weights,
        }))
    }

    fn security(parameters: &BTreeMap<String, String>) -> ReportResult<Self> {
        let target = required(parameters, "target")?.to_string();
        let ports = optional(parameters, "ports").unwrap_or(DEFAULT_PORTS).to_string();
        let url = optional(parameters, "url")
            .map(str::to_string)
            .unwrap_or_else(|| format!("http://{target}"));

        let checks = match optional(parameters, "checks") {
            Some(raw) => {
                let mut checks = Vec::new();
                for check in split_list(raw) {
                    let check = check.parse::<SecurityCheck>()?;
                    if !checks.contains(&check) {
                        checks.push(check);
                    }
                }
                if checks.is_empty() {
                    return Err(ReportError::invalid("checks", "no checks given"));
                }
                checks
            }
            None => SecurityCheck::ALL.to_vec(),
        };

        Ok(ReportRequest::Security(SecurityReportRequest {
            target,
            ports,
            url,
            checks,
        }))
    }

    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRequest::Financial(_) => ReportKind::Financial,
            ReportRequest::Security(_) => ReportKind::Security,
        }
    }

    /// Sub-requests in dispatch order.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            ReportRequest::Financial(req) => {
                let mut actions: Vec<Action> = req
                    .tickers
                    .iter()
                    .map(|ticker| Action::AnalyzeTicker {
                        ticker: ticker.clone(),
                        period: req.period.clone(),
                    })
                    .collect();
                if let Some(weights) = &req.weights {
                    actions.push(Action::AnalyzePortfolio {
                        tickers: req.tickers.clone(),
                        weights: weights.clone(),
                    });
                }
                actions
            }
            ReportRequest::Security(req) => req
                .checks
                .iter()
                .map(|check| match check {
                    SecurityCheck::Network => Action::NetworkScan {
                        target: req.target.clone(),
                        ports: req.ports.clone(),
                    },
                    SecurityCheck::Whois => Action::Whois {
                        domain: req.target.clone(),
                    },
                    SecurityCheck::Web => Action::WebVulnerabilityScan {
                        url: req.url.clone(),
                    },
                })
                .collect(),
        }
    }

    /// Normalised parameters, defaults filled in.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        match self {
            ReportRequest::Financial(req) => {
                out.insert("tickers".to_string(), req.tickers.join(","));
                out.insert("period".to_string(), req.period.clone());
                if let Some(weights) = &req.weights {
                    let weights: Vec<String> = weights.iter().map(f64::to_string).collect();
                    out.insert("weights".to_string(), weights.join(","));
                }
            }
            ReportRequest::Security(req) => {
                out.insert("target".to_string(), req.target.clone());
                out.insert("ports".to_string(), req.ports.clone());
                out.insert("url".to_string(), req.url.clone());
                let checks: Vec<&str> = req.checks.iter().map(SecurityCheck::as_str).collect();
                out.insert("checks".to_string(), checks.join(","));
            }
        }
        out
    }
}

fn optional<'a>(parameters: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(parameters: &'a BTreeMap<String, String>, key: &str) -> ReportResult<&'a str> {
    optional(parameters, key).ok_or_else(|| ReportError::MissingParameter(key.to_string()))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unknown_report_type() {
        let err = ReportRequest::from_parameters("weather", &params(&[])).unwrap_err();
        assert!(matches!(err, ReportError::UnknownReportType(tag) if tag == "weather"));
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = ReportRequest::from_parameters("financial", &params(&[])).unwrap_err();
        assert!(matches!(err, ReportError::MissingParameter(key) if key == "tickers"));

        let err = ReportRequest::from_parameters("security", &params(&[("target", "  ")])).unwrap_err();
        assert!(matches!(err, ReportError::MissingParameter(key) if key == "target"));
    }

    #[test]
    fn test_financial_defaults() {
        let req = ReportRequest::from_parameters("financial", &params(&[("tickers", "aapl, msft")])).unwrap();
        let ReportRequest::Financial(fin) = &req else {
            panic!("expected financial request");
        };
        assert_eq!(fin.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(fin.period, DEFAULT_PERIOD);
        assert_eq!(req.actions().len(), 2);
    }

    #[test]
    fn test_financial_weights_add_portfolio_slot() {
        let req = ReportRequest::from_parameters(
            "Financial",
            &params(&[("tickers", "AAPL,MSFT"), ("weights", "0.6,0.4"), ("period", "6mo")]),
        )
        .unwrap();
        let actions = req.actions();
        assert_eq!(actions.len(), 3);
        assert_eq!(
            actions[2],
            Action::AnalyzePortfolio {
                tickers: vec!["AAPL".into(), "MSFT".into()],
                weights: vec![0.6, 0.4]
            }
        );
        assert_eq!(req.parameters()["period"], "6mo");
    }

    #[test]
    fn test_weight_errors() {
        let err = ReportRequest::from_parameters(
            "financial",
            &params(&[("tickers", "AAPL,MSFT"), ("weights", "1.0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidParameter { key, .. } if key == "weights"));

        let err = ReportRequest::from_parameters(
            "financial",
            &params(&[("tickers", "AAPL"), ("weights", "lots")]),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidParameter { .. }));
    }

    #[test]
    fn test_security_defaults() {
        let req = ReportRequest::from_parameters("security", &params(&[("target", "example.com")])).unwrap();
        assert_eq!(
            req.actions(),
            vec![
                Action::NetworkScan { target: "example.com".into(), ports: DEFAULT_PORTS.into() },
                Action::Whois { domain: "example.com".into() },
                Action::WebVulnerabilityScan { url: "http://example.com".into() },
            ]
        );
        assert_eq!(req.kind(), ReportKind::Security);
    }

    #[test]
    fn test_security_checks_subset() {
        let req = ReportRequest::from_parameters(
            "security",
            &params(&[("target", "example.com"), ("checks", "web, whois, web")]),
        )
        .unwrap();
        let names: Vec<_> = req.actions().iter().map(Action::name).collect();
        assert_eq!(names, vec!["web_vulnerability_scan", "whois"]);

        let err = ReportRequest::from_parameters(
            "security",
            &params(&[("target", "example.com"), ("checks", "ddos")]),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidParameter { key, .. } if key == "checks"));
    }
}
