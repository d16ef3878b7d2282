//! Output formatters for action results, reports and audit trails.

use chrono::SecondsFormat;
use clap::ValueEnum;
use comfy_table::Table;
use serde_json::json;
use vantage_core::provider::{
    NetworkScan, PortfolioAnalysis, ProviderPayload, ProviderResult, TickerAnalysis,
    WebScanReport, WhoisRecord,
};
use vantage_core::{AuditEntry, Principal, Report, SlotOutcome};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the result of one action.
    fn format_result(&self, result: &ProviderResult) -> String;

    /// Format an assembled report.
    fn format_report(&self, report: &Report) -> String;

    /// Format a session audit trail.
    fn format_audit(&self, entries: &[AuditEntry]) -> String;

    /// Format the principal listing.
    fn format_principals(&self, principals: &[Principal]) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_result(&self, result: &ProviderResult) -> String {
        match result {
            Ok(payload) => format_payload(payload),
            Err(e) => format!("Provider error: {}", e),
        }
    }

    fn format_report(&self, report: &Report) -> String {
        let mut table = Table::new();
        table.set_header(vec!["#", "Action", "Status", "Detail"]);

        for (i, slot) in report.results.iter().enumerate() {
            let (status, detail) = match &slot.outcome {
                SlotOutcome::Completed { payload } => ("completed", payload_summary(payload)),
                SlotOutcome::Failed { error } => ("failed", error.to_string()),
                SlotOutcome::Denied { capability } => ("denied", format!("requires {}", capability)),
            };
            table.add_row(vec![
                (i + 1).to_string(),
                slot.request.to_string(),
                status.to_string(),
                detail,
            ]);
        }

        let params: Vec<String> = report
            .parameters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        format!(
            "{} report built {}\nparameters: {}\n{}\n{}",
            report.kind,
            report.built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            params.join(" "),
            table,
            report.summary()
        )
    }

    fn format_audit(&self, entries: &[AuditEntry]) -> String {
        if entries.is_empty() {
            return "Audit trail is empty".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Seq", "Time", "Principal", "Action", "Outcome", "Parameters"]);
        for entry in entries {
            table.add_row(vec![
                entry.seq.to_string(),
                entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                entry.principal.clone(),
                entry.action.clone(),
                entry.outcome.to_string(),
                entry.parameters.to_string(),
            ]);
        }
        table.to_string()
    }

    fn format_principals(&self, principals: &[Principal]) -> String {
        if principals.is_empty() {
            return "No principals registered".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Identifier", "Capabilities", "Last login"]);
        for principal in principals {
            table.add_row(vec![
                principal.identifier.clone(),
                principal.capabilities.to_string(),
                principal
                    .last_authenticated
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_else(|| "never".to_string()),
            ]);
        }
        table.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_result(&self, result: &ProviderResult) -> String {
        let value = match result {
            Ok(payload) => serde_json::to_value(payload),
            Err(e) => serde_json::to_value(e).map(|e| json!({ "error": e })),
        };
        pretty(value)
    }

    fn format_report(&self, report: &Report) -> String {
        pretty(serde_json::to_value(report))
    }

    fn format_audit(&self, entries: &[AuditEntry]) -> String {
        pretty(serde_json::to_value(entries))
    }

    fn format_principals(&self, principals: &[Principal]) -> String {
        pretty(serde_json::to_value(principals))
    }

    fn format_error(&self, error: &str) -> String {
        json!({ "error": error }).to_string()
    }

    fn format_message(&self, message: &str) -> String {
        json!({ "message": message }).to_string()
    }
}

fn pretty(value: serde_json::Result<serde_json::Value>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
}

fn format_payload(payload: &ProviderPayload) -> String {
    match payload {
        ProviderPayload::Analysis(a) => format_analysis(a),
        ProviderPayload::Portfolio(p) => format_portfolio(p),
        ProviderPayload::NetworkScan(s) => format_network_scan(s),
        ProviderPayload::Whois(w) => format_whois(w),
        ProviderPayload::WebScan(w) => format_web_scan(w),
    }
}

/// One-line description used in report tables.
fn payload_summary(payload: &ProviderPayload) -> String {
    match payload {
        ProviderPayload::Analysis(a) => format!(
            "{} {:.2} {:?} -> {:?}",
            a.ticker, a.price, a.trend, a.recommendation
        ),
        ProviderPayload::Portfolio(p) => format!(
            "{} assets, return {:.2}%, volatility {:.2}%",
            p.assets.len(),
            p.metrics.expected_return * 100.0,
            p.metrics.volatility * 100.0
        ),
        ProviderPayload::NetworkScan(s) => {
            let open: usize = s.hosts.iter().map(|h| h.open_ports().count()).sum();
            format!("{} host(s), {} open port(s)", s.hosts.len(), open)
        }
        ProviderPayload::Whois(w) => format!(
            "{} via {}",
            w.domain,
            w.registrar.as_deref().unwrap_or("unknown registrar")
        ),
        ProviderPayload::WebScan(w) => format!("{} finding(s)", w.vulnerabilities.len()),
    }
}

fn format_analysis(a: &TickerAnalysis) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Ticker".to_string(), a.ticker.clone()]);
    table.add_row(vec!["Period".to_string(), a.period.clone()]);
    table.add_row(vec!["Price".to_string(), format!("{:.2}", a.price)]);
    table.add_row(vec!["Trend".to_string(), format!("{:?}", a.trend)]);
    for (name, value) in &a.indicators {
        table.add_row(vec![name.clone(), format!("{:.2}", value)]);
    }
    if !a.signals.is_empty() {
        table.add_row(vec!["Signals".to_string(), a.signals.join("\n")]);
    }
    table.add_row(vec![
        "Recommendation".to_string(),
        format!("{:?}", a.recommendation),
    ]);
    table.to_string()
}

fn format_portfolio(p: &PortfolioAnalysis) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Ticker", "Weight", "Price", "Trend", "Recommendation"]);
    for (asset, weight) in p.assets.iter().zip(p.weights.iter()) {
        table.add_row(vec![
            asset.ticker.clone(),
            format!("{:.2}", weight),
            format!("{:.2}", asset.price),
            format!("{:?}", asset.trend),
            format!("{:?}", asset.recommendation),
        ]);
    }

    let mut lines = vec![
        table.to_string(),
        format!("Expected return: {:.2}%", p.metrics.expected_return * 100.0),
        format!("Volatility:      {:.2}%", p.metrics.volatility * 100.0),
    ];
    if let Some(sharpe) = p.metrics.sharpe_ratio {
        lines.push(format!("Sharpe ratio:    {:.2}", sharpe));
    }
    if let Some(drawdown) = p.metrics.max_drawdown {
        lines.push(format!("Max drawdown:    {:.2}%", drawdown * 100.0));
    }
    lines.join("\n")
}

fn format_network_scan(s: &NetworkScan) -> String {
    if s.hosts.is_empty() {
        return format!("No hosts found for {} (ports {})", s.target, s.ports);
    }

    let mut table = Table::new();
    table.set_header(vec!["Host", "Status", "Port", "State", "Service"]);
    for host in &s.hosts {
        let name = match &host.hostname {
            Some(hostname) => format!("{} ({})", host.address, hostname),
            None => host.address.clone(),
        };
        if host.ports.is_empty() {
            table.add_row(vec![name, host.status.clone(), "-".into(), "-".into(), "-".into()]);
            continue;
        }
        for port in &host.ports {
            table.add_row(vec![
                name.clone(),
                host.status.clone(),
                format!("{}/{}", port.port, port.protocol),
                port.state.clone(),
                port.service.clone().unwrap_or_default(),
            ]);
        }
    }
    table.to_string()
}

fn format_whois(w: &WhoisRecord) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let unknown = || "-".to_string();
    table.add_row(vec!["Domain".to_string(), w.domain.clone()]);
    table.add_row(vec!["Registrar".to_string(), w.registrar.clone().unwrap_or_else(unknown)]);
    table.add_row(vec!["Created".to_string(), w.creation_date.clone().unwrap_or_else(unknown)]);
    table.add_row(vec!["Expires".to_string(), w.expiration_date.clone().unwrap_or_else(unknown)]);
    table.add_row(vec!["Updated".to_string(), w.updated_date.clone().unwrap_or_else(unknown)]);
    table.add_row(vec!["Name servers".to_string(), w.name_servers.join("\n")]);
    table.to_string()
}

fn format_web_scan(w: &WebScanReport) -> String {
    if w.vulnerabilities.is_empty() {
        return format!("No findings for {}", w.url);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Finding"]);
    for (i, finding) in w.vulnerabilities.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), finding.clone()]);
    }
    format!("{}\n{}", w.url, table)
}
