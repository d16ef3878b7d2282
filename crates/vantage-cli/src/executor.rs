//! Gated action and report execution.

use crate::formatter::Formatter;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use vantage_core::{Action, Assistant, OrchestratorError, ReportError, Session};

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// No session is open.
    #[error("not logged in. Use .login <identifier> first.")]
    NotLoggedIn,

    #[error("{0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("{0}")]
    Report(#[from] ReportError),
}

/// Execute one gated action and return formatted output.
pub async fn execute(
    assistant: &Assistant,
    session: Option<&Session>,
    action: &Action,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    let session = session.ok_or(ExecuteError::NotLoggedIn)?;
    let result = assistant.execute(session, action).await?;
    Ok(formatter.format_result(&result))
}

/// Build a report, optionally save it, and return formatted output.
pub async fn build_report(
    assistant: &Assistant,
    session: Option<&Session>,
    kind: &str,
    parameters: &BTreeMap<String, String>,
    save: Option<&Path>,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    let session = session.ok_or(ExecuteError::NotLoggedIn)?;
    let report = assistant.build_report(kind, parameters, session).await?;

    let mut output = formatter.format_report(&report);
    if let Some(destination) = save {
        let path = assistant.config().report_path(destination);
        report.persist(&path)?;
        output.push('\n');
        output.push_str(&formatter.format_message(&format!("Saved to {}", path.display())));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{JsonFormatter, TableFormatter};
    use std::sync::Arc;
    use vantage_core::provider::{Canned, FixtureSet, WhoisRecord};
    use vantage_core::{Capability, FixtureProvider, Secret, VantageConfig};

    fn assistant() -> Assistant {
        assistant_with(VantageConfig::default())
    }

    fn assistant_with(config: VantageConfig) -> Assistant {
        let mut fixtures = FixtureSet::default();
        fixtures.whois.insert(
            "example.com".to_string(),
            Canned::Success(WhoisRecord {
                domain: "example.com".to_string(),
                registrar: Some("IANA".to_string()),
                creation_date: Some("1995-08-14".to_string()),
                expiration_date: None,
                updated_date: None,
                name_servers: Vec::new(),
            }),
        );
        let provider = Arc::new(FixtureProvider::new(fixtures));
        let assistant = Assistant::in_memory(config, provider.clone(), provider);
        assistant.auth().register("alice", &Secret::from("pw123")).unwrap();
        assistant
            .store()
            .grant("alice", Capability::domain_analysis())
            .unwrap();
        assistant
    }

    #[tokio::test]
    async fn test_requires_session() {
        let assistant = assistant();
        let action = Action::Whois { domain: "example.com".into() };
        let err = execute(&assistant, None, &action, &TableFormatter).await.unwrap_err();
        assert!(matches!(err, ExecuteError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_execute_whois() {
        let assistant = assistant();
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let action = Action::Whois { domain: "example.com".into() };

        let output = execute(&assistant, Some(&session), &action, &TableFormatter)
            .await
            .unwrap();
        assert!(output.contains("1995-08-14"));
    }

    #[tokio::test]
    async fn test_denied_action_is_an_error() {
        let assistant = assistant();
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let action = Action::NetworkScan { target: "10.0.0.1".into(), ports: "22".into() };

        let err = execute(&assistant, Some(&session), &action, &TableFormatter)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("network_scanning"));
    }

    #[tokio::test]
    async fn test_report_saved() {
        let assistant = assistant();
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whois.json");
        let parameters: BTreeMap<String, String> = [
            ("target".to_string(), "example.com".to_string()),
            ("checks".to_string(), "whois".to_string()),
        ]
        .into_iter()
        .collect();

        let output = build_report(
            &assistant,
            Some(&session),
            "security",
            &parameters,
            Some(&path),
            &JsonFormatter,
        )
        .await
        .unwrap();

        assert!(output.contains("\"security\""));
        assert!(vantage_core::Report::load(&path).is_ok());
    }

    #[tokio::test]
    async fn test_report_save_failure_is_a_report_error() {
        let assistant = assistant();
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::create_dir_all(blocked.join("child")).unwrap();
        let parameters: BTreeMap<String, String> = [
            ("target".to_string(), "example.com".to_string()),
            ("checks".to_string(), "whois".to_string()),
        ]
        .into_iter()
        .collect();

        let err = build_report(
            &assistant,
            Some(&session),
            "security",
            &parameters,
            Some(&blocked),
            &JsonFormatter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecuteError::Report(ReportError::Io(_))));
    }

    #[tokio::test]
    async fn test_unknown_report_kind_is_a_report_error() {
        let assistant = assistant();
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let err = build_report(
            &assistant,
            Some(&session),
            "forecast",
            &BTreeMap::new(),
            None,
            &TableFormatter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecuteError::Report(ReportError::UnknownReportType(_))));
    }

    #[tokio::test]
    async fn test_bare_save_name_goes_to_reports_dir() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant_with(VantageConfig::new(dir.path()));
        let session = assistant.auth().login("alice", &Secret::from("pw123")).unwrap();
        let parameters: BTreeMap<String, String> = [
            ("target".to_string(), "example.com".to_string()),
            ("checks".to_string(), "whois".to_string()),
        ]
        .into_iter()
        .collect();

        let output = build_report(
            &assistant,
            Some(&session),
            "security",
            &parameters,
            Some(Path::new("whois.json")),
            &TableFormatter,
        )
        .await
        .unwrap();

        let saved = dir.path().join("reports").join("whois.json");
        assert!(output.contains(&saved.display().to_string()));
        assert!(vantage_core::Report::load(&saved).is_ok());
    }
}
