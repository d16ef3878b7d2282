//! REPL line parsing.
//!
//! Lines starting with `.` are session commands; anything else is a gated
//! action. Parsing is pure: nothing here touches the assistant.

use crate::formatter::OutputFormat;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use vantage_core::report::DEFAULT_PERIOD;
use vantage_core::Action;

/// Parse errors, printed as usage hints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command: {0}. Type .help for commands.")]
    Unknown(String),

    #[error("{0}")]
    Invalid(String),
}

/// Capability domain shown by `.domain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Financial,
    Security,
}

impl Domain {
    /// Action menu for the domain.
    pub fn menu(&self) -> &'static str {
        match self {
            Domain::Financial => {
                "Financial analysis (requires financial_analysis)\n\
                 \x20 analyze <TICKER> [period]          Analyse one ticker (default period 1y)\n\
                 \x20 portfolio <T1,T2,..> <w1,w2,..>    Analyse a weighted portfolio\n\
                 \x20 .report financial tickers=AAPL,MSFT [period=6mo] [weights=0.6,0.4]"
            }
            Domain::Security => {
                "Security reconnaissance\n\
                 \x20 scan <target> [ports]    Network scan (network_scanning, default ports 1-1024)\n\
                 \x20 whois <domain>           Registration lookup (domain_analysis)\n\
                 \x20 webscan <url>            Web vulnerability scan (vulnerability_scanning)\n\
                 \x20 .report security target=example.com [ports=..] [url=..] [checks=network,whois,web]"
            }
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Financial => write!(f, "financial"),
            Domain::Security => write!(f, "security"),
        }
    }
}

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Help,
    Clear,
    Register(String),
    Login(String),
    Logout,
    Whoami,
    /// Select a domain, or show the current one.
    Domain(Option<Domain>),
    ShowAudit,
    ClearAudit,
    /// Set the output format, or show the current one.
    Format(Option<OutputFormat>),
    Report {
        kind: String,
        parameters: BTreeMap<String, String>,
        save: Option<PathBuf>,
    },
    Action(Action),
}

/// Check if a line is a dot-command.
pub fn is_command(line: &str) -> bool {
    line.trim().starts_with('.')
}

/// Parse one REPL line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Usage(".help"));
    };
    let args: Vec<&str> = words.collect();
    let head = head.to_lowercase();

    match head.as_str() {
        ".exit" | ".quit" | ".q" => Ok(Command::Exit),
        ".help" | ".h" | ".?" => Ok(Command::Help),
        ".clear" | ".cls" => Ok(Command::Clear),

        ".register" => one(&args, ".register <identifier>").map(|id| Command::Register(id.to_string())),
        ".login" => one(&args, ".login <identifier>").map(|id| Command::Login(id.to_string())),
        ".logout" => Ok(Command::Logout),
        ".whoami" => Ok(Command::Whoami),

        ".domain" => match args.as_slice() {
            [] => Ok(Command::Domain(None)),
            [name] => match name.to_lowercase().as_str() {
                "financial" | "finance" => Ok(Command::Domain(Some(Domain::Financial))),
                "security" | "recon" => Ok(Command::Domain(Some(Domain::Security))),
                _ => Err(CommandError::Invalid(format!(
                    "Unknown domain '{}'. Use: financial, security",
                    name
                ))),
            },
            _ => Err(CommandError::Usage(".domain [financial|security]")),
        },

        ".audit" => match args.as_slice() {
            [] => Ok(Command::ShowAudit),
            ["clear"] => Ok(Command::ClearAudit),
            _ => Err(CommandError::Usage(".audit [clear]")),
        },

        ".format" => match args.as_slice() {
            [] => Ok(Command::Format(None)),
            [fmt] => match fmt.to_lowercase().as_str() {
                "table" => Ok(Command::Format(Some(OutputFormat::Table))),
                "json" => Ok(Command::Format(Some(OutputFormat::Json))),
                _ => Err(CommandError::Invalid(format!(
                    "Unknown format '{}'. Use: table, json",
                    fmt
                ))),
            },
            _ => Err(CommandError::Usage(".format [table|json]")),
        },

        ".report" => parse_report(&args),

        "analyze" => match args.as_slice() {
            [ticker] => Ok(analyze(ticker, DEFAULT_PERIOD)),
            [ticker, period] => Ok(analyze(ticker, period)),
            _ => Err(CommandError::Usage("analyze <TICKER> [period]")),
        },

        "portfolio" => match args.as_slice() {
            [tickers, weights] => parse_portfolio(tickers, weights),
            _ => Err(CommandError::Usage("portfolio <T1,T2,..> <w1,w2,..>")),
        },

        "scan" => match args.as_slice() {
            [target] => Ok(Command::Action(Action::NetworkScan {
                target: target.to_string(),
                ports: vantage_core::report::DEFAULT_PORTS.to_string(),
            })),
            [target, ports] => Ok(Command::Action(Action::NetworkScan {
                target: target.to_string(),
                ports: ports.to_string(),
            })),
            _ => Err(CommandError::Usage("scan <target> [ports]")),
        },

        "whois" => one(&args, "whois <domain>").map(|domain| {
            Command::Action(Action::Whois {
                domain: domain.to_string(),
            })
        }),

        "webscan" => one(&args, "webscan <url>").map(|url| {
            Command::Action(Action::WebVulnerabilityScan {
                url: url.to_string(),
            })
        }),

        _ => Err(CommandError::Unknown(head)),
    }
}

fn one<'a>(args: &[&'a str], usage: &'static str) -> Result<&'a str, CommandError> {
    match args {
        [value] => Ok(*value),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn analyze(ticker: &str, period: &str) -> Command {
    Command::Action(Action::AnalyzeTicker {
        ticker: ticker.to_uppercase(),
        period: period.to_string(),
    })
}

fn parse_portfolio(tickers: &str, weights: &str) -> Result<Command, CommandError> {
    let tickers: Vec<String> = tickers
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect();

    let weights = weights
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<f64>()
                .map_err(|_| CommandError::Invalid(format!("'{}' is not a weight", w)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if tickers.len() != weights.len() {
        return Err(CommandError::Invalid(format!(
            "{} tickers but {} weights",
            tickers.len(),
            weights.len()
        )));
    }

    Ok(Command::Action(Action::AnalyzePortfolio { tickers, weights }))
}

/// `.report <kind> key=value.. [--save <path>]`
fn parse_report(args: &[&str]) -> Result<Command, CommandError> {
    const USAGE: &str = ".report <financial|security> key=value.. [--save <path>]";

    let Some((kind, rest)) = args.split_first() else {
        return Err(CommandError::Usage(USAGE));
    };

    let mut parameters = BTreeMap::new();
    let mut save = None;
    let mut rest = rest.iter();
    while let Some(arg) = rest.next() {
        if *arg == "--save" {
            let path = rest.next().ok_or(CommandError::Usage(USAGE))?;
            save = Some(PathBuf::from(*path));
            continue;
        }
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            CommandError::Invalid(format!("Expected key=value, got '{}'", arg))
        })?;
        parameters.insert(key.to_string(), value.to_string());
    }

    Ok(Command::Report {
        kind: kind.to_string(),
        parameters,
        save,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command(".exit"));
        assert!(is_command("  .login alice"));
        assert!(!is_command("analyze AAPL"));
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(parse(".quit").unwrap(), Command::Exit);
        assert_eq!(parse(".login alice").unwrap(), Command::Login("alice".into()));
        assert_eq!(parse(".register bob").unwrap(), Command::Register("bob".into()));
        assert_eq!(parse(".audit").unwrap(), Command::ShowAudit);
        assert_eq!(parse(".audit clear").unwrap(), Command::ClearAudit);
        assert_eq!(
            parse(".domain security").unwrap(),
            Command::Domain(Some(Domain::Security))
        );
        assert_eq!(
            parse(".format json").unwrap(),
            Command::Format(Some(OutputFormat::Json))
        );
    }

    #[test]
    fn test_login_requires_identifier() {
        assert_eq!(
            parse(".login").unwrap_err(),
            CommandError::Usage(".login <identifier>")
        );
    }

    #[test]
    fn test_actions() {
        assert_eq!(
            parse("analyze aapl").unwrap(),
            Command::Action(Action::AnalyzeTicker {
                ticker: "AAPL".into(),
                period: "1y".into()
            })
        );
        assert_eq!(
            parse("scan 10.0.0.1 22,80").unwrap(),
            Command::Action(Action::NetworkScan {
                target: "10.0.0.1".into(),
                ports: "22,80".into()
            })
        );
        assert_eq!(
            parse("portfolio aapl,msft 0.6,0.4").unwrap(),
            Command::Action(Action::AnalyzePortfolio {
                tickers: vec!["AAPL".into(), "MSFT".into()],
                weights: vec![0.6, 0.4]
            })
        );
    }

    #[test]
    fn test_portfolio_length_mismatch() {
        assert!(matches!(
            parse("portfolio AAPL,MSFT 1.0"),
            Err(CommandError::Invalid(_))
        ));
    }

    #[test]
    fn test_report() {
        let Command::Report { kind, parameters, save } =
            parse(".report security target=example.com checks=whois --save out.json").unwrap()
        else {
            panic!("expected report command");
        };
        assert_eq!(kind, "security");
        assert_eq!(parameters["target"], "example.com");
        assert_eq!(parameters["checks"], "whois");
        assert_eq!(save, Some(PathBuf::from("out.json")));

        assert!(matches!(
            parse(".report financial tickers"),
            Err(CommandError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            parse("launch missiles").unwrap_err(),
            CommandError::Unknown("launch".into())
        );
    }
}
