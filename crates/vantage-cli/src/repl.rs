//! Interactive REPL implementation.

use crate::commands::{self, Command, Domain};
use crate::completer::{read_secret, VantageHelper};
use crate::executor;
use crate::formatter::{self, OutputFormat};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::sync::Arc;
use vantage_core::{Assistant, Session};

/// Get the history file path.
fn history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vantage_history")
}

/// Mutable REPL state.
struct ReplState {
    session: Option<Arc<Session>>,
    domain: Option<Domain>,
    format: OutputFormat,
}

impl ReplState {
    fn prompt(&self) -> String {
        match (&self.session, self.domain) {
            (Some(s), Some(d)) => format!("{}@vantage[{}]> ", s.principal(), d),
            (Some(s), None) => format!("{}@vantage> ", s.principal()),
            (None, _) => "vantage> ".to_string(),
        }
    }
}

/// What the loop should do after a command.
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive REPL.
pub async fn run(
    assistant: Assistant,
    initial_format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = ReplState {
        session: None,
        domain: None,
        format: initial_format,
    };

    // Set up rustyline
    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();

    let mut rl: Editor<VantageHelper, DefaultHistory> = Editor::with_config(rl_config)?;
    rl.set_helper(Some(VantageHelper::new()));

    // Load history
    let hist_path = history_path();
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    println!("Vantage - Type .help for commands, .exit to quit\n");

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let command = match commands::parse(line) {
                    Ok(command) => command,
                    Err(e) if commands::is_command(line) => {
                        println!("{}", e);
                        continue;
                    }
                    Err(e) => {
                        println!("{} (actions: analyze, portfolio, scan, whois, webscan)", e);
                        continue;
                    }
                };

                if let Flow::Exit = handle(&assistant, &mut state, command).await {
                    println!("Goodbye!");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&hist_path);

    if let Some(session) = state.session.take() {
        let _ = assistant.auth().logout(&session);
    }
    assistant.shutdown()?;

    Ok(())
}

async fn handle(assistant: &Assistant, state: &mut ReplState, command: Command) -> Flow {
    let formatter = formatter::create_formatter(state.format);

    match command {
        Command::Exit => return Flow::Exit,

        Command::Help => println!("{}", get_help()),

        Command::Clear => {
            // ANSI clear screen
            print!("\x1B[2J\x1B[1;1H");
        }

        Command::Register(identifier) => match register(assistant, &identifier) {
            Ok(()) => println!("Registered '{}'. Use .login {} to start a session.", identifier, identifier),
            Err(e) => println!("{}", formatter.format_error(&e)),
        },

        Command::Login(identifier) => {
            if let Some(session) = state.session.as_ref().filter(|s| s.is_active()) {
                println!(
                    "Already logged in as '{}'. Use .logout first.",
                    session.principal()
                );
                return Flow::Continue;
            }
            if let Some(expired) = state.session.take() {
                if let Ok(trail) = assistant.auth().logout(&expired) {
                    println!("Previous session for '{}' expired.", expired.principal());
                    println!("{}", formatter.format_audit(&trail));
                }
            }
            let secret = match read_secret("secret: ") {
                Ok(secret) => secret,
                Err(e) => {
                    println!("{}", formatter.format_error(&e.to_string()));
                    return Flow::Continue;
                }
            };
            match assistant.auth().login(&identifier, &secret) {
                Ok(session) => {
                    let caps = assistant.store().capabilities_of(session.principal());
                    println!("Logged in as '{}' (capabilities: {})", identifier, caps);
                    state.session = Some(session);
                }
                Err(e) => println!("{}", formatter.format_error(&e.to_string())),
            }
        }

        Command::Logout => match state.session.take() {
            Some(session) => match assistant.auth().logout(&session) {
                Ok(trail) => {
                    println!("{}", formatter.format_audit(&trail));
                    println!("Logged out '{}' ({} audit entries)", session.principal(), trail.len());
                }
                Err(e) => println!("{}", formatter.format_error(&e.to_string())),
            },
            None => println!("Not logged in"),
        },

        Command::Whoami => match &state.session {
            Some(session) if session.is_active() => {
                let caps = assistant.store().capabilities_of(session.principal());
                println!(
                    "{} (session {}, since {})\ncapabilities: {}",
                    session.principal(),
                    session.id(),
                    session.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
                    caps
                );
            }
            Some(_) => println!("Session expired. Use .login <identifier>."),
            None => println!("Not logged in"),
        },

        Command::Domain(Some(domain)) => {
            state.domain = Some(domain);
            println!("{}", domain.menu());
        }

        Command::Domain(None) => match state.domain {
            Some(domain) => println!("{}", domain.menu()),
            None => println!("No domain selected. Use: .domain financial | .domain security"),
        },

        Command::ShowAudit => match &state.session {
            Some(session) => println!("{}", formatter.format_audit(&assistant.audit().entries(session))),
            None => println!("Not logged in"),
        },

        Command::ClearAudit => match &state.session {
            Some(session) => {
                let discarded = assistant.audit().clear(session);
                println!("Cleared {} entries from the session trail", discarded);
            }
            None => println!("Not logged in"),
        },

        Command::Format(Some(format)) => {
            state.format = format;
            println!("Output format set to {}", format);
        }

        Command::Format(None) => println!("Current format: {}", state.format),

        Command::Report {
            kind,
            parameters,
            save,
        } => {
            let output = executor::build_report(
                assistant,
                state.session.as_deref(),
                &kind,
                &parameters,
                save.as_deref(),
                &*formatter,
            )
            .await;
            print_output(output, &*formatter);
        }

        Command::Action(action) => {
            let output =
                executor::execute(assistant, state.session.as_deref(), &action, &*formatter).await;
            print_output(output, &*formatter);
        }
    }

    Flow::Continue
}

fn print_output(
    output: Result<String, executor::ExecuteError>,
    formatter: &dyn formatter::Formatter,
) {
    match output {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(e) => println!("{}", formatter.format_error(&e.to_string())),
    }
}

/// Prompt for a secret twice and register `identifier`.
fn register(assistant: &Assistant, identifier: &str) -> Result<(), String> {
    let secret = read_secret("secret: ").map_err(|e| e.to_string())?;
    if secret.is_empty() {
        return Err("secret must not be empty".to_string());
    }
    let confirm = read_secret("confirm secret: ").map_err(|e| e.to_string())?;
    if secret.expose() != confirm.expose() {
        return Err("secrets do not match".to_string());
    }
    assistant
        .auth()
        .register(identifier, &secret)
        .map_err(|e| e.to_string())
}

/// Get help text for REPL commands.
fn get_help() -> String {
    r#"Session Commands
================

.register <identifier>   Register a principal (prompts for a secret)
.login <identifier>      Open a session (prompts for a secret)
.logout                  Close the session and print its audit trail
.whoami                  Show the current principal and capabilities
.domain [name]           Select a domain menu (financial, security)
.audit                   Show the session audit trail
.audit clear             Discard the in-memory session trail
.report <kind> k=v..     Build a report (financial, security) [--save <path>]
                         A bare file name is saved under <data-dir>/reports
.format [type]           Get or set output format (table, json)
.clear                   Clear the screen
.help                    Show this help message
.exit / .quit            Exit the REPL

Actions
=======
analyze <TICKER> [period]          financial_analysis
portfolio <T1,T2,..> <w1,w2,..>    financial_analysis
scan <target> [ports]              network_scanning
whois <domain>                     domain_analysis
webscan <url>                      vulnerability_scanning
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_session() {
        let state = ReplState {
            session: None,
            domain: Some(Domain::Security),
            format: OutputFormat::Table,
        };
        assert_eq!(state.prompt(), "vantage> ");
    }

    #[test]
    fn test_help_lists_every_action() {
        let help = get_help();
        for action in ["analyze", "portfolio", "scan", "whois", "webscan"] {
            assert!(help.contains(action), "missing {}", action);
        }
    }
}
