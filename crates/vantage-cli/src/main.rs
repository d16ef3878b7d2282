//! Vantage Command-Line Client
//!
//! An interactive shell for capability-gated financial and security actions,
//! plus operator subcommands for managing the principal table.

mod commands;
mod completer;
mod executor;
mod formatter;
mod repl;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vantage_core::config::DEFAULT_DATA_DIR;
use vantage_core::provider::Unconfigured;
use vantage_core::{
    Assistant, Capability, CapabilitySet, DenialPolicy, FinancialProvider, FixtureProvider,
    ScanningProvider, StoreBackendKind, VantageConfig,
};

/// Vantage Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version, about = "Capability-gated analysis assistant")]
pub struct Args {
    /// Directory holding the principal table, audit log and reports
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Principal table backend (json, sled)
    #[arg(long, default_value = "json")]
    pub backend: StoreBackendKind,

    /// Canned provider responses (JSON). Without it every action is unavailable.
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Provider call timeout in seconds (0 waits indefinitely)
    #[arg(long, default_value_t = vantage_core::config::DEFAULT_PROVIDER_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Idle session timeout in seconds (0 disables expiry)
    #[arg(long, default_value_t = 0)]
    pub session_timeout: u64,

    /// Whether denied actions are audited (record, ignore)
    #[arg(long, default_value = "record")]
    pub denials: DenialPolicy,

    /// Capability granted to newly registered principals (repeatable)
    #[arg(long = "default-capability")]
    pub default_capabilities: Vec<Capability>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<OperatorCommand>,
}

/// Operator commands that run once and exit.
#[derive(Subcommand, Debug)]
pub enum OperatorCommand {
    /// Register a principal (prompts for a secret)
    Register { identifier: String },

    /// Grant a capability to a principal
    Grant {
        identifier: String,
        capability: Capability,
    },

    /// Revoke a capability from a principal
    Revoke {
        identifier: String,
        capability: Capability,
    },

    /// List registered principals
    Principals,
}

impl Args {
    fn config(&self) -> VantageConfig {
        let mut config = VantageConfig::new(&self.data_dir)
            .with_backend(self.backend)
            .with_denial_policy(self.denials)
            .with_default_capabilities(CapabilitySet::from_capabilities(
                self.default_capabilities.iter().cloned(),
            ));

        config = match self.timeout {
            0 => config.without_provider_timeout(),
            secs => config.with_provider_timeout(Duration::from_secs(secs)),
        };
        if self.session_timeout > 0 {
            config = config.with_session_timeout(Duration::from_secs(self.session_timeout));
        }
        config
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
                .add_directive("vantage_cli=info".parse().expect("static directive")),
        )
        .init();

    let args = Args::parse();

    let result = run(args).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (financial, scanning) = providers(args.fixtures.as_deref())?;
    let assistant = Assistant::open(args.config(), financial, scanning)?;

    match args.command {
        Some(command) => run_operator_command(&assistant, command, args.format),
        None => repl::run(assistant, args.format).await,
    }
}

fn providers(
    fixtures: Option<&std::path::Path>,
) -> Result<(Arc<dyn FinancialProvider>, Arc<dyn ScanningProvider>), Box<dyn std::error::Error>> {
    match fixtures {
        Some(path) => {
            let provider = Arc::new(FixtureProvider::from_file(path)?);
            tracing::info!(path = %path.display(), "using fixture providers");
            Ok((provider.clone(), provider))
        }
        None => Ok((Arc::new(Unconfigured), Arc::new(Unconfigured))),
    }
}

/// Execute a single operator command and exit.
fn run_operator_command(
    assistant: &Assistant,
    command: OperatorCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let formatter = formatter::create_formatter(format);
    let store = assistant.store();

    let message = match command {
        OperatorCommand::Register { identifier } => {
            let secret = completer::read_secret("secret: ")?;
            let confirm = completer::read_secret("confirm secret: ")?;
            if secret.expose() != confirm.expose() {
                return Err("secrets do not match".into());
            }
            assistant.auth().register(&identifier, &secret)?;
            format!("Registered '{}'", identifier)
        }
        OperatorCommand::Grant {
            identifier,
            capability,
        } => {
            let caps = store.grant(&identifier, capability)?;
            format!("'{}' now holds: {}", identifier, caps)
        }
        OperatorCommand::Revoke {
            identifier,
            capability,
        } => {
            let caps = store.revoke(&identifier, &capability)?;
            format!("'{}' now holds: {}", identifier, caps)
        }
        OperatorCommand::Principals => {
            println!("{}", formatter.format_principals(&store.principals()));
            return Ok(());
        }
    };

    println!("{}", formatter.format_message(&message));
    assistant.shutdown()?;
    Ok(())
}
