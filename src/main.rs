//! Themis - Support-Chat Evaluation Service
//!
//! This is the main entry point for the `themis` CLI, which serves the HTTP
//! evaluation API and offers one-shot evaluation and audit reporting for
//! scripts and cron jobs.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use themis_core::{
    api::{ApiServer, ApiServerConfig},
    audit::{self, AuditWindow},
    config::ThemisConfig,
    pipeline::Evaluator,
    storage::{csv::CsvStore, EvaluationStore},
    types::EvaluationReport,
};
use tracing::{debug, info, Level};
use tracing_subscriber::{self, EnvFilter};

/// Resolve the conversation text from `--text`, `--file`, or stdin.
fn read_conversation(file: Option<PathBuf>, text: Option<String>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(_), Some(_)) => anyhow::bail!("Pass --text or --file, not both"),
        (Some(text), None) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e)),
        (None, None) => {
            use std::io::Read;
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Start the HTTP server and run until interrupted
async fn run_server(config: ThemisConfig, addr_override: Option<String>) -> anyhow::Result<()> {
    debug!("Starting evaluation server...");

    let addr: SocketAddr = match addr_override {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", raw, e))?,
        None => config.bind_addr()?,
    };

    let evaluator = Arc::new(Evaluator::from_config(&config)?);
    let server = ApiServer::new(ApiServerConfig { addr }, evaluator);

    info!("Evaluation log: {}", config.store.path.display());
    info!("Interactive console: themis-console");

    // Run server with graceful shutdown on signals
    tokio::select! {
        result = server.serve() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping evaluation server gracefully...");
        }
    }

    info!("Evaluation server shut down complete");
    Ok(())
}

#[derive(Parser)]
#[command(name = "themis")]
#[command(about = "LLM-backed evaluation service for customer support chats", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Evaluation log path (overrides THEMIS_STORE__PATH env var and config)
    #[arg(long)]
    log: Option<String>,

    /// Configuration file (defaults to themis.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP evaluation server
    Serve {
        /// Server address (host:port, overrides config)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Create the evaluation log with its header row
    Init,

    /// Evaluate one conversation and print the result
    Evaluate {
        /// Read the conversation from a file (stdin if neither flag is given)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Conversation text passed inline
        #[arg(short, long)]
        text: Option<String>,

        /// Output format (json/text)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Export flagged evaluations as a CSV audit report
    Report {
        /// Range start in IST (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS])
        #[arg(long)]
        start: Option<String>,

        /// Range end in IST (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS])
        #[arg(long)]
        end: Option<String>,

        /// Output path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Build filter: use specified level for themis, but WARN for noisy HTTP
    // internals so request traces stay readable
    let filter = EnvFilter::new(format!(
        "themis={0},themis_core={0},tower_http={0},hyper=warn,reqwest=warn",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Themis v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = ThemisConfig::load(cli.config.as_deref())?;
    if let Some(ref log) = cli.log {
        config.store.path = PathBuf::from(log);
    }

    match cli.command {
        Some(Commands::Serve { addr }) => run_server(config, addr).await,
        Some(Commands::Init) => {
            debug!("Initializing evaluation log...");

            let store = CsvStore::new(config.store.path.clone());
            store.initialize().await?;

            println!("✓ Evaluation log initialized: {}", store.path().display());
            Ok(())
        }
        Some(Commands::Evaluate { file, text, format }) => {
            let conversation = read_conversation(file, text)?;

            let evaluator = Evaluator::from_config(&config)?;
            let record = evaluator.evaluate(&conversation).await?;
            let report = EvaluationReport::from(&record);

            if format == "text" {
                println!("Summary: {}", report.summary);
                println!();
                println!(
                    "Behavior:             {}/5  {}",
                    record.behavior_score, record.behavior_text
                );
                println!(
                    "Conversation quality: {}/5  {}",
                    record.conversation_score, record.conversation_text
                );
                println!(
                    "Know-how:             {}/5  {}",
                    record.knowhow_score, record.knowhow_text
                );
                println!();
                if record.agent_reported {
                    println!("⚠️  Flagged: agent asked for sensitive information");
                }
                println!(
                    "Logged: {} {} IST ({} UTC)",
                    record.date_ist,
                    record.time_ist,
                    record.timestamp_utc.to_rfc3339()
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        Some(Commands::Report { start, end, output }) => {
            let store = CsvStore::new(config.store.path.clone());
            let records = store.read_all().await?;

            let window = AuditWindow::from_bounds(start.as_deref(), end.as_deref())?;
            let flagged = window.filter(&records);

            if let Some(path) = output {
                audit::export_report(&flagged, &path)?;
                eprintln!(
                    "✓ Exported {} flagged evaluation(s) to {}",
                    flagged.len(),
                    path.display()
                );
            } else {
                let stdout = std::io::stdout();
                let handle = stdout.lock();
                audit::write_report(&flagged, handle)?;
            }
            Ok(())
        }
        // Bare `themis` behaves like `themis serve`
        None => run_server(config, None).await,
    }
}
