#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::{EnvFilter, fmt};

use clawmeter::commands::{CacheReportCommand, CommandDispatcher, CommandRequest};
use clawmeter::config::Config;
use clawmeter::session::store::SessionStore;
use clawmeter::session::types::SessionEntry;

/// `clawmeter` - token-cache telemetry for messaging-agent sessions.
#[derive(Parser, Debug)]
#[command(name = "clawmeter")]
#[command(version)]
#[command(about = "Token-cache telemetry and session accounting for messaging agents.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a cache report for a session
    Report {
        /// Scope arguments, as after the text command: `session` or `turns N`
        #[arg(trailing_var_arg = true)]
        scope: Vec<String>,

        /// Session key to look up in the session index
        #[arg(long)]
        session_key: Option<String>,

        /// Report a transcript file directly, bypassing the session index
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List sessions from the session index
    Sessions,

    /// Generate shell completions
    Completions {
        /// Shell to generate for (bash, zsh, fish, ...)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_default()?;

    match cli.command {
        Commands::Report {
            scope,
            session_key,
            file,
        } => run_report(&config, scope, session_key, file).await,
        Commands::Sessions => list_sessions(&config),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "clawmeter",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Route a report request through the same command surface the channels use,
/// so the CLI exercises alias matching and the full reply pipeline.
async fn run_report(
    config: &Config,
    scope: Vec<String>,
    session_key: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let body = if scope.is_empty() {
        "/cache_report".to_string()
    } else {
        format!("/cache_report {}", scope.join(" "))
    };

    let (session_key, session_entry) = if let Some(file) = file {
        let mut entry = SessionEntry::new("local");
        entry.session_file = Some(file.to_string_lossy().into_owned());
        (session_key.unwrap_or_else(|| "local".to_string()), Some(entry))
    } else {
        let key = session_key.context("--session-key is required unless --file is given")?;
        let store = SessionStore::new(&config.workspace_dir);
        let entry = store.get(&key)?;
        (key, entry)
    };

    let provider = session_entry
        .as_ref()
        .and_then(|entry| entry.provider_override.clone())
        .unwrap_or_else(|| config.default_provider.clone());
    let model = session_entry
        .as_ref()
        .and_then(|entry| entry.model_override.clone())
        .unwrap_or_else(|| config.default_model.clone());

    let dispatcher = CommandDispatcher::new()
        .register(Box::new(CacheReportCommand::new(&config.workspace_dir)));

    let request = CommandRequest {
        body,
        session_key,
        sender_id: "cli".to_string(),
        is_authorized: true,
        allow_text_commands: config.commands.text,
        provider,
        model,
        agent_id: Some(config.default_agent_id.clone()),
        session_entry,
    };

    let result = dispatcher.dispatch(&request).await;
    match result.reply {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => anyhow::bail!("report request was not handled"),
    }
}

fn list_sessions(config: &Config) -> Result<()> {
    let store = SessionStore::new(&config.workspace_dir);
    let entries = store.list()?;

    if entries.is_empty() {
        println!("No sessions recorded.");
        return Ok(());
    }

    for (key, entry) in entries {
        let model = match (&entry.provider_override, &entry.model_override) {
            (Some(provider), Some(model)) => format!("{provider}/{model}"),
            _ => "(default)".to_string(),
        };
        println!(
            "{key}  id={}  model={model}  compactions={}  updated={}",
            entry.session_id,
            entry.compaction_count,
            entry.updated_at.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
