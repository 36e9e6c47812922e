//! chatloop CLI: the main entry point.
//!
//! Commands:
//! - `ask`     Run one question through the ReAct loop against the gateway
//! - `replay`  Re-frame a captured response body and print its events
//! - `config`  Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatloop",
    about = "chatloop: a streaming ReAct chat agent loop",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent one question and stream the answer
    Ask {
        question: String,

        /// Kind of record being viewed, e.g. `issue`
        #[arg(long, requires = "resource_title")]
        resource_type: Option<String>,

        /// Title of the record being viewed
        #[arg(long, requires = "resource_type")]
        resource_title: Option<String>,

        /// Record the request start time so time-to-first-token is measured
        #[arg(long)]
        started_now: bool,
    },

    /// Feed a captured response body through the framer and parser
    Replay {
        file: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Ask {
            question,
            resource_type,
            resource_title,
            started_now,
        } => {
            let resource = resource_type.zip(resource_title);
            commands::ask::run(&question, resource, started_now).await?
        }
        Commands::Replay { file, chunk_size } => commands::replay::run(&file, chunk_size)?,
        Commands::Config => commands::config_cmd::show()?,
    }

    Ok(())
}
