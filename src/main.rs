mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lifelog_recall::config::RecallConfig;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lifelog-recall",
    version,
    about = "Ask questions about your lifelog transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question from the transcript corpus
    Ask {
        question: String,
        /// Number of excerpts to retrieve (defaults to retrieval.default_k)
        #[arg(long)]
        k: Option<usize>,
        /// Search every day instead of only today
        #[arg(long)]
        all_days: bool,
        /// Print the answer and excerpts as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the dates that have transcript data
    Dates,
    /// Check database health
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model and tokenizer to ~/.lifelog-recall/models/
    Download,
}

/// stderr keeps stdout clean for answers and --json output.
fn stderr_subscriber(level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env overrides warn while loading, before the configured level is known.
    let bootstrap_level = std::env::var("LIFELOG_LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let config =
        tracing::subscriber::with_default(stderr_subscriber(&bootstrap_level), RecallConfig::load)?;
    stderr_subscriber(&config.server.log_level).init();

    match cli.command {
        Command::Ask {
            question,
            k,
            all_days,
            json,
        } => {
            let k = k.unwrap_or(config.retrieval.default_k);
            cli::ask::ask(config, question, k, all_days, json).await?;
        }
        Command::Dates => {
            cli::dates::dates(&config)?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
