//! # Answer Harness CLI (`ans`)
//!
//! The `ans` binary runs the answer engine: it initializes the database,
//! serves the HTTP/WebSocket API, and answers or trains from the command
//! line.
//!
//! ## Usage
//!
//! ```bash
//! ans --config ./config/answers.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ans init` | Create the SQLite database and run schema migrations |
//! | `ans serve` | Start the HTTP/WebSocket server and background jobs |
//! | `ans ask "<query>"` | Answer one query |
//! | `ans train --query .. --answer ..` | Add a training entry and retrain |
//! | `ans keywords` | List ranked corpus keywords |
//! | `ans intents` | List active intents and discovered clusters |
//! | `ans promote` | Promote clusters that reached the threshold |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `answer_harness=info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use answer_harness::{commands, config, migrate, server};

/// Answer Harness CLI: corpus-backed question answering with intent
/// discovery.
#[derive(Parser)]
#[command(
    name = "ans",
    about = "Answer Harness: TF-IDF answer retrieval with intent classification and discovery",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/answers.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Safe to
    /// run repeatedly.
    Init,

    /// Start the HTTP/WebSocket server.
    ///
    /// Binds to `[server].bind` and runs the promotion sweep and retrain on
    /// the `[schedule]` intervals.
    Serve,

    /// Answer a single query.
    Ask {
        /// The query text.
        query: String,
    },

    /// Add a training entry and retrain the model.
    Train {
        #[arg(long)]
        query: String,

        #[arg(long)]
        answer: String,

        /// Optional intent label stored with the entry.
        #[arg(long)]
        intent: Option<String>,
    },

    /// List ranked corpus keywords.
    Keywords {
        /// Maximum number of keywords to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List active intents and discovered clusters.
    Intents,

    /// Promote every discovered cluster that reached the threshold.
    Promote,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("answer_harness=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query } => {
            commands::run_ask(&cfg, &query).await?;
        }
        Commands::Train {
            query,
            answer,
            intent,
        } => {
            commands::run_train(&cfg, query, answer, intent).await?;
        }
        Commands::Keywords { limit } => {
            commands::run_keywords(&cfg, limit).await?;
        }
        Commands::Intents => {
            commands::run_intents(&cfg).await?;
        }
        Commands::Promote => {
            commands::run_promote(&cfg).await?;
        }
    }

    Ok(())
}
