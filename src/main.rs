//! # simcheck CLI
//!
//! ## Usage
//!
//! ```bash
//! simcheck --config ./config/simcheck.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `simcheck init` | Create the SQLite database and run schema migrations |
//! | `simcheck ingest <path> --batch <name>` | Ingest a file or directory into a batch |
//! | `simcheck batches` | List batches |
//! | `simcheck list <batch>` | List the documents of a batch |
//! | `simcheck get <id>` | Show a document and its passages |
//! | `simcheck delete <id>` | Delete a document |
//! | `simcheck embed pending` | Embed documents missing current passages |
//! | `simcheck compare <a> <b>` | Compare two documents (or files with `--files`) |
//! | `simcheck rank <id>` | Rank a document's batch by similarity to it |
//! | `simcheck hash <file>` | Print a file's content hash |
//! | `simcheck detect <file>` | Estimate whether a file's text is AI-generated |
//! | `simcheck completions <shell>` | Print shell completions |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `warn`).

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use simcheck::{
    compare_cmd, config, embed_cmd, file_cmd, get, ingest, migrate, rank_cmd,
};

/// simcheck — local-first document similarity and plagiarism detection.
///
/// All corpus commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/simcheck.example.toml`.
#[derive(Parser)]
#[command(
    name = "simcheck",
    about = "simcheck — local-first document similarity and plagiarism detection",
    version,
    long_about = "simcheck splits documents into overlapping passages, embeds them, and \
    reports which passages of one document closely match passages of another, either for \
    a single pair or across a whole batch."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/simcheck.toml`.
    #[arg(long, global = true, default_value = "./config/simcheck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest a file or directory into a batch.
    ///
    /// Files whose content is already in the corpus are skipped. New
    /// documents are embedded inline unless `--no-embed` is given or the
    /// embedding provider is disabled.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,

        /// Batch name; created if it does not exist.
        #[arg(long)]
        batch: String,

        /// Store documents without embedding them.
        #[arg(long)]
        no_embed: bool,
    },

    /// List batches.
    Batches,

    /// List the documents of a batch.
    List {
        /// Batch name.
        batch: String,
    },

    /// Show a document, its text, and its passages.
    Get {
        /// Document UUID.
        id: String,
    },

    /// Delete a document and its passages.
    Delete {
        /// Document UUID.
        id: String,
    },

    /// Manage passage embeddings.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Compare a source document against a target document.
    ///
    /// The score is the share of source passages that closely match some
    /// target passage, so `compare a b` and `compare b a` can differ.
    Compare {
        /// Source document UUID (or path with `--files`).
        source: String,

        /// Target document UUID (or path with `--files`).
        target: String,

        /// Treat both arguments as files on disk instead of document ids.
        #[arg(long)]
        files: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rank every other document in a document's batch by similarity.
    ///
    /// Press Ctrl-C to cancel a long ranking.
    Rank {
        /// Document UUID.
        id: String,

        /// Show at most this many entries.
        #[arg(long)]
        limit: Option<usize>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the SHA-256 content hash of a file.
    Hash {
        path: PathBuf,
    },

    /// Estimate whether a file's text is AI-generated.
    Detect {
        path: PathBuf,

        /// Print the verdict as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum EmbedAction {
    /// Embed documents whose passages are missing or stale.
    ///
    /// Passages are stale when they were produced with different chunking
    /// parameters or a different embedding model.
    Pending {
        /// Only process this batch.
        #[arg(long)]
        batch: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "simcheck", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Hash { path } => {
            return file_cmd::run_hash(path);
        }
        Commands::Detect { path, json } => {
            let cfg =
                config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            return file_cmd::run_detect(&cfg, path, *json).await;
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            path,
            batch,
            no_embed,
        } => {
            ingest::run_ingest(&cfg, &path, &batch, no_embed).await?;
        }
        Commands::Batches => {
            get::run_batches(&cfg).await?;
        }
        Commands::List { batch } => {
            get::run_list(&cfg, &batch).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Delete { id } => {
            get::run_delete(&cfg, &id).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending { batch } => {
                embed_cmd::run_embed_pending(&cfg, batch.as_deref()).await?;
            }
        },
        Commands::Compare {
            source,
            target,
            files,
            json,
        } => {
            compare_cmd::run_compare(&cfg, &source, &target, files, json).await?;
        }
        Commands::Rank { id, limit, json } => {
            rank_cmd::run_rank(&cfg, &id, limit, json).await?;
        }
        Commands::Hash { .. } | Commands::Detect { .. } | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
