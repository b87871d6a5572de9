//! `tuition` binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the directory API or runs a one-shot operator
//! task.
//!
//! ```
//! tuition ingest --centres centres.csv --offerings offerings.csv
//! tuition serve
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tuition_core::store::DirectoryStore as _;
use tuition_ingest::{IngestOptions, coordinator::DEFAULT_SOURCE_TAG};
use tuition_server::{app, directory, ingest_files, load_config, open_store};

#[derive(Parser)]
#[command(author, version, about = "Tuition centre directory")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API over HTTP.
  Serve,

  /// Load centres from CSV exports into the store.
  Ingest {
    /// Centre sheet, one centre per row.
    #[arg(long)]
    centres: PathBuf,

    /// Optional offerings sheet, one level and subject per row.
    #[arg(long)]
    offerings: Option<PathBuf>,

    /// Tag prefixed to every centre's quality notes.
    #[arg(long, default_value = DEFAULT_SOURCE_TAG)]
    source_tag: String,

    /// Location for rows with neither address nor area.
    #[arg(long)]
    default_area: Option<String>,

    /// Classify against the store without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
  },

  /// Delete every centre, offering, level and subject.
  Wipe {
    /// Confirm the wipe.
    #[arg(long)]
    yes: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = load_config(&cli.config)?;

  match cli.command {
    Command::Serve => {
      let store = Arc::new(open_store(&config).await?);
      let app = app(directory(store, &config));
      let address = config.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }

    Command::Ingest {
      centres,
      offerings,
      source_tag,
      default_area,
      dry_run,
      json,
    } => {
      let store = open_store(&config).await?;
      let options = IngestOptions { source_tag, default_area, dry_run };
      let report =
        ingest_files(&store, &centres, offerings.as_deref(), &options).await?;
      if json {
        println!("{}", report.to_json()?);
      } else {
        print!("{report}");
      }
    }

    Command::Wipe { yes } => {
      if !yes {
        anyhow::bail!("refusing to wipe without --yes");
      }
      let store = open_store(&config).await?;
      let summary = store.wipe().await.context("wipe failed")?;
      tracing::warn!(rows = summary.total(), "store wiped");
      println!(
        "Removed {} centres, {} offerings, {} levels, {} subjects",
        summary.centres, summary.offerings, summary.levels, summary.subjects
      );
    }
  }

  Ok(())
}
