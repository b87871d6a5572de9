//! Process wiring for the tuition directory: configuration, store opening,
//! the HTTP application and the batch ingestion entry point.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tuition_core::{directory::Directory, store::DirectoryStore};
use tuition_ingest::{
  IngestOptions, IngestReport, IngestSource,
  source::{CENTRE_REQUIREMENTS, OFFERING_REQUIREMENTS, read_table_path},
};
use tuition_store_sqlite::SqliteStore;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `TUITION_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// Master switch for level/subject filtering.
  #[serde(default = "default_filters_enabled")]
  pub filters_enabled: bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 3000 }
fn default_store_path() -> PathBuf { PathBuf::from("tuition.db") }
fn default_filters_enabled() -> bool { true }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            default_host(),
      port:            default_port(),
      store_path:      default_store_path(),
      filters_enabled: default_filters_enabled(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Load configuration from an optional TOML file, overridden by the
/// environment.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("TUITION"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

pub async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&config.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app<S>(directory: Directory<S>) -> Router
where
  S: DirectoryStore + 'static,
{
  Router::new()
    .nest("/api", tuition_api::api_router(directory))
    .layer(TraceLayer::new_for_http())
}

pub fn directory<S: DirectoryStore>(
  store: Arc<S>,
  config: &ServerConfig,
) -> Directory<S> {
  Directory::new(store).with_filters_enabled(config.filters_enabled)
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

/// Read the centre sheet (and the offerings sheet, if given) and ingest them
/// into `store`.
pub async fn ingest_files<S: DirectoryStore>(
  store: &S,
  centres: &Path,
  offerings: Option<&Path>,
  options: &IngestOptions,
) -> anyhow::Result<IngestReport> {
  let centres = read_table_path(centres, CENTRE_REQUIREMENTS)
    .with_context(|| format!("failed to read {}", centres.display()))?;
  let offerings = offerings
    .map(|path| {
      read_table_path(path, OFFERING_REQUIREMENTS)
        .with_context(|| format!("failed to read {}", path.display()))
    })
    .transpose()?;

  tuition_ingest::ingest(store, IngestSource { centres, offerings }, options)
    .await
    .context("ingestion aborted")
}
