//! quire server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and blob directory, and serves the JSON API over HTTP.
//!
//! # Accounts
//!
//! Each `[[auth.accounts]]` entry needs an argon2 PHC string:
//!
//! ```
//! cargo run -p quire-server -- hash-password
//! ```
//!
//! # Memberships
//!
//! Billing lives outside quire. Flip a user's PRO status with:
//!
//! ```
//! cargo run -p quire-server -- membership alice --active true
//! ```

mod config;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use quire_api::AppState;
use quire_blob_fs::FsBlobStore;
use quire_core::{document::UserId, store::DocumentStore as _};
use quire_openai::OpenAiClient;
use quire_rag::{Backend, Rag, Services};
use quire_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// SQLite for metadata and vectors, local disk for PDFs, OpenAI for both
/// embeddings and chat.
struct ServerBackend;

impl Backend for ServerBackend {
  type Blobs = FsBlobStore;
  type Embedder = OpenAiClient;
  type Model = OpenAiClient;
  type Store = SqliteStore;
  type Vectors = SqliteStore;
}

#[derive(Parser)]
#[command(author, version, about = "Chat with your PDFs")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Set or clear a user's PRO membership.
  Membership {
    user_id: String,
    #[arg(long, action = clap::ArgAction::Set)]
    active:  bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => hash_password(),
    Command::Membership { user_id, active } => {
      let cfg = ServerConfig::load(&cli.config)?;
      set_membership(&cfg, &user_id, active).await
    }
    Command::Serve => {
      let cfg = ServerConfig::load(&cli.config)?;
      serve(cfg).await
    }
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  if cfg.auth.accounts.is_empty() {
    tracing::warn!("no accounts configured; every request will be rejected");
  }
  if cfg.openai.api_key.is_empty() {
    tracing::warn!("no OpenAI API key configured");
  }

  let store = open_store(&cfg).await?;

  let blob_root = expand_tilde(&cfg.blob_root);
  let blobs = FsBlobStore::open(&blob_root)
    .await
    .with_context(|| format!("failed to open blob root {blob_root:?}"))?;

  let llm = Arc::new(OpenAiClient::new(cfg.openai.clone()).context("failed to build OpenAI client")?);

  let services = Services::<ServerBackend> {
    store:    Arc::new(store.clone()),
    vectors:  Arc::new(store),
    blobs:    Arc::new(blobs),
    embedder: Arc::clone(&llm),
    model:    llm,
  };
  let rag = Rag::new(services, cfg.rag).context("invalid rag configuration")?;

  let state = AppState {
    rag,
    auth: Arc::new(cfg.auth.clone()),
    max_upload_bytes: cfg.max_upload_bytes,
  };
  let app = quire_api::router(state).layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shut down");
  Ok(())
}

async fn set_membership(cfg: &ServerConfig, user_id: &str, active: bool) -> anyhow::Result<()> {
  let user = UserId::new(user_id)?;
  let store = open_store(cfg).await?;
  store.set_membership(&user, active).await?;
  println!("{user}: membership {}", if active { "active" } else { "inactive" });
  Ok(())
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  SqliteStore::open(&store_path, cfg.embedding_dimensions)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

fn hash_password() -> anyhow::Result<()> {
  let password = rpassword_or_stdin()?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
    .to_string();
  println!("{hash}");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for ctrl-c: {e}");
    std::future::pending::<()>().await;
  }
}

/// Read a password from stdin (no echo).
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
