//! `quire`: command-line client for a quire server.
//!
//! # Usage
//!
//! ```
//! quire --url http://localhost:8080 --user alice --password secret ls
//! quire --config ~/.config/quire/config.toml upload paper.pdf
//! quire chat 6f1c…
//! ```

mod client;
mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "quire", about = "Chat with your PDFs from the terminal")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the quire server (default: http://localhost:8080).
  #[arg(long, env = "QUIRE_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "QUIRE_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "QUIRE_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show plan and document usage.
  Me,
  /// List your documents, newest first.
  Ls,
  /// Upload a PDF and wait until it is ready to chat with.
  Upload { file: PathBuf },
  /// Show one document's metadata.
  Show { id: Uuid },
  /// Print a document's conversation.
  History { id: Uuid },
  /// Ask a single question about a document.
  Ask {
    id:       Uuid,
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,
  },
  /// Interactive conversation with a document.
  Chat { id: Uuid },
  /// (Re)build a document's embeddings.
  Ingest { id: Uuid },
  /// Delete a document, its file and its conversation.
  Rm {
    id:  Uuid,
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,
  },
  /// Save a document's PDF locally.
  Download {
    id:     Uuid,
    /// Output path (default: the document's original name).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(args: &Args, file: ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, file: String| {
    flag.clone().or_else(|| (!file.is_empty()).then_some(file))
  };
  ApiConfig {
    base_url: pick(&args.url, file.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: pick(&args.user, file.username).unwrap_or_default(),
    password: pick(&args.password, file.password).unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(resolve(&args, file_cfg))?;

  match args.command {
    Command::Me => commands::me(&client).await,
    Command::Ls => commands::list(&client).await,
    Command::Upload { file } => commands::upload(&client, &file).await,
    Command::Show { id } => commands::show(&client, id).await,
    Command::History { id } => commands::history(&client, id).await,
    Command::Ask { id, question } => commands::ask(&client, id, &question.join(" ")).await,
    Command::Chat { id } => commands::chat(&client, id).await,
    Command::Ingest { id } => commands::ingest(&client, id).await,
    Command::Rm { id, yes } => commands::remove(&client, id, yes).await,
    Command::Download { id, output } => commands::download(&client, id, output).await,
  }
}

#[cfg(test)]
mod tests;
