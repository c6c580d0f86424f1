//! One function per subcommand. Output goes to stdout; progress and prompts
//! are plain text so the output pipes cleanly.

use std::{
  io::Write as _,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result, bail};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use quire_core::{
  document::Document,
  message::{Message, Role},
};
use quire_rag::{Outcome, UploadEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::client::ApiClient;

pub async fn me(client: &ApiClient) -> Result<()> {
  let sub = client.me().await?;
  let plan = if sub.has_active_membership { "PRO" } else { "Free" };
  println!("user:      {}", sub.user_id);
  println!("plan:      {plan}");
  match sub.file_limit {
    Some(limit) => println!("documents: {} of {limit}", sub.document_count),
    None => println!("documents: {}", sub.document_count),
  }
  if sub.is_over_file_limit {
    println!("You have reached your document limit.");
  }
  Ok(())
}

pub async fn list(client: &ApiClient) -> Result<()> {
  let docs = client.list_documents().await?;
  if docs.is_empty() {
    println!("No documents yet. Upload one with `quire upload <file.pdf>`.");
  }
  for doc in &docs {
    println!("{}", document_line(doc));
  }
  Ok(())
}

pub async fn show(client: &ApiClient, id: Uuid) -> Result<()> {
  let doc = client.get_document(id).await?;
  println!("id:       {}", doc.document_id);
  println!("name:     {}", doc.name);
  println!("size:     {}", HumanBytes(doc.size));
  println!("type:     {}", doc.mime_type);
  println!("sha256:   {}", doc.sha256);
  println!("uploaded: {}", doc.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
  Ok(())
}

pub async fn upload(client: &ApiClient, file: &Path) -> Result<()> {
  let bar = ProgressBar::new(100);
  bar.set_style(ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}")?.progress_chars("=> "));
  bar.enable_steady_tick(Duration::from_millis(120));

  let result = client
    .upload(file, |event| {
      if let UploadEvent::Uploading { percent, .. } = event {
        bar.set_position(u64::from(*percent));
      }
      bar.set_message(event.label());
    })
    .await;

  match result {
    Ok(UploadEvent::Complete { document, chunks }) => {
      bar.finish_with_message(format!("Ready ({chunks} chunks)"));
      println!("{}", document_line(&document));
      Ok(())
    }
    Ok(UploadEvent::Rejected { message }) => {
      bar.abandon_with_message("Upload rejected");
      bail!(message)
    }
    Ok(other) => {
      bar.abandon();
      bail!("upload ended early: {}", other.label())
    }
    Err(e) => {
      bar.abandon_with_message("Upload failed");
      Err(e)
    }
  }
}

pub async fn history(client: &ApiClient, id: Uuid) -> Result<()> {
  let messages = client.messages(id).await?;
  if messages.is_empty() {
    println!("No messages yet.");
  }
  for m in &messages {
    println!("{}", message_line(m));
  }
  Ok(())
}

pub async fn ask(client: &ApiClient, id: Uuid, question: &str) -> Result<()> {
  let outcome = client.ask(id, question).await?;
  print_outcome(&outcome);
  if !outcome.success {
    bail!("question was not answered");
  }
  Ok(())
}

/// Read questions line by line until EOF or `/quit`.
pub async fn chat(client: &ApiClient, id: Uuid) -> Result<()> {
  let doc = client.get_document(id).await?;
  println!("Chatting with {}. Type /quit to leave.", doc.name);
  for m in client.messages(id).await? {
    println!("{}", message_line(&m));
  }

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    print!("> ");
    std::io::stdout().flush().ok();
    let Some(line) = lines.next_line().await.context("reading stdin")? else { break };
    let question = line.trim();
    match question {
      "" => continue,
      "/quit" | "/exit" => break,
      _ => {}
    }
    match client.ask(id, question).await {
      Ok(outcome) => print_outcome(&outcome),
      Err(e) => eprintln!("error: {e:#}"),
    }
  }
  Ok(())
}

pub async fn ingest(client: &ApiClient, id: Uuid) -> Result<()> {
  let report = client.ingest(id).await?;
  let verb = if report.reused { "already indexed" } else { "indexed" };
  println!("{verb}: {} chunks in namespace {}", report.chunks, report.namespace);
  Ok(())
}

pub async fn remove(client: &ApiClient, id: Uuid, yes: bool) -> Result<()> {
  if !yes {
    let doc = client.get_document(id).await?;
    if !confirm(&format!("Delete {}?", doc.name))? {
      println!("Cancelled.");
      return Ok(());
    }
  }
  let outcome = client.delete_document(id).await?;
  if outcome.success {
    println!("Deleted.");
    Ok(())
  } else {
    bail!(outcome.message.unwrap_or_else(|| "delete refused".to_string()))
  }
}

pub async fn download(client: &ApiClient, id: Uuid, output: Option<PathBuf>) -> Result<()> {
  let output = match output {
    Some(path) => path,
    None => PathBuf::from(local_name(&client.get_document(id).await?.name)),
  };
  let bytes = client.download(id).await?;
  tokio::fs::write(&output, &bytes)
    .await
    .with_context(|| format!("writing {}", output.display()))?;
  println!("Saved {} to {}", HumanBytes(bytes.len() as u64), output.display());
  Ok(())
}

// ─── Formatting ───────────────────────────────────────────────────────────────

fn print_outcome(outcome: &Outcome) {
  match (&outcome.message, outcome.success) {
    (Some(text), true) => println!("{text}"),
    (Some(text), false) => eprintln!("{text}"),
    (None, _) => {}
  }
}

fn confirm(prompt: &str) -> Result<bool> {
  use std::io::BufRead;
  print!("{prompt} [y/N] ");
  std::io::stdout().flush().ok();
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

pub(crate) fn document_line(doc: &Document) -> String {
  format!(
    "{}  {:>9}  {}  {}",
    doc.document_id,
    // HumanBytes ignores width, so pad the rendered string.
    HumanBytes(doc.size).to_string(),
    doc.created_at.format("%Y-%m-%d %H:%M"),
    doc.name
  )
}

pub(crate) fn message_line(m: &Message) -> String {
  let who = match m.role {
    Role::Human => "you",
    Role::Ai => "ai ",
  };
  format!("[{}] {who}: {}", m.created_at.format("%H:%M"), m.message)
}

/// Strip any directory components a server-side name might carry.
pub(crate) fn local_name(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
  if base.is_empty() || base == "." || base == ".." { "document.pdf".to_string() } else { base.to_string() }
}
