//! Asking a question about a document.

use chrono::Utc;
use quire_core::{
  document::UserId,
  llm::{ChatModel, Embedder},
  message::{MessageOrder, NewMessage, Role},
  quota::Action,
  store::DocumentStore,
  vector::VectorIndex,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Backend, Outcome, Rag, RagError, Result, prompts};

impl<B: Backend> Rag<B> {
  /// Answer `question` from the document's content and its chat so far.
  ///
  /// A quota refusal returns `success: false` and writes nothing. On success
  /// the question and the answer are appended, in that order, and the answer
  /// is returned as the outcome message.
  pub async fn ask(&self, user: &UserId, document_id: Uuid, question: &str) -> Result<Outcome> {
    let question = question.trim();
    if question.is_empty() {
      return Err(RagError::EmptyQuestion);
    }
    let store = &self.services.store;
    let document = self.document(user, document_id).await?;

    let asked = store
      .count_messages(user, document_id, Some(Role::Human))
      .await
      .map_err(RagError::store)?;
    if let Some(message) = self.gate(user, Action::AskQuestion, asked).await? {
      return Ok(Outcome::refused(message));
    }
    let asked_at = Utc::now();

    // A document uploaded without embeddings gets them now.
    let report = self.ingest_document(&document).await?;
    if report.chunks == 0 {
      return Err(RagError::VectorStoreMissing(report.namespace));
    }
    let namespace = report.namespace;

    let mut history = store
      .list_messages(
        user,
        document_id,
        MessageOrder::NewestFirst,
        self.config.retrieval.history_limit,
      )
      .await
      .map_err(RagError::store)?;
    history.reverse();
    let history = prompts::history_turns(&history);

    let search_query = if history.is_empty() {
      question.to_owned()
    } else {
      self
        .services
        .model
        .complete(&prompts::condense(&history, question))
        .await
        .map_err(RagError::model)?
    };
    debug!(%document_id, %search_query, turns = history.len(), "retrieving context");

    let embedding = self
      .services
      .embedder
      .embed_query(&search_query)
      .await
      .map_err(RagError::model)?;
    let context = self
      .services
      .vectors
      .query(&namespace, &embedding, self.config.retrieval.top_k)
      .await
      .map_err(RagError::vectors)?;

    let answer = self
      .services
      .model
      .complete(&prompts::answer(&history, &context, question))
      .await
      .map_err(RagError::model)?;

    store
      .append_message(user, document_id, NewMessage::human(question, asked_at))
      .await
      .map_err(RagError::store)?
      .ok_or(RagError::DocumentNotFound(document_id))?;

    let appended = store
      .append_message(user, document_id, NewMessage::ai(answer.clone(), Utc::now()))
      .await;
    match appended {
      Ok(Some(_)) => {}
      Ok(None) => {
        warn!(%document_id, "document vanished before the answer was stored");
        return Err(RagError::DocumentNotFound(document_id));
      }
      Err(e) => {
        warn!(%document_id, error = %e, "question stored without an answer");
        return Err(RagError::store(e));
      }
    }

    info!(%user, %document_id, chunks = context.len(), "answered question");
    Ok(Outcome::ok(Some(answer)))
  }
}
