use chrono::{Duration, Utc};
use quire_core::{
  blob::BlobPath,
  document::{NewDocument, UserId},
  message::{MessageOrder, NewMessage, Role},
  store::DocumentStore,
  vector::{Chunk, VectorIndex, VectorRecord},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

const DIMS: usize = 2;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(DIMS)
    .await
    .expect("in-memory store should open")
}

fn user(id: &str) -> UserId { UserId::new(id).expect("valid user id") }

fn new_doc(owner: &UserId, name: &str) -> NewDocument {
  let document_id = Uuid::new_v4();
  NewDocument {
    document_id,
    user_id: owner.clone(),
    name: name.to_owned(),
    size: 1234,
    mime_type: "application/pdf".to_owned(),
    download_url: Some(format!("file:///tmp/{document_id}")),
    storage_path: BlobPath::for_document(owner, document_id),
    sha256: "ab".repeat(32),
  }
}

fn record(index: u32, embedding: Vec<f32>) -> VectorRecord {
  VectorRecord {
    id: Uuid::new_v4(),
    chunk: Chunk { text: format!("chunk {index}"), page: Some(1), index },
    embedding,
  }
}

// ─── Users ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_user_is_idempotent_and_starts_free() {
  let s = store().await;
  let alice = user("alice");

  let first = s.upsert_user(&alice).await.unwrap();
  let again = s.upsert_user(&alice).await.unwrap();
  assert!(!first.has_active_membership);
  assert_eq!(first, again);
}

#[tokio::test]
async fn set_membership_creates_and_toggles() {
  let s = store().await;
  let bob = user("bob");

  assert!(s.get_user(&bob).await.unwrap().is_none());
  assert!(s.set_membership(&bob, true).await.unwrap().has_active_membership);
  assert!(!s.set_membership(&bob, false).await.unwrap().has_active_membership);
  assert!(s.get_user(&bob).await.unwrap().is_some());
}

// ─── Documents ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trips() {
  let s = store().await;
  let alice = user("alice");

  let created = s.create_document(new_doc(&alice, "report.pdf")).await.unwrap();
  let fetched = s
    .get_document(&alice, created.document_id)
    .await
    .unwrap()
    .expect("document should exist");
  assert_eq!(created, fetched);
  assert_eq!(
    fetched.storage_path.as_str(),
    format!("users/alice/files/{}", created.document_id)
  );
}

#[tokio::test]
async fn documents_are_scoped_to_owner() {
  let s = store().await;
  let (alice, mallory) = (user("alice"), user("mallory"));

  let doc = s.create_document(new_doc(&alice, "a.pdf")).await.unwrap();
  assert!(s.get_document(&mallory, doc.document_id).await.unwrap().is_none());
  assert!(!s.delete_document(&mallory, doc.document_id).await.unwrap());
  assert_eq!(s.count_documents(&mallory).await.unwrap(), 0);
  assert_eq!(s.count_documents(&alice).await.unwrap(), 1);
}

#[tokio::test]
async fn list_documents_newest_first() {
  let s = store().await;
  let alice = user("alice");

  let first = s.create_document(new_doc(&alice, "first.pdf")).await.unwrap();
  let second = s.create_document(new_doc(&alice, "second.pdf")).await.unwrap();

  let ids: Vec<_> = s
    .list_documents(&alice)
    .await
    .unwrap()
    .into_iter()
    .map(|d| d.document_id)
    .collect();
  assert_eq!(ids, vec![second.document_id, first.document_id]);
}

#[tokio::test]
async fn delete_document_cascades_messages() {
  let s = store().await;
  let alice = user("alice");
  let doc = s.create_document(new_doc(&alice, "a.pdf")).await.unwrap();

  s.append_message(&alice, doc.document_id, NewMessage::human("hi", Utc::now()))
    .await
    .unwrap()
    .expect("appended");

  assert!(s.delete_document(&alice, doc.document_id).await.unwrap());
  assert!(!s.delete_document(&alice, doc.document_id).await.unwrap());
  assert_eq!(s.count_messages(&alice, doc.document_id, None).await.unwrap(), 0);

  let leftover: i64 = s
    .conn
    .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?))
    .await
    .unwrap();
  assert_eq!(leftover, 0);
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_to_missing_or_foreign_document_is_none() {
  let s = store().await;
  let (alice, mallory) = (user("alice"), user("mallory"));
  let doc = s.create_document(new_doc(&alice, "a.pdf")).await.unwrap();

  let foreign = s
    .append_message(&mallory, doc.document_id, NewMessage::human("x", Utc::now()))
    .await
    .unwrap();
  let missing = s
    .append_message(&alice, Uuid::new_v4(), NewMessage::human("x", Utc::now()))
    .await
    .unwrap();
  assert!(foreign.is_none());
  assert!(missing.is_none());
  assert_eq!(s.count_messages(&alice, doc.document_id, None).await.unwrap(), 0);
}

#[tokio::test]
async fn messages_order_limit_and_count_by_role() {
  let s = store().await;
  let alice = user("alice");
  let doc = s.create_document(new_doc(&alice, "a.pdf")).await.unwrap();
  let t0 = Utc::now();

  for i in 0..3 {
    let at = t0 + Duration::seconds(i * 2);
    s.append_message(&alice, doc.document_id, NewMessage::human(format!("q{i}"), at))
      .await
      .unwrap();
    s.append_message(
      &alice,
      doc.document_id,
      NewMessage::ai(format!("a{i}"), at + Duration::seconds(1)),
    )
    .await
    .unwrap();
  }

  let oldest = s
    .list_messages(&alice, doc.document_id, MessageOrder::OldestFirst, None)
    .await
    .unwrap();
  let bodies: Vec<_> = oldest.iter().map(|m| m.message.as_str()).collect();
  assert_eq!(bodies, ["q0", "a0", "q1", "a1", "q2", "a2"]);

  let newest = s
    .list_messages(&alice, doc.document_id, MessageOrder::NewestFirst, Some(2))
    .await
    .unwrap();
  let bodies: Vec<_> = newest.iter().map(|m| m.message.as_str()).collect();
  assert_eq!(bodies, ["a2", "q2"]);

  let humans = s
    .count_messages(&alice, doc.document_id, Some(Role::Human))
    .await
    .unwrap();
  assert_eq!(humans, 3);
  assert_eq!(s.count_messages(&alice, doc.document_id, None).await.unwrap(), 6);
}

#[tokio::test]
async fn equal_timestamps_keep_insertion_order() {
  let s = store().await;
  let alice = user("alice");
  let doc = s.create_document(new_doc(&alice, "a.pdf")).await.unwrap();
  let at = Utc::now();

  s.append_message(&alice, doc.document_id, NewMessage::human("question", at))
    .await
    .unwrap();
  s.append_message(&alice, doc.document_id, NewMessage::ai("answer", at))
    .await
    .unwrap();

  let roles: Vec<_> = s
    .list_messages(&alice, doc.document_id, MessageOrder::OldestFirst, None)
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.role)
    .collect();
  assert_eq!(roles, [Role::Human, Role::Ai]);
}

// ─── Vectors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn namespace_lifecycle() {
  let s = store().await;

  assert!(!s.namespace_exists("ns").await.unwrap());
  s.upsert("ns", vec![record(0, vec![1.0, 0.0]), record(1, vec![0.0, 1.0])])
    .await
    .unwrap();
  assert!(s.namespace_exists("ns").await.unwrap());
  assert_eq!(s.count("ns").await.unwrap(), 2);
  assert_eq!(s.count("other").await.unwrap(), 0);

  s.delete_namespace("ns").await.unwrap();
  assert!(!s.namespace_exists("ns").await.unwrap());
  // Deleting an absent namespace is fine.
  s.delete_namespace("ns").await.unwrap();
}

#[tokio::test]
async fn upsert_same_id_replaces() {
  let s = store().await;
  let mut r = record(0, vec![1.0, 0.0]);
  s.upsert("ns", vec![r.clone()]).await.unwrap();
  r.chunk.text = "rewritten".into();
  s.upsert("ns", vec![r]).await.unwrap();

  assert_eq!(s.count("ns").await.unwrap(), 1);
  let hits = s.query("ns", &[1.0, 0.0], 4).await.unwrap();
  assert_eq!(hits[0].chunk.text, "rewritten");
}

#[tokio::test]
async fn query_ranks_by_cosine_and_respects_top_k() {
  let s = store().await;
  s.upsert(
    "ns",
    vec![
      record(0, vec![0.0, 1.0]),
      record(1, vec![1.0, 0.1]),
      record(2, vec![0.7, 0.7]),
    ],
  )
  .await
  .unwrap();

  let hits = s.query("ns", &[1.0, 0.0], 2).await.unwrap();
  let order: Vec<_> = hits.iter().map(|h| h.chunk.index).collect();
  assert_eq!(order, [1, 2]);
  assert!(hits[0].score >= hits[1].score);

  assert!(s.query("ns", &[1.0, 0.0], 0).await.unwrap().is_empty());
  assert!(s.query("empty", &[1.0, 0.0], 4).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_ties_break_by_chunk_index() {
  let s = store().await;
  s.upsert(
    "ns",
    vec![record(2, vec![1.0, 0.0]), record(0, vec![1.0, 0.0]), record(1, vec![1.0, 0.0])],
  )
  .await
  .unwrap();

  let order: Vec<_> = s
    .query("ns", &[1.0, 0.0], 3)
    .await
    .unwrap()
    .into_iter()
    .map(|h| h.chunk.index)
    .collect();
  assert_eq!(order, [0, 1, 2]);
}

#[tokio::test]
async fn namespaces_are_isolated() {
  let s = store().await;
  s.upsert("a", vec![record(0, vec![1.0, 0.0])]).await.unwrap();
  s.upsert("b", vec![record(0, vec![1.0, 0.0])]).await.unwrap();
  s.delete_namespace("a").await.unwrap();
  assert_eq!(s.count("b").await.unwrap(), 1);
}

#[tokio::test]
async fn identical_vector_scores_one() {
  let s = store().await;
  s.upsert("ns", vec![record(0, vec![3.0, 4.0])]).await.unwrap();
  let hits = s.query("ns", &[0.6, 0.8], 1).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert!((hits[0].score - 1.0).abs() < 1e-5, "score {}", hits[0].score);
}

#[tokio::test]
async fn wrong_width_embeddings_are_rejected() {
  let s = store().await;
  let err = s.upsert("ns", vec![record(0, vec![1.0, 0.0, 0.0])]).await.unwrap_err();
  assert!(matches!(err, Error::Dimensions { expected: 2, got: 3 }));
  assert_eq!(s.count("ns").await.unwrap(), 0);

  s.upsert("ns", vec![record(0, vec![1.0, 0.0])]).await.unwrap();
  let err = s.query("ns", &[1.0], 1).await.unwrap_err();
  assert!(matches!(err, Error::Dimensions { expected: 2, got: 1 }));
}

#[tokio::test]
async fn reopening_with_other_width_fails() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("quire.db");

  let first = SqliteStore::open(&path, 4).await.unwrap();
  first.upsert("ns", vec![record(0, vec![1.0, 0.0, 0.0, 0.0])]).await.unwrap();
  drop(first);

  let again = SqliteStore::open(&path, 4).await.unwrap();
  assert_eq!(again.count("ns").await.unwrap(), 1);
  drop(again);

  let err = SqliteStore::open(&path, 8).await.err().expect("width mismatch");
  assert!(matches!(err, Error::Dimensions { expected: 4, got: 8 }));
}

#[tokio::test]
async fn zero_width_is_a_config_error() {
  assert!(matches!(
    SqliteStore::open_in_memory(0).await,
    Err(Error::Core(quire_core::Error::InvalidConfig(_)))
  ));
}
