//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quire_core::{
  document::{Document, NewDocument, User, UserId},
  message::{Message, MessageOrder, NewMessage, Role},
  store::DocumentStore,
};

use crate::{
  encode::{
    encode_dt, encode_role, encode_size, encode_uuid, RawDocument, RawMessage, RawUser,
  },
  extension::register_sqlite_vec,
  schema::{SCHEMA, vec_schema},
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Quire metadata and vectors backed by a single SQLite file.
///
/// Embeddings live in a sqlite-vec `vec0` table whose width is fixed when the
/// database is created. Cloning is cheap; the inner connection is
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:       tokio_rusqlite::Connection,
  pub(crate) dimensions: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` for embeddings of `dimensions`
  /// floats and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
    register_sqlite_vec()?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, dimensions };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(dimensions: usize) -> Result<Self> {
    register_sqlite_vec()?;
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, dimensions };
    store.init_schema().await?;
    Ok(store)
  }

  pub fn dimensions(&self) -> usize { self.dimensions }

  /// Apply the schema and pin the embedding width. Reopening a database with
  /// a different width is an error rather than a silently unusable index.
  async fn init_schema(&self) -> Result<()> {
    if self.dimensions == 0 {
      return Err(Error::Core(quire_core::Error::InvalidConfig(
        "embedding dimensions must be positive".into(),
      )));
    }
    let wanted = self.dimensions.to_string();
    let vec_ddl = vec_schema(self.dimensions);

    let stored: String = self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
          "INSERT INTO settings (key, value) VALUES ('embedding_dimensions', ?1)
           ON CONFLICT(key) DO NOTHING",
          rusqlite::params![wanted],
        )?;
        let stored: String = conn.query_row(
          "SELECT value FROM settings WHERE key = 'embedding_dimensions'",
          [],
          |r| r.get(0),
        )?;
        if stored == wanted {
          conn.execute_batch(&vec_ddl)?;
        }
        Ok(stored)
      })
      .await?;

    let stored: usize = stored
      .parse()
      .map_err(|_| Error::Decode(format!("bad embedding_dimensions setting {stored:?}")))?;
    if stored != self.dimensions {
      return Err(Error::Dimensions { expected: stored, got: self.dimensions });
    }
    Ok(())
  }

  async fn fetch_user(&self, user: &UserId) -> Result<Option<User>> {
    let user_str = user.as_str().to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
            rusqlite::params![user_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

/// Stored timestamps carry microseconds; trim before handing values back so a
/// freshly written row compares equal to the same row read later.
fn stamp(dt: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> { dt.trunc_subsecs(6) }

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, user: &UserId) -> Result<User> {
    let user_str = user.as_str().to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, has_active_membership, created_at)
           VALUES (?1, 0, ?2)
           ON CONFLICT(user_id) DO NOTHING",
          rusqlite::params![user_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    self
      .fetch_user(user)
      .await?
      .ok_or_else(|| Error::Decode(format!("user {user} vanished after upsert")))
  }

  async fn get_user(&self, user: &UserId) -> Result<Option<User>> {
    self.fetch_user(user).await
  }

  async fn set_membership(&self, user: &UserId, active: bool) -> Result<User> {
    let user_str = user.as_str().to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, has_active_membership, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE
             SET has_active_membership = excluded.has_active_membership",
          rusqlite::params![user_str, active, at_str],
        )?;
        Ok(())
      })
      .await?;

    self
      .fetch_user(user)
      .await?
      .ok_or_else(|| Error::Decode(format!("user {user} vanished after update")))
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument) -> Result<Document> {
    let document = Document {
      document_id:  input.document_id,
      user_id:      input.user_id,
      name:         input.name,
      size:         input.size,
      mime_type:    input.mime_type,
      download_url: input.download_url,
      storage_path: input.storage_path,
      sha256:       input.sha256,
      created_at:   stamp(Utc::now()),
    };

    let id_str   = encode_uuid(document.document_id);
    let user_str = document.user_id.as_str().to_owned();
    let name     = document.name.clone();
    let size     = encode_size(document.size);
    let mime     = document.mime_type.clone();
    let url      = document.download_url.clone();
    let path     = document.storage_path.as_str().to_owned();
    let sha      = document.sha256.clone();
    let at_str   = encode_dt(document.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (user_id, has_active_membership, created_at)
           VALUES (?1, 0, ?2)
           ON CONFLICT(user_id) DO NOTHING",
          rusqlite::params![user_str, at_str],
        )?;
        tx.execute(
          "INSERT INTO documents
             (document_id, user_id, name, size, mime_type, download_url,
              storage_path, sha256, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![id_str, user_str, name, size, mime, url, path, sha, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(document)
  }

  async fn get_document(&self, user: &UserId, document_id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(document_id);
    let user_str = user.as_str().to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM documents WHERE document_id = ?1 AND user_id = ?2",
              RawDocument::COLUMNS
            ),
            rusqlite::params![id_str, user_str],
            RawDocument::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self, user: &UserId) -> Result<Vec<Document>> {
    let user_str = user.as_str().to_owned();

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM documents WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC",
          RawDocument::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn count_documents(&self, user: &UserId) -> Result<u64> {
    let user_str = user.as_str().to_owned();

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM documents WHERE user_id = ?1",
          rusqlite::params![user_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(n.max(0) as u64)
  }

  async fn delete_document(&self, user: &UserId, document_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(document_id);
    let user_str = user.as_str().to_owned();

    // Messages follow via ON DELETE CASCADE.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE document_id = ?1 AND user_id = ?2",
          rusqlite::params![id_str, user_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn append_message(
    &self,
    user: &UserId,
    document_id: Uuid,
    input: NewMessage,
  ) -> Result<Option<Message>> {
    let message = Message {
      message_id: Uuid::new_v4(),
      document_id,
      role: input.role,
      message: input.message,
      created_at: stamp(input.created_at),
    };

    let msg_str  = encode_uuid(message.message_id);
    let doc_str  = encode_uuid(document_id);
    let user_str = user.as_str().to_owned();
    let role     = encode_role(message.role);
    let body     = message.message.clone();
    let at_str   = encode_dt(message.created_at);

    // The EXISTS guard makes "wrong owner" and "no such document" the same
    // outcome: nothing inserted.
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO messages (message_id, document_id, role, message, created_at)
           SELECT ?1, ?2, ?3, ?4, ?5
           WHERE EXISTS (
             SELECT 1 FROM documents WHERE document_id = ?2 AND user_id = ?6
           )",
          rusqlite::params![msg_str, doc_str, role, body, at_str, user_str],
        )?)
      })
      .await?;

    Ok((inserted == 1).then_some(message))
  }

  async fn list_messages(
    &self,
    user: &UserId,
    document_id: Uuid,
    order: MessageOrder,
    limit: Option<usize>,
  ) -> Result<Vec<Message>> {
    let doc_str = encode_uuid(document_id);
    let user_str = user.as_str().to_owned();
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let direction = match order {
      MessageOrder::OldestFirst => "ASC",
      MessageOrder::NewestFirst => "DESC",
    };

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT m.message_id, m.document_id, m.role, m.message, m.created_at
           FROM messages m
           JOIN documents d ON d.document_id = m.document_id
           WHERE m.document_id = ?1 AND d.user_id = ?2
           ORDER BY m.created_at {direction}, m.rowid {direction}
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str, user_str, limit], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn count_messages(
    &self,
    user: &UserId,
    document_id: Uuid,
    role: Option<Role>,
  ) -> Result<u64> {
    let doc_str = encode_uuid(document_id);
    let user_str = user.as_str().to_owned();
    let role = role.map(encode_role);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM messages m
           JOIN documents d ON d.document_id = m.document_id
           WHERE m.document_id = ?1 AND d.user_id = ?2
             AND (?3 IS NULL OR m.role = ?3)",
          rusqlite::params![doc_str, user_str, role],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(n.max(0) as u64)
  }
}
