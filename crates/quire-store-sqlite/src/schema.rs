//! SQL schema for the quire SQLite store.
//!
//! Executed once at connection startup, after sqlite-vec is registered. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id               TEXT PRIMARY KEY,
    has_active_membership INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    document_id  TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    name         TEXT NOT NULL,
    size         INTEGER NOT NULL,
    mime_type    TEXT NOT NULL,
    download_url TEXT,
    storage_path TEXT NOT NULL,
    sha256       TEXT NOT NULL,
    created_at   TEXT NOT NULL    -- RFC 3339 UTC, microsecond precision
);

-- A document's chat. Rows go with their document.
CREATE TABLE IF NOT EXISTS messages (
    message_id  TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    role        TEXT NOT NULL CHECK (role IN ('human', 'ai')),
    message     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Chunk text for embedded vectors, one namespace per document. No foreign
-- key to documents; namespaces are created and dropped through the
-- VectorIndex trait. `id` is the rowid of the matching `vec_chunks` row.
CREATE TABLE IF NOT EXISTS vectors (
    id          INTEGER PRIMARY KEY,
    namespace   TEXT NOT NULL,
    vector_id   TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    page        INTEGER,
    content     TEXT NOT NULL,
    UNIQUE (namespace, vector_id)
);

-- Fixed when the database is created; the vec0 column width depends on it.
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_user_idx  ON documents(user_id, created_at);
CREATE INDEX IF NOT EXISTS messages_doc_idx    ON messages(document_id, created_at);

PRAGMA user_version = 1;
";

/// sqlite-vec index over the embeddings, partitioned by namespace so a KNN
/// query only visits one document's chunks.
pub fn vec_schema(dimensions: usize) -> String {
  format!(
    "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(
    namespace TEXT PARTITION KEY,
    embedding float[{dimensions}] distance_metric=cosine
);"
  )
}
