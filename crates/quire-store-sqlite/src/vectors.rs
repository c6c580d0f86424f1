//! [`VectorIndex`] over the `vectors` and `vec_chunks` tables.
//!
//! `vectors` holds chunk text and positions; `vec_chunks` is the sqlite-vec
//! `vec0` index holding the embeddings under the same rowid, partitioned by
//! namespace. Similarity search is a KNN `MATCH` on cosine distance.

use quire_core::vector::{Chunk, ScoredChunk, VectorIndex, VectorRecord};
use rusqlite::OptionalExtension as _;

use crate::{
  encode::{encode_embedding, encode_uuid},
  store::SqliteStore,
  Error, Result,
};

struct RawHit {
  chunk_index: i64,
  page:        Option<i64>,
  content:     String,
  distance:    f64,
}

impl RawHit {
  fn into_scored(self) -> Result<ScoredChunk> {
    let index = u32::try_from(self.chunk_index)
      .map_err(|_| Error::Decode(format!("bad chunk index {}", self.chunk_index)))?;
    Ok(ScoredChunk {
      chunk: Chunk {
        text: self.content,
        page: self.page.map(|p| u32::try_from(p).unwrap_or(0)),
        index,
      },
      score: (1.0 - self.distance) as f32,
    })
  }
}

impl SqliteStore {
  fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
    if embedding.len() == self.dimensions {
      Ok(())
    } else {
      Err(Error::Dimensions { expected: self.dimensions, got: embedding.len() })
    }
  }
}

impl VectorIndex for SqliteStore {
  type Error = Error;

  async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
    let ns = namespace.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM vectors WHERE namespace = ?1 LIMIT 1",
            rusqlite::params![ns],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn count(&self, namespace: &str) -> Result<u64> {
    let ns = namespace.to_owned();

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM vectors WHERE namespace = ?1",
          rusqlite::params![ns],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(n.max(0) as u64)
  }

  async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<()> {
    if records.is_empty() {
      return Ok(());
    }
    for r in &records {
      self.check_dimensions(&r.embedding)?;
    }
    let ns = namespace.to_owned();
    let rows: Vec<_> = records
      .into_iter()
      .map(|r| {
        (
          encode_uuid(r.id),
          i64::from(r.chunk.index),
          r.chunk.page.map(i64::from),
          r.chunk.text,
          encode_embedding(&r.embedding),
        )
      })
      .collect();
    let n = rows.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut upsert_row = tx.prepare(
            "INSERT INTO vectors (namespace, vector_id, chunk_index, page, content)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(namespace, vector_id) DO UPDATE SET
               chunk_index = excluded.chunk_index,
               page        = excluded.page,
               content     = excluded.content
             RETURNING id",
          )?;
          // vec0 has no upsert; replace the embedding by rowid.
          let mut drop_embedding = tx.prepare("DELETE FROM vec_chunks WHERE rowid = ?1")?;
          let mut put_embedding = tx.prepare(
            "INSERT INTO vec_chunks (rowid, namespace, embedding) VALUES (?1, ?2, ?3)",
          )?;
          for (id, index, page, content, embedding) in rows {
            let rowid: i64 = upsert_row
              .query_row(rusqlite::params![ns, id, index, page, content], |r| r.get(0))?;
            drop_embedding.execute(rusqlite::params![rowid])?;
            put_embedding.execute(rusqlite::params![rowid, ns, embedding])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(namespace, vectors = n, "upserted vectors");
    Ok(())
  }

  async fn query(
    &self,
    namespace: &str,
    embedding: &[f32],
    top_k: usize,
  ) -> Result<Vec<ScoredChunk>> {
    if top_k == 0 {
      return Ok(Vec::new());
    }
    self.check_dimensions(embedding)?;
    let ns = namespace.to_owned();
    let needle = encode_embedding(embedding);
    let k = i64::try_from(top_k).unwrap_or(i64::MAX);

    let raws: Vec<RawHit> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "WITH knn AS (
             SELECT rowid, distance FROM vec_chunks
             WHERE embedding MATCH ?1 AND k = ?2 AND namespace = ?3
           )
           SELECT v.chunk_index, v.page, v.content, knn.distance
           FROM knn JOIN vectors v ON v.id = knn.rowid
           ORDER BY knn.distance, v.chunk_index",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![needle, k, ns], |row| {
            Ok(RawHit {
              chunk_index: row.get(0)?,
              page:        row.get(1)?,
              content:     row.get(2)?,
              distance:    row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHit::into_scored).collect()
  }

  async fn delete_namespace(&self, namespace: &str) -> Result<()> {
    let ns = namespace.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM vec_chunks WHERE rowid IN (SELECT id FROM vectors WHERE namespace = ?1)",
          rusqlite::params![ns],
        )?;
        let removed = tx.execute("DELETE FROM vectors WHERE namespace = ?1", rusqlite::params![ns])?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    tracing::debug!(namespace, removed, "deleted vector namespace");
    Ok(())
  }
}
