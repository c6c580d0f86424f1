//! Filesystem [`BlobStore`] for quire.
//!
//! Blobs live under a root directory at their [`BlobPath`]. Uploads stream
//! into a sibling `.part` file which [`BlobStore::finish`] renames into place,
//! so a reader never observes a half-written PDF. Download URLs are `file://`
//! URLs of the published file.

use std::{
  io::{ErrorKind, SeekFrom},
  path::{Path, PathBuf},
};

use bytes::Bytes;
use quire_core::blob::{BlobPath, BlobStore};
use reqwest::Url;
use tokio::{
  fs::{self, OpenOptions},
  io::{AsyncSeekExt as _, AsyncWriteExt as _},
};

pub mod error;

pub use error::{Error, Result};

const PENDING_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  /// Create the root directory if needed and open a store over it.
  pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref();
    fs::create_dir_all(root).await?;
    let root = fs::canonicalize(root).await?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  fn published(&self, path: &BlobPath) -> PathBuf {
    path.segments().fold(self.root.clone(), |acc, seg| acc.join(seg))
  }

  fn pending(&self, path: &BlobPath) -> PathBuf {
    let mut p = self.published(path).into_os_string();
    p.push(PENDING_SUFFIX);
    PathBuf::from(p)
  }
}

async fn remove_if_present(path: &Path) -> Result<bool> {
  match fs::remove_file(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e.into()),
  }
}

impl BlobStore for FsBlobStore {
  type Error = Error;

  async fn write_chunk(&self, path: &BlobPath, offset: u64, bytes: Bytes) -> Result<()> {
    let pending = self.pending(path);
    if let Some(parent) = pending.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut file = if offset == 0 {
      OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&pending)
        .await?
    } else {
      let mut file = match OpenOptions::new().write(true).open(&pending).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
          return Err(Error::NotPending(path.clone()));
        }
        Err(e) => return Err(e.into()),
      };
      let actual = file.metadata().await?.len();
      if actual != offset {
        return Err(Error::OffsetMismatch { path: path.clone(), expected: actual, got: offset });
      }
      file.seek(SeekFrom::Start(offset)).await?;
      file
    };

    file.write_all(&bytes).await?;
    file.flush().await?;
    Ok(())
  }

  async fn finish(&self, path: &BlobPath) -> Result<String> {
    let pending = self.pending(path);
    let published = self.published(path);

    match fs::rename(&pending, &published).await {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::NotFound => {
        return Err(Error::NotPending(path.clone()));
      }
      Err(e) => return Err(e.into()),
    }

    let url = Url::from_file_path(&published)
      .map_err(|()| Error::Url(published.clone()))?;
    tracing::debug!(%path, %url, "published blob");
    Ok(url.to_string())
  }

  async fn read(&self, path: &BlobPath) -> Result<Option<Bytes>> {
    match fs::read(self.published(path)).await {
      Ok(data) => Ok(Some(Bytes::from(data))),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn delete(&self, path: &BlobPath) -> Result<()> {
    let published = remove_if_present(&self.published(path)).await?;
    let pending = remove_if_present(&self.pending(path)).await?;
    tracing::debug!(%path, published, pending, "deleted blob");
    Ok(())
  }
}
