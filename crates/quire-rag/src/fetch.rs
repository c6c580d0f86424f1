//! Fetching document bytes by download URL.

use std::{path::PathBuf, time::Duration};

use bytes::Bytes;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("invalid url {url:?}: {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("unsupported url scheme {0:?}")]
  UnsupportedScheme(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {url} returned {status}")]
  Status { url: String, status: u16 },

  #[error("cannot read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Resolves `http(s)://` and `file://` download URLs to bytes.
#[derive(Debug, Clone)]
pub struct UrlFetcher {
  http: reqwest::Client,
}

impl UrlFetcher {
  pub fn new(timeout: Duration) -> Result<Self, FetchError> {
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { http })
  }

  pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
      url:    url.to_owned(),
      reason: e.to_string(),
    })?;

    match parsed.scheme() {
      "http" | "https" => {
        let resp = self.http.get(parsed).send().await?;
        let status = resp.status();
        if !status.is_success() {
          return Err(FetchError::Status { url: url.to_owned(), status: status.as_u16() });
        }
        Ok(resp.bytes().await?)
      }
      "file" => {
        let path = parsed.to_file_path().map_err(|()| FetchError::InvalidUrl {
          url:    url.to_owned(),
          reason: "not a local file path".to_owned(),
        })?;
        match tokio::fs::read(&path).await {
          Ok(data) => Ok(Bytes::from(data)),
          Err(source) => Err(FetchError::Io { path, source }),
        }
      }
      other => Err(FetchError::UnsupportedScheme(other.to_owned())),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  fn fetcher() -> UrlFetcher { UrlFetcher::new(Duration::from_secs(5)).unwrap() }

  #[tokio::test]
  async fn reads_file_urls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();
    let url = Url::from_file_path(&path).unwrap();

    let bytes = fetcher().fetch(url.as_str()).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4");
  }

  #[tokio::test]
  async fn rejects_other_schemes_and_garbage() {
    let f = fetcher();
    assert!(matches!(
      f.fetch("ftp://example.com/a.pdf").await,
      Err(FetchError::UnsupportedScheme(s)) if s == "ftp"
    ));
    assert!(matches!(f.fetch("not a url").await, Err(FetchError::InvalidUrl { .. })));
  }

  #[tokio::test]
  async fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::from_file_path(dir.path().join("absent.pdf")).unwrap();
    assert!(matches!(fetcher().fetch(url.as_str()).await, Err(FetchError::Io { .. })));
  }
}
