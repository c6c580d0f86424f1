//! PDF loading, one text blob per page.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::{Error, Result};

pub const PDF_MIME_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracted text of a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
  /// 1-based page number.
  pub number: u32,
  pub text:   String,
}

/// Whether `bytes` starts like a PDF file.
///
/// The header may be preceded by a little junk, which readers tolerate, so
/// the first kilobyte is searched.
pub fn is_pdf(bytes: &[u8]) -> bool {
  let head = &bytes[..bytes.len().min(1024)];
  head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Extract the text of every page in `bytes`.
///
/// Pages without any text are dropped; a document where every page is blank
/// (e.g. a scan without OCR) yields [`Error::NoText`].
pub fn load_pdf(bytes: &[u8]) -> Result<Vec<Page>> {
  if !is_pdf(bytes) {
    return Err(Error::NotPdf);
  }

  // The extractor panics on some malformed inputs; contain that here so a
  // bad upload surfaces as an ordinary error.
  let raw = panic::catch_unwind(AssertUnwindSafe(|| {
    pdf_extract::extract_text_from_mem_by_pages(bytes)
  }))
  .map_err(|_| Error::Extract("extractor panicked".to_string()))?
  .map_err(|e| Error::Extract(e.to_string()))?;

  let total = raw.len();
  let pages: Vec<Page> = raw
    .into_iter()
    .enumerate()
    .filter(|(_, text)| !text.trim().is_empty())
    .map(|(idx, text)| Page { number: idx as u32 + 1, text })
    .collect();

  debug!(total, with_text = pages.len(), "extracted PDF pages");

  if pages.is_empty() {
    return Err(Error::NoText);
  }
  Ok(pages)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn magic_detection() {
    assert!(is_pdf(b"%PDF-1.7\n..."));
    assert!(is_pdf(b"\xef\xbb\xbf%PDF-1.4"));
    assert!(!is_pdf(b"PK\x03\x04 zip file"));
    assert!(!is_pdf(b""));
  }

  #[test]
  fn rejects_non_pdf() {
    assert!(matches!(load_pdf(b"hello"), Err(Error::NotPdf)));
  }

  #[test]
  fn garbage_after_magic_is_an_error() {
    let result = load_pdf(b"%PDF-1.4\nthis is not really a pdf");
    assert!(
      matches!(result, Err(Error::Extract(_) | Error::NoText)),
      "{result:?}"
    );
  }
}
