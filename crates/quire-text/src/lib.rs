//! Text extraction and chunking for quire.
//!
//! Turns PDF bytes into page texts and page texts into overlapping chunks.
//! Pure synchronous; callers on an async runtime should run [`load_pdf`] on a
//! blocking thread.

pub mod error;
mod pdf;
mod split;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use error::{Error, Result};
pub use pdf::{PDF_MIME_TYPE, Page, is_pdf, load_pdf};
pub use split::RecursiveSplitter;
