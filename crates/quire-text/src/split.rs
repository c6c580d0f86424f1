//! Recursive character text splitter.
//!
//! Splits on the coarsest separator that occurs in the text (paragraphs, then
//! lines, then words, then characters), recursing into pieces that are still
//! too long, and greedily merges the pieces back into chunks of at most
//! `chunk_size` characters. Consecutive chunks share up to `chunk_overlap`
//! characters of trailing pieces.

use std::collections::VecDeque;

use quire_core::{config::ChunkingConfig, vector::Chunk};

use crate::{Page, Result};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text into overlapping chunks. Lengths are measured in characters.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
  config: ChunkingConfig,
}

impl RecursiveSplitter {
  pub fn new(config: ChunkingConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &ChunkingConfig { &self.config }

  /// Split every page and number the chunks across the whole document.
  pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
    let mut index = 0u32;
    let mut chunks = Vec::new();
    for page in pages {
      for text in self.split_text(&page.text) {
        chunks.push(Chunk { text, page: Some(page.number), index });
        index += 1;
      }
    }
    chunks
  }

  /// Split a single text into chunks, trimmed and non-empty.
  pub fn split_text(&self, text: &str) -> Vec<String> {
    self.split_with(text, &SEPARATORS)
  }

  fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
    // The empty separator always matches, so `position` finds something
    // whenever the list ends with it.
    let idx = separators
      .iter()
      .position(|sep| sep.is_empty() || text.contains(sep))
      .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(idx).copied().unwrap_or("");
    let finer = separators.get(idx + 1..).unwrap_or(&[]);

    let pieces: Vec<&str> = if separator.is_empty() {
      text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
      text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();
    for piece in pieces {
      if char_len(piece) < self.config.chunk_size {
        fitting.push(piece);
        continue;
      }
      if !fitting.is_empty() {
        chunks.extend(self.merge(&fitting, separator));
        fitting.clear();
      }
      if finer.is_empty() {
        chunks.push(piece.trim().to_string());
      } else {
        chunks.extend(self.split_with(piece, finer));
      }
    }
    if !fitting.is_empty() {
      chunks.extend(self.merge(&fitting, separator));
    }
    chunks.retain(|c| !c.is_empty());
    chunks
  }

  /// Greedily join `pieces` with `separator` into chunks of at most
  /// `chunk_size` characters, carrying trailing pieces over as overlap.
  fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
    let size = self.config.chunk_size;
    let overlap = self.config.chunk_overlap;
    let sep_len = char_len(separator);

    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
      let len = char_len(piece);
      let joiner = if window.is_empty() { 0 } else { sep_len };

      if total + len + joiner > size && !window.is_empty() {
        push_joined(&mut chunks, &window, separator);

        // Shed leading pieces until what remains fits as overlap and leaves
        // room for the incoming piece.
        loop {
          let joiner = if window.is_empty() { 0 } else { sep_len };
          let must_shed = total > overlap || (total > 0 && total + len + joiner > size);
          if !must_shed {
            break;
          }
          let Some((_, first_len)) = window.pop_front() else { break };
          let freed_sep = if window.is_empty() { 0 } else { sep_len };
          total -= first_len + freed_sep;
        }
      }

      let joiner = if window.is_empty() { 0 } else { sep_len };
      window.push_back((piece, len));
      total += len + joiner;
    }

    push_joined(&mut chunks, &window, separator);
    chunks
  }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>, separator: &str) {
  let joined = window.iter().map(|(p, _)| *p).collect::<Vec<_>>().join(separator);
  let trimmed = joined.trim();
  if !trimmed.is_empty() {
    chunks.push(trimmed.to_string());
  }
}

fn char_len(s: &str) -> usize { s.chars().count() }

#[cfg(test)]
mod tests {
  use super::*;

  fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
    RecursiveSplitter::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap })
      .unwrap()
  }

  fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{i:03}")).collect::<Vec<_>>().join(" ")
  }

  #[test]
  fn short_text_is_one_chunk() {
    let chunks = splitter(1000, 200).split_text("  Hello world. This is a test.\n");
    assert_eq!(chunks, vec!["Hello world. This is a test."]);
  }

  #[test]
  fn empty_and_blank_text() {
    assert!(splitter(100, 10).split_text("").is_empty());
    assert!(splitter(100, 10).split_text(" \n\n \n").is_empty());
  }

  #[test]
  fn chunks_respect_size() {
    let text = words(500);
    let chunks = splitter(100, 20).split_text(&text);
    assert!(chunks.len() > 1);
    for c in &chunks {
      assert!(c.chars().count() <= 100, "chunk too long: {}", c.len());
    }
  }

  #[test]
  fn consecutive_chunks_overlap() {
    let text = words(200);
    let chunks = splitter(80, 30).split_text(&text);
    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
      let last_word = pair[0].split(' ').next_back().unwrap();
      assert!(
        pair[1].starts_with(last_word) || pair[1].contains(last_word),
        "no overlap between {:?} and {:?}",
        pair[0],
        pair[1]
      );
    }
  }

  #[test]
  fn zero_overlap_partitions_words() {
    let text = words(100);
    let chunks = splitter(64, 0).split_text(&text);
    let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
    let original: Vec<&str> = text.split(' ').collect();
    assert_eq!(rejoined, original);
  }

  #[test]
  fn paragraphs_preferred_over_words() {
    let text = "alpha beta gamma\n\ndelta epsilon zeta";
    let chunks = splitter(20, 0).split_text(text);
    assert_eq!(chunks, vec!["alpha beta gamma", "delta epsilon zeta"]);
  }

  #[test]
  fn unbroken_run_falls_back_to_characters() {
    let text = "x".repeat(250);
    let chunks = splitter(100, 10).split_text(&text);
    assert!(chunks.len() >= 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= 100));
  }

  #[test]
  fn multibyte_text_is_split_on_char_boundaries() {
    let text = "é".repeat(150);
    let chunks = splitter(50, 5).split_text(&text);
    assert!(chunks.iter().all(|c| c.chars().count() <= 50));
  }

  #[test]
  fn pages_are_numbered_and_indexed() {
    let pages = vec![
      Page { number: 1, text: words(40) },
      Page { number: 3, text: "tail page".to_string() },
    ];
    let chunks = splitter(100, 0).split_pages(&pages);
    assert!(chunks.len() >= 3);
    for (i, c) in chunks.iter().enumerate() {
      assert_eq!(c.index, i as u32);
    }
    let last = chunks.last().unwrap();
    assert_eq!(last.page, Some(3));
    assert_eq!(last.text, "tail page");
    assert_eq!(chunks[0].page, Some(1));
  }

  #[test]
  fn invalid_config_rejected() {
    let err = RecursiveSplitter::new(ChunkingConfig { chunk_size: 10, chunk_overlap: 10 });
    assert!(err.is_err());
  }
}
