//! A minimal PDF writer for tests.
//!
//! Produces a valid single-font PDF with one page per input string; each line
//! of a string becomes one line of Helvetica text. ASCII only.

/// Build a PDF whose pages contain `pages`, in order.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> { build(pages, 0) }

/// Like [`pdf_with_pages`], padded with a header comment to exactly `len`
/// bytes. Returns the unpadded document if it is already longer.
pub fn pdf_with_len(pages: &[&str], len: usize) -> Vec<u8> {
  let mut pad = 0;
  let mut out = build(pages, pad);
  // Growing the pad can widen the `startxref` offset by a digit, so settle
  // over a few rounds.
  for _ in 0..8 {
    if out.len() == len {
      break;
    }
    let next = (pad + len).saturating_sub(out.len());
    if next == pad {
      break;
    }
    pad = next;
    out = build(pages, pad);
  }
  out
}

fn build(pages: &[&str], pad: usize) -> Vec<u8> {
  // Object layout: 1 catalog, 2 page tree, 3 font, then (page, contents)
  // pairs starting at 4.
  let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
  let kids = page_ids
    .iter()
    .map(|id| format!("{id} 0 R"))
    .collect::<Vec<_>>()
    .join(" ");

  let mut objects: Vec<Vec<u8>> = vec![
    b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
    format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).into_bytes(),
    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
  ];

  for (i, text) in pages.iter().enumerate() {
    let contents_id = page_ids[i] + 1;
    objects.push(
      format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 3 0 R >> >> /Contents {contents_id} 0 R >>"
      )
      .into_bytes(),
    );

    let mut stream = String::from("BT\n/F1 12 Tf\n14 TL\n72 720 Td\n");
    for (n, line) in text.lines().enumerate() {
      if n > 0 {
        stream.push_str("T*\n");
      }
      stream.push_str(&format!("({}) Tj\n", escape(line)));
    }
    stream.push_str("ET");

    let mut obj = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
    obj.extend_from_slice(stream.as_bytes());
    obj.extend_from_slice(b"\nendstream");
    objects.push(obj);
  }

  let mut out = b"%PDF-1.4\n".to_vec();
  if pad > 0 {
    out.push(b'%');
    out.resize(out.len() + pad.saturating_sub(2), b' ');
    out.push(b'\n');
  }
  let mut offsets = Vec::with_capacity(objects.len());
  for (i, body) in objects.iter().enumerate() {
    offsets.push(out.len());
    out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
  }

  let xref_at = out.len();
  out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
  out.extend_from_slice(b"0000000000 65535 f \n");
  for off in offsets {
    out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
  }
  out.extend_from_slice(
    format!(
      "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
      objects.len() + 1
    )
    .as_bytes(),
  );
  out
}

fn escape(line: &str) -> String {
  let mut s = String::with_capacity(line.len());
  for c in line.chars().filter(char::is_ascii) {
    if matches!(c, '(' | ')' | '\\') {
      s.push('\\');
    }
    s.push(c);
  }
  s
}
