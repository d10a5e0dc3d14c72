//! Header detection over a [`DocumentBuffer`].
//!
//! Only a bounded prefix of the document is inspected: leading skip-pattern
//! lines, then blank lines, then the first real line either opens a header or
//! the document has none.

use tracing::trace;

use super::buffer::DocumentBuffer;
use crate::definitions::HeaderDefinition;

/// Half-open byte range of a detected header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRange {
  pub start: usize,
  pub end: usize,
}

impl HeaderRange {
  pub const fn len(&self) -> usize {
    self.end - self.start
  }

  pub const fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

/// Detection state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderState {
  #[default]
  NotScanned,
  Found(HeaderRange),
  Absent,
}

/// Result of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
  pub state: HeaderState,
  /// Offset right after the leading skip-pattern lines.
  pub insert_at: usize,
}

/// Scans `buffer` for a header described by `definition`.
///
/// When `guard` is set, a detected block only counts as a header if its text
/// contains one of the (lower-case) keywords.
pub fn scan(buffer: &mut DocumentBuffer, definition: &HeaderDefinition, guard: Option<&[String]>) -> Scan {
  buffer.reset();

  let insert_at = skip_leading_lines(buffer, definition);
  let absent = Scan {
    state: HeaderState::Absent,
    insert_at,
  };

  let Some((start, closes_on_first_line)) = find_header_start(buffer, definition) else {
    trace!("No header start found in {}", definition.type_name());
    return absent;
  };

  let end = if definition.is_multiline() {
    if closes_on_first_line {
      Some(buffer.position())
    } else {
      collect_multiline(buffer, definition)
    }
  } else {
    Some(collect_per_line(buffer, definition))
  };

  let Some(end) = end else {
    buffer.rewind();
    return absent;
  };

  let end = absorb_trailing_blank_lines(buffer, definition, start, end);
  let range = HeaderRange { start, end };

  if let Some(keywords) = guard {
    let text = buffer.as_str()[start..end].to_lowercase();
    if !keywords.iter().any(|keyword| text.contains(keyword.as_str())) {
      trace!("Comment block at {}..{} has no header keyword", start, end);
      return absent;
    }
  }

  trace!("Header found at {}..{}", start, end);
  Scan {
    state: HeaderState::Found(range),
    insert_at,
  }
}

fn skip_leading_lines(buffer: &mut DocumentBuffer, definition: &HeaderDefinition) -> usize {
  let mut insert_at = 0;
  if !definition.has_skip_line_pattern() {
    return insert_at;
  }

  loop {
    let before = buffer.position();
    match buffer.next_line() {
      Some(line) if definition.is_skip_line(line) => insert_at = buffer.position(),
      Some(_) => {
        buffer.reset_to(before);
        break;
      }
      None => break,
    }
  }

  insert_at
}

/// Returns the header start offset and whether the first line also closes a
/// multiline header.
fn find_header_start(buffer: &mut DocumentBuffer, definition: &HeaderDefinition) -> Option<(usize, bool)> {
  loop {
    let before = buffer.position();
    let line = buffer.next_line()?;
    if line.trim().is_empty() {
      continue;
    }

    if !definition.is_first_header_line(line) {
      return None;
    }

    let closes = definition.is_last_header_line(line) && line.trim() != definition.opening_marker();
    return Some((before, closes));
  }
}

fn collect_multiline(buffer: &mut DocumentBuffer, definition: &HeaderDefinition) -> Option<usize> {
  loop {
    let line = buffer.next_line()?;
    let is_last = definition.is_last_header_line(line);
    let is_blank = line.trim().is_empty();
    if is_last {
      return Some(buffer.position());
    }
    if is_blank && !definition.allow_blank_lines() {
      return None;
    }
  }
}

fn collect_per_line(buffer: &mut DocumentBuffer, definition: &HeaderDefinition) -> usize {
  let mut end = buffer.position();
  while let Some(line) = buffer.next_line() {
    if line.trim().is_empty() {
      if definition.allow_blank_lines() {
        continue;
      }
      break;
    }
    if !definition.is_last_header_line(line) {
      break;
    }
    end = buffer.position();
  }
  buffer.reset_to(end);
  end
}

fn absorb_trailing_blank_lines(buffer: &mut DocumentBuffer, definition: &HeaderDefinition, start: usize, end: usize) -> usize {
  let absorb_all = start == 0;
  if !absorb_all && !definition.ends_with_blank_line() {
    return end;
  }

  buffer.reset_to(end);
  let mut end = end;
  while let Some(line) = buffer.next_line() {
    if !line.trim().is_empty() {
      break;
    }
    end = buffer.position();
    if !absorb_all {
      break;
    }
  }
  buffer.reset_to(end);
  end
}
