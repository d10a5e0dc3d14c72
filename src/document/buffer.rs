//! Line-addressable text buffer over one file's content.

use std::fmt;

use serde::Serialize;

/// Line terminator convention of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
  #[default]
  Lf,
  CrLf,
}

impl LineSeparator {
  pub const fn as_str(self) -> &'static str {
    match self {
      LineSeparator::Lf => "\n",
      LineSeparator::CrLf => "\r\n",
    }
  }

  /// Detects the convention from the first terminator in `text`.
  ///
  /// Returns `None` when the text holds no line terminator at all.
  pub fn detect(text: &str) -> Option<Self> {
    let index = text.find('\n')?;
    if index > 0 && text.as_bytes()[index - 1] == b'\r' {
      Some(LineSeparator::CrLf)
    } else {
      Some(LineSeparator::Lf)
    }
  }
}

impl fmt::Display for LineSeparator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LineSeparator::Lf => write!(f, "LF"),
      LineSeparator::CrLf => write!(f, "CRLF"),
    }
  }
}

/// Mutable text buffer with a line cursor and one level of backtracking.
///
/// Offsets are byte offsets and always fall on character boundaries: the
/// cursor only ever stops right after a `\n` or at the end of the buffer, and
/// callers only edit at offsets obtained from [`DocumentBuffer::position`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBuffer {
  content: String,
  position: usize,
  previous: usize,
}

impl DocumentBuffer {
  pub const fn new(content: String) -> Self {
    Self {
      content,
      position: 0,
      previous: 0,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.content
  }

  pub fn into_string(self) -> String {
    self.content
  }

  pub const fn len(&self) -> usize {
    self.content.len()
  }

  pub const fn is_empty(&self) -> bool {
    self.content.is_empty()
  }

  /// Current cursor offset.
  pub const fn position(&self) -> usize {
    self.position
  }

  /// Text from the cursor to the end of the buffer.
  pub fn remaining(&self) -> &str {
    &self.content[self.position..]
  }

  /// Returns the next logical line without its terminator and advances past
  /// the terminator. Returns `None` at the end of the buffer.
  pub fn next_line(&mut self) -> Option<&str> {
    if self.position >= self.content.len() {
      return None;
    }

    let start = self.position;
    let rest = &self.content[start..];
    let (line_end, next) = match rest.find('\n') {
      Some(index) => (start + index, start + index + 1),
      None => (self.content.len(), self.content.len()),
    };

    self.previous = start;
    self.position = next;

    let line = &self.content[start..line_end];
    Some(line.strip_suffix('\r').unwrap_or(line))
  }

  /// Moves the cursor back to where it stood before the last `next_line`.
  pub const fn rewind(&mut self) {
    self.position = self.previous;
  }

  /// Moves the cursor to `position`, clamped to the buffer length.
  pub fn reset_to(&mut self, position: usize) {
    let position = position.min(self.content.len());
    self.position = position;
    self.previous = position;
  }

  pub fn reset(&mut self) {
    self.reset_to(0);
  }

  /// Line separator of the buffer, or `None` if it holds no terminator.
  pub fn line_separator(&self) -> Option<LineSeparator> {
    LineSeparator::detect(&self.content)
  }

  /// Separator used for inserted text: the detected one, LF otherwise.
  pub fn separator_or_default(&self) -> LineSeparator {
    self.line_separator().unwrap_or_default()
  }

  /// Inserts `text` at `offset`. The cursor is reset to the start.
  pub fn insert(&mut self, offset: usize, text: &str) {
    let offset = offset.min(self.content.len());
    self.content.insert_str(offset, text);
    self.reset();
  }

  /// Deletes the half-open range `start..end`. The cursor is reset to the start.
  pub fn delete(&mut self, start: usize, end: usize) {
    let end = end.min(self.content.len());
    let start = start.min(end);
    self.content.replace_range(start..end, "");
    self.reset();
  }

  /// Merges consecutive blank lines at the very end of the buffer into a
  /// single blank line.
  pub fn collapse_trailing_blank_lines(&mut self) {
    let separator = self.separator_or_default().as_str();
    let body_len = self.content.trim_end_matches(['\r', '\n']).len();
    let terminators = self.content[body_len..].matches('\n').count();

    if body_len == 0 {
      if terminators > 1 {
        self.content = separator.to_string();
        self.reset();
      }
      return;
    }

    // The last content line's own terminator plus one blank line.
    if terminators > 2 {
      self.content.truncate(body_len);
      self.content.push_str(separator);
      self.content.push_str(separator);
      self.reset();
    }
  }
}
