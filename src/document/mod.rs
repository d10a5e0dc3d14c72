//! # Document Module
//!
//! A [`Document`] is one file's content plus the comment style that applies to
//! it. It locates an existing header, compares it against a
//! [`HeaderTemplate`], and inserts, replaces or removes it in place.
//!
//! Line endings and a leading byte-order mark are preserved: the BOM is held
//! aside while the text is edited and restored by [`Document::to_output`].
//!
//! ## Example
//!
//! ```rust
//! use std::path::PathBuf;
//!
//! use edheader::definitions::DefinitionRegistry;
//! use edheader::document::Document;
//! use edheader::properties::Properties;
//! use edheader::templates::HeaderTemplate;
//!
//! let registry = DefinitionRegistry::builtin();
//! let script = registry.lookup("SCRIPT_STYLE").expect("built-in style");
//! let template = HeaderTemplate::load("Copyright Acme", &Properties::new());
//!
//! let mut document = Document::new(PathBuf::from("run.sh"), "#!/bin/sh\necho hi\n".to_string(), script);
//! assert!(!document.has_header(&template, true));
//!
//! document.update_header(&template);
//! assert_eq!(document.content(), "#!/bin/sh\n#\n# Copyright Acme\n#\n\necho hi\n");
//! assert!(document.has_header(&template, true));
//! ```

mod buffer;
mod parser;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
pub use buffer::{DocumentBuffer, LineSeparator};
pub use parser::{HeaderRange, HeaderState};
use tracing::trace;

use crate::definitions::HeaderDefinition;
use crate::templates::HeaderTemplate;

const UTF8_BOM: &str = "\u{feff}";

/// One file's content under edit.
#[derive(Debug, Clone)]
pub struct Document {
  path: PathBuf,
  definition: Arc<HeaderDefinition>,
  buffer: DocumentBuffer,
  has_bom: bool,
  state: HeaderState,
  insert_at: usize,
  guard_keywords: Option<Vec<String>>,
}

impl Document {
  /// Creates a document from already-read content.
  pub fn new(path: PathBuf, content: String, definition: Arc<HeaderDefinition>) -> Self {
    let (content, has_bom) = match content.strip_prefix(UTF8_BOM) {
      Some(rest) => (rest.to_string(), true),
      None => (content, false),
    };

    Self {
      path,
      definition,
      buffer: DocumentBuffer::new(content),
      has_bom,
      state: HeaderState::NotScanned,
      insert_at: 0,
      guard_keywords: None,
    }
  }

  /// Reads a document from disk.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or is not valid UTF-8.
  pub fn load(path: &Path, definition: Arc<HeaderDefinition>) -> Result<Self> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let content = String::from_utf8(bytes).with_context(|| format!("File is not valid UTF-8: {}", path.display()))?;
    Ok(Self::new(path.to_path_buf(), content, definition))
  }

  /// Only treat a detected comment block as a header when it contains one of
  /// `keywords` (case-insensitive).
  #[must_use]
  pub fn with_keyword_guard<I, S>(mut self, keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let keywords: Vec<String> = keywords.into_iter().map(|k| k.as_ref().to_lowercase()).collect();
    self.guard_keywords = (!keywords.is_empty()).then_some(keywords);
    self.state = HeaderState::NotScanned;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn definition(&self) -> &HeaderDefinition {
    &self.definition
  }

  /// Text content without the byte-order mark.
  pub fn content(&self) -> &str {
    self.buffer.as_str()
  }

  pub const fn has_bom(&self) -> bool {
    self.has_bom
  }

  pub fn line_separator(&self) -> Option<LineSeparator> {
    self.buffer.line_separator()
  }

  /// Content as it should be written back, BOM included.
  pub fn to_output(&self) -> String {
    if self.has_bom {
      format!("{UTF8_BOM}{}", self.buffer.as_str())
    } else {
      self.buffer.as_str().to_string()
    }
  }

  /// Runs detection if the document has not been scanned since its last edit.
  pub fn detect(&mut self) -> HeaderState {
    if self.state == HeaderState::NotScanned {
      let scan = parser::scan(&mut self.buffer, &self.definition, self.guard_keywords.as_deref());
      self.state = scan.state;
      self.insert_at = scan.insert_at;
      trace!("Scanned {}: {:?}", self.path.display(), self.state);
    }
    self.state
  }

  /// The detected header text, if any.
  pub fn header_text(&mut self) -> Option<&str> {
    match self.detect() {
      HeaderState::Found(range) => Some(&self.buffer.as_str()[range.start..range.end]),
      _ => None,
    }
  }

  /// Whether a header is present at all, whatever its content.
  pub fn is_header_present(&mut self) -> bool {
    matches!(self.detect(), HeaderState::Found(_))
  }

  /// Whether a header is present and matches `template`.
  pub fn has_header(&mut self, template: &HeaderTemplate, strict: bool) -> bool {
    let HeaderState::Found(range) = self.detect() else {
      return false;
    };

    let separator = self.buffer.line_separator();
    let existing = &self.buffer.as_str()[range.start..range.end];
    template.matches(
      &self.definition,
      existing,
      separator.unwrap_or_default(),
      separator.is_none(),
      strict,
    )
  }

  /// Removes a detected header. Returns `false` when there was none.
  pub fn remove_header(&mut self) -> bool {
    let HeaderState::Found(range) = self.detect() else {
      return false;
    };

    self.buffer.delete(range.start, range.end);
    if range.start == 0 {
      self.buffer.collapse_trailing_blank_lines();
    }
    self.state = HeaderState::Absent;
    true
  }

  /// Replaces a detected header, or inserts one, with `template` rendered for
  /// this document's comment style and line separator.
  ///
  /// The header goes right after any leading skip-pattern lines.
  pub fn update_header(&mut self, template: &HeaderTemplate) {
    let state = self.detect();
    let insert_at = self.insert_at;

    if let HeaderState::Found(range) = state {
      self.buffer.delete(insert_at, range.end);
    }
    if insert_at == 0 {
      let leading_blank = leading_blank_lines_len(self.buffer.as_str());
      self.buffer.delete(0, leading_blank);
    }

    let separator = self.buffer.separator_or_default();
    let header = template.render(&self.definition, separator, false);
    let mut text = String::with_capacity(header.len() + 2 * separator.as_str().len());

    let before = &self.buffer.as_str()[..insert_at];
    if !before.is_empty() && !before.ends_with('\n') {
      text.push_str(separator.as_str());
    }
    text.push_str(&header);

    let rest = &self.buffer.as_str()[insert_at..];
    let header_ends_blank = header.ends_with(&format!("{0}{0}", separator.as_str()));
    if !rest.is_empty() && !starts_with_blank_line(rest) && !header_ends_blank {
      text.push_str(separator.as_str());
    }

    self.buffer.insert(insert_at, &text);
    self.state = HeaderState::NotScanned;
  }
}

fn starts_with_blank_line(text: &str) -> bool {
  let first = text.split('\n').next().unwrap_or("");
  first.trim().is_empty()
}

fn leading_blank_lines_len(text: &str) -> usize {
  let mut offset = 0;
  for line in text.split_inclusive('\n') {
    if !line.ends_with('\n') || !line.trim().is_empty() {
      break;
    }
    offset += line.len();
  }
  offset
}
