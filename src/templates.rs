//! # Templates Module
//!
//! This module turns raw header text into concrete, per-dialect headers and
//! compares them against headers that already exist in a document.
//!
//! The module includes:
//! - [`HeaderTemplate`] for loading, interpolating, rendering and comparing
//!   header text
//! - [`read_header_source`] for reading the raw header text from disk
//!
//! ## Example
//!
//! ```rust
//! use edheader::definitions::DefinitionRegistry;
//! use edheader::document::LineSeparator;
//! use edheader::properties::Properties;
//! use edheader::templates::HeaderTemplate;
//!
//! let mut properties = Properties::new();
//! properties.insert("owner".to_string(), "Acme Corp".to_string());
//!
//! let template = HeaderTemplate::load("Copyright ${owner}\nAll rights reserved.\n", &properties);
//! let registry = DefinitionRegistry::builtin();
//! let script = registry.lookup("SCRIPT_STYLE").expect("built-in style");
//!
//! let header = template.render(&script, LineSeparator::Lf, false);
//! assert_eq!(&*header, "#\n# Copyright Acme Corp\n# All rights reserved.\n#\n\n");
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::trace;

use crate::definitions::{EOL_TOKEN, HeaderDefinition};
use crate::document::LineSeparator;
use crate::properties::Properties;

/// Literal used in place of the line separator when a header is rendered for
/// a document that holds no line separator at all.
pub const COLLAPSED_LINE_SEPARATOR: &str = " ";

/// Keyword markers used when none are configured.
pub const DEFAULT_KEYWORDS: &[&str] = &["copyright"];

static PLACEHOLDER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{([^}\s]+)\}").expect("placeholder regex must compile"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RenderKey {
  type_name: String,
  separator: LineSeparator,
  collapse: bool,
}

/// Words of one rendered header line, for single-line comparison.
struct Segment<'a> {
  keyword: bool,
  words: Vec<&'a str>,
}

/// A header template after property interpolation.
///
/// Rendering is pure, so results are memoized per
/// (definition type, line separator, collapse flag). The cache is the only
/// interior mutability and is safe to share between workers.
#[derive(Debug)]
pub struct HeaderTemplate {
  lines: Vec<String>,
  keywords: Vec<String>,
  unresolved: Vec<String>,
  cache: Mutex<HashMap<RenderKey, Arc<str>>>,
}

impl HeaderTemplate {
  /// Loads header text and interpolates `${key}` placeholders.
  ///
  /// Lines may end with either terminator. Trailing blank lines are dropped.
  /// Placeholders without a matching property are left verbatim and reported
  /// by [`unresolved_placeholders`](Self::unresolved_placeholders).
  ///
  /// # Parameters
  ///
  /// * `source` - Raw header text
  /// * `properties` - Values substituted into the text
  pub fn load(source: &str, properties: &Properties) -> Self {
    let mut text = source.to_string();
    for (key, value) in properties {
      let placeholder = format!("${{{key}}}");
      if text.contains(&placeholder) {
        text = text.replace(&placeholder, value);
      }
    }

    let mut unresolved: Vec<String> = PLACEHOLDER_RE
      .captures_iter(&text)
      .map(|caps| caps[1].to_string())
      .collect();
    unresolved.sort();
    unresolved.dedup();

    let mut lines: Vec<String> = text
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
      .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
      lines.pop();
    }

    trace!("Loaded header template with {} line(s)", lines.len());

    Self {
      lines,
      keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
      unresolved,
      cache: Mutex::new(HashMap::new()),
    }
  }

  /// Replaces the keyword markers. Matching is case-insensitive.
  #[must_use]
  pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.keywords = keywords
      .into_iter()
      .map(|k| k.as_ref().trim().to_lowercase())
      .filter(|k| !k.is_empty())
      .collect();
    self.clear_cache();
    self
  }

  /// Content lines after interpolation.
  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn keywords(&self) -> &[String] {
    &self.keywords
  }

  /// Placeholder names that had no matching property, sorted and unique.
  pub fn unresolved_placeholders(&self) -> &[String] {
    &self.unresolved
  }

  /// Whether any content line carries a keyword marker.
  pub fn has_keyword_line(&self) -> bool {
    self.lines.iter().any(|line| self.contains_keyword(line))
  }

  /// Whether `text` contains any keyword marker.
  pub fn contains_keyword(&self, text: &str) -> bool {
    let lower = text.to_lowercase();
    self.keywords.iter().any(|keyword| lower.contains(keyword.as_str()))
  }

  /// Renders the header for `definition`.
  ///
  /// Per-line definitions wrap every content line in `before_each_line` and
  /// `after_each_line`; multiline definitions indent content lines with
  /// `before_each_line` inside one comment token pair. Boundary literals are
  /// emitted with `EOL` replaced by the separator.
  ///
  /// # Parameters
  ///
  /// * `definition` - Comment style to render for
  /// * `separator` - Line separator of the target document
  /// * `collapse` - Use [`COLLAPSED_LINE_SEPARATOR`] instead of a real
  ///   separator, keeping the header on one physical line
  pub fn render(&self, definition: &HeaderDefinition, separator: LineSeparator, collapse: bool) -> Arc<str> {
    let key = RenderKey {
      type_name: definition.type_name().to_string(),
      separator,
      collapse,
    };

    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rendered) = cache.get(&key) {
      return Arc::clone(rendered);
    }

    let separator = if collapse {
      COLLAPSED_LINE_SEPARATOR
    } else {
      separator.as_str()
    };
    let rendered: Arc<str> = Arc::from(self.render_uncached(definition, separator));
    cache.insert(key, Arc::clone(&rendered));
    rendered
  }

  fn render_uncached(&self, definition: &HeaderDefinition, separator: &str) -> String {
    let mut out = String::new();

    if !definition.first_line().is_empty() {
      push_boundary(&mut out, definition.first_line(), separator);
    }

    let after = if definition.is_multiline() {
      ""
    } else {
      definition.after_each_line()
    };
    for line in &self.lines {
      let rendered = format!("{}{}{}", definition.before_each_line(), line, after);
      out.push_str(rendered.trim_end());
      out.push_str(separator);
    }

    if !definition.end_line().is_empty() {
      push_boundary(&mut out, definition.end_line(), separator);
    }

    out
  }

  /// Compares an existing header against this template.
  ///
  /// The template is re-rendered for the document's separator and compared
  /// line by line. Leading and trailing blank lines and trailing whitespace
  /// are ignored; lines containing a keyword are skipped on both sides. When
  /// `strict` is false only the first and last remaining lines are compared.
  ///
  /// For a `collapse`d document the existing header is a single physical
  /// line. It is compared word by word against the rendered lines; a
  /// keyword line of the template stands for any run of words that contains
  /// a keyword.
  pub fn matches(
    &self,
    definition: &HeaderDefinition,
    existing: &str,
    separator: LineSeparator,
    collapse: bool,
    strict: bool,
  ) -> bool {
    if collapse {
      let expected = self.render(definition, LineSeparator::Lf, false);
      let segments: Vec<Segment<'_>> = expected
        .split('\n')
        .map(|line| Segment {
          keyword: self.contains_keyword(line),
          words: line.split_whitespace().collect(),
        })
        .collect();
      let words: Vec<&str> = existing.split_whitespace().collect();
      return self.matches_words(&segments, &words);
    }

    let expected = self.render(definition, separator, false);
    let expected_lines = self.comparable_lines(&expected);
    let existing_lines = self.comparable_lines(existing);

    if strict {
      expected_lines == existing_lines
    } else {
      expected_lines.first() == existing_lines.first() && expected_lines.last() == existing_lines.last()
    }
  }

  fn matches_words(&self, segments: &[Segment<'_>], words: &[&str]) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
      return words.is_empty();
    };

    if !segment.keyword {
      return words.starts_with(&segment.words) && self.matches_words(rest, &words[segment.words.len()..]);
    }

    (1..=words.len()).any(|taken| {
      self.contains_keyword(&words[..taken].join(" ")) && self.matches_words(rest, &words[taken..])
    })
  }

  fn comparable_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
    let mut lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();

    while lines.first().is_some_and(|line| line.is_empty()) {
      lines.remove(0);
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
      lines.pop();
    }

    lines.retain(|line| !self.contains_keyword(line));
    lines
  }

  fn clear_cache(&self) {
    self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
  }
}

fn push_boundary(out: &mut String, literal: &str, separator: &str) {
  let rendered = literal.replace(EOL_TOKEN, separator);
  out.push_str(&rendered);
  if rendered != separator {
    out.push_str(separator);
  }
}

/// Reads raw header text from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_header_source(path: &Path) -> Result<String> {
  trace!("Loading header template from: {}", path.display());
  fs::read_to_string(path).with_context(|| format!("Failed to read header template file: {}", path.display()))
}
