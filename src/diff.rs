//! # Diff Module
//!
//! This module renders unified diffs between a file's original content and
//! the content edheader would write. It is used by `--show-diff` and
//! `--save-diff`, mostly together with `--dry-run`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use similar::TextDiff;

/// Manages diff creation and rendering for header changes.
///
/// This struct handles:
/// - Generating unified diffs between original and modified content
/// - Displaying diffs to stderr with colorization
/// - Appending diffs to a file
#[derive(Debug, Clone, Default)]
pub struct DiffManager {
  /// Whether to print diffs to stderr
  pub show_diff: bool,

  /// File that collects every diff of the run
  pub save_diff_path: Option<PathBuf>,
}

impl DiffManager {
  /// Creates a new DiffManager with the specified configuration.
  ///
  /// # Parameters
  ///
  /// * `show_diff` - Whether to print diffs to stderr
  /// * `save_diff_path` - File to append every diff to
  pub const fn new(show_diff: bool, save_diff_path: Option<PathBuf>) -> Self {
    Self {
      show_diff,
      save_diff_path,
    }
  }

  /// Whether this manager has anything to do.
  pub const fn is_enabled(&self) -> bool {
    self.show_diff || self.save_diff_path.is_some()
  }

  /// Displays and/or saves the diff between `original` and `new`.
  ///
  /// Diffs from several files are appended to the same save file, producing
  /// one consolidated patch.
  ///
  /// # Errors
  ///
  /// Returns an error if the save file cannot be opened or written.
  pub fn display_diff(&self, path: &Path, original: &str, new: &str) -> Result<()> {
    if original == new {
      return Ok(());
    }

    let diff = render_diff(path, original, new);

    if self.show_diff {
      for line in diff.split_inclusive('\n') {
        if line.starts_with('+') && !line.starts_with("+++") {
          eprint!("{}", line.if_supports_color(Stream::Stderr, |l| l.green()));
        } else if line.starts_with('-') && !line.starts_with("---") {
          eprint!("{}", line.if_supports_color(Stream::Stderr, |l| l.red()));
        } else {
          eprint!("{line}");
        }
      }
      if !diff.ends_with('\n') {
        eprintln!();
      }
    }

    if let Some(ref diff_path) = self.save_diff_path {
      let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(diff_path)
        .with_context(|| format!("Failed to open diff file: {}", diff_path.display()))?;
      file
        .write_all(diff.as_bytes())
        .with_context(|| format!("Failed to write diff file: {}", diff_path.display()))?;
    }

    Ok(())
  }
}

/// Renders a unified diff with `a/` and `b/` headers.
pub fn render_diff(path: &Path, original: &str, new: &str) -> String {
  let display = path.display().to_string();
  TextDiff::from_lines(original, new)
    .unified_diff()
    .context_radius(3)
    .header(&format!("a/{display}"), &format!("b/{display}"))
    .to_string()
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_render_diff_shows_inserted_header() {
    let diff = render_diff(Path::new("src/main.rs"), "fn main() {}\n", "// Copyright Acme\n\nfn main() {}\n");
    assert!(diff.contains("--- a/src/main.rs"));
    assert!(diff.contains("+++ b/src/main.rs"));
    assert!(diff.contains("+// Copyright Acme"));
    assert!(diff.contains(" fn main() {}"));
  }

  #[test]
  fn test_save_diff_appends() {
    let dir = tempdir().expect("tempdir");
    let diff_path = dir.path().join("changes.patch");
    let manager = DiffManager::new(false, Some(diff_path.clone()));

    manager
      .display_diff(Path::new("a.rs"), "a\n", "// h\na\n")
      .expect("first diff");
    manager
      .display_diff(Path::new("b.rs"), "b\n", "// h\nb\n")
      .expect("second diff");
    manager
      .display_diff(Path::new("c.rs"), "same\n", "same\n")
      .expect("no diff");

    let saved = std::fs::read_to_string(&diff_path).expect("read diff");
    assert!(saved.contains("a/a.rs"));
    assert!(saved.contains("a/b.rs"));
    assert!(!saved.contains("c.rs"));
  }
}
