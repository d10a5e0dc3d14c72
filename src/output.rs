//! # Output Module
//!
//! This module centralizes all user-facing output for the edheader tool.
//! It provides consistent formatting, colors, and symbols for terminal output.
//!
//! Quiet mode prints nothing but the paths that need attention, one per line,
//! so the output can be piped into other tools.

use std::path::Path;

use owo_colors::{OwoColorize, Stream};

use crate::logging::{is_quiet, is_verbose};
use crate::processor::Mode;
use crate::report::{FileAction, FileReport, ProcessingSummary};

/// Symbols used in output
pub mod symbols {
  /// Success/has header
  pub const SUCCESS: &str = "\u{2713}"; // ✓
  /// Missing header/failure
  pub const FAILURE: &str = "\u{2717}"; // ✗
  /// Header replaced or mismatched
  pub const UPDATED: &str = "\u{21bb}"; // ↻
  /// Header removed
  pub const REMOVED: &str = "-";
}

/// Maximum number of files to show in the default output before truncating
const DEFAULT_FILE_LIST_LIMIT: usize = 20;

/// Print the initial "Checking N files..." style message.
pub fn print_start_message(file_count: usize, mode: Mode, dry_run: bool) {
  if is_quiet() {
    return;
  }

  let verb = match mode {
    Mode::Check => "Checking",
    Mode::Format => "Formatting",
    Mode::Remove => "Removing headers from",
  };
  let suffix = if dry_run && mode != Mode::Check {
    " (dry run)"
  } else {
    ""
  };

  println!("{} {} {}{}...", verb, file_count, files_word(file_count), suffix);
}

/// Print a blank line for visual separation (respects quiet mode).
pub fn print_blank_line() {
  if !is_quiet() {
    println!();
  }
}

/// Print the files that make `check` fail: missing, mismatched, failed.
///
/// In quiet mode only the bare paths are printed.
pub fn print_problem_files(categorized: &CategorizedReports<'_>, workspace_root: Option<&Path>) {
  if is_quiet() {
    let mut all: Vec<&FileReport> = categorized
      .missing
      .iter()
      .chain(&categorized.mismatched)
      .chain(&categorized.failed)
      .copied()
      .collect();
    all.sort_by(|a, b| a.path.cmp(&b.path));
    for file in all {
      println!("{}", make_relative_path(&file.path, workspace_root));
    }
    return;
  }

  print_file_list(
    &categorized.missing,
    &format!(
      "{} {} {} missing a header:",
      symbols::FAILURE.if_supports_color(Stream::Stdout, |s| s.red()),
      categorized.missing.len(),
      files_word(categorized.missing.len())
    ),
    workspace_root,
  );
  print_file_list(
    &categorized.mismatched,
    &format!(
      "{} {} {} with a header that differs from the template:",
      symbols::UPDATED.if_supports_color(Stream::Stdout, |s| s.yellow()),
      categorized.mismatched.len(),
      files_word(categorized.mismatched.len())
    ),
    workspace_root,
  );
  print_failed_files(&categorized.failed, workspace_root);
}

/// Print the files that were (or would be) written.
pub fn print_changed_files(categorized: &CategorizedReports<'_>, dry_run: bool, workspace_root: Option<&Path>) {
  if is_quiet() {
    let mut all: Vec<&FileReport> = categorized
      .inserted
      .iter()
      .chain(&categorized.updated)
      .chain(&categorized.removed)
      .copied()
      .collect();
    all.sort_by(|a, b| a.path.cmp(&b.path));
    for file in all {
      println!("{}", make_relative_path(&file.path, workspace_root));
    }
    return;
  }

  let (inserted, updated, removed) = if dry_run {
    ("Would insert a header into", "Would update the header in", "Would remove the header from")
  } else {
    ("Inserted a header into", "Updated the header in", "Removed the header from")
  };

  for (files, symbol, verb) in [
    (&categorized.inserted, symbols::SUCCESS, inserted),
    (&categorized.updated, symbols::UPDATED, updated),
    (&categorized.removed, symbols::REMOVED, removed),
  ] {
    let count = files.len();
    let header = format!(
      "{} {} {} {}:",
      symbol.if_supports_color(Stream::Stdout, |s| s.green()),
      verb,
      count,
      files_word(count)
    );
    print_file_list(files, &header, workspace_root);
  }

  print_failed_files(&categorized.failed, workspace_root);
}

/// Failed files always list their error message.
fn print_failed_files(files: &[&FileReport], workspace_root: Option<&Path>) {
  if files.is_empty() {
    return;
  }

  let count = files.len();
  println!(
    "{} {} {} could not be processed:",
    symbols::FAILURE.if_supports_color(Stream::Stdout, |s| s.red()),
    count,
    files_word(count)
  );
  let mut sorted: Vec<_> = files.to_vec();
  sorted.sort_by(|a, b| a.path.cmp(&b.path));
  for file in sorted {
    println!(
      "  {}: {}",
      make_relative_path(&file.path, workspace_root),
      file
        .message
        .as_deref()
        .unwrap_or("unknown error")
        .if_supports_color(Stream::Stdout, |s| s.red())
    );
  }
}

/// Print a header line plus up to `DEFAULT_FILE_LIST_LIMIT` sorted paths.
/// In verbose mode, shows all files.
fn print_file_list(files: &[&FileReport], header: &str, workspace_root: Option<&Path>) {
  if files.is_empty() {
    return;
  }

  let mut sorted_files: Vec<_> = files.to_vec();
  sorted_files.sort_by(|a, b| a.path.cmp(&b.path));

  println!("{}", header);

  let count = sorted_files.len();
  let limit = if is_verbose() { count } else { DEFAULT_FILE_LIST_LIMIT };

  for file in sorted_files.iter().take(limit) {
    println!("  {}", make_relative_path(&file.path, workspace_root));
  }

  if count > limit {
    println!(
      "  {}",
      format!("... and {} more (use -v to see all)", count - limit).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
}

/// Print the success message when every checked file is fine.
pub fn print_all_files_ok() {
  if is_quiet() {
    return;
  }

  println!(
    "{} All files have the expected header.",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green())
  );
}

/// Print the processing summary.
///
/// Format: "Summary: X OK, Y missing, Z mismatched, ..."
/// In verbose mode, also shows timing.
pub fn print_summary(summary: &ProcessingSummary, mode: Mode) {
  if is_quiet() {
    return;
  }

  let highlight = |count: usize| {
    if count > 0 {
      count.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
    } else {
      count.if_supports_color(Stream::Stdout, |s| s.cyan()).to_string()
    }
  };

  let mut summary_line = match mode {
    Mode::Check => format!(
      "Summary: {} OK, {} missing, {} mismatched",
      summary.present.if_supports_color(Stream::Stdout, |s| s.cyan()),
      highlight(summary.missing),
      highlight(summary.mismatched)
    ),
    Mode::Format => format!(
      "Summary: {} OK, {} inserted, {} updated",
      summary.present.if_supports_color(Stream::Stdout, |s| s.cyan()),
      summary.inserted.if_supports_color(Stream::Stdout, |s| s.cyan()),
      summary.updated.if_supports_color(Stream::Stdout, |s| s.cyan())
    ),
    Mode::Remove => format!(
      "Summary: {} removed",
      summary.removed.if_supports_color(Stream::Stdout, |s| s.cyan())
    ),
  };

  summary_line.push_str(&format!(
    ", {} skipped, {} failed",
    summary.skipped.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    highlight(summary.failed)
  ));

  if is_verbose() {
    summary_line.push_str(&format!(" ({:.2}s)", summary.processing_time.as_secs_f64()));
  }

  println!("{}", summary_line);
}

/// Print a hint for the user about what to do next.
pub fn print_hint(message: &str) {
  if is_quiet() {
    return;
  }

  println!("{}", message.if_supports_color(Stream::Stdout, |s| s.yellow()));
}

/// File reports grouped by outcome.
#[derive(Debug, Default)]
pub struct CategorizedReports<'a> {
  pub present: Vec<&'a FileReport>,
  pub missing: Vec<&'a FileReport>,
  pub mismatched: Vec<&'a FileReport>,
  pub inserted: Vec<&'a FileReport>,
  pub updated: Vec<&'a FileReport>,
  pub removed: Vec<&'a FileReport>,
  pub skipped: Vec<&'a FileReport>,
  pub failed: Vec<&'a FileReport>,
}

impl<'a> CategorizedReports<'a> {
  /// Categorize a slice of file reports.
  pub fn from_reports(reports: &'a [FileReport]) -> Self {
    let mut categorized = Self::default();

    for report in reports {
      let bucket = match report.action {
        FileAction::Present => &mut categorized.present,
        FileAction::Missing => &mut categorized.missing,
        FileAction::Mismatched => &mut categorized.mismatched,
        FileAction::Inserted => &mut categorized.inserted,
        FileAction::Updated => &mut categorized.updated,
        FileAction::Removed => &mut categorized.removed,
        FileAction::Skipped => &mut categorized.skipped,
        FileAction::Failed => &mut categorized.failed,
      };
      bucket.push(report);
    }

    categorized
  }

  pub fn has_problems(&self) -> bool {
    !(self.missing.is_empty() && self.mismatched.is_empty() && self.failed.is_empty())
  }
}

const fn files_word(count: usize) -> &'static str {
  if count == 1 { "file" } else { "files" }
}

/// Make a path relative to the workspace root for display.
fn make_relative_path(path: &Path, workspace_root: Option<&Path>) -> String {
  if let Some(root) = workspace_root {
    path
      .strip_prefix(root)
      .map(|p| p.to_string_lossy().to_string())
      .unwrap_or_else(|_| path.to_string_lossy().to_string())
  } else {
    path.to_string_lossy().to_string()
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;

  #[test]
  fn test_categorize_reports_mixed() {
    let reports = vec![
      FileReport::new("src/ok.rs", FileAction::Present),
      FileReport::new("src/new.rs", FileAction::Missing),
      FileReport::new("src/old.rs", FileAction::Mismatched),
      FileReport::new("src/added.rs", FileAction::Inserted),
      FileReport::new("src/replaced.rs", FileAction::Updated),
      FileReport::new("src/stripped.rs", FileAction::Removed),
      FileReport::new("data.bin", FileAction::Skipped),
      FileReport::new("src/broken.rs", FileAction::Failed).with_message("boom"),
    ];

    let categorized = CategorizedReports::from_reports(&reports);

    assert_eq!(categorized.present.len(), 1);
    assert_eq!(categorized.missing.len(), 1);
    assert_eq!(categorized.mismatched.len(), 1);
    assert_eq!(categorized.inserted.len(), 1);
    assert_eq!(categorized.updated.len(), 1);
    assert_eq!(categorized.removed.len(), 1);
    assert_eq!(categorized.skipped.len(), 1);
    assert_eq!(categorized.failed.len(), 1);
    assert!(categorized.has_problems());
  }

  #[test]
  fn test_no_problems_when_all_present() {
    let reports = vec![
      FileReport::new("a.rs", FileAction::Present),
      FileReport::new("b.bin", FileAction::Skipped),
    ];
    assert!(!CategorizedReports::from_reports(&reports).has_problems());
  }

  #[test]
  fn test_make_relative_path_with_root() {
    let path = PathBuf::from("/workspace/project/src/main.rs");
    let root = PathBuf::from("/workspace/project");

    let result = make_relative_path(&path, Some(&root));
    assert_eq!(result, "src/main.rs");
  }

  #[test]
  fn test_make_relative_path_without_root() {
    let path = PathBuf::from("/workspace/project/src/main.rs");

    let result = make_relative_path(&path, None);
    assert_eq!(result, "/workspace/project/src/main.rs");
  }
}
