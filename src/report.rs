//! # Report Module
//!
//! This module provides functionality for generating reports of header
//! processing in JSON and CSV.
//!
//! It captures the outcome for each processed file, including the comment
//! style used and any error message, and can write this information in the
//! requested format.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Outcome of processing one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
  /// Path to the file
  #[serde(with = "path_serialization")]
  pub path: PathBuf,
  /// What happened to the file
  pub action: FileAction,
  /// Comment style the file was processed with
  #[serde(skip_serializing_if = "Option::is_none")]
  pub style: Option<String>,
  /// Skip reason or error message
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl FileReport {
  pub fn new(path: impl Into<PathBuf>, action: FileAction) -> Self {
    Self {
      path: path.into(),
      action,
      style: None,
      message: None,
    }
  }

  pub fn with_style(mut self, style: impl Into<String>) -> Self {
    self.style = Some(style.into());
    self
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  /// Whether this outcome makes `check` fail.
  pub const fn is_problem(&self) -> bool {
    matches!(
      self.action,
      FileAction::Missing | FileAction::Mismatched | FileAction::Failed
    )
  }
}

/// Possible outcomes for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
  /// Header present and matching the template
  Present,
  /// No header found (check mode)
  Missing,
  /// A header exists but differs from the template (check mode)
  Mismatched,
  /// Header was inserted, or would be in a dry run
  Inserted,
  /// Existing header was replaced, or would be in a dry run
  Updated,
  /// Header was removed, or would be in a dry run
  Removed,
  /// File was not processed (unknown type, nothing to remove, ...)
  Skipped,
  /// Processing failed; the file is unchanged
  Failed,
}

impl FileAction {
  pub const fn as_str(self) -> &'static str {
    match self {
      FileAction::Present => "present",
      FileAction::Missing => "missing",
      FileAction::Mismatched => "mismatched",
      FileAction::Inserted => "inserted",
      FileAction::Updated => "updated",
      FileAction::Removed => "removed",
      FileAction::Skipped => "skipped",
      FileAction::Failed => "failed",
    }
  }
}

impl std::fmt::Display for FileAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Helper module for serializing/deserializing PathBuf
mod path_serialization {
  use std::path::PathBuf;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(path: &std::path::Path, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&path.to_string_lossy())
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    Ok(PathBuf::from(s))
  }
}

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
  /// JSON format for machine readability
  Json,
  /// CSV format for spreadsheet compatibility
  Csv,
}

impl std::fmt::Display for ReportFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ReportFormat::Json => write!(f, "JSON"),
      ReportFormat::Csv => write!(f, "CSV"),
    }
  }
}

/// Error returned when parsing a string into a ReportFormat fails
#[derive(Debug, thiserror::Error)]
#[error("Invalid report format: {0}")]
pub struct ParseReportFormatError(pub String);

impl std::str::FromStr for ReportFormat {
  type Err = ParseReportFormatError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "json" => Ok(ReportFormat::Json),
      "csv" => Ok(ReportFormat::Csv),
      _ => Err(ParseReportFormatError(s.to_string())),
    }
  }
}

/// Report Generator for creating header reports
pub struct ReportGenerator<'a> {
  /// Format of the report to generate
  format: ReportFormat,
  /// Path where the report will be saved
  output_path: &'a Path,
}

impl<'a> ReportGenerator<'a> {
  /// Create a new report generator
  ///
  /// # Parameters
  ///
  /// * `format` - The format to use for the report
  /// * `output_path` - The path where the report will be saved
  pub const fn new(format: ReportFormat, output_path: &'a Path) -> Self {
    Self { format, output_path }
  }

  /// Generate a report from a collection of file reports
  ///
  /// # Parameters
  ///
  /// * `files` - List of file reports to include
  /// * `summary` - Processing summary information
  ///
  /// # Returns
  ///
  /// `Ok(())` if the report was generated successfully, or an error if the
  /// report couldn't be generated or written to disk.
  pub fn generate(&self, files: &[FileReport], summary: &ProcessingSummary) -> Result<()> {
    let content = self.render(files, summary)?;

    fs::write(self.output_path, content)
      .with_context(|| format!("Failed to write report to {}", self.output_path.display()))
  }

  /// Renders the report without writing it.
  ///
  /// # Errors
  ///
  /// Returns an error if JSON serialization fails.
  pub fn render(&self, files: &[FileReport], summary: &ProcessingSummary) -> Result<String> {
    match self.format {
      ReportFormat::Json => Self::generate_json(files, summary),
      ReportFormat::Csv => Ok(Self::generate_csv(files, summary)),
    }
  }

  fn generate_json(files: &[FileReport], summary: &ProcessingSummary) -> Result<String> {
    use serde_json::{json, to_string_pretty};

    let report = json!({
        "summary": summary,
        "files": files,
    });

    to_string_pretty(&report).context("Failed to serialize JSON report")
  }

  fn generate_csv(files: &[FileReport], summary: &ProcessingSummary) -> String {
    let mut csv = String::new();

    csv.push_str("file_path,action,style,message\n");

    for file in files {
      csv.push_str(&format!(
        "{},{},{},{}\n",
        escape_csv(&file.path.to_string_lossy()),
        file.action,
        escape_csv(file.style.as_deref().unwrap_or_default()),
        escape_csv(file.message.as_deref().unwrap_or_default()),
      ));
    }

    csv.push_str("\n# Summary\n");
    csv.push_str(&format!("Total files processed,{}\n", summary.total_files));
    csv.push_str(&format!("Headers present,{}\n", summary.present));
    csv.push_str(&format!("Headers missing,{}\n", summary.missing));
    csv.push_str(&format!("Headers mismatched,{}\n", summary.mismatched));
    csv.push_str(&format!("Headers inserted,{}\n", summary.inserted));
    csv.push_str(&format!("Headers updated,{}\n", summary.updated));
    csv.push_str(&format!("Headers removed,{}\n", summary.removed));
    csv.push_str(&format!("Files skipped,{}\n", summary.skipped));
    csv.push_str(&format!("Files failed,{}\n", summary.failed));
    csv.push_str(&format!(
      "Processing time (seconds),{:.2}\n",
      summary.processing_time.as_secs_f64()
    ));
    csv.push_str(&format!("Generated on,{}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));

    csv
  }
}

/// Escapes commas and line breaks so each record stays on one row.
fn escape_csv(value: &str) -> String {
  value.replace(',', "%2C").replace('\r', "").replace('\n', " ")
}

/// Summary of the processing results
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingSummary {
  /// Total number of files processed
  pub total_files: usize,
  pub present: usize,
  pub missing: usize,
  pub mismatched: usize,
  pub inserted: usize,
  pub updated: usize,
  pub removed: usize,
  pub skipped: usize,
  pub failed: usize,
  /// Total processing time
  #[serde(skip_serializing)]
  pub processing_time: Duration,
  /// Processing time in seconds for serialization
  #[serde(rename = "processing_time_seconds")]
  pub processing_time_secs: f64,
  /// Timestamp when the report was generated
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<i64>,
}

impl ProcessingSummary {
  /// Create a new ProcessingSummary initialized to zero
  pub fn new(processing_time: Duration) -> Self {
    Self {
      processing_time,
      processing_time_secs: processing_time.as_secs_f64(),
      timestamp: Some(Local::now().timestamp()),
      ..Self::default()
    }
  }

  /// Create a ProcessingSummary from a collection of FileReports
  pub fn from_reports(files: &[FileReport], processing_time: Duration) -> Self {
    let mut summary = Self::new(processing_time);
    summary.total_files = files.len();

    for file in files {
      let counter = match file.action {
        FileAction::Present => &mut summary.present,
        FileAction::Missing => &mut summary.missing,
        FileAction::Mismatched => &mut summary.mismatched,
        FileAction::Inserted => &mut summary.inserted,
        FileAction::Updated => &mut summary.updated,
        FileAction::Removed => &mut summary.removed,
        FileAction::Skipped => &mut summary.skipped,
        FileAction::Failed => &mut summary.failed,
      };
      *counter += 1;
    }

    summary
  }

  /// Number of files that make `check` fail.
  pub const fn problems(&self) -> usize {
    self.missing + self.mismatched + self.failed
  }

  /// Number of files written (or that would be written in a dry run).
  pub const fn changed(&self) -> usize {
    self.inserted + self.updated + self.removed
  }
}
