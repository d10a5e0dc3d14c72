//! # Processor Module
//!
//! This module drives a whole run: it collects files, picks a comment style
//! for each one, and checks, formats, or strips its header.
//!
//! The module is organized into several submodules:
//! - [`file_io`] - Atomic write-back
//! - [`file_collector`] - File collection, exclude globs, and directory traversal
//!
//! Files are processed in parallel on the tokio blocking pool. Every file gets
//! exactly one [`FileReport`]; a failure on one file never touches the others
//! and leaves that file unchanged on disk.

mod file_collector;
mod file_io;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
pub use file_collector::{FileCollector, normalize_path};
pub use file_io::FileIO;
use futures::stream::{self, StreamExt};
use tracing::{debug, trace, warn};

use crate::definitions::{DefinitionRegistry, HeaderDefinition};
use crate::diff::DiffManager;
use crate::document::Document;
use crate::mapping::FileMapping;
use crate::properties::PropertyResolver;
use crate::report::{FileAction, FileReport};
use crate::templates::{DEFAULT_KEYWORDS, HeaderTemplate};
use crate::verbose_log;

/// What a run does to each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Report missing or mismatched headers without writing
  Check,
  /// Insert missing headers and replace mismatched ones
  Format,
  /// Strip detected headers
  Remove,
}

impl Mode {
  /// Whether this mode renders the header template.
  pub const fn needs_template(self) -> bool {
    matches!(self, Mode::Check | Mode::Format)
  }
}

/// Configuration for creating a Processor instance.
pub struct ProcessorConfig {
  pub mode: Mode,
  pub registry: Arc<DefinitionRegistry>,
  pub mapping: Arc<FileMapping>,
  /// Raw header template text; required unless `mode` is [`Mode::Remove`]
  pub header_source: Option<String>,
  pub keywords: Vec<String>,
  pub resolver: PropertyResolver,
  pub workspace_root: PathBuf,

  // Behavior flags
  pub strict: bool,
  pub keyword_guard: bool,
  pub strict_properties: bool,
  pub dry_run: bool,
  pub fail_fast: bool,
  pub jobs: usize,

  pub diff_manager: DiffManager,
}

impl ProcessorConfig {
  /// Creates a new ProcessorConfig with required fields and sensible defaults.
  ///
  /// Use struct update syntax to override specific fields:
  /// ```ignore
  /// ProcessorConfig {
  ///     dry_run: true,
  ///     ..ProcessorConfig::new(Mode::Format, registry, mapping, resolver, workspace_root)
  /// }
  /// ```
  pub fn new(
    mode: Mode,
    registry: Arc<DefinitionRegistry>,
    mapping: Arc<FileMapping>,
    resolver: PropertyResolver,
    workspace_root: PathBuf,
  ) -> Self {
    Self {
      mode,
      registry,
      mapping,
      header_source: None,
      keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
      resolver,
      workspace_root,
      strict: true,
      keyword_guard: false,
      strict_properties: false,
      dry_run: false,
      fail_fast: false,
      jobs: num_cpus::get(),
      diff_manager: DiffManager::default(),
    }
  }
}

/// Processor for handling header operations on files.
///
/// The `Processor` is responsible for:
/// - Mapping each file to a comment style
/// - Resolving template properties per file
/// - Detecting, comparing, inserting, replacing, and removing headers
/// - Writing changed files back atomically (unless dry-running)
/// - Showing diffs
/// - Producing one report per file
pub struct Processor {
  mode: Mode,
  registry: Arc<DefinitionRegistry>,
  mapping: Arc<FileMapping>,
  header_source: Option<String>,
  keywords: Vec<String>,

  /// Template shared by every file when no provider contributes per-file
  /// properties
  shared_template: Option<Arc<HeaderTemplate>>,

  resolver: PropertyResolver,
  workspace_root: PathBuf,
  strict: bool,
  keyword_guard: bool,
  strict_properties: bool,
  dry_run: bool,
  fail_fast: bool,
  jobs: usize,
  diff_manager: DiffManager,

  /// Set once a file fails under `fail_fast`; later files are not started
  aborted: AtomicBool,

  /// Whether the unresolved-placeholder warning was already emitted
  placeholders_warned: AtomicBool,
}

impl std::fmt::Debug for Processor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Processor")
      .field("mode", &self.mode)
      .field("workspace_root", &self.workspace_root)
      .field("resolver", &self.resolver)
      .field("dry_run", &self.dry_run)
      .field("jobs", &self.jobs)
      .finish_non_exhaustive()
  }
}

impl Processor {
  /// Creates a new processor and initialises its property providers.
  ///
  /// # Errors
  ///
  /// Returns an error if:
  /// - The mode needs a header template and none was given
  /// - A property provider fails to initialise
  pub fn new(mut config: ProcessorConfig) -> Result<Self> {
    if config.mode.needs_template() && config.header_source.is_none() {
      bail!("A header template is required; pass --header or set header.file in the config");
    }

    if config.resolver.has_providers() {
      config
        .resolver
        .init_all(config.workspace_root.clone())
        .context("Failed to initialise property providers")?;
    }

    let shared_template = match config.header_source.as_deref() {
      Some(source) if config.mode.needs_template() && !config.resolver.has_providers() => {
        let template = HeaderTemplate::load(source, config.resolver.base()).with_keywords(&config.keywords);
        Some(Arc::new(template))
      }
      _ => None,
    };

    let jobs = config.jobs.max(1);
    debug!(
      "Processor ready: mode={:?}, jobs={}, providers={:?}",
      config.mode,
      jobs,
      config.resolver.provider_names()
    );

    Ok(Self {
      mode: config.mode,
      registry: config.registry,
      mapping: config.mapping,
      header_source: config.header_source,
      keywords: config.keywords,
      shared_template,
      resolver: config.resolver,
      workspace_root: config.workspace_root,
      strict: config.strict,
      keyword_guard: config.keyword_guard,
      strict_properties: config.strict_properties,
      dry_run: config.dry_run,
      fail_fast: config.fail_fast,
      jobs,
      diff_manager: config.diff_manager,
      aborted: AtomicBool::new(false),
      placeholders_warned: AtomicBool::new(false),
    })
  }

  pub const fn mode(&self) -> Mode {
    self.mode
  }

  pub fn workspace_root(&self) -> &Path {
    &self.workspace_root
  }

  /// Processes `files` with up to `jobs` files in flight.
  ///
  /// Reports come back sorted by path. Property providers are closed when
  /// the batch finishes.
  ///
  /// # Errors
  ///
  /// Returns an error only if a worker task panics or is cancelled; per-file
  /// problems are reported as [`FileAction::Failed`].
  pub async fn process_files(self: &Arc<Self>, files: Vec<PathBuf>) -> Result<Vec<FileReport>> {
    let start = std::time::Instant::now();
    let total = files.len();

    let mut results = stream::iter(files)
      .map(|path| {
        let processor = Arc::clone(self);
        tokio::task::spawn_blocking(move || processor.process_file_unless_aborted(&path))
      })
      .buffer_unordered(self.jobs);

    let mut reports = Vec::with_capacity(total);
    while let Some(joined) = results.next().await {
      let Some(report) = joined.context("File worker panicked")? else {
        continue;
      };
      if report.action == FileAction::Failed && self.fail_fast && !self.aborted.swap(true, Ordering::SeqCst) {
        warn!("Stopping after first failure (--fail-fast)");
      }
      reports.push(report);
    }

    self.resolver.close_all();

    reports.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Processed {} of {} files in {}ms", reports.len(), total, start.elapsed().as_millis());
    Ok(reports)
  }

  fn process_file_unless_aborted(&self, path: &Path) -> Option<FileReport> {
    if self.aborted.load(Ordering::SeqCst) {
      trace!("Not started after failure: {}", path.display());
      return None;
    }
    Some(self.process_file(path))
  }

  /// Processes one file and reports what happened to it.
  pub fn process_file(&self, path: &Path) -> FileReport {
    if std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
      trace!("Skipping: {} (symlink)", path.display());
      return FileReport::new(path, FileAction::Skipped).with_message("symlink");
    }

    let Some(style) = self.mapping.resolve(path) else {
      trace!("Skipping: {} (no comment style)", path.display());
      return FileReport::new(path, FileAction::Skipped).with_message("no comment style for this file type");
    };

    let Some(definition) = self.registry.lookup(&style) else {
      return FileReport::new(path, FileAction::Failed)
        .with_style(&style)
        .with_message(format!("unknown comment style '{}'", style));
    };

    match self.transform(path, definition) {
      Ok(report) => report.with_style(style),
      Err(e) => {
        warn!("Failed to process {}: {:#}", path.display(), e);
        FileReport::new(path, FileAction::Failed)
          .with_style(style)
          .with_message(format!("{:#}", e))
      }
    }
  }

  fn transform(&self, path: &Path, definition: Arc<HeaderDefinition>) -> Result<FileReport> {
    let mut document = Document::load(path, definition)?;

    if self.mode == Mode::Remove {
      if self.keyword_guard {
        document = document.with_keyword_guard(&self.keywords);
      }
      let original = document.to_output();
      if !document.remove_header() {
        return Ok(FileReport::new(path, FileAction::Skipped).with_message("no header found"));
      }
      self.commit(path, &original, &document.to_output())?;
      verbose_log!("Removed header from {}", path.display());
      return Ok(FileReport::new(path, FileAction::Removed));
    }

    let template = self.template_for(&document)?;
    // Templates without a keyword line would fail their own guard.
    if self.keyword_guard && template.has_keyword_line() {
      document = document.with_keyword_guard(&self.keywords);
    }
    if document.has_header(&template, self.strict) {
      trace!("Header OK: {}", path.display());
      return Ok(FileReport::new(path, FileAction::Present));
    }

    let had_header = document.is_header_present();
    let original = document.to_output();
    document.update_header(&template);
    let updated = document.to_output();

    if self.mode == Mode::Check {
      self.diff_manager.display_diff(path, &original, &updated)?;
      let action = if had_header {
        FileAction::Mismatched
      } else {
        FileAction::Missing
      };
      return Ok(FileReport::new(path, action));
    }

    if updated == original {
      return Ok(FileReport::new(path, FileAction::Present));
    }

    self.commit(path, &original, &updated)?;
    let action = if had_header {
      verbose_log!("Updated header in {}", path.display());
      FileAction::Updated
    } else {
      verbose_log!("Inserted header into {}", path.display());
      FileAction::Inserted
    };
    Ok(FileReport::new(path, action))
  }

  /// The template for one document: the shared one, or a fresh one built
  /// from the document's resolved properties.
  fn template_for(&self, document: &Document) -> Result<Arc<HeaderTemplate>> {
    let template = match &self.shared_template {
      Some(template) => Arc::clone(template),
      None => {
        let source = self
          .header_source
          .as_deref()
          .context("No header template configured")?;
        let properties = self.resolver.resolve(document)?;
        Arc::new(HeaderTemplate::load(source, &properties).with_keywords(&self.keywords))
      }
    };

    let unresolved = template.unresolved_placeholders();
    if !unresolved.is_empty() {
      if self.strict_properties {
        bail!("Unresolved header template properties: {}", unresolved.join(", "));
      }
      if !self.placeholders_warned.swap(true, Ordering::SeqCst) {
        verbose_log!(
          "Header template has unresolved properties, left as-is: {}",
          unresolved.join(", ")
        );
      }
    }

    Ok(template)
  }

  /// Shows the diff and writes `updated` unless dry-running.
  fn commit(&self, path: &Path, original: &str, updated: &str) -> Result<()> {
    if self.diff_manager.is_enabled() {
      self.diff_manager.display_diff(path, original, updated)?;
    }
    if self.dry_run {
      trace!("Dry run, not writing {}", path.display());
      return Ok(());
    }
    FileIO::write_atomic(path, updated)
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;
  use crate::properties::Properties;

  const HEADER: &str = "Copyright 2024 Acme\nLicensed under MIT";

  fn processor(mode: Mode, root: &Path, configure: impl FnOnce(&mut ProcessorConfig)) -> Processor {
    let mut config = ProcessorConfig::new(
      mode,
      Arc::new(DefinitionRegistry::builtin()),
      Arc::new(FileMapping::builtin()),
      PropertyResolver::new(Properties::new()),
      root.to_path_buf(),
    );
    config.header_source = Some(HEADER.to_string());
    configure(&mut config);
    Processor::new(config).expect("processor")
  }

  #[test]
  fn test_template_required_for_format() {
    let config = ProcessorConfig::new(
      Mode::Format,
      Arc::new(DefinitionRegistry::builtin()),
      Arc::new(FileMapping::builtin()),
      PropertyResolver::new(Properties::new()),
      PathBuf::from("."),
    );
    assert!(Processor::new(config).is_err());
  }

  #[test]
  fn test_format_then_check_then_remove() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("main.rs");
    fs::write(&path, "fn main() {}\n").expect("write");

    let check = processor(Mode::Check, dir.path(), |_| {});
    assert_eq!(check.process_file(&path).action, FileAction::Missing);

    let format = processor(Mode::Format, dir.path(), |_| {});
    let report = format.process_file(&path);
    assert_eq!(report.action, FileAction::Inserted);
    assert_eq!(report.style.as_deref(), Some("DOUBLESLASH_STYLE"));
    let formatted = fs::read_to_string(&path).expect("read");
    assert!(formatted.contains("Copyright 2024 Acme"));
    assert!(formatted.ends_with("fn main() {}\n"));

    assert_eq!(format.process_file(&path).action, FileAction::Present);
    assert_eq!(check.process_file(&path).action, FileAction::Present);

    let remove = processor(Mode::Remove, dir.path(), |config| config.header_source = None);
    assert_eq!(remove.process_file(&path).action, FileAction::Removed);
    assert_eq!(fs::read_to_string(&path).expect("read"), "fn main() {}\n");
    assert_eq!(remove.process_file(&path).action, FileAction::Skipped);
  }

  #[test]
  fn test_dry_run_leaves_file_untouched() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("script.py");
    fs::write(&path, "print('hi')\n").expect("write");

    let format = processor(Mode::Format, dir.path(), |config| config.dry_run = true);
    assert_eq!(format.process_file(&path).action, FileAction::Inserted);
    assert_eq!(fs::read_to_string(&path).expect("read"), "print('hi')\n");
  }

  #[test]
  fn test_keyword_guard_accepts_header_without_keywords() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("main.rs");
    fs::write(&path, "fn main() {}\n").expect("write");

    let format = processor(Mode::Format, dir.path(), |config| {
      config.header_source = Some("Licensed under the MIT License".to_string());
      config.keyword_guard = true;
    });
    assert_eq!(format.process_file(&path).action, FileAction::Inserted);
    assert_eq!(format.process_file(&path).action, FileAction::Present);
    assert_eq!(
      fs::read_to_string(&path).expect("read"),
      "// Licensed under the MIT License\n\nfn main() {}\n"
    );

    let check = processor(Mode::Check, dir.path(), |config| {
      config.header_source = Some("Licensed under the MIT License".to_string());
      config.keyword_guard = true;
    });
    assert_eq!(check.process_file(&path).action, FileAction::Present);
  }

  #[test]
  fn test_keyword_guard_still_protects_keyword_templates() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("main.rs");
    fs::write(&path, "// Licensed under MIT\n\nfn main() {}\n").expect("write");

    let check = processor(Mode::Check, dir.path(), |config| config.keyword_guard = true);
    assert_eq!(check.process_file(&path).action, FileAction::Missing);
  }

  #[test]
  fn test_unknown_file_type_is_skipped() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("blob.unknownext");
    fs::write(&path, "data").expect("write");

    let report = processor(Mode::Format, dir.path(), |_| {}).process_file(&path);
    assert_eq!(report.action, FileAction::Skipped);
    assert_eq!(fs::read_to_string(&path).expect("read"), "data");
  }

  #[test]
  fn test_strict_properties_fail_the_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("main.rs");
    fs::write(&path, "fn main() {}\n").expect("write");

    let format = processor(Mode::Format, dir.path(), |config| {
      config.header_source = Some("Copyright ${owner}".to_string());
      config.strict_properties = true;
    });
    let report = format.process_file(&path);
    assert_eq!(report.action, FileAction::Failed);
    assert!(report.message.as_deref().is_some_and(|m| m.contains("owner")));
    assert_eq!(fs::read_to_string(&path).expect("read"), "fn main() {}\n");
  }

  #[test]
  fn test_invalid_utf8_fails_without_writing() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("main.rs");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).expect("write");

    let report = processor(Mode::Format, dir.path(), |_| {}).process_file(&path);
    assert_eq!(report.action, FileAction::Failed);
    assert_eq!(fs::read(&path).expect("read"), vec![0xff, 0xfe, 0x00, 0x41]);
  }

  #[tokio::test]
  async fn test_process_files_reports_every_file_sorted() {
    let dir = tempdir().expect("tempdir");
    let mut files = Vec::new();
    for name in ["c.rs", "a.py", "b.sh", "d.bin"] {
      let path = dir.path().join(name);
      fs::write(&path, "x\n").expect("write");
      files.push(path);
    }

    let format = Arc::new(processor(Mode::Format, dir.path(), |config| config.jobs = 2));
    let reports = format.process_files(files).await.expect("process");

    let names: Vec<_> = reports
      .iter()
      .map(|r| r.path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
      .collect();
    assert_eq!(names, vec!["a.py", "b.sh", "c.rs", "d.bin"]);
    assert_eq!(reports[0].action, FileAction::Inserted);
    assert_eq!(reports[3].action, FileAction::Skipped);
  }
}
