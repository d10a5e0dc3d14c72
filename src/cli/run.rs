//! # Run Command
//!
//! This module implements `check`, `format`, and `remove`: it assembles a
//! [`Processor`] from the config file and the command line, runs it, and
//! prints the outcome.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use edheader::config::{Config, load_config};
use edheader::definitions::DefinitionRegistry;
use edheader::diff::DiffManager;
use edheader::info_log;
use edheader::logging::{init_tracing, set_quiet, set_verbose};
use edheader::mapping::FileMapping;
use edheader::output::{
  CategorizedReports, print_all_files_ok, print_blank_line, print_changed_files, print_hint, print_problem_files,
  print_start_message, print_summary,
};
use edheader::processor::{FileCollector, Mode, Processor, ProcessorConfig};
use edheader::properties::{FilesystemYearsProvider, GitYearsProvider, Properties, PropertyResolver, base_properties};
use edheader::report::{FileReport, ProcessingSummary, ReportFormat, ReportGenerator};
use edheader::templates::{DEFAULT_KEYWORDS, read_header_source};
use edheader::workspace::resolve_workspace;
use tracing::debug;

use super::CommonArgs;

/// Run one of the file-processing commands.
///
/// # Returns
///
/// Exit code 1 when `check` finds a missing or mismatched header, or when
/// any file failed.
///
/// # Errors
///
/// Returns an error for configuration problems. No file is touched then.
pub async fn run(mode: Mode, args: CommonArgs, dry_run: bool) -> Result<ExitCode> {
  init_tracing(args.quiet, args.verbose);
  if args.verbose > 0 {
    set_verbose();
  } else if args.quiet {
    set_quiet();
  }
  args.colors.apply();

  let workspace = resolve_workspace(&args.patterns)?;
  let workspace_root = workspace.root().to_path_buf();
  debug!("Using workspace root: {}", workspace_root.display());

  let config = load_config(args.config.as_deref(), &workspace_root, args.no_config)?.unwrap_or_default();

  let registry = config.registry().context("Invalid comment style definitions")?;
  let mapping = build_mapping(&config, &args.mapping, &registry)?;

  let resolver = build_resolver(&config, &args);

  let header_source = if mode.needs_template() {
    let path = args
      .header
      .clone()
      .or_else(|| config.header_file())
      .context("A header template is required; pass --header or set header.file in the config")?;
    Some(read_header_source(&path)?)
  } else {
    None
  };

  let keywords = if !args.keyword.is_empty() {
    args.keyword.clone()
  } else if let Some(ref keywords) = config.header.keywords {
    keywords.clone()
  } else {
    DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect()
  };

  let exclude: Vec<String> = config.exclude.iter().chain(&args.exclude).cloned().collect();
  let collector = FileCollector::new(workspace_root.clone(), &exclude, config.use_gitignore)?;
  let files = collector.collect(&args.patterns)?;

  let processor_config = ProcessorConfig {
    header_source,
    keywords,
    strict: config.header.strict && !args.lenient,
    keyword_guard: config.header.keyword_guard,
    strict_properties: config.header.strict_properties,
    dry_run,
    fail_fast: args.fail_fast,
    jobs: args.jobs.unwrap_or_else(num_cpus::get),
    diff_manager: DiffManager::new(args.show_diff, args.save_diff.clone()),
    ..ProcessorConfig::new(
      mode,
      Arc::new(registry),
      Arc::new(mapping),
      resolver,
      workspace_root.clone(),
    )
  };
  let processor = Arc::new(Processor::new(processor_config)?);

  print_start_message(files.len(), mode, dry_run);

  if files.is_empty() {
    print_blank_line();
    print_all_files_ok();
    return Ok(ExitCode::SUCCESS);
  }

  let start_time = Instant::now();
  let reports = processor.process_files(files).await?;
  let summary = ProcessingSummary::from_reports(&reports, start_time.elapsed());
  let categorized = CategorizedReports::from_reports(&reports);

  print_blank_line();
  print_outcome(mode, dry_run, &categorized, &workspace_root);

  print_blank_line();
  print_summary(&summary, mode);

  if mode == Mode::Check && categorized.has_problems() {
    print_blank_line();
    print_hint("Run `edheader format` with the same arguments to fix missing and outdated headers.");
  }

  write_reports(&args, &reports, &summary);

  let failed = match mode {
    Mode::Check => summary.problems() > 0,
    Mode::Format | Mode::Remove => summary.failed > 0,
  };
  Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn print_outcome(mode: Mode, dry_run: bool, categorized: &CategorizedReports<'_>, workspace_root: &Path) {
  match mode {
    Mode::Check => {
      if categorized.has_problems() {
        print_problem_files(categorized, Some(workspace_root));
      } else {
        print_all_files_ok();
      }
    }
    Mode::Format | Mode::Remove => {
      let changed = categorized.inserted.len() + categorized.updated.len() + categorized.removed.len();
      print_changed_files(categorized, dry_run, Some(workspace_root));
      if changed == 0 && categorized.failed.is_empty() && mode == Mode::Format {
        print_all_files_ok();
      }
    }
  }
}

/// Built-in mapping, then `[mapping]` from the config, then `--mapping`.
fn build_mapping(config: &Config, cli: &[(String, String)], registry: &DefinitionRegistry) -> Result<FileMapping> {
  let mut mapping = config.file_mapping();
  for (key, style) in cli {
    mapping.insert(key, style);
  }

  if let Some((key, style)) = mapping.unknown_styles(registry).into_iter().next() {
    bail!("Mapping '{}' refers to unknown comment style '{}'", key, style);
  }
  Ok(mapping)
}

/// Base properties from the config and `--property`, plus the enabled
/// year providers.
fn build_resolver(config: &Config, args: &CommonArgs) -> PropertyResolver {
  let mut overrides: Properties = config.properties();
  overrides.extend(args.property.iter().cloned());

  let mut resolver = PropertyResolver::new(base_properties(&overrides));
  if args.fs_years || config.providers.filesystem {
    resolver.register(Box::new(FilesystemYearsProvider));
  }
  if args.git_years || config.providers.git {
    resolver.register(Box::new(GitYearsProvider::new()));
  }
  if resolver.has_providers() {
    debug!("Property providers: {:?}", resolver.provider_names());
  }
  resolver
}

fn write_reports(args: &CommonArgs, reports: &[FileReport], summary: &ProcessingSummary) {
  let requested: [(ReportFormat, Option<&PathBuf>); 2] = [
    (ReportFormat::Json, args.report_json.as_ref()),
    (ReportFormat::Csv, args.report_csv.as_ref()),
  ];

  for (format, path) in requested {
    let Some(path) = path else {
      continue;
    };
    match ReportGenerator::new(format, path).generate(reports, summary) {
      Ok(()) => info_log!("Generated {} report at {}", format, path.display()),
      Err(e) => eprintln!("Error generating {} report: {:#}", format, e),
    }
  }
}
