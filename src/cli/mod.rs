//! # CLI Module
//!
//! This module contains the command-line interface implementation.
//! It uses clap for argument parsing with one subcommand per mode.

mod run;
mod styles;

use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Args, Parser, Subcommand};
use edheader::logging::ColorMode;
pub use run::run;
pub use styles::{StylesArgs, run_styles};

const CUSTOM_STYLES: Styles = Styles::styled()
  .header(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .usage(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))).bold())
  .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
  .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))).bold())
  .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
  .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))));

const LONG_VERSION: &str = concat!(
  env!("CARGO_PKG_VERSION"),
  " (",
  env!("GIT_HASH"),
  " ",
  env!("GIT_DATE"),
  ")"
);

/// Top-level CLI arguments
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  long_version = LONG_VERSION,
  about,
  styles = CUSTOM_STYLES,
  after_help = "Examples:
  # Check that every file carries the header
  edheader check --header HEADER.txt src/

  # Insert or fix headers
  edheader format --header HEADER.txt src/ tests/

  # Preview changes without writing
  edheader format --dry-run --show-diff --header HEADER.txt .

  # Copyright years from git history
  edheader format --git-years --property inception_year=2019 --header HEADER.txt .

  # Treat *.tmpl files as XML
  edheader check --mapping tmpl=XML_STYLE --header HEADER.txt templates/

  # Strip headers
  edheader remove src/
",
  help_template = "{before-help}{name} v{version}
{about-section}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Report files whose header is missing or differs from the template
  Check(CommonArgs),
  /// Insert missing headers and replace outdated ones
  Format(ModifyArgs),
  /// Remove detected headers
  Remove(ModifyArgs),
  /// List the available comment styles
  Styles(StylesArgs),
}

/// Arguments shared by `check`, `format`, and `remove`
#[derive(Args, Debug, Default, Clone)]
pub struct CommonArgs {
  /// File, directory, or glob patterns to process. Directories are processed
  /// recursively. Defaults to the workspace root.
  #[arg(required = false)]
  pub patterns: Vec<String>,

  /// Header template file (default: header.file from the config)
  #[arg(long, value_name = "FILE")]
  pub header: Option<PathBuf>,

  /// Path to config file (default: .edheader.toml in workspace root)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// Glob patterns of files to skip (repeatable)
  #[arg(long, short = 'e', value_name = "GLOB")]
  pub exclude: Vec<String>,

  /// Template property (repeatable), overrides the config
  #[arg(long, short = 'p', value_name = "KEY=VALUE", value_parser = parse_key_value)]
  pub property: Vec<(String, String)>,

  /// Comment style for an extension or file name (repeatable)
  #[arg(long, short = 'm', value_name = "KEY=STYLE", value_parser = parse_key_value)]
  pub mapping: Vec<(String, String)>,

  /// Marker of header lines that may differ, such as copyright years
  /// (repeatable, default: copyright)
  #[arg(long, short = 'k', value_name = "WORD")]
  pub keyword: Vec<String>,

  /// Compare only the first and last header lines
  #[arg(long)]
  pub lenient: bool,

  /// Number of files processed in parallel (default: number of CPUs)
  #[arg(long, short = 'j', value_name = "N")]
  pub jobs: Option<usize>,

  /// Stop at the first file that fails
  #[arg(long)]
  pub fail_fast: bool,

  /// Derive copyright years from file modification times
  #[arg(long)]
  pub fs_years: bool,

  /// Derive copyright years from git history
  #[arg(long)]
  pub git_years: bool,

  /// Print a diff of every change to stderr
  #[arg(long)]
  pub show_diff: bool,

  /// Append a diff of every change to a file
  #[arg(long, value_name = "FILE")]
  pub save_diff: Option<PathBuf>,

  /// Generate a JSON report and save it to the specified path
  #[arg(long, value_name = "OUTPUT")]
  pub report_json: Option<PathBuf>,

  /// Generate a CSV report and save it to the specified path
  #[arg(long, value_name = "OUTPUT")]
  pub report_csv: Option<PathBuf>,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except paths that need attention
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Control when to use colored output (auto, never, always)
  #[arg(
    long,
    value_name = "WHEN",
    num_args = 0..=1,
    default_value_t = ColorMode::Auto,
    default_missing_value = "always",
    value_enum
  )]
  pub colors: ColorMode,
}

/// Arguments for the commands that write files
#[derive(Args, Debug, Default, Clone)]
pub struct ModifyArgs {
  #[command(flatten)]
  pub common: CommonArgs,

  /// Report what would change without writing any file
  #[arg(long)]
  pub dry_run: bool,
}

impl Cli {
  /// Parse CLI arguments and return the Cli struct
  pub fn parse_args() -> Self {
    Self::parse()
  }
}

/// Parses `KEY=VALUE`. The value may itself contain `=`.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
  let (key, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
  let key = key.trim();
  if key.is_empty() {
    return Err(format!("empty key in '{s}'"));
  }
  Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_parse_key_value() {
    assert_eq!(
      parse_key_value("owner=Acme Corp").expect("valid"),
      ("owner".to_string(), "Acme Corp".to_string())
    );
    assert_eq!(
      parse_key_value("expr=a=b").expect("valid"),
      ("expr".to_string(), "a=b".to_string())
    );
    assert!(parse_key_value("novalue").is_err());
    assert!(parse_key_value("=x").is_err());
  }

  #[test]
  fn test_format_subcommand_flags() {
    let cli = Cli::try_parse_from([
      "edheader",
      "format",
      "--dry-run",
      "--header",
      "HEADER.txt",
      "-p",
      "owner=Acme",
      "--mapping",
      "tmpl=XML_STYLE",
      "src",
    ])
    .expect("valid arguments");

    let Command::Format(args) = cli.command else {
      panic!("expected format subcommand");
    };
    assert!(args.dry_run);
    assert_eq!(args.common.patterns, vec!["src".to_string()]);
    assert_eq!(args.common.property, vec![("owner".to_string(), "Acme".to_string())]);
    assert_eq!(args.common.mapping, vec![("tmpl".to_string(), "XML_STYLE".to_string())]);
  }

  #[test]
  fn test_check_has_no_dry_run_flag() {
    assert!(Cli::try_parse_from(["edheader", "check", "--dry-run"]).is_err());
  }
}
