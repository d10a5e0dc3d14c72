//! # Styles Command
//!
//! Lists the registered comment styles, including those added by the config
//! file, optionally with a rendered sample header for each.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use edheader::config::load_config;
use edheader::document::LineSeparator;
use edheader::properties::Properties;
use edheader::templates::HeaderTemplate;
use edheader::workspace::resolve_workspace;
use owo_colors::{OwoColorize, Stream};

const SAMPLE_HEADER: &str = "Copyright 2024 Example Corp\nSPDX-License-Identifier: MIT";

/// Arguments for the styles command
#[derive(Args, Debug, Default, Clone)]
pub struct StylesArgs {
  /// Path to config file (default: .edheader.toml in workspace root)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// Show a sample header rendered in every style
  #[arg(long)]
  pub preview: bool,
}

/// Run the styles command.
///
/// # Errors
///
/// Returns an error if the config file or its definitions are invalid.
pub fn run_styles(args: &StylesArgs) -> Result<()> {
  let workspace = resolve_workspace(&[])?;
  let config = load_config(args.config.as_deref(), workspace.root(), args.no_config)?.unwrap_or_default();
  let registry = config.registry().context("Invalid comment style definitions")?;

  let sample = HeaderTemplate::load(SAMPLE_HEADER, &Properties::new());

  for name in registry.type_names() {
    println!("{}", name.if_supports_color(Stream::Stdout, |n| n.bold()));
    if !args.preview {
      continue;
    }
    if let Some(definition) = registry.lookup(name) {
      for line in sample.render(&definition, LineSeparator::Lf, false).lines() {
        println!("    {}", line.if_supports_color(Stream::Stdout, |l| l.dimmed()));
      }
      println!();
    }
  }

  Ok(())
}
