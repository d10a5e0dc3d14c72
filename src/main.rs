//! # edheader
//!
//! Command-line front end: `edheader check|format|remove [PATTERNS]...` and
//! `edheader styles`.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use edheader::processor::Mode;

use crate::cli::{Cli, Command, run, run_styles};

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let cli = Cli::parse_args();

  match cli.command {
    Command::Check(args) => run(Mode::Check, args, false).await,
    Command::Format(args) => run(Mode::Format, args.common, args.dry_run).await,
    Command::Remove(args) => run(Mode::Remove, args.common, args.dry_run).await,
    Command::Styles(args) => {
      run_styles(&args)?;
      Ok(ExitCode::SUCCESS)
    }
  }
}
