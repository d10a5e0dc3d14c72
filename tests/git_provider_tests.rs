mod common;

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use chrono::{Datelike, Utc};
use common::{git_add_and_commit_at, init_git_repo, is_git_available, style, write_file};
use edheader::document::Document;
use edheader::properties::{
  GIT_COPYRIGHT_CREATION_YEAR, GIT_COPYRIGHT_LAST_YEAR, GIT_COPYRIGHT_YEARS, GIT_LAST_CHANGE_REVISION,
  GitYearsProvider, INCEPTION_YEAR_KEY, Properties, PropertyResolver,
};
use tempfile::tempdir;

fn resolver(root: &Path, inception: Option<&str>) -> Result<PropertyResolver> {
  let mut base = Properties::new();
  if let Some(year) = inception {
    base.insert(INCEPTION_YEAR_KEY.to_string(), year.to_string());
  }
  let mut resolver = PropertyResolver::new(base);
  resolver.register(Box::new(GitYearsProvider::new()));
  resolver.init_all(root.to_path_buf())?;
  Ok(resolver)
}

fn properties_for(resolver: &PropertyResolver, path: &Path) -> Result<Properties> {
  let document = Document::load(path, style("DOUBLESLASH_STYLE"))?;
  Ok(resolver.resolve(&document)?)
}

#[test]
fn test_years_follow_commit_history() -> Result<()> {
  if !is_git_available() {
    eprintln!("git not available, skipping");
    return Ok(());
  }

  let dir = tempdir()?;
  init_git_repo(dir.path())?;
  let path = write_file(dir.path(), "src/lib.rs", "pub fn f() {}\n")?;
  git_add_and_commit_at(dir.path(), "src/lib.rs", "Initial", "2019-06-01T12:00:00+00:00")?;

  let props = properties_for(&resolver(dir.path(), None)?, &path)?;
  assert_eq!(props[GIT_COPYRIGHT_CREATION_YEAR], "2019");
  assert_eq!(props[GIT_COPYRIGHT_LAST_YEAR], "2019");
  assert_eq!(props[GIT_COPYRIGHT_YEARS], "2019");
  assert!(props.contains_key(GIT_LAST_CHANGE_REVISION));

  fs::write(&path, "pub fn f() -> u8 { 1 }\n")?;
  git_add_and_commit_at(dir.path(), "src/lib.rs", "Change", "2021-03-01T12:00:00+00:00")?;

  let props = properties_for(&resolver(dir.path(), None)?, &path)?;
  assert_eq!(props[GIT_COPYRIGHT_CREATION_YEAR], "2019");
  assert_eq!(props[GIT_COPYRIGHT_YEARS], "2019-2021");

  let props = properties_for(&resolver(dir.path(), Some("2015"))?, &path)?;
  assert_eq!(props[GIT_COPYRIGHT_YEARS], "2015-2021");
  Ok(())
}

#[test]
fn test_uncommitted_changes_count_as_this_year() -> Result<()> {
  if !is_git_available() {
    eprintln!("git not available, skipping");
    return Ok(());
  }

  let this_year = Utc::now().year().to_string();
  let dir = tempdir()?;
  init_git_repo(dir.path())?;
  let committed = write_file(dir.path(), "a.rs", "fn a() {}\n")?;
  git_add_and_commit_at(dir.path(), "a.rs", "Initial", "2019-06-01T12:00:00+00:00")?;

  fs::write(&committed, "fn a() { todo!() }\n")?;
  let untracked = write_file(dir.path(), "b.rs", "fn b() {}\n")?;
  let resolver = resolver(dir.path(), None)?;

  let modified = properties_for(&resolver, &committed)?;
  assert_eq!(modified[GIT_COPYRIGHT_LAST_YEAR], this_year);
  assert_eq!(modified[GIT_COPYRIGHT_YEARS], format!("2019-{this_year}"));

  let fresh = properties_for(&resolver, &untracked)?;
  assert_eq!(fresh[GIT_COPYRIGHT_CREATION_YEAR], this_year);
  assert_eq!(fresh[GIT_COPYRIGHT_YEARS], this_year);
  assert!(!fresh.contains_key(GIT_LAST_CHANGE_REVISION));

  resolver.close_all();
  Ok(())
}

#[test]
fn test_resolver_outside_repository_fails_to_start() -> Result<()> {
  let dir = tempdir()?;
  let mut resolver = PropertyResolver::new(Properties::new());
  resolver.register(Box::new(GitYearsProvider::new()));
  assert!(resolver.init_all(dir.path().to_path_buf()).is_err());
  Ok(())
}

#[test]
fn test_format_with_git_years() -> Result<()> {
  if !is_git_available() {
    eprintln!("git not available, skipping");
    return Ok(());
  }

  let dir = tempdir()?;
  init_git_repo(dir.path())?;
  let path = write_file(dir.path(), "src/main.rs", "fn main() {}\n")?;
  git_add_and_commit_at(dir.path(), "src/main.rs", "Initial", "2019-06-01T12:00:00+00:00")?;
  write_file(dir.path(), "HEADER.txt", "Copyright ${git.copyright_years} Acme\n")?;

  Command::cargo_bin("edheader")?
    .current_dir(dir.path())
    .env_remove("EDHEADER_CONFIG")
    .args(["format", "--no-config", "--git-years", "--header", "HEADER.txt", "src"])
    .assert()
    .success();

  assert_eq!(fs::read_to_string(&path)?, "// Copyright 2019 Acme\n\nfn main() {}\n");
  Ok(())
}
