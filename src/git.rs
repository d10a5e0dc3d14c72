//! # Git Module
//!
//! Repository lookups used outside the git years provider: finding the
//! workspace root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{ErrorCode, Repository};

use crate::verbose_log;

/// Finds the working-tree root of the repository containing `path`.
///
/// # Returns
///
/// `Ok(None)` when `path` is not inside a repository or the repository is
/// bare.
///
/// # Errors
///
/// Returns an error if a repository exists but cannot be opened.
pub fn discover_repo_root(path: &Path) -> Result<Option<PathBuf>> {
  let repo = match Repository::discover(path) {
    Ok(repo) => repo,
    Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
    Err(e) => {
      return Err(e).with_context(|| format!("Failed to open git repository at {}", path.display()));
    }
  };

  let Some(workdir) = repo.workdir() else {
    verbose_log!("Repository at {} is bare; ignoring it", repo.path().display());
    return Ok(None);
  };

  let root = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
  verbose_log!("Git workspace root: {}", root.display());
  Ok(Some(root))
}
