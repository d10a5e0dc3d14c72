//! # File I/O Module
//!
//! This module provides file writing utilities for the processor. Writes go to
//! a temporary file next to the target which is then renamed over it, so a
//! reader never sees a half-written file.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// File I/O operations for the processor.
pub struct FileIO;

impl FileIO {
  /// Atomically replaces the content of `path`.
  ///
  /// The original file's permissions are carried over to the new file.
  ///
  /// # Parameters
  ///
  /// * `path` - Path to the file to write
  /// * `content` - Content to write to the file
  ///
  /// # Errors
  ///
  /// Returns an error if the temporary file cannot be created, written, or
  /// renamed. The original file is left unchanged in that case.
  pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
      .parent()
      .filter(|dir| !dir.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));

    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();

    let mut temp = NamedTempFile::new_in(dir)
      .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp
      .write_all(content.as_bytes())
      .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    temp
      .as_file()
      .sync_all()
      .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;

    if let Some(permissions) = permissions {
      fs::set_permissions(temp.path(), permissions)
        .with_context(|| format!("Failed to copy permissions for {}", path.display()))?;
    }

    temp
      .persist(path)
      .with_context(|| format!("Failed to replace file: {}", path.display()))?;
    Ok(())
  }
}
