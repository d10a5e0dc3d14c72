//! # File Collector Module
//!
//! This module turns user-provided patterns (file paths, directory paths, or
//! globs) into the sorted, de-duplicated list of files to process.
//!
//! Directories are walked with the `ignore` crate so `.gitignore` rules apply
//! when enabled. Exclude globs apply to every candidate, including files named
//! explicitly.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use tracing::{debug, trace, warn};

use crate::verbose_log;

/// File collector for pattern matching and directory traversal.
#[derive(Debug, Clone)]
pub struct FileCollector {
  /// Root of the workspace; exclude globs match paths relative to it
  workspace_root: PathBuf,
  /// Compiled exclude globs
  exclude: Vec<glob::Pattern>,
  /// Honour `.gitignore`, `.ignore`, and git exclude files while walking
  use_gitignore: bool,
}

impl FileCollector {
  /// Creates a new FileCollector.
  ///
  /// # Parameters
  ///
  /// * `workspace_root` - The root directory of the workspace
  /// * `exclude` - Glob patterns of files never collected
  /// * `use_gitignore` - Whether directory walks honour ignore files
  ///
  /// # Errors
  ///
  /// Returns an error if an exclude pattern is not a valid glob.
  pub fn new(workspace_root: PathBuf, exclude: &[String], use_gitignore: bool) -> Result<Self> {
    let exclude = exclude
      .iter()
      .map(|pattern| glob::Pattern::new(pattern).with_context(|| format!("Invalid exclude pattern: {}", pattern)))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      workspace_root,
      exclude,
      use_gitignore,
    })
  }

  /// Collects every file named by `patterns`.
  ///
  /// An empty pattern list means the workspace root. Patterns that are
  /// neither an existing path nor a glob matching anything produce a warning.
  ///
  /// # Errors
  ///
  /// Returns an error if a glob pattern is malformed.
  pub fn collect(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let start_time = std::time::Instant::now();
    let mut files = BTreeSet::new();

    if patterns.is_empty() {
      self.walk(&self.workspace_root, &mut files);
    }

    for pattern in patterns {
      let path = PathBuf::from(pattern);
      if path.is_dir() {
        self.walk(&path, &mut files);
      } else if path.is_file() {
        self.push(path, &mut files);
      } else {
        let matches = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        let mut matched = false;
        for entry in matches {
          match entry {
            Ok(path) if path.is_file() => {
              matched = true;
              self.push(path, &mut files);
            }
            Ok(path) if path.is_dir() => {
              matched = true;
              self.walk(&path, &mut files);
            }
            Ok(_) => {}
            Err(e) => warn!("Cannot read {}: {}", e.path().display(), e.error()),
          }
        }
        if !matched {
          warn!("Pattern matched no files: {}", pattern);
        }
      }
    }

    debug!(
      "Collected {} files in {}ms",
      files.len(),
      start_time.elapsed().as_millis()
    );

    Ok(files.into_iter().collect())
  }

  /// Whether `path` matches one of the exclude globs.
  ///
  /// Globs are tried against the path relative to the workspace root and
  /// against the bare file name, so `*.min.js` excludes at any depth.
  pub fn is_excluded(&self, path: &Path) -> bool {
    if self.exclude.is_empty() {
      return false;
    }

    let relative = relative_to(path, &self.workspace_root);
    let file_name = path.file_name().map(Path::new);

    self.exclude.iter().any(|pattern| {
      pattern.matches_path(&relative) || file_name.is_some_and(|name| pattern.matches_path(name))
    })
  }

  fn push(&self, path: PathBuf, files: &mut BTreeSet<PathBuf>) {
    if self.is_excluded(&path) {
      verbose_log!("Excluded: {}", path.display());
      return;
    }
    files.insert(normalize_path(&path));
  }

  fn walk(&self, dir: &Path, files: &mut BTreeSet<PathBuf>) {
    debug!("Scanning directory: {}", dir.display());

    let walker = WalkBuilder::new(dir)
      .hidden(false)
      .standard_filters(self.use_gitignore)
      .require_git(false)
      .filter_entry(|entry| entry.file_name() != ".git")
      .build();

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!("Error walking {}: {}", dir.display(), e);
          continue;
        }
      };
      if entry.file_type().is_some_and(|ft| ft.is_file()) {
        trace!("Found {}", entry.path().display());
        self.push(entry.into_path(), files);
      }
    }
  }
}

/// Path of `path` relative to `root`, falling back to `path` itself.
fn relative_to(path: &Path, root: &Path) -> PathBuf {
  let normalized = normalize_path(path);
  if let Ok(stripped) = normalized.strip_prefix(root) {
    return stripped.to_path_buf();
  }
  if normalized.is_absolute()
    && let Some(relative) = pathdiff::diff_paths(&normalized, root)
  {
    return relative;
  }
  normalized
}

/// Removes `.` components so the same file is not collected twice.
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    if matches!(component, Component::CurDir) {
      continue;
    }
    normalized.push(component.as_os_str());
  }

  if normalized.as_os_str().is_empty() {
    PathBuf::from(".")
  } else {
    normalized
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, "content\n").expect("write file");
  }

  #[test]
  fn test_normalize_path() {
    assert_eq!(normalize_path(Path::new("./a/./b.rs")), PathBuf::from("a/b.rs"));
    assert_eq!(normalize_path(Path::new(".")), PathBuf::from("."));
  }

  #[test]
  fn test_collect_directory_with_exclude() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("src/main.rs"));
    touch(&root.join("src/lib.rs"));
    touch(&root.join("vendor/dep.rs"));
    touch(&root.join("web/app.min.js"));

    let collector = FileCollector::new(
      root.to_path_buf(),
      &["vendor/**".to_string(), "*.min.js".to_string()],
      true,
    )
    .expect("collector");
    let files = collector
      .collect(&[root.to_string_lossy().to_string()])
      .expect("collect");

    assert_eq!(files, vec![root.join("src/lib.rs"), root.join("src/main.rs")]);
  }

  #[test]
  fn test_collect_honours_gitignore() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("keep.rs"));
    touch(&root.join("target/build.rs"));
    fs::write(root.join(".gitignore"), "target/\n").expect("write gitignore");

    let collector = FileCollector::new(root.to_path_buf(), &[], true).expect("collector");
    let files = collector
      .collect(&[root.to_string_lossy().to_string()])
      .expect("collect");
    assert!(files.contains(&root.join("keep.rs")));
    assert!(files.contains(&root.join(".gitignore")));
    assert!(!files.contains(&root.join("target/build.rs")));

    let collector = FileCollector::new(root.to_path_buf(), &[], false).expect("collector");
    let files = collector
      .collect(&[root.to_string_lossy().to_string()])
      .expect("collect");
    assert!(files.contains(&root.join("target/build.rs")));
  }

  #[test]
  fn test_collect_glob_and_explicit_file() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("a.py"));
    touch(&root.join("b.py"));
    touch(&root.join("c.rs"));

    let collector = FileCollector::new(root.to_path_buf(), &[], true).expect("collector");
    let files = collector
      .collect(&[
        format!("{}/*.py", root.display()),
        root.join("c.rs").to_string_lossy().to_string(),
        root.join("a.py").to_string_lossy().to_string(),
      ])
      .expect("collect");

    assert_eq!(files, vec![root.join("a.py"), root.join("b.py"), root.join("c.rs")]);
  }

  #[test]
  fn test_invalid_exclude_is_rejected() {
    assert!(FileCollector::new(PathBuf::from("."), &["[".to_string()], true).is_err());
  }
}
