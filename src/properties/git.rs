use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use chrono::{DateTime, Datelike, Utc};
use git2::{Oid, Repository, Sort, Status};
use tracing::{debug, warn};

use super::{INCEPTION_YEAR_KEY, Properties, PropertyProvider, ProviderContext, ProviderError, copyright_years, optional_year};
use crate::document::Document;

pub const GIT_COPYRIGHT_LAST_YEAR: &str = "git.copyright_last_year";
pub const GIT_COPYRIGHT_CREATION_YEAR: &str = "git.copyright_creation_year";
pub const GIT_COPYRIGHT_YEARS: &str = "git.copyright_years";
pub const GIT_LAST_CHANGE_DATE: &str = "git.last_change_date";
pub const GIT_LAST_CHANGE_TIMESTAMP: &str = "git.last_change_timestamp";
pub const GIT_LAST_CHANGE_REVISION: &str = "git.last_change_revision";

/// Copyright years from the commit history of each file.
///
/// A file with uncommitted changes, or with no history at all, counts as
/// changed now. The range starts at `inception_year` when set and at the
/// file's first commit otherwise.
///
/// `git2::Repository` cannot be shared between threads, so each worker thread
/// opens its own handle on first use. The handles live in a thread-keyed map
/// that [`close`](PropertyProvider::close) drains.
#[derive(Default)]
pub struct GitYearsProvider {
  workdir: Option<PathBuf>,
  repositories: Mutex<HashMap<ThreadId, Arc<Mutex<Repository>>>>,
  shallow_warned: AtomicBool,
}

impl std::fmt::Debug for GitYearsProvider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GitYearsProvider")
      .field("workdir", &self.workdir)
      .field("open_repositories", &self.open_repositories())
      .finish()
  }
}

/// History facts about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileHistory {
  last_change: DateTime<Utc>,
  creation_year: i32,
  revision: Option<String>,
}

impl GitYearsProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of repository handles currently held.
  pub fn open_repositories(&self) -> usize {
    self.repositories.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  fn repository(&self) -> Result<Arc<Mutex<Repository>>, ProviderError> {
    let workdir = self
      .workdir
      .as_ref()
      .ok_or(ProviderError::NotInitialized { provider: "git" })?;

    let id = thread::current().id();
    let mut repositories = self.repositories.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(repository) = repositories.get(&id) {
      return Ok(Arc::clone(repository));
    }

    let repository = Repository::open(workdir).map_err(|source| ProviderError::Git {
      path: workdir.clone(),
      source,
    })?;
    debug!("Opened repository handle for thread {:?}", id);
    let repository = Arc::new(Mutex::new(repository));
    repositories.insert(id, Arc::clone(&repository));
    Ok(repository)
  }

  fn relative_path(&self, path: &Path) -> Option<PathBuf> {
    let workdir = self.workdir.as_ref()?;
    let absolute = path.canonicalize().ok()?;
    let relative = pathdiff::diff_paths(&absolute, workdir)?;
    (!relative.starts_with("..")).then_some(relative)
  }

  fn history(repository: &Repository, relative: &Path) -> Result<FileHistory, git2::Error> {
    let now = Utc::now();

    let status = repository.status_file(relative).unwrap_or(Status::WT_NEW);
    let dirty = !(status.is_empty() || status.contains(Status::IGNORED));

    let Ok(head) = repository.head() else {
      return Ok(FileHistory::uncommitted(now));
    };

    let mut walk = repository.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push(head.peel_to_commit()?.id())?;

    let mut newest: Option<(DateTime<Utc>, Oid)> = None;
    let mut oldest: Option<DateTime<Utc>> = None;

    for oid in walk {
      let commit = repository.find_commit(oid?)?;
      let Some(entry) = commit.tree()?.get_path(relative).ok().map(|e| e.id()) else {
        continue;
      };

      let touched = commit.parent_count() == 0
        || commit.parents().any(|parent| {
          parent
            .tree()
            .ok()
            .and_then(|tree| tree.get_path(relative).ok())
            .map(|e| e.id())
            != Some(entry)
        });
      if !touched {
        continue;
      }

      let time = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or(now);
      if newest.is_none() {
        newest = Some((time, commit.id()));
      }
      oldest = Some(time);
    }

    let history = match (newest, oldest) {
      (Some((last, revision)), Some(first)) => FileHistory {
        last_change: if dirty { now } else { last },
        creation_year: first.year(),
        revision: Some(revision.to_string()),
      },
      _ => FileHistory::uncommitted(now),
    };
    Ok(history)
  }
}

impl FileHistory {
  fn uncommitted(now: DateTime<Utc>) -> Self {
    Self {
      last_change: now,
      creation_year: now.year(),
      revision: None,
    }
  }
}

impl PropertyProvider for GitYearsProvider {
  fn name(&self) -> &'static str {
    "git"
  }

  fn init(&mut self, context: &ProviderContext) -> Result<(), ProviderError> {
    let repository = Repository::discover(&context.root).map_err(|source| ProviderError::Git {
      path: context.root.clone(),
      source,
    })?;

    let workdir = repository.workdir().ok_or_else(|| ProviderError::Git {
      path: context.root.clone(),
      source: git2::Error::from_str("bare repositories have no working tree"),
    })?;
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());

    if repository.is_shallow() && !self.shallow_warned.swap(true, Ordering::SeqCst) {
      warn!(
        "Repository at {} is a shallow clone; copyright years from git history may be inaccurate",
        workdir.display()
      );
    }

    debug!("Git years provider using {}", workdir.display());
    self.workdir = Some(workdir);
    Ok(())
  }

  fn adjust_properties(&self, properties: &Properties, document: &Document) -> Result<Properties, ProviderError> {
    let inception = optional_year(properties, INCEPTION_YEAR_KEY)?;
    let repository = self.repository()?;

    let history = match self.relative_path(document.path()) {
      Some(relative) => {
        let repository = repository.lock().unwrap_or_else(PoisonError::into_inner);
        Self::history(&repository, &relative).map_err(|source| ProviderError::Git {
          path: document.path().to_path_buf(),
          source,
        })?
      }
      None => FileHistory::uncommitted(Utc::now()),
    };

    let last = history.last_change.year();
    let first = inception.unwrap_or(history.creation_year);

    let mut result = Properties::new();
    result.insert(GIT_COPYRIGHT_LAST_YEAR.to_string(), last.to_string());
    result.insert(GIT_COPYRIGHT_CREATION_YEAR.to_string(), history.creation_year.to_string());
    result.insert(GIT_COPYRIGHT_YEARS.to_string(), copyright_years(first, last));
    result.insert(
      GIT_LAST_CHANGE_DATE.to_string(),
      history.last_change.format("%Y-%m-%d").to_string(),
    );
    result.insert(
      GIT_LAST_CHANGE_TIMESTAMP.to_string(),
      history.last_change.timestamp().to_string(),
    );
    if let Some(revision) = history.revision {
      result.insert(GIT_LAST_CHANGE_REVISION.to_string(), revision);
    }
    Ok(result)
  }

  fn close(&self) {
    let mut repositories = self.repositories.lock().unwrap_or_else(PoisonError::into_inner);
    let count = repositories.len();
    repositories.clear();
    debug!("Closed {} repository handle(s)", count);
  }
}
