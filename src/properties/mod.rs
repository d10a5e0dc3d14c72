//! # Properties Module
//!
//! Builds the interpolation context for header templates. A
//! [`PropertyResolver`] starts from base properties (configuration values plus
//! `year`) and lets every registered [`PropertyProvider`] contribute keys for
//! the document being processed. Providers run in registration order; a later
//! provider overrides keys set by an earlier one and sees everything merged so
//! far.
//!
//! Two providers ship with the crate:
//! - [`FilesystemYearsProvider`] derives a copyright range from the file's
//!   modification time
//! - [`GitYearsProvider`] derives it from the file's commit history

mod filesystem;
mod git;

use std::collections::BTreeMap;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, Utc};
pub use filesystem::{
  FS_COPYRIGHT_LAST_YEAR, FS_COPYRIGHT_YEARS, FS_LAST_CHANGE_DATE, FS_LAST_CHANGE_TIMESTAMP, FilesystemYearsProvider,
};
pub use git::{
  GIT_COPYRIGHT_CREATION_YEAR, GIT_COPYRIGHT_LAST_YEAR, GIT_COPYRIGHT_YEARS, GIT_LAST_CHANGE_DATE,
  GIT_LAST_CHANGE_REVISION, GIT_LAST_CHANGE_TIMESTAMP, GitYearsProvider,
};
use tracing::debug;

use crate::document::Document;

/// Interpolation context: property name to value, iterated in key order.
pub type Properties = BTreeMap<String, String>;

/// Property holding the first year of the copyright range.
pub const INCEPTION_YEAR_KEY: &str = "inception_year";

/// Property holding the current calendar year.
pub const YEAR_KEY: &str = "year";

/// Errors raised by property providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
  #[error("the {provider} provider requires the '{key}' property")]
  MissingProperty { provider: &'static str, key: String },

  #[error("property '{key}' must be a year, got '{value}'")]
  InvalidYear {
    key: String,
    value: String,
    #[source]
    source: ParseIntError,
  },

  #[error("failed to read modification time of {path}: {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("git lookup failed for {path}: {source}")]
  Git {
    path: PathBuf,
    #[source]
    source: git2::Error,
  },

  #[error("the {provider} provider was used before it was initialised")]
  NotInitialized { provider: &'static str },
}

/// Shared state handed to providers once, before any document is processed.
#[derive(Debug, Clone)]
pub struct ProviderContext {
  /// Directory the run operates on; used to locate repositories.
  pub root: PathBuf,
  /// Base properties of the run.
  pub properties: Properties,
}

/// A pluggable source of template properties.
///
/// `adjust_properties` is called concurrently from several workers, so
/// implementations keep any per-worker resources behind their own
/// synchronization.
pub trait PropertyProvider: Send + Sync {
  /// Short name used in logs and errors.
  fn name(&self) -> &'static str;

  /// One-time setup before the first document.
  ///
  /// # Errors
  ///
  /// Returns an error if the provider cannot work in this context.
  fn init(&mut self, _context: &ProviderContext) -> Result<(), ProviderError> {
    Ok(())
  }

  /// Returns the properties this provider contributes for `document`.
  ///
  /// # Errors
  ///
  /// Returns an error if a required property is missing or the underlying
  /// lookup fails. The document is then left untouched.
  fn adjust_properties(&self, properties: &Properties, document: &Document) -> Result<Properties, ProviderError>;

  /// Releases pooled resources. Must be safe even if `init` never ran.
  fn close(&self) {}
}

/// Merges base properties with provider output per document.
pub struct PropertyResolver {
  base: Properties,
  providers: Vec<Box<dyn PropertyProvider>>,
  closed: AtomicBool,
}

impl std::fmt::Debug for PropertyResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
    f.debug_struct("PropertyResolver")
      .field("base", &self.base)
      .field("providers", &names)
      .finish()
  }
}

impl PropertyResolver {
  pub const fn new(base: Properties) -> Self {
    Self {
      base,
      providers: Vec::new(),
      closed: AtomicBool::new(false),
    }
  }

  /// Appends a provider; it runs after every provider registered before it.
  pub fn register(&mut self, provider: Box<dyn PropertyProvider>) {
    self.providers.push(provider);
  }

  pub fn base(&self) -> &Properties {
    &self.base
  }

  pub fn has_providers(&self) -> bool {
    !self.providers.is_empty()
  }

  pub fn provider_names(&self) -> Vec<&'static str> {
    self.providers.iter().map(|p| p.name()).collect()
  }

  /// Initialises every provider in registration order.
  ///
  /// # Errors
  ///
  /// Returns the first provider error; later providers are not initialised.
  pub fn init_all(&mut self, root: PathBuf) -> Result<(), ProviderError> {
    let context = ProviderContext {
      root,
      properties: self.base.clone(),
    };
    for provider in &mut self.providers {
      debug!("Initialising {} provider", provider.name());
      provider.init(&context)?;
    }
    Ok(())
  }

  /// Resolves the full property set for one document.
  ///
  /// # Errors
  ///
  /// Returns the first provider error.
  pub fn resolve(&self, document: &Document) -> Result<Properties, ProviderError> {
    let mut merged = self.base.clone();
    for provider in &self.providers {
      let contributed = provider.adjust_properties(&merged, document)?;
      merged.extend(contributed);
    }
    Ok(merged)
  }

  /// Closes every provider. Runs at most once; later calls do nothing.
  pub fn close_all(&self) {
    if self.closed.swap(true, Ordering::SeqCst) {
      return;
    }
    for provider in &self.providers {
      debug!("Closing {} provider", provider.name());
      provider.close();
    }
  }
}

impl Drop for PropertyResolver {
  fn drop(&mut self) {
    self.close_all();
  }
}

/// Base properties for a run: the current year, then `overrides`.
pub fn base_properties(overrides: &Properties) -> Properties {
  let mut properties = Properties::new();
  properties.insert(YEAR_KEY.to_string(), current_year().to_string());
  properties.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
  properties
}

pub(crate) fn current_year() -> i32 {
  Utc::now().year()
}

/// Formats a copyright range. A last year at or before the inception year
/// yields the inception year alone.
pub fn copyright_years(inception: i32, last: i32) -> String {
  if last <= inception {
    inception.to_string()
  } else {
    format!("{inception}-{last}")
  }
}

/// Reads a year-valued property.
///
/// # Errors
///
/// Returns [`ProviderError::MissingProperty`] when absent and
/// [`ProviderError::InvalidYear`] when not a number.
pub fn required_year(properties: &Properties, key: &str, provider: &'static str) -> Result<i32, ProviderError> {
  let value = properties.get(key).ok_or_else(|| ProviderError::MissingProperty {
    provider,
    key: key.to_string(),
  })?;
  parse_year(key, value)
}

fn parse_year(key: &str, value: &str) -> Result<i32, ProviderError> {
  value.trim().parse().map_err(|source| ProviderError::InvalidYear {
    key: key.to_string(),
    value: value.to_string(),
    source,
  })
}

/// Reads an optional year-valued property.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidYear`] when present but not a number.
pub fn optional_year(properties: &Properties, key: &str) -> Result<Option<i32>, ProviderError> {
  properties.get(key).map(|value| parse_year(key, value)).transpose()
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::AtomicUsize;

  use super::*;
  use crate::definitions::DefinitionRegistry;

  struct StaticProvider {
    name: &'static str,
    values: Properties,
    closes: Arc<AtomicUsize>,
  }

  impl PropertyProvider for StaticProvider {
    fn name(&self) -> &'static str {
      self.name
    }

    fn adjust_properties(&self, properties: &Properties, _document: &Document) -> Result<Properties, ProviderError> {
      let mut values = self.values.clone();
      if let Some(owner) = properties.get("owner") {
        values.insert("seen_owner".to_string(), owner.clone());
      }
      Ok(values)
    }

    fn close(&self) {
      self.closes.fetch_add(1, Ordering::SeqCst);
    }
  }

  fn provider(name: &'static str, pairs: &[(&str, &str)], closes: &Arc<AtomicUsize>) -> Box<dyn PropertyProvider> {
    Box::new(StaticProvider {
      name,
      values: pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
      closes: Arc::clone(closes),
    })
  }

  fn document() -> Document {
    let definition = DefinitionRegistry::builtin().lookup("TEXT").expect("text style");
    Document::new(PathBuf::from("a.txt"), String::new(), definition)
  }

  #[test]
  fn test_copyright_years() {
    assert_eq!(copyright_years(1999, 2023), "1999-2023");
    assert_eq!(copyright_years(1999, 1999), "1999");
    assert_eq!(copyright_years(2000, 1999), "2000");
  }

  #[test]
  fn test_base_properties_include_year_and_overrides() {
    let mut overrides = Properties::new();
    overrides.insert("owner".to_string(), "Acme".to_string());
    let base = base_properties(&overrides);
    assert_eq!(base.get(YEAR_KEY), Some(&current_year().to_string()));
    assert_eq!(base.get("owner").map(String::as_str), Some("Acme"));

    overrides.insert(YEAR_KEY.to_string(), "1984".to_string());
    assert_eq!(base_properties(&overrides).get(YEAR_KEY).map(String::as_str), Some("1984"));
  }

  #[test]
  fn test_later_providers_override_earlier_ones() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut base = Properties::new();
    base.insert("owner".to_string(), "Acme".to_string());

    let mut resolver = PropertyResolver::new(base);
    resolver.register(provider("first", &[("license", "MIT"), ("owner", "First")], &closes));
    resolver.register(provider("second", &[("license", "Apache-2.0")], &closes));

    let resolved = resolver.resolve(&document()).expect("resolve");
    assert_eq!(resolved.get("license").map(String::as_str), Some("Apache-2.0"));
    assert_eq!(resolved.get("owner").map(String::as_str), Some("First"));
    // The second provider saw the first provider's output.
    assert_eq!(resolved.get("seen_owner").map(String::as_str), Some("First"));
  }

  #[test]
  fn test_close_runs_exactly_once() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut resolver = PropertyResolver::new(Properties::new());
    resolver.register(provider("only", &[], &closes));

    resolver.close_all();
    resolver.close_all();
    drop(resolver);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_close_on_drop_without_init() {
    let closes = Arc::new(AtomicUsize::new(0));
    {
      let mut resolver = PropertyResolver::new(Properties::new());
      resolver.register(provider("only", &[], &closes));
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_required_year() {
    let mut properties = Properties::new();
    assert!(matches!(
      required_year(&properties, INCEPTION_YEAR_KEY, "test"),
      Err(ProviderError::MissingProperty { .. })
    ));

    properties.insert(INCEPTION_YEAR_KEY.to_string(), "nineteen".to_string());
    assert!(matches!(
      required_year(&properties, INCEPTION_YEAR_KEY, "test"),
      Err(ProviderError::InvalidYear { .. })
    ));

    properties.insert(INCEPTION_YEAR_KEY.to_string(), " 1999 ".to_string());
    assert_eq!(required_year(&properties, INCEPTION_YEAR_KEY, "test").expect("year"), 1999);
  }
}
