//! # Configuration Module
//!
//! This module provides configuration support for edheader: the header
//! template, template properties, file-to-style mapping overrides, extra
//! comment-style definitions, property providers, and exclusions.
//!
//! Configuration can be specified in a `.edheader.toml` file or via the
//! `EDHEADER_CONFIG` environment variable.
//!
//! ```toml
//! exclude = ["vendor/**", "**/*.min.js"]
//!
//! [header]
//! file = "HEADER.txt"
//! keywords = ["copyright"]
//!
//! [properties]
//! owner = "Acme Corp"
//! inception_year = 2019
//!
//! [mapping]
//! tmpl = "XML_STYLE"
//! "Jenkinsfile*" = "SLASHSTAR_STYLE"
//!
//! [definitions.MY_STYLE]
//! first-line = ""
//! before-each-line = "<> "
//! end-line = "EOL"
//! first-line-detection-pattern = "<>.*"
//! last-line-detection-pattern = "<>.*"
//!
//! [providers]
//! git = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::definitions::{DefinitionRegistry, DefinitionSpec, RegistryError};
use crate::mapping::FileMapping;
use crate::properties::Properties;
use crate::verbose_log;

/// The default config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".edheader.toml";

/// Environment variable for specifying config file path.
pub const CONFIG_ENV_VAR: &str = "EDHEADER_CONFIG";

const fn default_true() -> bool {
  true
}

/// The `[header]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HeaderConfig {
  /// Header template file, relative to the config file.
  #[serde(default)]
  pub file: Option<PathBuf>,

  /// Markers of lines that may legitimately differ (copyright years).
  #[serde(default)]
  pub keywords: Option<Vec<String>>,

  /// Compare whole headers rather than only their boundary lines.
  #[serde(default = "default_true")]
  pub strict: bool,

  /// Only treat comment blocks containing a keyword as headers.
  #[serde(default = "default_true")]
  pub keyword_guard: bool,

  /// Fail a file whose template still has unresolved `${...}` placeholders.
  #[serde(default)]
  pub strict_properties: bool,
}

impl Default for HeaderConfig {
  fn default() -> Self {
    Self {
      file: None,
      keywords: None,
      strict: true,
      keyword_guard: true,
      strict_properties: false,
    }
  }
}

/// The `[providers]` table.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
  /// Enable copyright years from file modification times.
  #[serde(default)]
  pub filesystem: bool,

  /// Enable copyright years from git history.
  #[serde(default)]
  pub git: bool,
}

/// Main configuration struct for edheader.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub header: HeaderConfig,

  /// Template properties. Non-string values are used in their TOML form.
  #[serde(default)]
  pub properties: BTreeMap<String, toml::Value>,

  /// File name, glob, or extension to comment-style type name.
  #[serde(default)]
  pub mapping: BTreeMap<String, String>,

  /// Additional or replacement comment styles.
  #[serde(default)]
  pub definitions: BTreeMap<String, DefinitionSpec>,

  #[serde(default)]
  pub providers: ProvidersConfig,

  /// Glob patterns of files never processed.
  #[serde(default)]
  pub exclude: Vec<String>,

  /// Honour `.gitignore` and similar files while walking directories.
  #[serde(default = "default_true")]
  pub use_gitignore: bool,

  /// Directory containing the config file; relative paths resolve against it.
  #[serde(skip)]
  pub base_dir: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      header: HeaderConfig::default(),
      properties: BTreeMap::new(),
      mapping: BTreeMap::new(),
      definitions: BTreeMap::new(),
      providers: ProvidersConfig::default(),
      exclude: Vec::new(),
      use_gitignore: true,
      base_dir: PathBuf::from("."),
    }
  }
}

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("Failed to read config file '{path}': {source}")]
  ReadError { path: PathBuf, source: std::io::Error },

  /// The config file contains invalid TOML.
  #[error("Failed to parse config file '{path}': {source}")]
  ParseError { path: PathBuf, source: toml::de::Error },

  /// One or more `[definitions]` entries are malformed.
  #[error("Invalid comment styles in '{path}': {source}")]
  InvalidDefinitions { path: PathBuf, source: RegistryError },

  /// A `[mapping]` entry names a style that does not exist.
  #[error("Mapping '{key}' refers to unknown comment style '{style}'")]
  UnknownStyle { key: String, style: String },

  /// An `exclude` entry is not a valid glob.
  #[error("Invalid exclude pattern '{pattern}': {source}")]
  InvalidExclude { pattern: String, source: glob::PatternError },
}

impl Config {
  /// Load configuration from a file.
  ///
  /// # Arguments
  ///
  /// * `path` - Path to the configuration file
  ///
  /// # Returns
  ///
  /// The loaded and validated configuration.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or parsed, or if any
  /// definition, mapping, or exclude entry is invalid.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    verbose_log!("Loading config from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
      path: path.to_path_buf(),
      source: e,
    })?;

    let mut config = Self::parse(&content, path)?;
    config.base_dir = path
      .parent()
      .filter(|dir| !dir.as_os_str().is_empty())
      .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    config.validate(path)?;

    verbose_log!(
      "Loaded {} mapping override(s) and {} comment style definition(s)",
      config.mapping.len(),
      config.definitions.len()
    );

    Ok(config)
  }

  /// Parse configuration text without validating it.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::ParseError`] for invalid TOML or unknown keys.
  pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
      path: path.to_path_buf(),
      source: e,
    })
  }

  /// Validate the configuration.
  ///
  /// Checks that:
  /// - Every comment style definition is well formed
  /// - Every mapping names a registered style
  /// - Every exclude entry is a valid glob
  fn validate(&self, path: &Path) -> Result<(), ConfigError> {
    let registry = self.registry().map_err(|source| ConfigError::InvalidDefinitions {
      path: path.to_path_buf(),
      source,
    })?;

    if let Some((key, style)) = self.file_mapping().unknown_styles(&registry).into_iter().next() {
      return Err(ConfigError::UnknownStyle { key, style });
    }

    for pattern in &self.exclude {
      glob::Pattern::new(pattern).map_err(|source| ConfigError::InvalidExclude {
        pattern: pattern.clone(),
        source,
      })?;
    }

    Ok(())
  }

  /// Builds the definition registry: built-in styles plus `[definitions]`.
  ///
  /// # Errors
  ///
  /// Returns every malformed definition.
  pub fn registry(&self) -> Result<DefinitionRegistry, RegistryError> {
    DefinitionRegistry::with_additional(self.definitions.clone())
  }

  /// Builds the file mapping with `[mapping]` overrides applied.
  pub fn file_mapping(&self) -> FileMapping {
    FileMapping::with_overrides(&self.mapping)
  }

  /// Template properties as strings.
  pub fn properties(&self) -> Properties {
    self
      .properties
      .iter()
      .map(|(key, value)| {
        let value = match value {
          toml::Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        (key.clone(), value)
      })
      .collect()
  }

  /// Header template path resolved against the config file's directory.
  pub fn header_file(&self) -> Option<PathBuf> {
    self.header.file.as_ref().map(|file| {
      if file.is_absolute() {
        file.clone()
      } else {
        self.base_dir.join(file)
      }
    })
  }
}

/// Discover the configuration file path.
///
/// The configuration file is discovered in the following order:
/// 1. Path specified via `--config` flag (passed as `explicit_path`)
/// 2. Path specified via `EDHEADER_CONFIG` environment variable
/// 3. `.edheader.toml` in the workspace root
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `workspace_root` - The workspace root directory
///
/// # Returns
///
/// The path to the configuration file, or `None` if no config file is found.
pub fn discover_config_path(explicit_path: Option<&Path>, workspace_root: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit_path {
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
    let path = PathBuf::from(&env_path);
    if path.exists() {
      verbose_log!("Using config from {}: {}", CONFIG_ENV_VAR, path.display());
      return Some(path);
    }
    verbose_log!("{} path does not exist: {}", CONFIG_ENV_VAR, env_path);
  }

  let workspace_config = workspace_root.join(DEFAULT_CONFIG_FILENAME);
  if workspace_config.exists() {
    verbose_log!("Using workspace config: {}", workspace_config.display());
    return Some(workspace_config);
  }

  verbose_log!("No config file found");
  None
}

/// Load configuration from the discovered path.
///
/// An explicit `--config` path that does not exist is an error; a missing
/// discovered file is not.
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `workspace_root` - The workspace root directory
/// * `no_config` - If true, skip config file discovery
///
/// # Returns
///
/// The loaded configuration, or `None` when no config file applies.
pub fn load_config(explicit_path: Option<&Path>, workspace_root: &Path, no_config: bool) -> Result<Option<Config>> {
  if no_config {
    verbose_log!("Config file discovery disabled (--no-config)");
    return Ok(None);
  }

  match discover_config_path(explicit_path, workspace_root) {
    Some(path) => {
      let config = Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))?;
      Ok(Some(config))
    }
    None => Ok(None),
  }
}
