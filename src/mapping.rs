//! # Mapping Module
//!
//! Selects the comment-style definition type for a file from its name or
//! extension. User overrides are consulted before the built-in table:
//!
//! 1. override matching the whole file name (`Dockerfile`, `Jenkinsfile`)
//! 2. override whose key contains `*`, matched as a file-name glob
//! 3. override matching the extension (`sh`, `.tmpl`)
//! 4. built-in file name table
//! 5. built-in extension table
//!
//! All comparisons are case-insensitive. Files that match nothing have no
//! style and are skipped by the processor.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::trace;

use crate::definitions::DefinitionRegistry;

/// Built-in extension table.
const EXTENSIONS: &[(&str, &str)] = &[
  // C family and JVM languages
  ("c", "SLASHSTAR_STYLE"),
  ("h", "SLASHSTAR_STYLE"),
  ("cpp", "SLASHSTAR_STYLE"),
  ("cc", "SLASHSTAR_STYLE"),
  ("cxx", "SLASHSTAR_STYLE"),
  ("hpp", "SLASHSTAR_STYLE"),
  ("hh", "SLASHSTAR_STYLE"),
  ("m", "SLASHSTAR_STYLE"),
  ("mm", "SLASHSTAR_STYLE"),
  ("cs", "SLASHSTAR_STYLE"),
  ("java", "SLASHSTAR_STYLE"),
  ("groovy", "SLASHSTAR_STYLE"),
  ("gradle", "SLASHSTAR_STYLE"),
  ("kt", "SLASHSTAR_STYLE"),
  ("kts", "SLASHSTAR_STYLE"),
  ("css", "SLASHSTAR_STYLE"),
  ("scss", "SLASHSTAR_STYLE"),
  ("less", "SLASHSTAR_STYLE"),
  ("scala", "SCALA_STYLE"),
  ("sc", "SCALA_STYLE"),
  ("js", "JAVASCRIPT_STYLE"),
  ("mjs", "JAVASCRIPT_STYLE"),
  ("cjs", "JAVASCRIPT_STYLE"),
  ("jsx", "JAVADOC_STYLE"),
  ("ts", "JAVADOC_STYLE"),
  ("tsx", "JAVADOC_STYLE"),
  ("php", "PHP"),
  // Line comment languages
  ("rs", "DOUBLESLASH_STYLE"),
  ("go", "DOUBLESLASH_STYLE"),
  ("swift", "DOUBLESLASH_STYLE"),
  ("dart", "DOUBLESLASH_STYLE"),
  ("proto", "DOUBLESLASH_STYLE"),
  ("zig", "DOUBLESLASH_STYLE"),
  ("v", "DOUBLESLASH_STYLE"),
  ("sv", "DOUBLESLASH_STYLE"),
  ("fs", "DOUBLESLASH_STYLE"),
  ("py", "PYTHON_STYLE"),
  ("pyi", "PYTHON_STYLE"),
  ("rb", "RUBY_STYLE"),
  ("rake", "RUBY_STYLE"),
  ("sh", "SCRIPT_STYLE"),
  ("bash", "SCRIPT_STYLE"),
  ("zsh", "SCRIPT_STYLE"),
  ("fish", "SCRIPT_STYLE"),
  ("pl", "SCRIPT_STYLE"),
  ("pm", "SCRIPT_STYLE"),
  ("r", "SCRIPT_STYLE"),
  ("tcl", "SCRIPT_STYLE"),
  ("tf", "SCRIPT_STYLE"),
  ("hcl", "SCRIPT_STYLE"),
  ("bzl", "SCRIPT_STYLE"),
  ("yaml", "SCRIPT_STYLE"),
  ("yml", "SCRIPT_STYLE"),
  ("toml", "SCRIPT_STYLE"),
  ("properties", "SCRIPT_STYLE"),
  ("cmake", "SCRIPT_STYLE"),
  ("ps1", "SCRIPT_STYLE"),
  ("nix", "SCRIPT_STYLE"),
  ("haml", "HAML_STYLE"),
  ("sql", "DOUBLEDASHES_STYLE"),
  ("hs", "DOUBLEDASHES_STYLE"),
  ("ada", "DOUBLEDASHES_STYLE"),
  ("adb", "DOUBLEDASHES_STYLE"),
  ("ads", "DOUBLEDASHES_STYLE"),
  ("lua", "LUA"),
  ("el", "SEMICOLON_STYLE"),
  ("lisp", "SEMICOLON_STYLE"),
  ("clj", "SEMICOLON_STYLE"),
  ("cljs", "SEMICOLON_STYLE"),
  ("scm", "SEMICOLON_STYLE"),
  ("asm", "SEMICOLON_STYLE"),
  ("ini", "SEMICOLON_STYLE"),
  ("vb", "APOSTROPHE_STYLE"),
  ("vbs", "APOSTROPHE_STYLE"),
  ("bas", "APOSTROPHE_STYLE"),
  ("f", "EXCLAMATION_STYLE"),
  ("f90", "EXCLAMATION_STYLE"),
  ("erl", "PERCENT3_STYLE"),
  ("hrl", "PERCENT3_STYLE"),
  ("tex", "PERCENT_STYLE"),
  ("sty", "PERCENT_STYLE"),
  ("matlab", "PERCENT_STYLE"),
  ("bat", "BATCH"),
  ("cmd", "BATCH"),
  ("ml", "OCAML_STYLE"),
  ("mli", "OCAML_STYLE"),
  ("pas", "DELPHI"),
  ("dpr", "DELPHI"),
  ("adoc", "ASCIIDOC_STYLE"),
  ("asciidoc", "ASCIIDOC_STYLE"),
  // Markup and templates
  ("xml", "XML_STYLE"),
  ("xsd", "XML_STYLE"),
  ("xsl", "XML_STYLE"),
  ("xslt", "XML_STYLE"),
  ("pom", "XML_STYLE"),
  ("svg", "XML_STYLE"),
  ("wxs", "XML_STYLE"),
  ("wxi", "XML_STYLE"),
  ("wxl", "XML_STYLE"),
  ("vue", "XML_STYLE"),
  ("html", "HTML_STYLE"),
  ("htm", "HTML_STYLE"),
  ("xhtml", "HTML_STYLE"),
  ("md", "HTML_STYLE"),
  ("jsp", "JSP"),
  ("jspx", "XML_STYLE"),
  ("asp", "ASP"),
  ("aspx", "ASP"),
  ("ftl", "FTL"),
  ("vm", "SHARPSTAR_STYLE"),
  ("tpl", "BRACESSTAR_STYLE"),
  ("cfc", "DYNASCRIPT3_STYLE"),
  ("cfm", "DYNASCRIPT3_STYLE"),
  ("mv", "MVEL"),
  ("mustache", "MUSTACHE"),
  ("hbs", "HANDLEBARS"),
  ("handlebars", "HANDLEBARS"),
  ("j2", "JINJA_STYLE"),
  ("jinja", "JINJA_STYLE"),
  ("jinja2", "JINJA_STYLE"),
  ("twig", "JINJA_STYLE"),
  ("txt", "TEXT"),
];

/// Built-in file name table (lower-case names).
const FILENAMES: &[(&str, &str)] = &[
  ("dockerfile", "DOCKERFILE_STYLE"),
  ("containerfile", "DOCKERFILE_STYLE"),
  ("makefile", "SCRIPT_STYLE"),
  ("gnumakefile", "SCRIPT_STYLE"),
  ("cmakelists.txt", "SCRIPT_STYLE"),
  ("build", "SCRIPT_STYLE"),
  ("workspace", "SCRIPT_STYLE"),
  ("gemfile", "RUBY_STYLE"),
  ("rakefile", "RUBY_STYLE"),
  ("vagrantfile", "RUBY_STYLE"),
  ("jenkinsfile", "SLASHSTAR_STYLE"),
  (".gitignore", "SCRIPT_STYLE"),
  (".gitattributes", "SCRIPT_STYLE"),
  (".editorconfig", "SCRIPT_STYLE"),
  (".dockerignore", "SCRIPT_STYLE"),
];

/// Resolves file paths to comment-style type names.
#[derive(Debug, Clone, Default)]
pub struct FileMapping {
  /// Overrides keyed by lower-case file name, glob, or extension.
  overrides: BTreeMap<String, String>,
}

impl FileMapping {
  /// Creates a mapping that only uses the built-in tables.
  pub fn builtin() -> Self {
    Self::default()
  }

  /// Creates a mapping with user overrides on top of the built-in tables.
  ///
  /// Keys are file names, file-name globs (containing `*`), or extensions with
  /// or without a leading dot. Values are style type names.
  pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
    let overrides = overrides
      .iter()
      .map(|(key, style)| (key.to_lowercase(), style.to_uppercase()))
      .collect();
    Self { overrides }
  }

  /// Adds or replaces a single override.
  pub fn insert(&mut self, key: &str, style: &str) {
    self.overrides.insert(key.to_lowercase(), style.to_uppercase());
  }

  /// Returns the style type name for `path`, or `None` if the file type is
  /// unknown.
  pub fn resolve(&self, path: &Path) -> Option<String> {
    let file_name = path
      .file_name()
      .and_then(|name| name.to_str())
      .unwrap_or("")
      .to_lowercase();
    let extension = path
      .extension()
      .and_then(|ext| ext.to_str())
      .unwrap_or("")
      .to_lowercase();

    if let Some(style) = self.overrides.get(&file_name) {
      trace!("Using filename override for: {}", file_name);
      return Some(style.clone());
    }

    for (pattern, style) in &self.overrides {
      if pattern.contains('*')
        && let Ok(glob_pattern) = glob::Pattern::new(pattern)
        && glob_pattern.matches(&file_name)
      {
        trace!("Using filename glob override '{}' for: {}", pattern, file_name);
        return Some(style.clone());
      }
    }

    if !extension.is_empty() {
      let dotted = format!(".{extension}");
      if let Some(style) = self.overrides.get(&extension).or_else(|| self.overrides.get(&dotted)) {
        trace!("Using extension override for: .{}", extension);
        return Some(style.clone());
      }
    }

    lookup(FILENAMES, &file_name)
      .or_else(|| lookup(EXTENSIONS, &extension))
      .map(str::to_string)
  }

  /// Overrides naming a style the registry does not know, as `(key, style)`.
  pub fn unknown_styles(&self, registry: &DefinitionRegistry) -> Vec<(String, String)> {
    self
      .overrides
      .iter()
      .filter(|(_, style)| !registry.contains(style))
      .map(|(key, style)| (key.clone(), style.clone()))
      .collect()
  }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
  if key.is_empty() {
    return None;
  }
  table.iter().find(|(name, _)| *name == key).map(|(_, style)| *style)
}

/// Style names referenced by the built-in tables.
pub fn builtin_targets() -> impl Iterator<Item = &'static str> {
  EXTENSIONS.iter().chain(FILENAMES.iter()).map(|(_, style)| *style)
}
