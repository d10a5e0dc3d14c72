//! # Definitions Module
//!
//! This module holds the comment-style rules that describe how a license
//! header looks in each comment dialect, and the [`DefinitionRegistry`] that
//! maps style type names (such as `SCRIPT_STYLE` or `XML_STYLE`) to compiled
//! [`HeaderDefinition`]s.
//!
//! The registry is built once from the built-in table merged with
//! user-supplied additions. An addition whose name matches a built-in style
//! replaces it entirely. After construction the registry is read-only and is
//! shared between workers behind an [`Arc`].
//!
//! ## The `EOL` token
//!
//! Inside `first-line` and `end-line` the literal `EOL` stands for the line
//! separator of the document the header is rendered for. A boundary literal of
//! `"#EOL"` therefore renders as `#`, a line break, and an empty line.
//!
//! ## Example
//!
//! ```rust
//! use edheader::definitions::DefinitionRegistry;
//!
//! let registry = DefinitionRegistry::builtin();
//! let script = registry.lookup("script_style").expect("built-in style");
//! assert!(script.is_skip_line("#!/bin/sh"));
//! assert!(script.is_first_header_line("# Copyright 2025"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

/// Token standing for the document's line separator in boundary literals.
pub const EOL_TOKEN: &str = "EOL";

/// Raw, unvalidated comment-style definition.
///
/// This is the shape of a `[definitions.<TYPE>]` table in the configuration
/// file. Required fields are modelled as `Option` so that a missing field can
/// be reported by name instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DefinitionSpec {
  pub first_line: Option<String>,
  pub before_each_line: Option<String>,
  pub end_line: Option<String>,
  pub after_each_line: Option<String>,
  pub skip_line_pattern: Option<String>,
  pub first_line_detection_pattern: Option<String>,
  pub last_line_detection_pattern: Option<String>,
  #[serde(default)]
  pub allow_blank_lines: bool,
  #[serde(default)]
  pub multiline: bool,
}

/// A malformed comment-style definition.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
  /// A required field was not supplied.
  #[error("comment style '{type_name}' is missing required field '{field}'")]
  MissingField { type_name: String, field: &'static str },

  /// A detection pattern was supplied but empty.
  #[error("comment style '{type_name}' has an empty '{field}'")]
  EmptyPattern { type_name: String, field: &'static str },

  /// A pattern failed to compile.
  #[error("comment style '{type_name}' has an invalid '{field}': {source}")]
  InvalidPattern {
    type_name: String,
    field: &'static str,
    #[source]
    source: regex::Error,
  },
}

/// Every malformed entry found while building a registry, one error per entry.
#[derive(Debug, thiserror::Error)]
#[error("{}", format_registry_errors(.0))]
pub struct RegistryError(pub Vec<DefinitionError>);

fn format_registry_errors(errors: &[DefinitionError]) -> String {
  let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
  format!("{} invalid comment style definition(s):\n{}", errors.len(), lines.join("\n"))
}

/// A compiled, immutable comment-style definition.
#[derive(Debug, Clone)]
pub struct HeaderDefinition {
  type_name: String,
  first_line: String,
  before_each_line: String,
  end_line: String,
  after_each_line: String,
  skip_line_pattern: Option<Regex>,
  first_line_detection_pattern: Regex,
  last_line_detection_pattern: Regex,
  allow_blank_lines: bool,
  multiline: bool,
}

impl HeaderDefinition {
  /// Validates and compiles a raw definition.
  ///
  /// Detection patterns are anchored so that they have to match the whole
  /// line, the same way a line-oriented matcher would treat them.
  ///
  /// # Errors
  ///
  /// Returns the first problem found in the entry, naming the type and the
  /// field.
  pub fn compile(type_name: &str, spec: &DefinitionSpec) -> Result<Self, DefinitionError> {
    let required = |value: &Option<String>, field: &'static str| -> Result<String, DefinitionError> {
      value.clone().ok_or_else(|| DefinitionError::MissingField {
        type_name: type_name.to_string(),
        field,
      })
    };

    let first_line = required(&spec.first_line, "first-line")?;
    let before_each_line = required(&spec.before_each_line, "before-each-line")?;
    let end_line = required(&spec.end_line, "end-line")?;
    let first_pattern = required(&spec.first_line_detection_pattern, "first-line-detection-pattern")?;
    let last_pattern = required(&spec.last_line_detection_pattern, "last-line-detection-pattern")?;

    let first_line_detection_pattern = compile_pattern(type_name, "first-line-detection-pattern", &first_pattern)?;
    let last_line_detection_pattern = compile_pattern(type_name, "last-line-detection-pattern", &last_pattern)?;
    let skip_line_pattern = match spec.skip_line_pattern.as_deref() {
      Some(pattern) if !pattern.is_empty() => Some(compile_pattern(type_name, "skip-line-pattern", pattern)?),
      _ => None,
    };

    Ok(Self {
      type_name: type_name.to_uppercase(),
      first_line,
      before_each_line,
      end_line,
      after_each_line: spec.after_each_line.clone().unwrap_or_default(),
      skip_line_pattern,
      first_line_detection_pattern,
      last_line_detection_pattern,
      allow_blank_lines: spec.allow_blank_lines,
      multiline: spec.multiline,
    })
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn first_line(&self) -> &str {
    &self.first_line
  }

  pub fn before_each_line(&self) -> &str {
    &self.before_each_line
  }

  pub fn end_line(&self) -> &str {
    &self.end_line
  }

  pub fn after_each_line(&self) -> &str {
    &self.after_each_line
  }

  pub const fn allow_blank_lines(&self) -> bool {
    self.allow_blank_lines
  }

  pub const fn is_multiline(&self) -> bool {
    self.multiline
  }

  pub const fn has_skip_line_pattern(&self) -> bool {
    self.skip_line_pattern.is_some()
  }

  /// Whether the line must stay above the header (shebang, XML prolog, ...).
  pub fn is_skip_line(&self, line: &str) -> bool {
    self
      .skip_line_pattern
      .as_ref()
      .is_some_and(|pattern| pattern.is_match(line))
  }

  pub fn is_first_header_line(&self, line: &str) -> bool {
    self.first_line_detection_pattern.is_match(line)
  }

  pub fn is_last_header_line(&self, line: &str) -> bool {
    self.last_line_detection_pattern.is_match(line)
  }

  /// The opening marker without `EOL` tokens or surrounding whitespace.
  ///
  /// A multiline header whose first line is exactly this marker is still open,
  /// even if the line also matches the closing pattern (`====` in `TEXT`).
  pub fn opening_marker(&self) -> &str {
    self.first_line.trim_end_matches(EOL_TOKEN).trim_start_matches(EOL_TOKEN).trim()
  }

  /// Whether the rendered header ends with an empty separator line.
  pub fn ends_with_blank_line(&self) -> bool {
    self.end_line.ends_with(EOL_TOKEN)
  }
}

fn compile_pattern(type_name: &str, field: &'static str, pattern: &str) -> Result<Regex, DefinitionError> {
  if pattern.trim().is_empty() {
    return Err(DefinitionError::EmptyPattern {
      type_name: type_name.to_string(),
      field,
    });
  }

  Regex::new(&format!("^(?:{pattern})$")).map_err(|source| DefinitionError::InvalidPattern {
    type_name: type_name.to_string(),
    field,
    source,
  })
}

/// Immutable table of comment-style definitions keyed by upper-case type name.
#[derive(Debug, Clone)]
pub struct DefinitionRegistry {
  definitions: BTreeMap<String, Arc<HeaderDefinition>>,
}

impl Default for DefinitionRegistry {
  fn default() -> Self {
    Self::builtin()
  }
}

impl DefinitionRegistry {
  /// Creates a registry holding only the built-in styles.
  pub fn builtin() -> Self {
    Self::with_additional(BTreeMap::new()).expect("built-in comment styles must be valid")
  }

  /// Creates a registry from the built-in styles merged with `additional`.
  ///
  /// Names are case-insensitive; an addition named like a built-in style
  /// replaces it.
  ///
  /// # Errors
  ///
  /// Returns a [`RegistryError`] listing every malformed entry.
  pub fn with_additional(additional: BTreeMap<String, DefinitionSpec>) -> Result<Self, RegistryError> {
    let mut specs = builtin_specs();
    for (name, spec) in additional {
      specs.insert(name.to_uppercase(), spec);
    }

    let mut definitions = BTreeMap::new();
    let mut errors = Vec::new();
    for (name, spec) in &specs {
      match HeaderDefinition::compile(name, spec) {
        Ok(definition) => {
          definitions.insert(name.clone(), Arc::new(definition));
        }
        Err(e) => errors.push(e),
      }
    }

    if !errors.is_empty() {
      return Err(RegistryError(errors));
    }

    Ok(Self { definitions })
  }

  /// Checks every entry and returns one error per malformed entry.
  pub fn validate_all(specs: &BTreeMap<String, DefinitionSpec>) -> Vec<DefinitionError> {
    specs
      .iter()
      .filter_map(|(name, spec)| HeaderDefinition::compile(name, spec).err())
      .collect()
  }

  /// Looks up a definition by type name, case-insensitively.
  pub fn lookup(&self, type_name: &str) -> Option<Arc<HeaderDefinition>> {
    self.definitions.get(&type_name.to_uppercase()).cloned()
  }

  pub fn contains(&self, type_name: &str) -> bool {
    self.definitions.contains_key(&type_name.to_uppercase())
  }

  /// All registered type names in sorted order.
  pub fn type_names(&self) -> impl Iterator<Item = &str> {
    self.definitions.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }
}

impl fmt::Display for HeaderDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} (first: {:?}, each: {:?}, end: {:?}{})",
      self.type_name,
      self.first_line,
      self.before_each_line,
      self.end_line,
      if self.multiline { ", multiline" } else { "" }
    )
  }
}

struct BuiltinStyle {
  name: &'static str,
  first_line: &'static str,
  before_each_line: &'static str,
  end_line: &'static str,
  after_each_line: &'static str,
  skip_line_pattern: Option<&'static str>,
  first_line_detection_pattern: &'static str,
  last_line_detection_pattern: &'static str,
  allow_blank_lines: bool,
  multiline: bool,
}

/// A header wrapped in one comment token pair.
#[allow(clippy::too_many_arguments)]
const fn block(
  name: &'static str,
  first_line: &'static str,
  before_each_line: &'static str,
  end_line: &'static str,
  skip_line_pattern: Option<&'static str>,
  first_line_detection_pattern: &'static str,
  last_line_detection_pattern: &'static str,
  allow_blank_lines: bool,
) -> BuiltinStyle {
  BuiltinStyle {
    name,
    first_line,
    before_each_line,
    end_line,
    after_each_line: "",
    skip_line_pattern,
    first_line_detection_pattern,
    last_line_detection_pattern,
    allow_blank_lines,
    multiline: true,
  }
}

/// A header where every line carries its own comment prefix.
const fn lines(
  name: &'static str,
  first_line: &'static str,
  before_each_line: &'static str,
  end_line: &'static str,
  skip_line_pattern: Option<&'static str>,
  line_pattern: &'static str,
) -> BuiltinStyle {
  BuiltinStyle {
    name,
    first_line,
    before_each_line,
    end_line,
    after_each_line: "",
    skip_line_pattern,
    first_line_detection_pattern: line_pattern,
    last_line_detection_pattern: line_pattern,
    allow_blank_lines: false,
    multiline: false,
  }
}

const SLASHSTAR_START: &str = r"(\s|\t)*/\*.*";
const SLASHSTAR_END: &str = r".*\*/(\s|\t)*";
const XML_START: &str = r"(\s|\t)*<!--.*";
const XML_END: &str = r".*-->(\s|\t)*";
const XML_PROLOG: &str = r"<\?xml.*>";

const BUILTIN_STYLES: &[BuiltinStyle] = &[
  block("JAVADOC_STYLE", "/**", " * ", " */", None, SLASHSTAR_START, SLASHSTAR_END, false),
  block("JAVASCRIPT_STYLE", "/**", " * ", " */", Some(r"#!.*"), SLASHSTAR_START, SLASHSTAR_END, false),
  block("SCALA_STYLE", "/**", "  * ", "  */", None, SLASHSTAR_START, SLASHSTAR_END, false),
  block(
    "JAVAPKG_STYLE",
    "EOL/*-",
    " * ",
    " */",
    Some(r"package [a-z_]+(\.[a-z_][a-z0-9_]*)*;"),
    SLASHSTAR_START,
    SLASHSTAR_END,
    false,
  ),
  block("SLASHSTAR_STYLE", "/*", " * ", " */", None, SLASHSTAR_START, SLASHSTAR_END, false),
  block("PHP", "/*", " * ", " */", Some(r"<\?php.*"), SLASHSTAR_START, SLASHSTAR_END, false),
  block(
    "BRACESSTAR_STYLE",
    "{*",
    " * ",
    " *}",
    None,
    r"(\s|\t)*\{\*.*",
    r".*\*\}(\s|\t)*",
    false,
  ),
  block("SHARPSTAR_STYLE", "#*", " * ", " *#", None, r"(\s|\t)*#\*.*", r".*\*#(\s|\t)*", false),
  block("XML_STYLE", "<!--EOL", "    ", "EOL-->", Some(XML_PROLOG), XML_START, XML_END, true),
  block(
    "HTML_STYLE",
    "<!--EOL",
    "    ",
    "EOL-->",
    Some(r"<!(DOCTYPE|doctype).*>"),
    XML_START,
    XML_END,
    true,
  ),
  block("WIKI", "<!--EOL", "    ", "EOL-->", None, XML_START, XML_END, true),
  block(
    "DYNASCRIPT_STYLE",
    "<%--EOL",
    "    ",
    "EOL--%>",
    None,
    r"(\s|\t)*<%--.*",
    r".*--%>(\s|\t)*",
    true,
  ),
  block(
    "JSP",
    "<%--EOL",
    "    ",
    "EOL--%>",
    Some(r"<%@.*%>"),
    r"(\s|\t)*<%--.*",
    r".*--%>(\s|\t)*",
    true,
  ),
  block(
    "DYNASCRIPT3_STYLE",
    "<!---EOL",
    "    ",
    "EOL--->",
    None,
    r"(\s|\t)*<!---.*",
    r".*--->(\s|\t)*",
    true,
  ),
  block("ASP", "<%", "    ", "%>", None, r"(\s|\t)*<%(\s.*)?", r".*%>(\s|\t)*", true),
  block("LUA", "--[[EOL", "    ", "EOL]]", None, r"--\[\[", r"\]\]", true),
  block("FTL", "<#--EOL", "    ", "EOL-->", None, r"(\s|\t)*<#--.*", r".*-->(\s|\t)*", true),
  block(
    "FTL_ALT",
    "[#--EOL",
    "    ",
    "EOL--]",
    Some(r"\[#ftl(\s.*)?\]"),
    r"(\s|\t)*\[#--.*",
    r".*--\](\s|\t)*",
    true,
  ),
  block("TEXT", "====", "    ", "====EOL", None, r"====.*", r"====.*", true),
  block("MVEL", "@comment{", "  ", "}", None, r"@comment\{", r"\}", true),
  block("MUSTACHE", "{{!", "    ", "}}", None, r"\{\{!.*", r".*\}\}", true),
  block("HANDLEBARS", "{{!--", "    ", "--}}", None, r"\{\{!--.*", r".*--\}\}", true),
  block("ASCIIDOC_STYLE", "////", "  ", "////EOL", None, r"////", r"////", true),
  block(
    "HASKELL_BLOCK_STYLE",
    "{-",
    "    ",
    "-}",
    None,
    r"(\s|\t)*\{-.*",
    r".*-\}(\s|\t)*",
    true,
  ),
  block("OCAML_STYLE", "(**", "   ", " *)", None, r"(\s|\t)*\(\*.*", r".*\*\)(\s|\t)*", true),
  block("JINJA_STYLE", "{#", "    ", "#}", None, r"(\s|\t)*\{#.*", r".*#\}(\s|\t)*", true),
  block("DELPHI", "{", "  ", "}", None, r"\{.*", r".*\}", true),
  lines("SCRIPT_STYLE", "#", "# ", "#EOL", Some(r"#!.*"), r"#.*"),
  lines(
    "PYTHON_STYLE",
    "#",
    "# ",
    "#EOL",
    Some(r"(#!.*|#.*-\*-.*coding.*|# *vim:.*)"),
    r"#.*",
  ),
  lines(
    "RUBY_STYLE",
    "#",
    "# ",
    "#EOL",
    Some(r"(#!.*|# *(encoding|frozen_string_literal|coding):.*)"),
    r"#.*",
  ),
  lines("DOCKERFILE_STYLE", "#", "# ", "#EOL", Some(r"# *(syntax|escape|check)=.*"), r"#.*"),
  lines("HAML_STYLE", "-#", "-# ", "-#EOL", Some(r"-#!.*"), r"-#.*"),
  lines("SEMICOLON_STYLE", ";", "; ", ";EOL", None, r";.*"),
  lines("APOSTROPHE_STYLE", "'", "' ", "'EOL", None, r"'.*"),
  lines("EXCLAMATION_STYLE", "!", "! ", "!EOL", None, r"!.*"),
  lines("EXCLAMATION3_STYLE", "!!!", "!!! ", "!!!EOL", None, r"!!!.*"),
  lines("DOUBLEDASHES_STYLE", "--", "-- ", "--EOL", None, r"--.*"),
  lines("DOUBLETILDE_STYLE", "~~", "~~ ", "~~EOL", None, r"~~.*"),
  lines("PERCENT_STYLE", "", "% ", "EOL", None, r"%.*"),
  lines("PERCENT3_STYLE", "%%%", "%%% ", "%%%EOL", None, r"%%%.*"),
  lines("DOUBLEPERCENT_STYLE", "%%", "%% ", "%%EOL", None, r"%%.*"),
  lines("DOUBLESLASH_STYLE", "", "// ", "EOL", None, r"//.*"),
  lines("SINGLE_LINE_DOUBLESLASH_STYLE", "", "// ", "", None, r"//.*"),
  lines("TRIPLESLASH_STYLE", "///", "/// ", "///EOL", None, r"///.*"),
  lines("BATCH", "@REM", "@REM ", "@REMEOL", None, r"@REM.*"),
  BuiltinStyle {
    name: "XML_PER_LINE",
    first_line: "",
    before_each_line: "<!-- ",
    end_line: "EOL",
    after_each_line: " -->",
    skip_line_pattern: Some(XML_PROLOG),
    first_line_detection_pattern: r"(\s|\t)*<!--.*-->(\s|\t)*",
    last_line_detection_pattern: r"(\s|\t)*<!--.*-->(\s|\t)*",
    allow_blank_lines: false,
    multiline: false,
  },
];

fn builtin_specs() -> BTreeMap<String, DefinitionSpec> {
  BUILTIN_STYLES
    .iter()
    .map(|style| {
      let spec = DefinitionSpec {
        first_line: Some(style.first_line.to_string()),
        before_each_line: Some(style.before_each_line.to_string()),
        end_line: Some(style.end_line.to_string()),
        after_each_line: Some(style.after_each_line.to_string()),
        skip_line_pattern: style.skip_line_pattern.map(str::to_string),
        first_line_detection_pattern: Some(style.first_line_detection_pattern.to_string()),
        last_line_detection_pattern: Some(style.last_line_detection_pattern.to_string()),
        allow_blank_lines: style.allow_blank_lines,
        multiline: style.multiline,
      };
      (style.name.to_string(), spec)
    })
    .collect()
}
