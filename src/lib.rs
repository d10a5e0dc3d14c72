//! # edheader
//!
//! A tool that detects, inserts, updates, and removes license header comment
//! blocks across source files of many languages, normalizing them to a single
//! template.
//!
//! ## Features
//!
//! * More than forty comment styles, from Javadoc blocks to `#` scripts and XML
//! * Headers go below shebangs, XML prologs, and similar leading lines
//! * Line endings and byte-order marks are preserved
//! * Lines containing a keyword such as "copyright" may differ without
//!   counting as a mismatch
//! * Applying a header twice changes nothing the second time
//! * Copyright years from file modification times or git history
//!
//! ## Usage as a Library
//!
//! ```rust
//! use std::path::PathBuf;
//!
//! use edheader::definitions::DefinitionRegistry;
//! use edheader::document::Document;
//! use edheader::properties::Properties;
//! use edheader::templates::HeaderTemplate;
//!
//! let registry = DefinitionRegistry::builtin();
//! let style = registry.lookup("SCRIPT_STYLE").expect("built-in style");
//!
//! let mut properties = Properties::new();
//! properties.insert("owner".to_string(), "Acme".to_string());
//! let template = HeaderTemplate::load("Copyright ${owner}", &properties);
//!
//! let mut document = Document::new(PathBuf::from("run.sh"), "#!/bin/sh\necho hi\n".to_string(), style);
//! assert!(!document.has_header(&template, true));
//!
//! document.update_header(&template);
//! assert_eq!(document.content(), "#!/bin/sh\n#\n# Copyright Acme\n#\n\necho hi\n");
//! assert!(document.has_header(&template, true));
//! ```
//!
//! ## Modules
//!
//! * [`definitions`] - Comment style rules
//! * [`templates`] - Header rendering and comparison
//! * [`document`] - Header detection and editing in one file
//! * [`properties`] - Template properties and year providers
//! * [`processor`] - Batch processing of many files
//!
//! [`definitions`]: crate::definitions
//! [`templates`]: crate::templates
//! [`document`]: crate::document
//! [`properties`]: crate::properties
//! [`processor`]: crate::processor

pub mod config;
pub mod definitions;
pub mod diff;
pub mod document;
pub mod git;
pub mod logging;
pub mod mapping;
pub mod output;
pub mod processor;
pub mod properties;
pub mod report;
pub mod templates;
pub mod workspace;
