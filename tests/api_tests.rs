mod common;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use chrono::{TimeZone, Utc};
use common::{style, write_file};
use edheader::definitions::DefinitionRegistry;
use edheader::document::Document;
use edheader::mapping::FileMapping;
use edheader::processor::{Mode, Processor, ProcessorConfig};
use edheader::properties::{
  FS_COPYRIGHT_LAST_YEAR, FS_COPYRIGHT_YEARS, FilesystemYearsProvider, INCEPTION_YEAR_KEY, Properties,
  PropertyResolver,
};
use edheader::report::FileAction;
use edheader::templates::HeaderTemplate;
use tempfile::tempdir;

const HEADER: &str = "Copyright 2024 Acme\nLicensed under MIT";

fn template(text: &str) -> HeaderTemplate {
  HeaderTemplate::load(text, &Properties::new())
}

fn document(name: &str, text: &str, style_name: &str) -> Document {
  Document::new(PathBuf::from(name), text.to_string(), style(style_name))
}

fn processor(mode: Mode, root: &Path, dry_run: bool) -> Result<Arc<Processor>> {
  let config = ProcessorConfig {
    header_source: Some(HEADER.to_string()),
    dry_run,
    jobs: 2,
    ..ProcessorConfig::new(
      mode,
      Arc::new(DefinitionRegistry::builtin()),
      Arc::new(FileMapping::builtin()),
      PropertyResolver::new(Properties::new()),
      root.to_path_buf(),
    )
  };
  Ok(Arc::new(Processor::new(config)?))
}

#[test]
fn test_text_header_with_crlf() {
  let original = "first line\r\nsecond line\r\n";
  let mut doc = document("doc1.txt", original, "TEXT");

  doc.update_header(&template("X"));
  assert_eq!(doc.content(), format!("====\r\n    X\r\n====\r\n\r\n{original}"));

  let mut untouched = document("doc1.txt", original, "TEXT");
  assert!(!untouched.remove_header());
  assert_eq!(untouched.content(), original);
}

#[test]
fn test_xml_prolog_survives_removal() {
  let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!--\n    Copyright Acme\n-->\n<project>\n</project>\n";
  let mut doc = document("pom.xml", text, "XML_STYLE");

  assert!(doc.is_header_present());
  assert!(doc.remove_header());
  assert_eq!(
    doc.content(),
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n</project>\n"
  );
}

#[test]
fn test_xml_header_goes_below_prolog() {
  let mut doc = document("pom.xml", "<?xml version=\"1.0\"?>\n<root/>\n", "XML_STYLE");
  doc.update_header(&template("Copyright Acme"));
  assert!(doc.content().starts_with("<?xml version=\"1.0\"?>\n<!--"));
  assert!(doc.content().ends_with("-->\n\n<root/>\n"));
}

#[test]
fn test_mapping_override_gives_identical_headers() {
  let mut mapping = FileMapping::builtin();
  mapping.insert("txt", "script_style");
  let registry = DefinitionRegistry::builtin();
  let tpl = template("Copyright Acme\nAll rights reserved");

  let bodies = [
    ("doc1.txt", "plain body\n", "plain body\n"),
    ("doc2.txt", "# Copyright 1999 Old Corp\n\nold body\n", "old body\n"),
    ("doc3.txt", "#!/bin/sh\necho hi\n", "echo hi\n"),
    ("doc4.txt", "", ""),
  ];

  let mut headers = Vec::new();
  for (name, text, body) in bodies {
    let style_name = mapping.resolve(Path::new(name)).expect("txt is mapped");
    assert_eq!(style_name, "SCRIPT_STYLE");

    let definition = registry.lookup(&style_name).expect("script style");
    let mut doc = Document::new(PathBuf::from(name), text.to_string(), definition);
    doc.update_header(&tpl);

    assert!(doc.content().ends_with(body), "{name}: body changed: {:?}", doc.content());
    headers.push(doc.header_text().expect("header after update").to_string());
  }

  assert!(headers.iter().all(|h| h == &headers[0]), "headers differ: {headers:?}");
  assert_eq!(headers[0], "#\n# Copyright Acme\n# All rights reserved\n#\n\n");
}

#[test]
fn test_copyright_ranges() {
  let at = |year: i32| Utc.with_ymd_and_hms(year, 3, 1, 0, 0, 0).single().expect("valid date");

  let range = FilesystemYearsProvider::years_for(1999, at(2023));
  assert_eq!(range[FS_COPYRIGHT_YEARS], "1999-2023");

  let same = FilesystemYearsProvider::years_for(1999, at(1999));
  assert_eq!(same[FS_COPYRIGHT_YEARS], "1999");

  let older = FilesystemYearsProvider::years_for(2000, at(1999));
  assert_eq!(older[FS_COPYRIGHT_YEARS], "2000");
  assert_eq!(older[FS_COPYRIGHT_LAST_YEAR], "1999");
}

#[test]
fn test_filesystem_years_in_rendered_header() -> Result<()> {
  let dir = tempdir()?;
  let path = write_file(dir.path(), "lib.rs", "fn main() {}\n")?;
  let modified = Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).single().expect("valid date");
  let file = File::options().write(true).open(&path)?;
  file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(modified.timestamp() as u64))?;
  drop(file);

  let mut base = Properties::new();
  base.insert(INCEPTION_YEAR_KEY.to_string(), "2019".to_string());
  let mut resolver = PropertyResolver::new(base);
  resolver.register(Box::new(FilesystemYearsProvider));
  resolver.init_all(dir.path().to_path_buf())?;

  let mut doc = Document::load(&path, style("DOUBLESLASH_STYLE"))?;
  let properties = resolver.resolve(&doc)?;
  doc.update_header(&HeaderTemplate::load("Copyright ${fs.copyright_years} Acme", &properties));

  assert_eq!(doc.content(), "// Copyright 2019-2023 Acme\n\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_update_twice_changes_nothing() {
  let tpl = template(HEADER);
  for (name, text, style_name) in [
    ("a.rs", "fn main() {}\n", "DOUBLESLASH_STYLE"),
    ("b.java", "/*\n * Copyright 1999 Old\n */\nclass A {}\n", "SLASHSTAR_STYLE"),
    ("c.py", "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\nprint(1)\n", "PYTHON_STYLE"),
    ("d.sql", "select 1;\n", "DOUBLEDASHES_STYLE"),
    ("e.txt", "\r\n\r\nbody\r\n", "TEXT"),
    ("f.xml", "<?xml version=\"1.0\"?>\n<a/>\n", "XML_STYLE"),
  ] {
    let mut doc = document(name, text, style_name);
    doc.update_header(&tpl);
    let once = doc.content().to_string();
    doc.update_header(&tpl);
    assert_eq!(doc.content(), once, "{name}");
    assert!(doc.has_header(&tpl, true), "{name}");
  }
}

#[test]
fn test_remove_then_reinsert_reproduces_content() {
  let tpl = template(HEADER);
  for (name, text, style_name) in [
    ("a.rs", "// Copyright 2024 Acme\n// Licensed under MIT\n\nfn main() {}\n", "DOUBLESLASH_STYLE"),
    ("b.sh", "#!/bin/sh\n#\n# Copyright 2024 Acme\n# Licensed under MIT\n#\n\necho hi\n", "SCRIPT_STYLE"),
  ] {
    let mut doc = document(name, text, style_name);
    assert!(doc.has_header(&tpl, true), "{name}");
    assert!(doc.remove_header());
    doc.update_header(&tpl);
    assert_eq!(doc.content(), text, "{name}");
  }
}

#[test]
fn test_keyword_lines_are_ignored_when_comparing() {
  let tpl = template(HEADER);

  let mut other_year = document("a.rs", "// Copyright 1999 Someone Else\n// Licensed under MIT\n\nfn main() {}\n", "DOUBLESLASH_STYLE");
  assert!(other_year.has_header(&tpl, true));

  let mut other_license = document("a.rs", "// Copyright 2024 Acme\n// Licensed under GPL\n\nfn main() {}\n", "DOUBLESLASH_STYLE");
  assert!(!other_license.has_header(&tpl, true));
}

#[test]
fn test_lenient_comparison_checks_outer_lines_only() {
  let tpl = template("Copyright Acme\nLicensed under MIT\nSee LICENSE");
  let text = "/*\n * Copyright Acme\n * Licensed under Apache\n * See LICENSE\n */\nint x;\n";

  let mut doc = document("a.c", text, "SLASHSTAR_STYLE");
  assert!(!doc.has_header(&tpl, true));
  assert!(doc.has_header(&tpl, false));
}

#[test]
fn test_bom_round_trip() {
  let mut doc = document("a.rs", "\u{feff}fn main() {}\n", "DOUBLESLASH_STYLE");
  doc.update_header(&template("Copyright Acme"));
  assert!(doc.to_output().starts_with("\u{feff}// Copyright Acme"));
  assert!(doc.remove_header());
  assert_eq!(doc.to_output(), "\u{feff}fn main() {}\n");
}

#[tokio::test]
async fn test_format_check_remove_through_processor() -> Result<()> {
  let dir = tempdir()?;
  let rust = write_file(dir.path(), "src/main.rs", "fn main() {}\n")?;
  let script = write_file(dir.path(), "run.sh", "#!/bin/sh\necho hi\n")?;
  let binary = write_file(dir.path(), "data.bin", "opaque")?;
  let files = vec![rust.clone(), script.clone(), binary.clone()];

  let check = processor(Mode::Check, dir.path(), false)?.process_files(files.clone()).await?;
  let actions: Vec<FileAction> = check.iter().map(|r| r.action).collect();
  assert_eq!(actions, vec![FileAction::Skipped, FileAction::Missing, FileAction::Missing]);
  assert_eq!(fs::read_to_string(&rust)?, "fn main() {}\n");

  let format = processor(Mode::Format, dir.path(), false)?.process_files(files.clone()).await?;
  assert_eq!(format.iter().filter(|r| r.action == FileAction::Inserted).count(), 2);
  assert_eq!(
    fs::read_to_string(&rust)?,
    "// Copyright 2024 Acme\n// Licensed under MIT\n\nfn main() {}\n"
  );

  let again = processor(Mode::Format, dir.path(), false)?.process_files(files.clone()).await?;
  assert_eq!(again.iter().filter(|r| r.action == FileAction::Present).count(), 2);

  let remove = processor(Mode::Remove, dir.path(), true)?.process_files(files.clone()).await?;
  assert_eq!(remove.iter().filter(|r| r.action == FileAction::Removed).count(), 2);
  assert!(fs::read_to_string(&rust)?.starts_with("// Copyright"));

  processor(Mode::Remove, dir.path(), false)?.process_files(files).await?;
  assert_eq!(fs::read_to_string(&rust)?, "fn main() {}\n");
  assert_eq!(fs::read_to_string(&script)?, "#!/bin/sh\necho hi\n");
  assert_eq!(fs::read_to_string(&binary)?, "opaque");
  Ok(())
}
