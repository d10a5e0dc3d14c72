use std::fs;

use chrono::{DateTime, Datelike, Utc};

use super::{INCEPTION_YEAR_KEY, Properties, PropertyProvider, ProviderError, copyright_years, required_year};
use crate::document::Document;

pub const FS_COPYRIGHT_LAST_YEAR: &str = "fs.copyright_last_year";
pub const FS_COPYRIGHT_YEARS: &str = "fs.copyright_years";
pub const FS_LAST_CHANGE_DATE: &str = "fs.last_change_date";
pub const FS_LAST_CHANGE_TIMESTAMP: &str = "fs.last_change_timestamp";

/// Copyright years from the file's last modification time (UTC).
///
/// Requires the `inception_year` property.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemYearsProvider;

impl FilesystemYearsProvider {
  /// Properties for a file last modified at `modified`.
  pub fn years_for(inception: i32, modified: DateTime<Utc>) -> Properties {
    let last = modified.year();
    let mut properties = Properties::new();
    properties.insert(FS_COPYRIGHT_LAST_YEAR.to_string(), last.to_string());
    properties.insert(FS_COPYRIGHT_YEARS.to_string(), copyright_years(inception, last));
    properties.insert(FS_LAST_CHANGE_DATE.to_string(), modified.format("%Y-%m-%d").to_string());
    properties.insert(FS_LAST_CHANGE_TIMESTAMP.to_string(), modified.timestamp().to_string());
    properties
  }
}

impl PropertyProvider for FilesystemYearsProvider {
  fn name(&self) -> &'static str {
    "filesystem"
  }

  fn adjust_properties(&self, properties: &Properties, document: &Document) -> Result<Properties, ProviderError> {
    let inception = required_year(properties, INCEPTION_YEAR_KEY, self.name())?;

    let path = document.path();
    let metadata_error = |source| ProviderError::Metadata {
      path: path.to_path_buf(),
      source,
    };
    let modified = fs::metadata(path).and_then(|m| m.modified()).map_err(metadata_error)?;

    Ok(Self::years_for(inception, DateTime::<Utc>::from(modified)))
  }
}

#[cfg(test)]
mod tests {
  use std::fs::File;
  use std::path::PathBuf;
  use std::time::{Duration, SystemTime};

  use chrono::TimeZone;
  use tempfile::tempdir;

  use super::*;
  use crate::definitions::DefinitionRegistry;

  fn modified_in(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).single().expect("valid date")
  }

  #[test]
  fn test_years_for_range_rules() {
    let later = FilesystemYearsProvider::years_for(1999, modified_in(2023));
    assert_eq!(later[FS_COPYRIGHT_YEARS], "1999-2023");
    assert_eq!(later[FS_COPYRIGHT_LAST_YEAR], "2023");
    assert_eq!(later[FS_LAST_CHANGE_DATE], "2023-06-15");

    let same = FilesystemYearsProvider::years_for(1999, modified_in(1999));
    assert_eq!(same[FS_COPYRIGHT_YEARS], "1999");

    let older = FilesystemYearsProvider::years_for(2000, modified_in(1999));
    assert_eq!(older[FS_COPYRIGHT_YEARS], "2000");
    assert_eq!(older[FS_COPYRIGHT_LAST_YEAR], "1999");
  }

  #[test]
  fn test_adjust_properties_reads_mtime() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("file.txt");
    let file = File::create(&path).expect("create file");
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(modified_in(2023).timestamp() as u64);
    file.set_modified(mtime).expect("set mtime");
    drop(file);

    let definition = DefinitionRegistry::builtin().lookup("TEXT").expect("text style");
    let document = Document::new(path, String::new(), definition);
    let mut properties = Properties::new();
    properties.insert(INCEPTION_YEAR_KEY.to_string(), "1999".to_string());

    let result = FilesystemYearsProvider
      .adjust_properties(&properties, &document)
      .expect("provider output");
    assert_eq!(result[FS_COPYRIGHT_YEARS], "1999-2023");
    assert_eq!(result[FS_LAST_CHANGE_TIMESTAMP], modified_in(2023).timestamp().to_string());
  }

  #[test]
  fn test_missing_inception_year_fails() {
    let definition = DefinitionRegistry::builtin().lookup("TEXT").expect("text style");
    let document = Document::new(PathBuf::from("whatever.txt"), String::new(), definition);
    let err = FilesystemYearsProvider
      .adjust_properties(&Properties::new(), &document)
      .expect_err("inception year is required");
    assert!(err.to_string().contains(INCEPTION_YEAR_KEY));
  }

  #[test]
  fn test_missing_file_fails_with_path() {
    let definition = DefinitionRegistry::builtin().lookup("TEXT").expect("text style");
    let document = Document::new(PathBuf::from("/no/such/file.txt"), String::new(), definition);
    let mut properties = Properties::new();
    properties.insert(INCEPTION_YEAR_KEY.to_string(), "1999".to_string());

    let err = FilesystemYearsProvider
      .adjust_properties(&properties, &document)
      .expect_err("missing file");
    assert!(matches!(err, ProviderError::Metadata { .. }));
  }
}
