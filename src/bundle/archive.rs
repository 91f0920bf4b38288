//! In-memory archive tree serialised into a deterministic ZIP buffer.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::ExportError;

/// Ordered set of archive entries keyed by their archive-relative path.
#[derive(Debug, Clone, Default)]
pub struct BundleArchive {
  entries: Vec<(String, Vec<u8>)>,
}

impl BundleArchive {
  /// Create an empty archive tree.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a file, replacing the contents of an existing entry with the same path in place.
  pub fn add_file(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
    let path = path.into();
    let contents = contents.into();
    match self.entries.iter_mut().find(|(existing, _)| *existing == path) {
      Some(entry) => entry.1 = contents,
      None => self.entries.push((path, contents)),
    }
  }

  /// Entry paths in insertion order.
  pub fn paths(&self) -> Vec<String> {
    self.entries.iter().map(|(path, _)| path.clone()).collect()
  }

  /// Serialise the tree as a ZIP archive.
  ///
  /// Entries are written in insertion order with Deflate at level 9 and a fixed
  /// 1980-01-01 timestamp so that identical inputs produce identical bytes.
  pub fn finish(self) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .compression_level(Some(9))
      .last_modified_time(DateTime::default())
      .unix_permissions(0o644);

    for (path, contents) in &self.entries {
      writer.start_file(path.as_str(), options)?;
      writer.write_all(contents)?;
    }

    Ok(writer.finish()?.into_inner())
  }
}
