//! Data structures produced while snapshotting a page into an offline bundle.

use std::fmt;

use serde::Serialize;

/// Archive category an asset is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
  /// Raster and vector images, including CSS background images.
  Images,
  /// Video sources nested under `<video>` elements.
  Videos,
  /// Font files referenced from `@font-face` rules.
  Fonts,
  /// External stylesheets.
  Styles,
  /// External scripts.
  Scripts,
}

impl AssetKind {
  /// Directory name used for this category inside `assets/`.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Images => "images",
      Self::Videos => "videos",
      Self::Fonts => "fonts",
      Self::Styles => "styles",
      Self::Scripts => "scripts",
    }
  }
}

impl fmt::Display for AssetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Role a reference plays in the page; selects the filename prefix and default extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
  /// `<img src>` reference.
  Image,
  /// CSS `url(...)` background reference.
  Background,
  /// `<video><source src></video>` reference.
  Video,
  /// `@font-face` source.
  Font,
  /// `<script src>` reference.
  Script,
  /// `<link rel="stylesheet">` reference.
  Style,
}

impl AssetRole {
  /// Prefix placed in front of the derived hash.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Image => "img",
      Self::Background => "bg",
      Self::Video => "video",
      Self::Font => "font",
      Self::Script => "script",
      Self::Style => "style",
    }
  }

  /// Extension used when the URL path does not carry a recognised one.
  pub fn default_extension(self) -> &'static str {
    match self {
      Self::Script => ".js",
      Self::Style => ".css",
      _ => ".jpg",
    }
  }

  /// Archive category for assets discovered in this role.
  pub fn kind(self) -> AssetKind {
    match self {
      Self::Image | Self::Background => AssetKind::Images,
      Self::Video => AssetKind::Videos,
      Self::Font => AssetKind::Fonts,
      Self::Script => AssetKind::Scripts,
      Self::Style => AssetKind::Styles,
    }
  }
}

/// Remote binary resource discovered in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
  /// Absolute http(s) URL exactly as it appeared in the document.
  pub url: String,
  /// Archive category.
  pub kind: AssetKind,
  /// Derived local filename.
  pub filename: String,
}

/// External stylesheet or script reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
  /// Absolute http(s) URL exactly as it appeared in the document.
  pub url: String,
  /// Derived local filename.
  pub filename: String,
}

/// Consolidated inline CSS or JavaScript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
  /// Fixed output filename (`styles.css` or `scripts.js`).
  pub filename: &'static str,
  /// Every inline block in document order, separated by a blank line.
  pub content: String,
}

impl ExtractedBlock {
  /// Returns `true` when there is nothing worth externalising.
  pub fn is_blank(&self) -> bool {
    self.content.trim().is_empty()
  }
}

/// Original absolute URL paired with its archive-relative path, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMap {
  entries: Vec<(String, String)>,
}

impl AssetMap {
  /// Register a successfully fetched URL. Re-registering a URL replaces its path.
  pub fn insert(&mut self, url: impl Into<String>, local_path: impl Into<String>) {
    let url = url.into();
    let local_path = local_path.into();
    match self.entries.iter_mut().find(|(existing, _)| *existing == url) {
      Some(entry) => entry.1 = local_path,
      None => self.entries.push((url, local_path)),
    }
  }

  /// Local path registered for `url`.
  pub fn get(&self, url: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(existing, _)| existing == url)
      .map(|(_, path)| path.as_str())
  }

  /// Iterate over `(url, local_path)` pairs in registration order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(url, path)| (url.as_str(), path.as_str()))
  }

  /// Number of registered URLs.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when nothing has been registered.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Resource that could not be fetched and was left pointing at the live URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
  /// Category the resource was discovered in.
  pub kind: AssetKind,
  /// Remote URL left untouched in the output.
  pub url: String,
  /// Human readable failure reason.
  pub reason: String,
}

/// Diagnostics describing what a single export did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
  /// Archive paths written, in insertion order.
  pub entries: Vec<String>,
  /// Resources that failed to fetch.
  pub failed: Vec<FailedResource>,
  /// Number of asset URLs rewritten to local paths.
  pub rewritten_assets: usize,
  /// Whether inline CSS was consolidated into `css/styles.css`.
  pub inline_css: bool,
  /// Whether inline JavaScript was consolidated into `js/scripts.js`.
  pub inline_js: bool,
  /// Size of the serialised archive in bytes.
  pub archive_size: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roles_map_to_prefixes_and_defaults() {
    assert_eq!(AssetRole::Background.prefix(), "bg");
    assert_eq!(AssetRole::Background.kind(), AssetKind::Images);
    assert_eq!(AssetRole::Script.default_extension(), ".js");
    assert_eq!(AssetRole::Style.default_extension(), ".css");
    assert_eq!(AssetRole::Font.default_extension(), ".jpg");
  }

  #[test]
  fn asset_map_keeps_registration_order() {
    let mut map = AssetMap::default();
    map.insert("https://x.test/b.png", "assets/images/b.png");
    map.insert("https://x.test/a.png", "assets/images/a.png");
    map.insert("https://x.test/b.png", "assets/images/b2.png");

    let pairs: Vec<_> = map.iter().collect();
    assert_eq!(pairs, vec![
      ("https://x.test/b.png", "assets/images/b2.png"),
      ("https://x.test/a.png", "assets/images/a.png"),
    ]);
    assert_eq!(map.get("https://x.test/a.png"), Some("assets/images/a.png"));
    assert_eq!(map.len(), 2);
  }
}
