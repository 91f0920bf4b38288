//! External stylesheet and script references eligible for localisation.

use std::collections::HashSet;
use std::sync::OnceLock;

use scraper::{Html, Selector};

use super::cached_selector;
use crate::asset_paths::{derive_filename, is_remote_url};
use crate::models::{AssetRole, ExternalReference};

/// Absolute http(s) `href`s of `<link rel="stylesheet">` elements, deduplicated by URL.
pub fn discover_external_stylesheets(html: &str) -> Vec<ExternalReference> {
  static LINK: OnceLock<Selector> = OnceLock::new();

  let document = Html::parse_document(html);
  let hrefs = document
    .select(cached_selector(&LINK, r#"link[rel~="stylesheet"][href]"#))
    .filter_map(|element| element.value().attr("href"));

  collect_references(hrefs, AssetRole::Style)
}

/// Absolute http(s) `src`s of `<script>` elements, deduplicated by URL.
pub fn discover_external_scripts(html: &str) -> Vec<ExternalReference> {
  static SCRIPT: OnceLock<Selector> = OnceLock::new();

  let document = Html::parse_document(html);
  let sources = document
    .select(cached_selector(&SCRIPT, "script[src]"))
    .filter_map(|element| element.value().attr("src"));

  collect_references(sources, AssetRole::Script)
}

fn collect_references<'a>(
  urls: impl Iterator<Item = &'a str>,
  role: AssetRole,
) -> Vec<ExternalReference> {
  let mut seen = HashSet::new();
  urls
    .filter(|url| is_remote_url(url))
    .filter(|url| seen.insert(url.to_string()))
    .map(|url| ExternalReference {
      url: url.to_string(),
      filename: derive_filename(url, role),
    })
    .collect()
}
