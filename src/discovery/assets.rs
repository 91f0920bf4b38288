//! Typed binary assets: images, CSS backgrounds, videos and fonts.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::cached_selector;
use crate::asset_paths::{derive_filename, is_remote_url};
use crate::models::{Asset, AssetKind, AssetRole};

fn css_url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)url\(\s*(?:['"]|&quot;|&#39;|&apos;)?(https?://[^'")\s]+)['"]?\s*\)"#)
      .expect("invalid url() regex")
  })
}

/// Absolute URLs of every `url(...)` in `text`, with attribute-level entity escaping undone.
fn css_urls(text: &str) -> impl Iterator<Item = String> + '_ {
  css_url_pattern().captures_iter(text).map(|captures| {
    let raw = captures.get(1).map_or("", |url| url.as_str());
    let url = ["&quot;", "&#39;", "&apos;"]
      .iter()
      .find_map(|entity| raw.strip_suffix(entity))
      .unwrap_or(raw);
    url.replace("&amp;", "&")
  })
}

fn font_face_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?i)@font-face\s*\{([^}]*)\}").expect("invalid @font-face regex")
  })
}

/// Discover every remote image, background, video and font referenced by `html`.
///
/// Records are emitted by category (images, backgrounds, videos, fonts) and in document
/// order within a category. A URL is emitted at most once; `url(...)` values that sit inside
/// an `@font-face` rule are reported as fonts rather than backgrounds.
pub fn discover_assets(html: &str) -> Vec<Asset> {
  static IMG: OnceLock<Selector> = OnceLock::new();
  static VIDEO_SOURCE: OnceLock<Selector> = OnceLock::new();

  let document = Html::parse_document(html);
  let font_urls = font_face_urls(html);
  let mut collector = AssetCollector::default();

  for element in document.select(cached_selector(&IMG, "img[src]")) {
    if let Some(src) = element.value().attr("src") {
      collector.push(src, AssetRole::Image);
    }
  }

  for url in css_urls(html) {
    if !font_urls.contains(&url) {
      collector.push(&url, AssetRole::Background);
    }
  }

  for element in document.select(cached_selector(&VIDEO_SOURCE, "video source[src]")) {
    if let Some(src) = element.value().attr("src") {
      collector.push(src, AssetRole::Video);
    }
  }

  for url in &font_urls {
    collector.push(url, AssetRole::Font);
  }

  let assets = collector.finish();
  debug!(
    total = assets.len(),
    images = count_kind(&assets, AssetKind::Images),
    videos = count_kind(&assets, AssetKind::Videos),
    fonts = count_kind(&assets, AssetKind::Fonts),
    "discovered page assets"
  );
  assets
}

fn font_face_urls(html: &str) -> Vec<String> {
  font_face_pattern()
    .captures_iter(html)
    .flat_map(|block| {
      let body = block.get(1).map_or("", |body| body.as_str());
      css_urls(body).collect::<Vec<_>>()
    })
    .collect()
}

fn count_kind(assets: &[Asset], kind: AssetKind) -> usize {
  assets.iter().filter(|asset| asset.kind == kind).count()
}

#[derive(Default)]
struct AssetCollector {
  seen: HashSet<String>,
  assets: Vec<Asset>,
}

impl AssetCollector {
  fn push(&mut self, url: &str, role: AssetRole) {
    if !is_remote_url(url) || !self.seen.insert(url.to_string()) {
      return;
    }

    self.assets.push(Asset {
      url: url.to_string(),
      kind: role.kind(),
      filename: derive_filename(url, role),
    });
  }

  fn finish(self) -> Vec<Asset> {
    self.assets
  }
}
