//! Consolidation of inline `<style>` and `<script>` blocks.

use std::sync::OnceLock;

use scraper::{Html, Selector};

use super::cached_selector;
use crate::asset_paths::{INLINE_SCRIPTS_FILE, INLINE_STYLES_FILE, contains_editor_marker};
use crate::models::ExtractedBlock;

const BLOCK_SEPARATOR: &str = "\n\n";

/// Concatenate the contents of every `<style>` element in document order.
pub fn extract_inline_css(html: &str) -> ExtractedBlock {
  static STYLE: OnceLock<Selector> = OnceLock::new();

  let document = Html::parse_document(html);
  let blocks: Vec<String> = document
    .select(cached_selector(&STYLE, "style"))
    .map(|element| element.text().collect::<String>())
    .filter(|css| !css.is_empty())
    .collect();

  ExtractedBlock {
    filename: INLINE_STYLES_FILE,
    content: blocks.join(BLOCK_SEPARATOR),
  }
}

/// Concatenate the contents of every `<script>` without a `src` attribute.
///
/// Blank scripts and scripts carrying an editor marker are skipped; the latter are tooling
/// artifacts that must never end up in the bundle.
pub fn extract_inline_js(html: &str) -> ExtractedBlock {
  static SCRIPT: OnceLock<Selector> = OnceLock::new();

  let document = Html::parse_document(html);
  let blocks: Vec<String> = document
    .select(cached_selector(&SCRIPT, "script"))
    .filter(|element| element.value().attr("src").is_none())
    .map(|element| element.text().collect::<String>())
    .filter(|js| !js.trim().is_empty() && !contains_editor_marker(js))
    .collect();

  ExtractedBlock {
    filename: INLINE_SCRIPTS_FILE,
    content: blocks.join(BLOCK_SEPARATOR),
  }
}
