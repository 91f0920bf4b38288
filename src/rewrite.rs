//! Surgical text edits applied to the working HTML.
//!
//! Nothing here re-serialises a parsed tree: every edit is an anchored insertion or a
//! regex replacement over the raw text, so regions that are not touched keep their exact
//! bytes.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, NoExpand, Regex};
use tracing::warn;

use crate::asset_paths::{script_archive_path, stylesheet_archive_path};
use crate::models::AssetMap;

fn base_tag_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)<base\b[^>]*>").expect("invalid base regex"))
}

fn style_block_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("invalid style regex")
  })
}

fn script_block_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?is)<script\b([^>]*)>.*?</script\s*>").expect("invalid script regex")
  })
}

fn src_attribute_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)(?:^|\s)src\s*=").expect("invalid src regex"))
}

fn integrity_attribute_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)\s+(?:integrity|crossorigin)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?"#)
      .expect("invalid integrity regex")
  })
}

fn head_close_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)</head\s*>").expect("invalid head regex"))
}

fn body_open_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)<body\b[^>]*>").expect("invalid body regex"))
}

fn body_close_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("invalid body regex"))
}

/// Remove every `<base>` tag; a stray base href would break the bundle's relative paths.
pub fn strip_base_tags(html: &str) -> String {
  base_tag_pattern().replace_all(html, "").into_owned()
}

/// Remove every `<style>...</style>` block verbatim.
pub fn remove_style_blocks(html: &str) -> String {
  style_block_pattern().replace_all(html, "").into_owned()
}

/// Remove every `<script>` block that has no `src` attribute.
pub fn remove_inline_scripts(html: &str) -> String {
  script_block_pattern()
    .replace_all(html, |caps: &Captures| {
      if src_attribute_pattern().is_match(&caps[1]) {
        caps[0].to_string()
      } else {
        String::new()
      }
    })
    .into_owned()
}

/// Insert `markup` followed by a newline before the first `</head>`.
pub fn insert_before_head_close(html: &str, markup: &str) -> String {
  insert_at_anchor(html, head_close_pattern(), markup, Anchor::Before, "</head>")
}

/// Insert a newline followed by `markup` right after the opening `<body ...>` tag.
pub fn insert_after_body_open(html: &str, markup: &str) -> String {
  insert_at_anchor(html, body_open_pattern(), markup, Anchor::After, "<body>")
}

/// Insert `markup` followed by a newline before the first `</body>`.
pub fn insert_before_body_close(html: &str, markup: &str) -> String {
  insert_at_anchor(html, body_close_pattern(), markup, Anchor::Before, "</body>")
}

enum Anchor {
  Before,
  After,
}

fn insert_at_anchor(
  html: &str,
  pattern: &Regex,
  markup: &str,
  anchor: Anchor,
  anchor_name: &str,
) -> String {
  let Some(found) = pattern.find(html) else {
    warn!(anchor = anchor_name, "anchor not found; skipping insertion");
    return html.to_string();
  };

  let mut text = String::with_capacity(html.len() + markup.len() + 1);
  match anchor {
    Anchor::Before => {
      text.push_str(&html[..found.start()]);
      text.push_str(markup);
      text.push('\n');
      text.push_str(&html[found.start()..]);
    }
    Anchor::After => {
      text.push_str(&html[..found.end()]);
      text.push('\n');
      text.push_str(markup);
      text.push_str(&html[found.end()..]);
    }
  }
  text
}

/// Spellings a URL may have in the raw markup: as-is and with `&` entity-escaped.
fn literal_variants(url: &str) -> Vec<String> {
  let mut variants = vec![url.to_string()];
  let escaped = url.replace('&', "&amp;");
  if escaped != url {
    variants.push(escaped);
  }
  variants
}

fn alternation(url: &str) -> String {
  literal_variants(url)
    .iter()
    .map(|variant| regex::escape(variant))
    .collect::<Vec<_>>()
    .join("|")
}

/// Replace every `<link>` tag whose `href` is `url` with a canonical local stylesheet link.
///
/// Returns the rewritten text and the number of tags replaced. Attributes of the original
/// tag are dropped on purpose: integrity hashes would no longer match the local copy.
pub fn localize_stylesheet_links(html: &str, url: &str, filename: &str) -> (String, usize) {
  let pattern = match Regex::new(&format!(
    r#"(?i)<link\b[^>]*\bhref\s*=\s*["'](?:{})["'][^>]*>"#,
    alternation(url)
  )) {
    Ok(pattern) => pattern,
    Err(err) => {
      warn!(%url, error = %err, "could not build stylesheet pattern");
      return (html.to_string(), 0);
    }
  };

  let count = pattern.find_iter(html).count();
  let replacement = format!(
    r#"<link rel="stylesheet" href="{}">"#,
    stylesheet_archive_path(filename)
  );
  let text = pattern
    .replace_all(html, NoExpand(&replacement))
    .into_owned();
  (text, count)
}

/// Point every reference to the script `url` at its local copy.
///
/// `<script>` tags keep their other attributes but lose `integrity` and `crossorigin`;
/// any remaining literal occurrence of the URL (preload hints, for instance) is swapped
/// for the local path as well. URLs in `retained` are matched but left as they are, so a
/// longer URL that starts with `url` survives. Returns the rewritten text and the number of
/// replacements.
pub fn localize_script_references(
  html: &str,
  url: &str,
  filename: &str,
  retained: &[String],
) -> (String, usize) {
  let local_path = script_archive_path(filename);
  let pattern = match Regex::new(&format!(
    r#"(?i)<script\b([^>]*?)\ssrc\s*=\s*["'](?:{})["']([^>]*)>"#,
    alternation(url)
  )) {
    Ok(pattern) => pattern,
    Err(err) => {
      warn!(%url, error = %err, "could not build script pattern");
      return (html.to_string(), 0);
    }
  };

  let mut count = 0;
  let text = pattern
    .replace_all(html, |caps: &Captures| {
      count += 1;
      let before = integrity_attribute_pattern().replace_all(&caps[1], "");
      let after = integrity_attribute_pattern().replace_all(&caps[2], "");
      format!(r#"<script{before} src="{local_path}"{after}>"#)
    })
    .into_owned();

  let mut mapping = AssetMap::default();
  mapping.insert(url, local_path.as_str());
  let (text, literal_count) = rewrite_asset_urls(&text, &mapping, retained);
  (text, count + literal_count)
}

/// Replace every literal occurrence of each mapped URL with its local path.
///
/// All URLs are matched in a single pass with the longest URL tried first. URLs listed in
/// `retained` (remote references that stay remote) take part in the match but are emitted
/// unchanged, so a mapped URL that is a prefix of one of them cannot clobber it. Returns
/// the rewritten text and the number of occurrences replaced.
pub fn rewrite_asset_urls(html: &str, mapping: &AssetMap, retained: &[String]) -> (String, usize) {
  if mapping.is_empty() {
    return (html.to_string(), 0);
  }

  let mut lookup: HashMap<String, Option<&str>> = HashMap::new();
  for (url, local_path) in mapping.iter() {
    for variant in literal_variants(url) {
      lookup.entry(variant).or_insert(Some(local_path));
    }
  }
  for url in retained.iter().filter(|url| mapping.get(url).is_none()) {
    for variant in literal_variants(url) {
      lookup.entry(variant).or_insert(None);
    }
  }

  let mut literals: Vec<&String> = lookup.keys().collect();
  literals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

  let source = literals
    .iter()
    .map(|literal| regex::escape(literal))
    .collect::<Vec<_>>()
    .join("|");

  match Regex::new(&source) {
    Ok(pattern) => {
      let mut count = 0;
      let text = pattern
        .replace_all(html, |caps: &Captures| match lookup.get(&caps[0]).copied().flatten() {
          Some(local_path) => {
            count += 1;
            local_path.to_string()
          }
          None => caps[0].to_string(),
        })
        .into_owned();
      (text, count)
    }
    Err(err) => {
      warn!(error = %err, "falling back to sequential URL replacement");
      let mut text = html.to_string();
      let mut count = 0;
      for literal in literals {
        if let Some(Some(local_path)) = lookup.get(literal) {
          count += text.matches(literal.as_str()).count();
          text = text.replace(literal.as_str(), local_path);
        }
      }
      (text, count)
    }
  }
}
