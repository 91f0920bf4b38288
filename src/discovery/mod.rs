//! Read-only scans that locate inline blocks and remote references in a page.
//!
//! Discovery parses the document with `scraper` only to query it; the parsed tree is never
//! serialised back. Every function takes the current working HTML and returns owned records
//! so that callers can keep mutating their text buffer afterwards.

mod assets;
mod external;
mod inline;

use std::sync::OnceLock;

use scraper::Selector;

pub use assets::discover_assets;
pub use external::{discover_external_scripts, discover_external_stylesheets};
pub use inline::{extract_inline_css, extract_inline_js};

/// Lazily parse a constant CSS selector.
fn cached_selector(cell: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
  cell.get_or_init(|| Selector::parse(css).expect("invalid constant selector"))
}
