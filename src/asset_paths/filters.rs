use regex::Regex;

/// Substrings that mark inline scripts injected by the cloning editor.
const EDITOR_MARKERS: &[&str] = &["cp-editor", "tuglet"];

fn remote_url_pattern() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^https?://").expect("invalid http(s) regex"))
}

/// Determine whether a reference is an absolute http(s) URL eligible for bundling.
///
/// Scheme-relative (`//cdn...`) and relative references are left alone: they keep
/// resolving wherever they already resolve.
pub fn is_remote_url(value: &str) -> bool {
    remote_url_pattern().is_match(value)
}

/// Determine whether an inline script is an editor artifact rather than page logic.
pub fn contains_editor_marker(script: &str) -> bool {
    EDITOR_MARKERS.iter().any(|marker| script.contains(marker))
}
