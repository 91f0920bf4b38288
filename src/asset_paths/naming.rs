use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use crate::models::AssetRole;

fn known_extension_pattern() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|mp4|webm|woff|woff2|ttf|otf|eot|js|css)$")
            .expect("invalid extension regex")
    })
}

/// Derive the local filename `"{prefix}_{hash8}{ext}"` for a remote URL.
///
/// The hash is the first eight hex digits of the SHA-256 digest of the URL string, so the
/// same URL always maps to the same name across runs. The extension comes from the URL path
/// when it is a recognised media or code extension and falls back to the role default
/// otherwise. URLs that fail to parse keep the same hash and use the role default extension.
pub fn derive_filename(url: &str, role: AssetRole) -> String {
    let extension = match Url::parse(url) {
        Ok(parsed) => path_extension(parsed.path())
            .unwrap_or_else(|| role.default_extension().to_string()),
        Err(_) => role.default_extension().to_string(),
    };

    format!("{}_{}{}", role.prefix(), short_hash(url), extension)
}

fn path_extension(path: &str) -> Option<String> {
    known_extension_pattern()
        .find(path)
        .map(|found| found.as_str().to_ascii_lowercase())
}

fn short_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(8);
    encoded
}
