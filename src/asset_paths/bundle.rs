use crate::models::AssetKind;

/// Entry point of every bundle, regardless of the source document's name.
pub const INDEX_HTML: &str = "index.html";

/// Consolidated inline stylesheet filename.
pub const INLINE_STYLES_FILE: &str = "styles.css";

/// Consolidated inline script filename.
pub const INLINE_SCRIPTS_FILE: &str = "scripts.js";

/// Archive-relative path of a stylesheet, e.g. `css/style_1a2b3c4d.css`.
pub fn stylesheet_archive_path(filename: &str) -> String {
    format!("css/{}", trim_separators(filename))
}

/// Archive-relative path of a script, e.g. `js/script_1a2b3c4d.js`.
pub fn script_archive_path(filename: &str) -> String {
    format!("js/{}", trim_separators(filename))
}

/// Archive-relative path of a binary asset, e.g. `assets/images/img_1a2b3c4d.png`.
///
/// Stylesheet and script kinds are routed to their own top-level directories so that callers
/// can use a single entry point for every category.
pub fn asset_archive_path(kind: AssetKind, filename: &str) -> String {
    match kind {
        AssetKind::Styles => stylesheet_archive_path(filename),
        AssetKind::Scripts => script_archive_path(filename),
        _ => format!("assets/{}/{}", kind.as_str(), trim_separators(filename)),
    }
}

fn trim_separators(filename: &str) -> String {
    filename.replace('\\', "/").trim_matches('/').to_string()
}
