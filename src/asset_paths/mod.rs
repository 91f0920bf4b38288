//! Helpers for naming and placing remote resources inside the offline bundle.
//!
//! The responsibilities are split into focused submodules so that URL filtering, filename
//! derivation, and archive path layout can be tested independently. Discovery and the
//! orchestrator share them, which keeps the name a URL receives identical in both places.

mod bundle;
mod filters;
mod naming;

pub use bundle::{
    INDEX_HTML, INLINE_SCRIPTS_FILE, INLINE_STYLES_FILE, asset_archive_path, script_archive_path,
    stylesheet_archive_path,
};
pub use filters::{contains_editor_marker, is_remote_url};
pub use naming::derive_filename;
