//! Assembly of the final offline bundle.

pub mod archive;

pub use archive::BundleArchive;
