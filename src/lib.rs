#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod models;
pub mod rewrite;

pub use builder::{ExportOutcome, PageExporter};
pub use config::{BundlerConfig, CustomCode, ExportOptions, FetchSettings};
pub use error::{ExportError, FetchError};
pub use fetch::{Fetcher, HttpFetcher};
pub use models::ExportReport;
