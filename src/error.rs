//! Error types surfaced by the export pipeline.

use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve a single remote resource.
///
/// These never abort an export: the orchestrator logs them, records them in the
/// [`ExportReport`](crate::models::ExportReport) and leaves the live URL in place.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The request exceeded its deadline.
  #[error("request to {url} timed out after {}s", .timeout.as_secs())]
  Timeout {
    /// Requested URL.
    url: String,
    /// Deadline that was exceeded.
    timeout: Duration,
  },
  /// The server answered outside the 2xx range.
  #[error("{url} responded with HTTP {status}")]
  Status {
    /// Requested URL.
    url: String,
    /// Status code returned by the server.
    status: u16,
  },
  /// Connection, TLS or body transfer failure.
  #[error("request to {url} failed: {message}")]
  Network {
    /// Requested URL.
    url: String,
    /// Description of the underlying transport error.
    message: String,
  },
}

/// Terminal failure of an export; no partial archive is produced.
#[derive(Debug, Error)]
pub enum ExportError {
  /// The archive writer rejected an entry or could not finalise the archive.
  #[error("failed to assemble export archive: {0}")]
  Assembly(#[from] zip::result::ZipError),
  /// Writing into the in-memory archive buffer failed.
  #[error("failed to assemble export archive: {0}")]
  Io(#[from] std::io::Error),
}
