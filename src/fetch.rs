//! Network boundary: retrieving remote stylesheets, scripts and binary assets.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::config::FetchSettings;
use crate::error::FetchError;

/// Retrieves a remote resource in a single attempt.
///
/// Implementations must treat every call independently: no retries, no caching across
/// calls, and a failure only concerns the requested URL.
pub trait Fetcher: Send + Sync {
  /// Fetch the raw bytes behind `url`.
  fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

  /// Fetch `url` and decode it as UTF-8 text, replacing invalid sequences.
  fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
    async move {
      let bytes = self.fetch(url).await?;
      Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
  }
}

/// Production fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: Client,
  timeout: Duration,
}

impl HttpFetcher {
  /// Build a client with the configured deadline and browser-like user agent.
  pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
    let timeout = settings.timeout();
    let client = Client::builder()
      .timeout(timeout)
      .user_agent(settings.user_agent.as_str())
      .build()?;

    Ok(Self { client, timeout })
  }

  fn map_error(&self, url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
      FetchError::Timeout {
        url: url.to_string(),
        timeout: self.timeout,
      }
    } else if let Some(status) = err.status() {
      FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      }
    } else {
      FetchError::Network {
        url: url.to_string(),
        message: err.to_string(),
      }
    }
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .and_then(|response| response.error_for_status())
      .map_err(|err| self.map_error(url, err))?;

    let body = response
      .bytes()
      .await
      .map_err(|err| self.map_error(url, err))?;

    Ok(body.to_vec())
  }
}
