//! Export options and the optional on-disk configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// File name searched for by [`BundlerConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "offline-page-bundler.json";

/// User agent sent with every fetch; origin servers tend to reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
  "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
   Chrome/124.0.0.0 Safari/537.36";

/// Markup injected verbatim into the exported page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomCode {
  /// Inserted immediately before `</head>`.
  pub head: Option<String>,
  /// Inserted immediately after the opening `<body ...>` tag.
  pub body_start: Option<String>,
  /// Inserted immediately before `</body>`.
  pub body_end: Option<String>,
}

impl CustomCode {
  /// Returns `true` when no injection is configured.
  pub fn is_empty(&self) -> bool {
    [&self.head, &self.body_start, &self.body_end]
      .iter()
      .all(|markup| markup.as_deref().is_none_or(str::is_empty))
  }
}

/// Per-export switches. Immutable for the duration of one export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
  /// Download images, videos and fonts into `assets/`.
  pub include_assets: bool,
  /// Externalise inline CSS and localise external stylesheets.
  #[serde(rename = "separateCSS", alias = "separateCss")]
  pub separate_css: bool,
  /// Externalise inline JavaScript and localise external scripts.
  #[serde(rename = "separateJS", alias = "separateJs")]
  pub separate_js: bool,
  /// Reserved; accepted but does not change the output.
  pub minify: bool,
  /// Optional markup injections.
  pub custom_code: Option<CustomCode>,
}

impl Default for ExportOptions {
  fn default() -> Self {
    Self {
      include_assets: true,
      separate_css: true,
      separate_js: true,
      minify: false,
      custom_code: None,
    }
  }
}

/// Network behaviour of the remote fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
  /// Deadline applied to each fetch independently.
  pub timeout_secs: u64,
  /// `User-Agent` header sent with every request.
  pub user_agent: String,
  /// Upper bound on fetches in flight within one phase.
  pub max_concurrent_fetches: usize,
}

impl Default for FetchSettings {
  fn default() -> Self {
    Self {
      timeout_secs: 10,
      user_agent: DEFAULT_USER_AGENT.into(),
      max_concurrent_fetches: 4,
    }
  }
}

impl FetchSettings {
  /// Per-fetch deadline.
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// Concurrency bound, never below one.
  pub fn concurrency(&self) -> usize {
    self.max_concurrent_fetches.max(1)
  }
}

/// Contents of the optional JSON configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
  /// Fetcher settings.
  pub fetch: FetchSettings,
  /// Default export options; command-line flags override them.
  pub options: ExportOptions,
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the configuration file from disk.
  #[error("failed to read {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Failed to parse the JSON configuration file.
  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
}

impl BundlerConfig {
  /// Load `offline-page-bundler.json` from `dir`, falling back to defaults when the file is
  /// absent or unreadable.
  pub fn discover(dir: &Path) -> Self {
    Self::load_from_path(dir.join(DEFAULT_CONFIG_FILE)).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}
