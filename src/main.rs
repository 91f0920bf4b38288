use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use offline_page_bundler::{BundlerConfig, CustomCode, PageExporter};

/// Bundle a cloned HTML page and its remote resources into a portable ZIP archive.
#[derive(Debug, Parser)]
#[command(name = "offline-page-bundler", version, about, long_about = None)]
struct Cli {
  /// Cloned HTML document to export.
  input: PathBuf,

  /// URL the page was cloned from (informational).
  #[arg(long, default_value = "")]
  url: String,

  /// Destination archive; defaults to the input name with a `.zip` extension.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// JSON configuration file; `offline-page-bundler.json` next to the input is used if present.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Do not download images, videos and fonts.
  #[arg(long)]
  no_assets: bool,

  /// Keep inline and external CSS as-is.
  #[arg(long)]
  no_separate_css: bool,

  /// Keep inline and external JavaScript as-is.
  #[arg(long)]
  no_separate_js: bool,

  /// Request minification (reserved, currently has no effect).
  #[arg(long)]
  minify: bool,

  /// File whose contents are injected before `</head>`.
  #[arg(long, value_name = "FILE")]
  head: Option<PathBuf>,

  /// File whose contents are injected right after the opening `<body>` tag.
  #[arg(long, value_name = "FILE")]
  body_start: Option<PathBuf>,

  /// File whose contents are injected before `</body>`.
  #[arg(long, value_name = "FILE")]
  body_end: Option<PathBuf>,

  /// Maximum number of fetches in flight.
  #[arg(long)]
  concurrency: Option<usize>,

  /// Per-fetch timeout in seconds.
  #[arg(long)]
  timeout: Option<u64>,

  /// Enable debug logging.
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose)?;

  let mut config = load_config(&cli)?;
  apply_overrides(&cli, &mut config)?;

  let html = fs::read_to_string(&cli.input)
    .with_context(|| format!("failed to read {}", cli.input.display()))?;

  let exporter =
    PageExporter::from_settings(&config.fetch).context("failed to initialise HTTP client")?;
  let outcome = exporter
    .export(&html, &cli.url, &config.options)
    .await
    .context("export failed")?;

  let output = cli
    .output
    .clone()
    .unwrap_or_else(|| cli.input.with_extension("zip"));
  fs::write(&output, &outcome.archive)
    .with_context(|| format!("failed to write {}", output.display()))?;

  println!(
    "wrote {} ({} bytes, {} entries, {} resources left remote)",
    output.display(),
    outcome.report.archive_size,
    outcome.report.entries.len(),
    outcome.report.failed.len()
  );
  Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .try_init()
    .context("failed to initialise logging")
}

fn load_config(cli: &Cli) -> Result<BundlerConfig> {
  match &cli.config {
    Some(path) => BundlerConfig::load_from_path(path).map_err(Into::into),
    None => {
      let dir = cli
        .input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      Ok(BundlerConfig::discover(dir))
    }
  }
}

fn apply_overrides(cli: &Cli, config: &mut BundlerConfig) -> Result<()> {
  let options = &mut config.options;
  if cli.no_assets {
    options.include_assets = false;
  }
  if cli.no_separate_css {
    options.separate_css = false;
  }
  if cli.no_separate_js {
    options.separate_js = false;
  }
  if cli.minify {
    options.minify = true;
  }

  if cli.head.is_some() || cli.body_start.is_some() || cli.body_end.is_some() {
    let custom = options.custom_code.get_or_insert_with(CustomCode::default);
    if let Some(path) = &cli.head {
      custom.head = Some(read_markup(path)?);
    }
    if let Some(path) = &cli.body_start {
      custom.body_start = Some(read_markup(path)?);
    }
    if let Some(path) = &cli.body_end {
      custom.body_end = Some(read_markup(path)?);
    }
  }

  if let Some(concurrency) = cli.concurrency {
    config.fetch.max_concurrent_fetches = concurrency;
  }
  if let Some(timeout) = cli.timeout {
    config.fetch.timeout_secs = timeout;
  }
  Ok(())
}

fn read_markup(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
