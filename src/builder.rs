//! Export orchestrator turning a cloned page into a self-contained ZIP bundle.

use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::asset_paths::{
  INDEX_HTML, asset_archive_path, script_archive_path, stylesheet_archive_path,
};
use crate::bundle::BundleArchive;
use crate::config::{CustomCode, ExportOptions, FetchSettings};
use crate::discovery::{
  discover_assets, discover_external_scripts, discover_external_stylesheets, extract_inline_css,
  extract_inline_js,
};
use crate::error::{ExportError, FetchError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::models::{AssetKind, AssetMap, ExportReport, ExternalReference, FailedResource};
use crate::rewrite::{
  insert_after_body_open, insert_before_body_close, insert_before_head_close,
  localize_script_references, localize_stylesheet_links, remove_inline_scripts,
  remove_style_blocks, rewrite_asset_urls, strip_base_tags,
};

/// Archive bytes together with diagnostics about the export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
  /// Serialised ZIP archive.
  pub archive: Vec<u8>,
  /// What was bundled and what was left pointing at the live site.
  pub report: ExportReport,
}

/// Orchestrates discovery, fetching, rewriting and assembly for page exports.
///
/// An exporter holds no per-export state, so one instance can serve concurrent exports.
pub struct PageExporter<F> {
  fetcher: F,
  concurrency: usize,
}

impl PageExporter<HttpFetcher> {
  /// Create an exporter backed by an HTTP client configured from `settings`.
  pub fn from_settings(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
    Ok(Self::new(HttpFetcher::new(settings)?).with_concurrency(settings.concurrency()))
  }
}

impl<F: Fetcher> PageExporter<F> {
  /// Create an exporter around any [`Fetcher`] with the default concurrency bound.
  pub fn new(fetcher: F) -> Self {
    Self {
      fetcher,
      concurrency: FetchSettings::default().concurrency(),
    }
  }

  /// Limit how many fetches of one phase may be in flight at once. `1` is fully sequential.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Export `html` as a ZIP archive.
  ///
  /// Individual fetch failures are logged and leave the original URL in place; the only
  /// error returned is a failure to assemble the archive itself.
  pub async fn export_as_zip(
    &self,
    html: &str,
    source_url: &str,
    options: &ExportOptions,
  ) -> Result<Vec<u8>, ExportError> {
    self
      .export(html, source_url, options)
      .await
      .map(|outcome| outcome.archive)
  }

  /// Export `html` and return the archive alongside an [`ExportReport`].
  pub async fn export(
    &self,
    html: &str,
    source_url: &str,
    options: &ExportOptions,
  ) -> Result<ExportOutcome, ExportError> {
    info!(%source_url, ?options, "starting page export");

    let mut session = ExportSession::new(strip_base_tags(html));
    debug!("removed <base> tags");

    if options.separate_css {
      self.separate_css(&mut session).await;
    }

    if options.separate_js {
      self.separate_js(&mut session).await;
    }

    if let Some(custom) = &options.custom_code {
      session.inject_custom_code(custom);
    }

    if options.minify {
      debug!("minify requested; the option is reserved and leaves output unchanged");
    }

    if options.include_assets {
      self.bundle_assets(&mut session).await;
    }

    session.finish()
  }

  async fn separate_css(&self, session: &mut ExportSession) {
    let inline = extract_inline_css(&session.html);
    session.html = remove_style_blocks(&session.html);

    let stylesheets = discover_external_stylesheets(&session.html);
    info!(count = stylesheets.len(), "external stylesheets found");
    let results = self.fetch_texts(&stylesheets).await;

    let mut css_files = Vec::new();
    if !inline.is_blank() {
      css_files.push((inline.filename.to_string(), inline.content.clone()));
    }

    for (stylesheet, result) in stylesheets.iter().zip(results) {
      match result {
        Ok(content) => {
          let (html, replaced) =
            localize_stylesheet_links(&session.html, &stylesheet.url, &stylesheet.filename);
          session.html = html;
          debug!(url = %stylesheet.url, file = %stylesheet.filename, replaced, "stylesheet localised");
          css_files.push((stylesheet.filename.clone(), content));
        }
        Err(err) => session.record_failure(AssetKind::Styles, &stylesheet.url, &err),
      }
    }

    info!(count = css_files.len(), "stylesheets bundled");
    for (filename, content) in css_files {
      session
        .archive
        .add_file(stylesheet_archive_path(&filename), content);
    }

    if !inline.is_blank() {
      session.report.inline_css = true;
      let link = format!(
        r#"<link rel="stylesheet" href="{}">"#,
        stylesheet_archive_path(inline.filename)
      );
      session.html = insert_before_head_close(&session.html, &link);
    }
  }

  async fn separate_js(&self, session: &mut ExportSession) {
    let inline = extract_inline_js(&session.html);
    session.html = remove_inline_scripts(&session.html);

    let scripts = discover_external_scripts(&session.html);
    info!(count = scripts.len(), "external scripts found");
    let results = self.fetch_texts(&scripts).await;

    let mut js_files = Vec::new();
    if !inline.is_blank() {
      js_files.push((inline.filename.to_string(), inline.content.clone()));
    }

    let mut fetched = Vec::new();
    for (script, result) in scripts.iter().zip(results) {
      match result {
        Ok(content) => fetched.push((script, content)),
        Err(err) => session.record_failure(AssetKind::Scripts, &script.url, &err),
      }
    }

    let mut retained = session.remote_urls();
    retained.extend(scripts.iter().map(|script| script.url.clone()));
    for (script, content) in fetched {
      let (html, replaced) =
        localize_script_references(&session.html, &script.url, &script.filename, &retained);
      session.html = html;
      debug!(url = %script.url, file = %script.filename, replaced, "script localised");
      js_files.push((script.filename.clone(), content));
    }

    info!(count = js_files.len(), "scripts bundled");
    for (filename, content) in js_files {
      session.archive.add_file(script_archive_path(&filename), content);
    }

    if !inline.is_blank() {
      session.report.inline_js = true;
      let tag = format!(
        r#"<script src="{}"></script>"#,
        script_archive_path(inline.filename)
      );
      session.html = insert_before_body_close(&session.html, &tag);
    }
  }

  async fn bundle_assets(&self, session: &mut ExportSession) {
    let assets = discover_assets(&session.html);
    info!(count = assets.len(), "assets found");

    let urls: Vec<String> = assets.iter().map(|asset| asset.url.clone()).collect();
    let results = self.fetch_bytes(urls).await;

    let mut asset_map = AssetMap::default();
    for (asset, result) in assets.iter().zip(results) {
      match result {
        Ok(bytes) => {
          let local_path = asset_archive_path(asset.kind, &asset.filename);
          debug!(url = %asset.url, path = %local_path, size = bytes.len(), "asset downloaded");
          session.archive.add_file(local_path.clone(), bytes);
          asset_map.insert(asset.url.clone(), local_path);
        }
        Err(err) => session.record_failure(asset.kind, &asset.url, &err),
      }
    }

    let retained = session.remote_urls();
    let (html, replaced) = rewrite_asset_urls(&session.html, &asset_map, &retained);
    session.html = html;
    session.report.rewritten_assets = replaced;
    info!(assets = asset_map.len(), occurrences = replaced, "asset URLs rewritten");
  }

  async fn fetch_texts(&self, references: &[ExternalReference]) -> Vec<Result<String, FetchError>> {
    stream::iter(references)
      .map(|reference| self.fetcher.fetch_text(&reference.url))
      .buffered(self.concurrency)
      .collect()
      .await
  }

  async fn fetch_bytes(&self, urls: Vec<String>) -> Vec<Result<Vec<u8>, FetchError>> {
    stream::iter(urls)
      .map(|url| async move { self.fetcher.fetch(&url).await })
      .buffered(self.concurrency)
      .collect()
      .await
  }
}

/// Mutable state owned by a single export call.
struct ExportSession {
  html: String,
  archive: BundleArchive,
  report: ExportReport,
}

impl ExportSession {
  fn new(html: String) -> Self {
    Self {
      html,
      archive: BundleArchive::new(),
      report: ExportReport::default(),
    }
  }

  fn inject_custom_code(&mut self, custom: &CustomCode) {
    if custom.is_empty() {
      return;
    }
    if let Some(head) = non_empty(&custom.head) {
      self.html = insert_before_head_close(&self.html, head);
    }
    if let Some(body_start) = non_empty(&custom.body_start) {
      self.html = insert_after_body_open(&self.html, body_start);
    }
    if let Some(body_end) = non_empty(&custom.body_end) {
      self.html = insert_before_body_close(&self.html, body_end);
    }
  }

  fn record_failure(&mut self, kind: AssetKind, url: &str, err: &FetchError) {
    warn!(%kind, %url, error = %err, "fetch failed; keeping remote reference");
    self.report.failed.push(FailedResource {
      kind,
      url: url.to_string(),
      reason: err.to_string(),
    });
  }

  /// URLs that were attempted and left pointing at the live site.
  fn remote_urls(&self) -> Vec<String> {
    self
      .report
      .failed
      .iter()
      .map(|failed| failed.url.clone())
      .collect()
  }

  fn finish(mut self) -> Result<ExportOutcome, ExportError> {
    self.archive.add_file(INDEX_HTML, self.html);
    self.report.entries = self.archive.paths();

    let archive = self.archive.finish().inspect_err(|err| {
      error!(error = %err, "failed to build export archive");
    })?;

    self.report.archive_size = archive.len();
    info!(
      size = archive.len(),
      entries = self.report.entries.len(),
      failed = self.report.failed.len(),
      "export archive ready"
    );

    Ok(ExportOutcome {
      archive,
      report: self.report,
    })
  }
}

fn non_empty(markup: &Option<String>) -> Option<&str> {
  markup.as_deref().filter(|value| !value.is_empty())
}
