use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;
use std::time::Duration;

use offline_page_bundler::asset_paths::derive_filename;
use offline_page_bundler::models::{AssetKind, AssetRole};
use offline_page_bundler::{CustomCode, ExportOptions, FetchError, Fetcher, PageExporter};
use zip::ZipArchive;

enum Scripted {
  Body(Vec<u8>),
  Status(u16),
  Timeout,
}

/// In-memory fetcher that serves canned responses and records every request.
#[derive(Default)]
struct ScriptedFetcher {
  responses: HashMap<String, Scripted>,
  calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
  fn with(mut self, url: &str, response: Scripted) -> Self {
    self.responses.insert(url.to_string(), response);
    self
  }

  fn body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
    self.with(url, Scripted::Body(body.into()))
  }

  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

impl Fetcher for ScriptedFetcher {
  async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    self.calls.lock().unwrap().push(url.to_string());
    match self.responses.get(url) {
      Some(Scripted::Body(bytes)) => Ok(bytes.clone()),
      Some(Scripted::Status(status)) => Err(FetchError::Status {
        url: url.to_string(),
        status: *status,
      }),
      Some(Scripted::Timeout) => Err(FetchError::Timeout {
        url: url.to_string(),
        timeout: Duration::from_secs(10),
      }),
      None => Err(FetchError::Status {
        url: url.to_string(),
        status: 404,
      }),
    }
  }
}

impl Fetcher for &ScriptedFetcher {
  async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    (**self).fetch(url).await
  }
}

struct Unzipped {
  entries: Vec<(String, Vec<u8>)>,
}

impl Unzipped {
  fn read(bytes: &[u8]) -> Self {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive should be readable");
    let entries = (0..archive.len())
      .map(|index| {
        let mut file = archive.by_index(index).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        (file.name().to_string(), contents)
      })
      .collect();
    Self { entries }
  }

  fn names(&self) -> Vec<&str> {
    self.entries.iter().map(|(name, _)| name.as_str()).collect()
  }

  fn bytes(&self, name: &str) -> &[u8] {
    self
      .entries
      .iter()
      .find(|(entry, _)| entry == name)
      .map(|(_, contents)| contents.as_slice())
      .unwrap_or_else(|| panic!("missing archive entry {name}"))
  }

  fn text(&self, name: &str) -> String {
    String::from_utf8(self.bytes(name).to_vec()).unwrap()
  }
}

fn all_enabled() -> ExportOptions {
  ExportOptions::default()
}

fn all_disabled() -> ExportOptions {
  ExportOptions {
    include_assets: false,
    separate_css: false,
    separate_js: false,
    minify: false,
    custom_code: None,
  }
}

fn image_path(url: &str) -> String {
  format!("assets/images/{}", derive_filename(url, AssetRole::Image))
}

#[tokio::test]
async fn bundles_inline_css_and_remote_image() {
  let fetcher = ScriptedFetcher::default().body("https://x.test/a.png", vec![0xFF, 0xD8]);
  let exporter = PageExporter::new(fetcher);
  let html = r#"<html><head><style>body{color:red}</style></head><body><img src="https://x.test/a.png"></body></html>"#;

  let zip = exporter
    .export_as_zip(html, "https://x.test/", &all_enabled())
    .await
    .unwrap();
  let archive = Unzipped::read(&zip);
  let image = image_path("https://x.test/a.png");

  assert!(image.ends_with(".png"));
  assert_eq!(archive.names(), vec!["css/styles.css", image.as_str(), "index.html"]);
  assert_eq!(archive.text("css/styles.css"), "body{color:red}");
  assert_eq!(archive.bytes(&image), &[0xFF, 0xD8]);
  assert_eq!(
    archive.text("index.html"),
    format!(
      "<html><head><link rel=\"stylesheet\" href=\"css/styles.css\">\n</head><body><img src=\"{image}\"></body></html>"
    )
  );
}

#[tokio::test]
async fn repeated_exports_are_byte_identical() {
  let fetcher = ScriptedFetcher::default()
    .body("https://x.test/a.png", vec![1, 2, 3])
    .body("https://cdn.test/site.css", "h1{margin:0}")
    .body("https://cdn.test/app.js", "console.log(1)");
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head><link rel="stylesheet" href="https://cdn.test/site.css"><style>p{}</style></head>
<body><script>var a = 1;</script><img src="https://x.test/a.png"><script src="https://cdn.test/app.js"></script></body></html>"#;

  let first = exporter.export_as_zip(html, "", &all_enabled()).await.unwrap();
  let second = exporter.export_as_zip(html, "", &all_enabled()).await.unwrap();
  assert_eq!(first, second);

  let sequential = PageExporter::new(&fetcher)
    .with_concurrency(1)
    .export_as_zip(html, "", &all_enabled())
    .await
    .unwrap();
  assert_eq!(first, sequential);
}

#[tokio::test]
async fn duplicate_stylesheet_is_fetched_once() {
  let fetcher = ScriptedFetcher::default().body("https://cdn.test/site.css", "h1{margin:0}");
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head>
<link rel="stylesheet" href="https://cdn.test/site.css" integrity="sha384-abc" crossorigin="anonymous">
<link rel="stylesheet" href="https://cdn.test/site.css" media="print">
</head><body></body></html>"#;

  let options = ExportOptions {
    include_assets: false,
    ..all_enabled()
  };
  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &options).await.unwrap());
  let filename = derive_filename("https://cdn.test/site.css", AssetRole::Style);
  let local_link = format!(r#"<link rel="stylesheet" href="css/{filename}">"#);

  assert_eq!(fetcher.calls(), vec!["https://cdn.test/site.css"]);
  assert_eq!(archive.text(&format!("css/{filename}")), "h1{margin:0}");
  let index = archive.text("index.html");
  assert_eq!(index.matches(&local_link).count(), 2);
  assert!(!index.contains("https://cdn.test/site.css"));
  assert!(!index.contains("integrity"));
}

#[tokio::test]
async fn failed_asset_keeps_its_remote_url() {
  let fetcher = ScriptedFetcher::default()
    .body("https://x.test/1.png", vec![1])
    .with("https://x.test/2.png", Scripted::Timeout)
    .body("https://x.test/3.png", vec![3]);
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body><img src="https://x.test/1.png"><img src="https://x.test/2.png"><img src="https://x.test/3.png"></body></html>"#;

  let outcome = exporter.export(html, "", &all_enabled()).await.unwrap();
  let archive = Unzipped::read(&outcome.archive);
  let first = image_path("https://x.test/1.png");
  let second = image_path("https://x.test/2.png");
  let third = image_path("https://x.test/3.png");

  assert_eq!(archive.names(), vec![first.as_str(), third.as_str(), "index.html"]);
  assert_eq!(archive.bytes(&first), &[1]);
  assert_eq!(archive.bytes(&third), &[3]);

  let index = archive.text("index.html");
  assert!(index.contains(&format!(r#"<img src="{first}">"#)));
  assert!(index.contains(r#"<img src="https://x.test/2.png">"#));
  assert!(index.contains(&format!(r#"<img src="{third}">"#)));
  assert!(!index.contains(&second));

  assert_eq!(outcome.report.failed.len(), 1);
  assert_eq!(outcome.report.failed[0].url, "https://x.test/2.png");
  assert_eq!(outcome.report.failed[0].kind, AssetKind::Images);
  assert!(outcome.report.failed[0].reason.contains("timed out"));
  assert_eq!(outcome.report.rewritten_assets, 2);
}

#[tokio::test]
async fn base_tag_is_always_removed() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head><base href="https://example.com/"><title>t</title></head><body><img src="https://x.test/a.png"></body></html>"#;

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &all_disabled()).await.unwrap());

  assert_eq!(archive.names(), vec!["index.html"]);
  assert_eq!(
    archive.text("index.html"),
    r#"<html><head><title>t</title></head><body><img src="https://x.test/a.png"></body></html>"#
  );
  assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn editor_scripts_never_reach_the_archive() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body>
<script>window.tuglet = { secret: 42 };</script>
<script>document.title = 'page';</script>
</body></html>"#;

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &all_enabled()).await.unwrap());

  assert_eq!(archive.text("js/scripts.js"), "document.title = 'page';");
  let index = archive.text("index.html");
  assert!(index.contains("<script src=\"js/scripts.js\"></script>\n</body>"));
  for (name, contents) in &archive.entries {
    let text = String::from_utf8_lossy(contents);
    assert!(!text.contains("tuglet"), "{name} leaked an editor script");
  }
}

#[tokio::test]
async fn editor_only_scripts_are_dropped_without_bundle() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body><script>initEditor('cp-editor');</script></body></html>"#;

  let outcome = exporter.export(html, "", &all_enabled()).await.unwrap();
  let archive = Unzipped::read(&outcome.archive);

  assert_eq!(archive.names(), vec!["index.html"]);
  assert_eq!(archive.text("index.html"), "<html><head></head><body></body></html>");
  assert!(!outcome.report.inline_js);
}

#[tokio::test]
async fn custom_code_lands_at_its_anchors() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let options = ExportOptions {
    custom_code: Some(CustomCode {
      head: Some(r#"<meta name="tracking" content="$1">"#.into()),
      body_start: Some("<div id=\"banner\"></div>".into()),
      body_end: Some("<footer>bye</footer>".into()),
    }),
    ..all_disabled()
  };
  let html = r#"<html><head><title>t</title></head><body class="home" data-x="1"><p>hi</p></body></html>"#;

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &options).await.unwrap());

  assert_eq!(
    archive.text("index.html"),
    "<html><head><title>t</title><meta name=\"tracking\" content=\"$1\">\n</head>\
<body class=\"home\" data-x=\"1\">\n<div id=\"banner\"></div><p>hi</p><footer>bye</footer>\n</body></html>"
  );
}

#[tokio::test]
async fn custom_code_is_not_treated_as_inline_script() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let options = ExportOptions {
    custom_code: Some(CustomCode {
      body_end: Some("<script>track();</script>".into()),
      ..CustomCode::default()
    }),
    ..all_enabled()
  };
  let html = "<html><head></head><body><script>var a;</script></body></html>";

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &options).await.unwrap());
  let index = archive.text("index.html");

  assert_eq!(archive.text("js/scripts.js"), "var a;");
  assert_eq!(
    index,
    "<html><head></head><body><script src=\"js/scripts.js\"></script>\n<script>track();</script>\n</body></html>"
  );
}

#[tokio::test]
async fn external_scripts_are_localised_or_left_remote() {
  let fetcher = ScriptedFetcher::default()
    .body("https://cdn.test/app.js", "boot();")
    .with("https://cdn.test/broken.js", Scripted::Status(500));
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body>
<script src="https://cdn.test/app.js" integrity="sha384-x" crossorigin="anonymous" defer></script>
<script src="https://cdn.test/broken.js"></script>
<script src="/local.js"></script>
</body></html>"#;

  let outcome = exporter.export(html, "", &all_enabled()).await.unwrap();
  let archive = Unzipped::read(&outcome.archive);
  let filename = derive_filename("https://cdn.test/app.js", AssetRole::Script);

  assert_eq!(archive.text(&format!("js/{filename}")), "boot();");
  let index = archive.text("index.html");
  assert!(index.contains(&format!(r#"<script src="js/{filename}" defer></script>"#)));
  assert!(index.contains(r#"<script src="https://cdn.test/broken.js"></script>"#));
  assert!(index.contains(r#"<script src="/local.js"></script>"#));
  assert_eq!(outcome.report.failed.len(), 1);
  assert_eq!(outcome.report.failed[0].kind, AssetKind::Scripts);
  assert!(outcome.report.failed[0].reason.contains("HTTP 500"));
}

#[tokio::test]
async fn typed_assets_are_placed_in_their_directories() {
  let fetcher = ScriptedFetcher::default()
    .body("https://x.test/hero.webp", vec![1])
    .body("https://x.test/clip.mp4", vec![2])
    .body("https://x.test/inter.woff2", vec![3]);
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head><style>@font-face { font-family: Inter; src: url(https://x.test/inter.woff2); }</style></head>
<body><div style="background-image:url('https://x.test/hero.webp')"></div>
<video autoplay><source src="https://x.test/clip.mp4" type="video/mp4"></video></body></html>"#;

  let options = ExportOptions {
    separate_css: false,
    ..all_enabled()
  };
  let outcome = exporter.export(html, "", &options).await.unwrap();
  let archive = Unzipped::read(&outcome.archive);

  let background = format!(
    "assets/images/{}",
    derive_filename("https://x.test/hero.webp", AssetRole::Background)
  );
  let video = format!(
    "assets/videos/{}",
    derive_filename("https://x.test/clip.mp4", AssetRole::Video)
  );
  let font = format!(
    "assets/fonts/{}",
    derive_filename("https://x.test/inter.woff2", AssetRole::Font)
  );

  assert_eq!(archive.names(), vec![
    background.as_str(),
    video.as_str(),
    font.as_str(),
    "index.html"
  ]);
  assert_eq!(
    fetcher.calls(),
    vec![
      "https://x.test/hero.webp",
      "https://x.test/clip.mp4",
      "https://x.test/inter.woff2"
    ]
  );

  let index = archive.text("index.html");
  assert!(index.contains(&format!("url({font})")));
  assert!(index.contains(&format!("url('{background}')")));
  assert!(index.contains(&format!(r#"<source src="{video}" type="video/mp4">"#)));
  assert!(!index.contains("https://x.test/"));
}

#[tokio::test]
async fn relative_references_are_left_alone() {
  let fetcher = ScriptedFetcher::default();
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head><link rel="stylesheet" href="/site.css"><link rel="stylesheet" href="//cdn.test/x.css"></head><body><img src="img/logo.png"></body></html>"#;

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &all_enabled()).await.unwrap());

  assert_eq!(archive.names(), vec!["index.html"]);
  assert_eq!(archive.text("index.html"), html);
  assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn failed_urls_extending_a_bundled_url_stay_remote() {
  let fetcher = ScriptedFetcher::default()
    .body("https://x.test/a.png", vec![1])
    .with("https://x.test/a.png.webp", Scripted::Status(404))
    .body("https://cdn.test/app.js", "boot();")
    .with("https://cdn.test/app.js.map.js", Scripted::Status(404));
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body>
<img src="https://x.test/a.png"><img src="https://x.test/a.png.webp">
<script src="https://cdn.test/app.js"></script><script src="https://cdn.test/app.js.map.js"></script>
</body></html>"#;

  let outcome = exporter.export(html, "", &all_enabled()).await.unwrap();
  let archive = Unzipped::read(&outcome.archive);
  let image = image_path("https://x.test/a.png");
  let script = derive_filename("https://cdn.test/app.js", AssetRole::Script);

  let index = archive.text("index.html");
  assert!(index.contains(&format!(r#"<img src="{image}">"#)));
  assert!(index.contains(r#"<img src="https://x.test/a.png.webp">"#));
  assert!(index.contains(&format!(r#"<script src="js/{script}"></script>"#)));
  assert!(index.contains(r#"<script src="https://cdn.test/app.js.map.js"></script>"#));
  assert_eq!(outcome.report.failed.len(), 2);
  assert_eq!(outcome.report.rewritten_assets, 1);
}

#[tokio::test]
async fn entity_quoted_backgrounds_are_bundled() {
  let fetcher = ScriptedFetcher::default().body("https://x.test/a.png", vec![7]);
  let exporter = PageExporter::new(&fetcher);
  let html = r#"<html><head></head><body><div style="background-image: url(&quot;https://x.test/a.png&quot;);"></div></body></html>"#;

  let archive = Unzipped::read(&exporter.export_as_zip(html, "", &all_enabled()).await.unwrap());
  let background = format!(
    "assets/images/{}",
    derive_filename("https://x.test/a.png", AssetRole::Background)
  );

  assert_eq!(archive.bytes(&background), &[7]);
  assert_eq!(
    archive.text("index.html"),
    format!(
      r#"<html><head></head><body><div style="background-image: url(&quot;{background}&quot;);"></div></body></html>"#
    )
  );
}
