//! Catalog loading: fetch a manifest from the first reachable source,
//! validate its shape and normalize it into a flat list of records.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::constants;

/// View count as it appears in the manifest: a whole count, any other JSON
/// number (`1500.0`, `1.2e6`, `-1`), or a pre-formatted label such as `"120k"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Views {
  Count(u64),
  Number(f64),
  Text(String),
}

/// A validated catalog entry. Always has a playable target.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
  pub id: Option<String>,
  pub url: Option<String>,
  pub title: String,
  pub thumbnail: Option<String>,
  pub duration: Option<String>,
  pub views: Option<Views>,
  pub upload_date: Option<String>,
  pub category: Option<String>,
}

impl VideoRecord {
  /// Stable key for the record: the platform id, else the direct URL.
  pub fn key(&self) -> &str {
    self.id.as_deref().or(self.url.as_deref()).unwrap_or_default()
  }
}

/// The result of a successful load.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  pub records: Vec<VideoRecord>,
  /// Rows excluded at the load boundary (no playable target or placeholder id).
  pub dropped: usize,
  /// Where the manifest came from.
  pub source: String,
}

/// A manifest location: remote over HTTP(S) or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
  Http(String),
  File(PathBuf),
}

impl ManifestSource {
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
      ManifestSource::Http(raw.to_string())
    } else {
      ManifestSource::File(PathBuf::from(raw))
    }
  }
}

impl fmt::Display for ManifestSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestSource::Http(url) => f.write_str(url),
      ManifestSource::File(path) => write!(f, "{}", path.display()),
    }
  }
}

/// One failed attempt while walking the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
  pub location: String,
  pub reason: String,
}

impl fmt::Display for SourceFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.location, self.reason)
  }
}

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("no manifest found ({})", summarize(.attempts))]
  NotFound { attempts: Vec<SourceFailure> },
  #[error("malformed manifest at {location}: {reason}")]
  MalformedSchema { location: String, reason: String },
}

fn summarize(attempts: &[SourceFailure]) -> String {
  if attempts.is_empty() {
    return "no sources configured".to_string();
  }
  attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Deserialize)]
struct RawVideo {
  #[serde(default)]
  id: Option<String>,
  #[serde(default)]
  url: Option<String>,
  title: String,
  #[serde(default)]
  thumbnail: Option<String>,
  #[serde(default)]
  duration: Option<String>,
  #[serde(default)]
  views: Option<Views>,
  #[serde(default, rename = "uploadDate")]
  upload_date: Option<String>,
  #[serde(default)]
  category: Option<String>,
}

/// Trim and drop blank strings.
fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Whether an id looks like a real platform id rather than a manifest placeholder.
pub fn is_plausible_id(id: &str) -> bool {
  id.chars().count() >= constants().min_id_len && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Turn a raw row into a record, or `None` if it must be dropped.
fn normalize(raw: RawVideo, group: Option<&str>) -> Option<VideoRecord> {
  let id = non_blank(raw.id);
  let url = non_blank(raw.url);
  if let Some(ref id) = id
    && !is_plausible_id(id)
  {
    warn!(id = %id, title = %raw.title, "manifest: dropping row with placeholder id");
    return None;
  }
  if id.is_none() && url.is_none() {
    warn!(title = %raw.title, "manifest: dropping row with no id or url");
    return None;
  }
  Some(VideoRecord {
    id,
    url,
    title: raw.title.trim().to_string(),
    thumbnail: non_blank(raw.thumbnail),
    duration: non_blank(raw.duration),
    views: raw.views,
    upload_date: non_blank(raw.upload_date),
    category: group.map(str::to_string).or_else(|| non_blank(raw.category)),
  })
}

fn parse_rows(rows: &Value, group: Option<&str>, out: &mut Catalog) -> Result<(), String> {
  let rows = rows.as_array().ok_or_else(|| "`videos` is not an array".to_string())?;
  for (i, row) in rows.iter().enumerate() {
    let raw: RawVideo = RawVideo::deserialize(row).map_err(|e| match group {
      Some(g) => format!("playlist '{}' video #{}: {}", g, i, e),
      None => format!("video #{}: {}", i, e),
    })?;
    match normalize(raw, group) {
      Some(record) => out.records.push(record),
      None => out.dropped += 1,
    }
  }
  Ok(())
}

/// Parse and normalize a manifest body. Both the flat `{"videos": [...]}`
/// and grouped `{"playlists": [{"name", "videos"}]}` shapes are accepted.
pub fn parse_manifest(body: &str, location: &str) -> Result<Catalog, LoadError> {
  let malformed = |reason: String| LoadError::MalformedSchema { location: location.to_string(), reason };

  let doc: Value = serde_json::from_str(body).map_err(|e| malformed(format!("not valid JSON: {}", e)))?;
  let mut catalog = Catalog { source: location.to_string(), ..Catalog::default() };

  if let Some(videos) = doc.get("videos") {
    parse_rows(videos, None, &mut catalog).map_err(malformed)?;
  } else if let Some(playlists) = doc.get("playlists") {
    let playlists = playlists.as_array().ok_or_else(|| malformed("`playlists` is not an array".to_string()))?;
    for (i, playlist) in playlists.iter().enumerate() {
      let name = playlist
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| malformed(format!("playlist #{} has no name", i)))?;
      let videos = playlist.get("videos").ok_or_else(|| malformed(format!("playlist '{}' has no videos", name)))?;
      parse_rows(videos, Some(name), &mut catalog).map_err(malformed)?;
    }
  } else {
    return Err(malformed("expected a `videos` or `playlists` array".to_string()));
  }

  if catalog.dropped > 0 {
    warn!(dropped = catalog.dropped, location = %location, "manifest: rows dropped during normalization");
  }
  Ok(catalog)
}

async fn fetch_source(client: &Client, source: &ManifestSource) -> Result<String, String> {
  match source {
    ManifestSource::Http(url) => {
      let response = client.get(url).send().await.map_err(|e| e.to_string())?;
      let status = response.status();
      if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
      }
      response.text().await.map_err(|e| e.to_string())
    }
    ManifestSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| e.to_string()),
  }
}

/// Try each source in order and parse the first one that answers.
pub async fn load_catalog(client: &Client, sources: &[ManifestSource]) -> Result<Catalog, LoadError> {
  let mut attempts = Vec::new();
  for source in sources {
    debug!(source = %source, "manifest: trying source");
    match fetch_source(client, source).await {
      Ok(body) => {
        let catalog = parse_manifest(&body, &source.to_string())?;
        info!(source = %source, records = catalog.records.len(), dropped = catalog.dropped, "manifest: loaded");
        return Ok(catalog);
      }
      Err(reason) => {
        warn!(source = %source, reason = %reason, "manifest: source failed");
        attempts.push(SourceFailure { location: source.to_string(), reason });
      }
    }
  }
  Err(LoadError::NotFound { attempts })
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{Router, routing::get};
  use std::io::Write;

  const FLAT: &str = r#"{"videos":[{"id":"dQw4w9WgXcQ","title":"Test Video","views":100}]}"#;

  fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
  }

  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
  }

  // --- parse_manifest ---

  #[test]
  fn flat_manifest_parses() {
    let catalog = parse_manifest(FLAT, "test").unwrap();
    assert_eq!(catalog.records.len(), 1);
    assert_eq!(catalog.dropped, 0);
    let r = &catalog.records[0];
    assert_eq!(r.id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(r.title, "Test Video");
    assert_eq!(r.views, Some(Views::Count(100)));
    assert_eq!(r.category, None);
  }

  #[test]
  fn grouped_manifest_flattens_and_tags_category() {
    let body = r#"{"playlists":[
      {"name":"Music","videos":[{"id":"aaaaaaaaaa1","title":"Piano Cover #1"},{"id":"aaaaaaaaaa2","title":"Live Concert #2"}]},
      {"name":"Gaming","videos":[{"id":"bbbbbbbbbb1","title":"Speedrun #1","views":"120k"}]}
    ]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    let cats: Vec<_> = catalog.records.iter().map(|r| r.category.as_deref()).collect();
    assert_eq!(cats, vec![Some("Music"), Some("Music"), Some("Gaming")]);
    assert_eq!(catalog.records[0].title, "Piano Cover #1");
    assert_eq!(catalog.records[2].views, Some(Views::Text("120k".to_string())));
  }

  #[test]
  fn fractional_and_negative_views_do_not_reject_the_catalog() {
    let body = r#"{"videos":[
      {"id":"aaaaaaaaaa1","title":"A","views":1500.0},
      {"id":"aaaaaaaaaa2","title":"B","views":1.2e6},
      {"id":"aaaaaaaaaa3","title":"C","views":-1}
    ]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    let views: Vec<_> = catalog.records.iter().map(|r| r.views.clone()).collect();
    assert_eq!(
      views,
      vec![Some(Views::Number(1500.0)), Some(Views::Number(1_200_000.0)), Some(Views::Number(-1.0))]
    );
    assert_eq!(catalog.dropped, 0);
  }

  #[test]
  fn upload_date_uses_camel_case_key() {
    let body = r#"{"videos":[{"url":"https://cdn.example/a.mp4","title":"A","uploadDate":"2024-05-01","duration":"1:02"}]}"#;
    let r = &parse_manifest(body, "test").unwrap().records[0];
    assert_eq!(r.upload_date.as_deref(), Some("2024-05-01"));
    assert_eq!(r.duration.as_deref(), Some("1:02"));
  }

  #[test]
  fn placeholder_ids_are_dropped() {
    let body = r#"{"videos":[
      {"id":"x","title":"Too short"},
      {"id":"VIDEO_ID_HERE!","title":"Bad chars"},
      {"id":"abc_DEF-123","title":"Good"}
    ]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    assert_eq!(catalog.records.len(), 1);
    assert_eq!(catalog.records[0].title, "Good");
    assert_eq!(catalog.dropped, 2);
  }

  #[test]
  fn rows_without_target_are_dropped() {
    let body = r#"{"videos":[{"title":"Nothing"},{"id":"  ","url":"https://cdn.example/v.mp4","title":"Url only"}]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    assert_eq!(catalog.dropped, 1);
    assert_eq!(catalog.records[0].id, None);
    assert_eq!(catalog.records[0].url.as_deref(), Some("https://cdn.example/v.mp4"));
  }

  #[test]
  fn missing_records_field_is_malformed() {
    let err = parse_manifest(r#"{"items":[]}"#, "test").unwrap_err();
    assert!(matches!(err, LoadError::MalformedSchema { .. }));
  }

  #[test]
  fn non_json_is_malformed() {
    let err = parse_manifest("<html>404</html>", "test").unwrap_err();
    assert!(matches!(err, LoadError::MalformedSchema { .. }));
  }

  #[test]
  fn row_without_title_is_malformed() {
    let err = parse_manifest(r#"{"videos":[{"id":"dQw4w9WgXcQ"}]}"#, "test").unwrap_err();
    match err {
      LoadError::MalformedSchema { reason, .. } => assert!(reason.contains("video #0")),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn playlist_without_name_is_malformed() {
    let err = parse_manifest(r#"{"playlists":[{"videos":[]}]}"#, "test").unwrap_err();
    assert!(matches!(err, LoadError::MalformedSchema { .. }));
  }

  #[test]
  fn source_parse_distinguishes_http_and_files() {
    assert_eq!(ManifestSource::parse("https://x.test/v.json"), ManifestSource::Http("https://x.test/v.json".into()));
    assert_eq!(ManifestSource::parse("./videos.json"), ManifestSource::File(PathBuf::from("./videos.json")));
  }

  // --- load_catalog ---

  #[tokio::test]
  async fn no_sources_is_not_found() {
    let err = load_catalog(&client(), &[]).await.unwrap_err();
    assert!(matches!(err, LoadError::NotFound { ref attempts } if attempts.is_empty()));
  }

  #[tokio::test]
  async fn every_source_404_is_not_found() {
    let base = serve(Router::new()).await;
    let sources = vec![
      ManifestSource::Http(format!("{}/videos.json", base)),
      ManifestSource::Http(format!("{}/data/videos.json", base)),
    ];
    match load_catalog(&client(), &sources).await.unwrap_err() {
      LoadError::NotFound { attempts } => {
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.reason == "HTTP 404"));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn falls_back_to_next_http_source() {
    let base = serve(Router::new().route("/second.json", get(|| async { FLAT }))).await;
    let sources =
      vec![ManifestSource::Http(format!("{}/first.json", base)), ManifestSource::Http(format!("{}/second.json", base))];
    let catalog = load_catalog(&client(), &sources).await.unwrap();
    assert_eq!(catalog.records.len(), 1);
    assert!(catalog.source.ends_with("/second.json"));
  }

  #[tokio::test]
  async fn falls_back_from_missing_file_to_existing_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FLAT.as_bytes()).unwrap();
    let sources =
      vec![ManifestSource::File(PathBuf::from("/definitely/not/here.json")), ManifestSource::File(file.path().into())];
    let catalog = load_catalog(&client(), &sources).await.unwrap();
    assert_eq!(catalog.records[0].title, "Test Video");
  }

  #[tokio::test]
  async fn malformed_first_hit_does_not_fall_through() {
    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(br#"{"nope":true}"#).unwrap();
    let mut good = tempfile::NamedTempFile::new().unwrap();
    good.write_all(FLAT.as_bytes()).unwrap();
    let sources = vec![ManifestSource::File(bad.path().into()), ManifestSource::File(good.path().into())];
    let err = load_catalog(&client(), &sources).await.unwrap_err();
    assert!(matches!(err, LoadError::MalformedSchema { .. }));
  }
}
