use chrono::{DateTime, Utc};

use crate::age::format_age;
use crate::constants::constants;
use crate::manifest::{VideoRecord, Views};

/// Everything a grid card shows for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
  pub title: String,
  pub thumbnail_url: String,
  pub duration: String,
  pub views: String,
  pub age: String,
  pub category: Option<String>,
}

impl Card {
  pub fn from_record(record: &VideoRecord, now: DateTime<Utc>) -> Self {
    Self {
      title: record.title.clone(),
      thumbnail_url: thumbnail_url(record),
      duration: record.duration.clone().unwrap_or_else(|| "N/A".to_string()),
      views: record.views.as_ref().map(format_views).unwrap_or_else(|| "N/A".to_string()),
      age: format_age(record.upload_date.as_deref(), now),
      category: record.category.clone(),
    }
  }
}

/// Explicit thumbnail, else the platform thumbnail for the id, else the placeholder.
pub fn thumbnail_url(record: &VideoRecord) -> String {
  if let Some(ref thumb) = record.thumbnail {
    return thumb.clone();
  }
  match record.id {
    Some(ref id) => constants().thumbnail_url_for(id),
    None => constants().placeholder_thumbnail.clone(),
  }
}

/// `1234` -> `1.2K`, `1_000_000` -> `1M`. Pre-formatted labels pass through.
/// Fractional counts are truncated; negative ones are shown as whole numbers.
pub fn format_views(views: &Views) -> String {
  match views {
    Views::Text(s) => s.clone(),
    Views::Count(n) => humanize_count(*n),
    Views::Number(x) if !x.is_finite() => "N/A".to_string(),
    Views::Number(x) if *x < 0.0 => format!("{}", x.trunc() as i64),
    Views::Number(x) => humanize_count(x.trunc() as u64),
  }
}

fn humanize_count(n: u64) -> String {
  const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
  for (scale, suffix) in UNITS {
    if n >= scale {
      // One decimal, truncated so 999_999 never rounds up to "1000.0K".
      let tenths = n / (scale / 10);
      let whole = tenths / 10;
      let frac = tenths % 10;
      return if frac == 0 { format!("{}{}", whole, suffix) } else { format!("{}.{}{}", whole, frac, suffix) };
    }
  }
  n.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::parse_manifest;
  use chrono::TimeZone;

  fn record(id: Option<&str>, thumbnail: Option<&str>) -> VideoRecord {
    VideoRecord {
      id: id.map(str::to_string),
      url: Some("https://cdn.example/v.mp4".to_string()),
      title: "T".to_string(),
      thumbnail: thumbnail.map(str::to_string),
      duration: None,
      views: None,
      upload_date: None,
      category: None,
    }
  }

  #[test]
  fn single_video_manifest_renders_one_card() {
    let body = r#"{"videos":[{"id":"dQw4w9WgXcQ","title":"Test Video","views":100}]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let cards: Vec<Card> = catalog.records.iter().map(|r| Card::from_record(r, now)).collect();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Test Video");
    assert_eq!(cards[0].thumbnail_url, "https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg");
    assert_eq!(cards[0].views, "100");
    assert_eq!(cards[0].duration, "N/A");
    assert_eq!(cards[0].age, "Recently");
  }

  #[test]
  fn explicit_thumbnail_wins() {
    let r = record(Some("dQw4w9WgXcQ"), Some("https://picsum.photos/320/180"));
    assert_eq!(thumbnail_url(&r), "https://picsum.photos/320/180");
  }

  #[test]
  fn url_only_record_uses_placeholder() {
    let r = record(None, None);
    assert_eq!(thumbnail_url(&r), constants().placeholder_thumbnail);
  }

  #[test]
  fn counts_are_humanized() {
    assert_eq!(humanize_count(0), "0");
    assert_eq!(humanize_count(999), "999");
    assert_eq!(humanize_count(1_000), "1K");
    assert_eq!(humanize_count(1_234), "1.2K");
    assert_eq!(humanize_count(999_999), "999.9K");
    assert_eq!(humanize_count(2_500_000), "2.5M");
    assert_eq!(humanize_count(3_000_000_000), "3B");
  }

  #[test]
  fn non_integer_views_are_truncated() {
    assert_eq!(format_views(&Views::Number(1500.0)), "1.5K");
    assert_eq!(format_views(&Views::Number(1_299_999.9)), "1.2M");
    assert_eq!(format_views(&Views::Number(42.9)), "42");
    assert_eq!(format_views(&Views::Number(-1.0)), "-1");
  }

  #[test]
  fn fractional_views_render_on_the_card() {
    let body = r#"{"videos":[{"id":"dQw4w9WgXcQ","title":"A","views":1.2e6}]}"#;
    let catalog = parse_manifest(body, "test").unwrap();
    let card = Card::from_record(&catalog.records[0], Utc::now());
    assert_eq!(card.views, "1.2M");
  }

  #[test]
  fn text_views_pass_through() {
    assert_eq!(format_views(&Views::Text("120k".to_string())), "120k");
  }
}
