//! Relative "uploaded N ago" labels for cards.
//!
//! Months are 30 days and years are 365 days. The label is a display hint,
//! not a calendar computation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse an ISO-ish upload date. Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD` and yt-dlp's compact `YYYYMMDD`.
pub fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
    return Some(dt.and_utc());
  }
  ["%Y-%m-%d", "%Y%m%d"]
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

/// Format the distance between `date` and `now` as a short label.
pub fn format_age(date: Option<&str>, now: DateTime<Utc>) -> String {
  let Some(date) = date.and_then(parse_upload_date) else {
    return "Recently".to_string();
  };
  let days = (now - date).num_days().unsigned_abs();
  match days {
    0 => "Today".to_string(),
    1..=6 => format!("{}d ago", days),
    7..=29 => format!("{}w ago", days / 7),
    30..=364 => format!("{}m ago", days / 30),
    _ => format!("{}y ago", days / 365),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
  }

  fn days_ago(n: i64) -> String {
    (now() - Duration::days(n)).format("%Y-%m-%d").to_string()
  }

  #[test]
  fn missing_date_is_recently() {
    assert_eq!(format_age(None, now()), "Recently");
    assert_eq!(format_age(Some(""), now()), "Recently");
    assert_eq!(format_age(Some("not a date"), now()), "Recently");
  }

  #[test]
  fn same_day_is_today() {
    assert_eq!(format_age(Some("2026-10-19"), now()), "Today");
    assert_eq!(format_age(Some("2026-10-19T08:30:00Z"), now()), "Today");
  }

  #[test]
  fn days_below_a_week() {
    assert_eq!(format_age(Some(&days_ago(1)), now()), "1d ago");
    assert_eq!(format_age(Some(&days_ago(6)), now()), "6d ago");
  }

  #[test]
  fn weeks_below_thirty_days() {
    assert_eq!(format_age(Some(&days_ago(7)), now()), "1w ago");
    assert_eq!(format_age(Some(&days_ago(29)), now()), "4w ago");
  }

  #[test]
  fn months_use_thirty_day_buckets() {
    assert_eq!(format_age(Some(&days_ago(30)), now()), "1m ago");
    assert_eq!(format_age(Some(&days_ago(45)), now()), "1m ago");
    assert_eq!(format_age(Some(&days_ago(364)), now()), "12m ago");
  }

  #[test]
  fn years_use_365_day_buckets() {
    assert_eq!(format_age(Some(&days_ago(365)), now()), "1y ago");
    assert_eq!(format_age(Some(&days_ago(800)), now()), "2y ago");
  }

  #[test]
  fn future_dates_count_absolute_distance() {
    let ahead = (now() + Duration::days(3)).format("%Y-%m-%d").to_string();
    assert_eq!(format_age(Some(&ahead), now()), "2d ago");
  }

  #[test]
  fn compact_and_datetime_forms_parse() {
    assert!(parse_upload_date("20240131").is_some());
    assert!(parse_upload_date("2024-01-31T10:00:00").is_some());
    assert!(parse_upload_date("2024-01-31T10:00:00+02:00").is_some());
    assert!(parse_upload_date("31/01/2024").is_none());
  }
}
