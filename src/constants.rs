//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Manifest locations tried, in order, when neither the CLI nor prefs name any.
  pub default_sources: Vec<String>,

  // URL templates
  pub embed_url: String,
  pub watch_url: String,
  pub thumbnail_url: String,
  pub oembed_url: String,
  pub placeholder_thumbnail: String,

  // Loader
  pub min_id_len: usize,
  pub http_timeout_secs: u64,

  // Availability probing
  pub probe_concurrency: usize,

  // Grid
  pub card_width: u16,
  pub card_height: u16,
}

impl Constants {
  pub fn embed_url_for(&self, id: &str) -> String {
    self.embed_url.replace("{id}", id)
  }

  pub fn watch_url_for(&self, id: &str) -> String {
    self.watch_url.replace("{id}", id)
  }

  pub fn thumbnail_url_for(&self, id: &str) -> String {
    self.thumbnail_url.replace("{id}", id)
  }

  pub fn oembed_url_for(&self, id: &str) -> String {
    self.oembed_url.replace("{watch}", &self.watch_url_for(id))
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed every test below fails.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
