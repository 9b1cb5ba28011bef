//! The single playback slot. At most one video plays at a time.

use anyhow::Result;
use tracing::{debug, info};

use crate::constants::constants;
use crate::manifest::VideoRecord;

/// Whatever actually plays the video: an mpv process in the app, a
/// recorder in tests. `clear` must stop playback before returning.
pub trait PlayerFrame {
  /// The URL currently loaded, if any.
  fn source(&self) -> Option<&str>;
  async fn load(&mut self, url: &str) -> Result<()>;
  async fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalState {
  #[default]
  Closed,
  Open {
    playback_url: String,
    source: Option<VideoRecord>,
  },
}

/// Platform embed URL for an id, else the record's direct URL.
pub fn embed_url(record: &VideoRecord) -> Option<String> {
  match (&record.id, &record.url) {
    (Some(id), _) => Some(constants().embed_url_for(id)),
    (None, Some(url)) => Some(url.clone()),
    (None, None) => None,
  }
}

/// Page to open in a browser: the watch page for an id, else the direct URL.
pub fn watch_url(record: &VideoRecord) -> Option<String> {
  match (&record.id, &record.url) {
    (Some(id), _) => Some(constants().watch_url_for(id)),
    (None, Some(url)) => Some(url.clone()),
    (None, None) => None,
  }
}

pub struct PlaybackModal<F> {
  state: ModalState,
  frame: F,
}

impl<F: PlayerFrame> PlaybackModal<F> {
  pub fn new(frame: F) -> Self {
    Self { state: ModalState::Closed, frame }
  }

  pub fn state(&self) -> &ModalState {
    &self.state
  }

  pub fn is_open(&self) -> bool {
    matches!(self.state, ModalState::Open { .. })
  }

  /// The record being played, if the modal is open on one.
  pub fn current(&self) -> Option<&VideoRecord> {
    match &self.state {
      ModalState::Open { source, .. } => source.as_ref(),
      ModalState::Closed => None,
    }
  }

  pub fn frame(&self) -> &F {
    &self.frame
  }

  pub fn frame_mut(&mut self) -> &mut F {
    &mut self.frame
  }

  /// Open on `record`, replacing whatever was playing. Returns `Ok(false)`
  /// without touching anything when the record has nothing to play.
  ///
  /// If the frame fails to load, the modal stays open on the URL so the
  /// failure can be shown next to it.
  pub async fn open(&mut self, record: &VideoRecord) -> Result<bool> {
    let Some(playback_url) = embed_url(record) else {
      debug!(title = %record.title, "modal: nothing to play");
      return Ok(false);
    };
    self.close().await?;
    info!(url = %playback_url, "modal: open");
    self.state = ModalState::Open { playback_url: playback_url.clone(), source: Some(record.clone()) };
    self.frame.load(&playback_url).await?;
    Ok(true)
  }

  /// Stop playback, then close. A no-op when already closed.
  pub async fn close(&mut self) -> Result<()> {
    if !self.is_open() {
      return Ok(());
    }
    let released = self.frame.clear().await;
    self.state = ModalState::Closed;
    info!("modal: closed");
    released
  }
}
