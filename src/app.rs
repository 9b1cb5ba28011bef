use anyhow::Result;
use image::DynamicImage;
use ratatui::layout::Rect;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::availability::{Availability, ProbeResult, probe_all};
use crate::card;
use crate::catalog::{CatalogView, CategoryFilter};
use crate::config::Config;
use crate::display::DisplayMode;
use crate::manifest::{Catalog, LoadError, ManifestSource, load_catalog};
use crate::modal::{PlaybackModal, watch_url};
use crate::player::MpvFrame;
use crate::preview::{ThumbnailCache, fetch_thumbnail};
use crate::theme::{THEMES, Theme, theme_index};

// --- Types ---

pub type LoadOutcome = Result<Catalog, LoadError>;
pub type ThumbResult = (String, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Moving around the grid.
  Browse,
  /// Typing into the search box; the grid filters as you type.
  Search,
}

/// What the main area shows while there is no catalog to draw.
#[derive(Debug)]
pub enum LoadState {
  Loading,
  Ready,
  Failed(LoadError),
}

/// Monotonic load counter. A result is applied only if it belongs to a
/// newer load than the last one applied, so a slow old load can never
/// overwrite a newer catalog.
#[derive(Debug, Default)]
pub struct LoadGenerations {
  latest: u64,
  applied: u64,
}

impl LoadGenerations {
  pub fn start(&mut self) -> u64 {
    self.latest += 1;
    self.latest
  }

  /// Claim `generation` for applying. Returns `false` for stale results.
  pub fn accept(&mut self, generation: u64) -> bool {
    if generation <= self.applied {
      return false;
    }
    self.applied = generation;
    true
  }

  pub fn pending(&self) -> bool {
    self.latest > self.applied
  }
}

/// Startup options resolved from CLI flags and prefs.
#[derive(Debug, Clone)]
pub struct AppOptions {
  pub sources: Vec<ManifestSource>,
  pub probe_availability: bool,
  pub audio_only: bool,
  pub display_mode: DisplayMode,
}

/// Screen regions recorded during the last draw, used for mouse hit-testing.
#[derive(Default)]
pub struct HitAreas {
  /// `(visible index, area)` for each drawn card.
  pub cards: Vec<(usize, Rect)>,
  pub tabs: Vec<(CategoryFilter, Rect)>,
  /// The modal's content box; clicks outside it close the modal.
  pub modal: Option<Rect>,
}

/// In-flight async task receivers and handles.
pub(crate) struct AsyncTasks {
  pub(crate) load_tx: mpsc::UnboundedSender<(u64, LoadOutcome)>,
  pub(crate) load_rx: mpsc::UnboundedReceiver<(u64, LoadOutcome)>,
  pub(crate) probe_rx: Option<mpsc::Receiver<ProbeResult>>,
  pub(crate) probe_handle: Option<JoinHandle<()>>,
  pub(crate) thumb_rx: Option<oneshot::Receiver<ThumbResult>>,
}

impl AsyncTasks {
  fn new() -> Self {
    let (load_tx, load_rx) = mpsc::unbounded_channel();
    Self { load_tx, load_rx, probe_rx: None, probe_handle: None, thumb_rx: None }
  }
}

pub struct App {
  pub client: Client,
  pub sources: Vec<ManifestSource>,
  pub probe_availability: bool,
  pub display_mode: DisplayMode,
  pub view: CatalogView,
  pub modal: PlaybackModal<MpvFrame>,
  pub load_state: LoadState,
  pub generations: LoadGenerations,
  /// Where the current catalog came from and how many rows it dropped.
  pub loaded_from: Option<(String, usize)>,
  pub mode: AppMode,
  pub search_input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  /// Index into the visible set.
  pub selected: usize,
  /// Cards per row in the last drawn grid.
  pub grid_columns: usize,
  /// First grid row drawn.
  pub grid_scroll: usize,
  pub theme_index: usize,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, shown below status/error in priority.
  pub info_message: Option<String>,
  pub thumbnail: Option<ThumbnailCache>,
  pub hits: HitAreas,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
  config: Config,
  /// When the last error was set, for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(options: AppOptions, config: Config, client: Client) -> Self {
    Self {
      client,
      sources: options.sources,
      probe_availability: options.probe_availability,
      display_mode: options.display_mode,
      view: CatalogView::new(Vec::new()),
      modal: PlaybackModal::new(MpvFrame::new(options.audio_only)),
      load_state: LoadState::Loading,
      generations: LoadGenerations::default(),
      loaded_from: None,
      mode: AppMode::Browse,
      search_input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      selected: 0,
      grid_columns: 1,
      grid_scroll: 0,
      theme_index: theme_index(config.theme_name.as_deref()),
      last_error: None,
      status_message: None,
      info_message: None,
      thumbnail: None,
      hits: HitAreas::default(),
      should_quit: false,
      tasks: AsyncTasks::new(),
      config,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    // theme_index is kept in range by theme_index() and next_theme().
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.clear_error();
    }
  }

  // --- Loading ---

  /// Start a new load. Any load still in flight keeps running, but its
  /// result will be discarded if this one is applied first.
  pub fn trigger_load(&mut self) {
    let generation = self.generations.start();
    info!(generation, sources = self.sources.len(), "load triggered");
    self.clear_error();
    self.status_message = Some("Loading videos…".to_string());
    if self.view.records().is_empty() {
      self.load_state = LoadState::Loading;
    }

    let client = self.client.clone();
    let sources = self.sources.clone();
    let tx = self.tasks.load_tx.clone();
    tokio::spawn(async move {
      let outcome = load_catalog(&client, &sources).await;
      let _ = tx.send((generation, outcome));
    });
  }

  fn apply_load(&mut self, outcome: LoadOutcome) {
    match outcome {
      Ok(catalog) => {
        let count = catalog.records.len();
        self.view.replace(catalog.records);
        self.loaded_from = Some((catalog.source, catalog.dropped));
        self.load_state = LoadState::Ready;
        self.clamp_selection();
        self.info_message = Some(if catalog.dropped > 0 {
          format!("Loaded {} videos ({} invalid rows skipped)", count, catalog.dropped)
        } else {
          format!("Loaded {} videos", count)
        });
        self.trigger_probes();
      }
      Err(e) => {
        warn!(err = %e, "load failed");
        if self.view.records().is_empty() {
          self.load_state = LoadState::Failed(e);
        } else {
          self.set_error(format!("Refresh failed: {} (r to retry)", e));
        }
      }
    }
  }

  fn cancel_probes(&mut self) {
    if let Some(handle) = self.tasks.probe_handle.take() {
      handle.abort();
    }
    self.tasks.probe_rx = None;
  }

  /// Probe every record with a platform id in the background.
  fn trigger_probes(&mut self) {
    self.cancel_probes();
    if !self.probe_availability {
      return;
    }
    let ids: Vec<String> = self.view.records().iter().filter_map(|r| r.id.clone()).collect();
    if ids.is_empty() {
      return;
    }
    debug!(count = ids.len(), "availability probes started");
    let (tx, rx) = mpsc::channel(64);
    let client = self.client.clone();
    self.tasks.probe_handle = Some(tokio::spawn(probe_all(client, ids, tx)));
    self.tasks.probe_rx = Some(rx);
  }

  /// Apply whatever background work has finished since the last tick.
  pub fn check_pending(&mut self) {
    while let Ok((generation, outcome)) = self.tasks.load_rx.try_recv() {
      if !self.generations.accept(generation) {
        debug!(generation, "discarding stale load result");
        continue;
      }
      if !self.generations.pending() {
        self.status_message = None;
      }
      self.apply_load(outcome);
    }

    if let Some(rx) = &mut self.tasks.probe_rx {
      let mut hidden = Vec::new();
      let mut finished = false;
      loop {
        match rx.try_recv() {
          Ok(ProbeResult { video_id, availability: Availability::Unavailable }) => hidden.push(video_id),
          Ok(_) => {}
          Err(mpsc::error::TryRecvError::Empty) => break,
          Err(mpsc::error::TryRecvError::Disconnected) => {
            finished = true;
            break;
          }
        }
      }
      for id in hidden {
        info!(video_id = %id, "hiding unavailable video");
        self.view.hide(&id);
      }
      self.clamp_selection();
      if finished {
        self.tasks.probe_rx = None;
        self.tasks.probe_handle = None;
      }
    }

    if let Some(mut rx) = self.tasks.thumb_rx.take() {
      match rx.try_recv() {
        Ok((key, Ok(image))) => self.thumbnail = Some(ThumbnailCache::new(key, image)),
        Ok((key, Err(e))) => debug!(key = %key, err = %format!("{:#}", e), "no preview available"),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.thumb_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }
  }

  // --- Search & selection ---

  /// Re-filter after the search box changed.
  pub fn search_changed(&mut self) {
    let term = self.search_input.trim().to_string();
    self.view.set_search(&term);
    self.selected = 0;
    self.grid_scroll = 0;
  }

  pub fn clear_search(&mut self) {
    self.search_input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.search_changed();
  }

  pub fn set_category(&mut self, category: CategoryFilter) {
    self.view.set_category(category);
    self.selected = 0;
    self.grid_scroll = 0;
  }

  pub fn cycle_category(&mut self, delta: isize) {
    self.view.cycle_category(delta);
    self.selected = 0;
    self.grid_scroll = 0;
  }

  pub fn clamp_selection(&mut self) {
    let count = self.view.visible_len();
    self.selected = if count == 0 { 0 } else { self.selected.min(count - 1) };
  }

  /// Move the grid cursor by whole cards (`dx`) and rows (`dy`), staying in range.
  pub fn move_selection(&mut self, dx: isize, dy: isize) {
    let count = self.view.visible_len() as isize;
    if count == 0 {
      return;
    }
    let cols = self.grid_columns.max(1) as isize;
    let target = self.selected as isize + dx + dy * cols;
    self.selected = target.clamp(0, count - 1) as usize;
  }

  // --- Modal ---

  pub async fn open_selected(&mut self) {
    let Some(record) = self.view.visible_record(self.selected).cloned() else { return };
    self.open_record(record).await;
  }

  pub async fn open_visible(&mut self, index: usize) {
    self.selected = index;
    self.open_selected().await;
  }

  async fn open_record(&mut self, record: crate::manifest::VideoRecord) {
    self.clear_error();
    match self.modal.open(&record).await {
      Ok(true) => {}
      Ok(false) => return,
      Err(e) => self.set_error(format!("Playback error: {:#}", e)),
    }
    self.trigger_thumbnail(&record);
  }

  fn trigger_thumbnail(&mut self, record: &crate::manifest::VideoRecord) {
    if self.display_mode == DisplayMode::Off {
      return;
    }
    let key = record.key().to_string();
    if self.thumbnail.as_ref().is_some_and(|t| t.key == key) {
      return;
    }
    self.thumbnail = None;
    let url = card::thumbnail_url(record);
    let client = self.client.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send((key, fetch_thumbnail(&client, &url).await));
    });
    self.tasks.thumb_rx = Some(rx);
  }

  pub async fn close_modal(&mut self) {
    if let Err(e) = self.modal.close().await {
      self.set_error(format!("Failed to stop player: {:#}", e));
    }
    self.tasks.thumb_rx = None;
  }

  pub async fn toggle_pause(&mut self) {
    if let Err(e) = self.modal.frame_mut().toggle_pause().await {
      self.set_error(format!("Pause error: {}", e));
    }
  }

  /// Open the current video's watch page in the default browser.
  pub fn open_in_browser(&mut self) {
    let Some(url) = self.modal.current().and_then(watch_url) else { return };
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => self.set_error(format!("Failed to open browser: {}", e)),
    }
  }
}
