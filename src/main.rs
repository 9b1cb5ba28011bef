mod age;
mod app;
mod availability;
mod card;
mod catalog;
mod config;
mod constants;
mod display;
mod input;
mod manifest;
mod modal;
mod player;
mod preview;
mod theme;
mod ui;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
  },
};
use reqwest::Client;
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use app::{App, AppOptions};
use availability::{Availability, probe_all};
use card::Card;
use catalog::CategoryFilter;
use config::Config;
use constants::constants;
use display::CliDisplayMode;
use manifest::{ManifestSource, load_catalog};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Manifest files or URLs, tried in order (default: prefs, then built-in locations)
  sources: Vec<String>,

  /// Check each video's availability and hide removed ones
  #[arg(long, overrides_with = "no_probe")]
  probe: bool,

  /// Skip availability checks
  #[arg(long)]
  no_probe: bool,

  /// Thumbnail preview: 'auto', 'direct', 'ascii', or 'off' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Play audio only, without a video window
  #[arg(short, long)]
  audio_only: bool,

  /// Start on this category tab
  #[arg(short, long)]
  category: Option<String>,

  /// Print the catalog as a table and exit
  #[arg(short, long)]
  list: bool,

  /// Write logs here instead of the data directory
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

impl Args {
  fn probe_availability(&self, config: &Config) -> bool {
    if self.no_probe {
      false
    } else if self.probe {
      true
    } else {
      config.probe_availability.unwrap_or(true)
    }
  }

  /// CLI sources win over prefs, which win over the built-in list.
  fn sources(&self, config: &Config) -> Vec<ManifestSource> {
    let raw: &[String] = if !self.sources.is_empty() {
      &self.sources
    } else if !config.sources.is_empty() {
      &config.sources
    } else {
      &constants().default_sources
    };
    raw.iter().map(|s| ManifestSource::parse(s)).collect()
  }
}

// --- Logging ---

/// Route tracing output to a file; the terminal belongs to the UI.
fn init_logging(log_file: Option<PathBuf>) -> Option<WorkerGuard> {
  let path = log_file.or_else(|| config::data_dir().map(|d| d.join("vidgrid.log")))?;
  let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
  let file_name = path.file_name()?.to_owned();
  std::fs::create_dir_all(&dir).ok()?;

  let appender = tracing_appender::rolling::never(dir, file_name);
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn"));
  tracing_subscriber::fmt().with_writer(writer).with_env_filter(filter).with_ansi(false).init();
  Some(guard)
}

// --- List mode ---

async fn print_catalog(client: Client, sources: &[ManifestSource], probe_availability: bool) -> Result<()> {
  let mut catalog = load_catalog(&client, sources).await?;

  if probe_availability {
    let ids: Vec<String> = catalog.records.iter().filter_map(|r| r.id.clone()).collect();
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(probe_all(client, ids, tx));
    let mut hidden = Vec::new();
    while let Some(result) = rx.recv().await {
      if result.availability == Availability::Unavailable {
        hidden.push(result.video_id);
      }
    }
    catalog.records.retain(|r| r.id.as_ref().is_none_or(|id| !hidden.contains(id)));
  }

  let now = Utc::now();
  println!("{:<44} {:>9} {:>9} {:>10}  CATEGORY", "TITLE", "DURATION", "VIEWS", "UPLOADED");
  for record in &catalog.records {
    let card = Card::from_record(record, now);
    let title: String = card.title.chars().take(44).collect();
    println!(
      "{:<44} {:>9} {:>9} {:>10}  {}",
      title,
      card.duration,
      card.views,
      card.age,
      card.category.as_deref().unwrap_or("-")
    );
  }
  eprintln!("{} videos from {} ({} invalid rows skipped)", catalog.records.len(), catalog.source, catalog.dropped);
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "vg", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging(args.log_file.clone());
  let config = Config::load();
  let client = Client::builder()
    .timeout(Duration::from_secs(constants().http_timeout_secs))
    .user_agent(concat!("vidgrid/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("Failed to build HTTP client")?;

  let options = AppOptions {
    sources: args.sources(&config),
    probe_availability: args.probe_availability(&config),
    audio_only: args.audio_only || config.audio_only.unwrap_or(false),
    display_mode: display::resolve_display_mode(args.display_mode),
  };
  info!(sources = options.sources.len(), probe = options.probe_availability, "starting");

  if args.list {
    return print_catalog(client, &options.sources, options.probe_availability).await;
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  execute!(std::io::stdout(), EnableMouseCapture).context("Failed to enable mouse capture")?;
  let mut app = App::new(options, config, client);
  if let Some(name) = &args.category {
    app.set_category(CategoryFilter::parse(name));
  }
  let result = run(&mut terminal, app).await;
  let _ = execute!(std::io::stdout(), DisableMouseCapture);
  ratatui::restore();
  if let Err(e) = &result {
    error!(err = %format!("{:#}", e), "exiting with error");
  }
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  app.trigger_load();

  loop {
    app.check_pending();
    app.modal.frame_mut().check_mpv_status();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await?;
        }
        Event::Mouse(mouse) => {
          input::handle_mouse_event(&mut app, mouse).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.modal.close().await.context("Failed to stop playback")
}
