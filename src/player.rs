use anyhow::{Context, Result, anyhow};
use serde_json::json;
use std::{path::PathBuf, process::Stdio};
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
  net::UnixStream,
  process::{Child, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::modal::PlayerFrame;

/// mpv's status line, written to stdout once per tick.
const STATUS_FORMAT: &str = "--term-status-msg=${time-pos/full} / ${duration/full} (${percent-pos}%)";

/// Plays the modal's URL in an mpv child process. mpv hands YouTube URLs
/// (embed pages included) to yt-dlp on its own.
pub struct MpvFrame {
  program: String,
  audio_only: bool,
  source: Option<String>,
  child: Option<Child>,
  status_task: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<String>>,
  last_status: Option<String>,
  ipc_path: Option<PathBuf>,
  pub paused: bool,
}

impl MpvFrame {
  pub fn new(audio_only: bool) -> Self {
    Self::with_program("mpv", audio_only)
  }

  /// Drive `program` instead of the `mpv` found on `PATH`. It is given mpv's
  /// command line.
  pub fn with_program(program: &str, audio_only: bool) -> Self {
    Self {
      program: program.to_string(),
      audio_only,
      source: None,
      child: None,
      status_task: None,
      status_rx: None,
      last_status: None,
      ipc_path: None,
      paused: false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.child.is_some()
  }

  /// Drain status lines from mpv and notice if it exited on its own.
  pub fn check_mpv_status(&mut self) {
    if let Some(rx) = self.status_rx.as_mut() {
      while let Ok(line) = rx.try_recv() {
        self.last_status = Some(line);
      }
    }
    let exited = match self.child.as_mut() {
      Some(child) => child.try_wait().ok().flatten(),
      None => None,
    };
    if let Some(status) = exited {
      info!(%status, "player: mpv exited");
      self.child = None;
      self.last_status = Some(format!("Player exited ({})", status));
    }
  }

  pub fn last_mpv_status(&self) -> Option<&str> {
    self.last_status.as_deref()
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    if self.ipc_path.is_none() {
      return Ok(());
    }
    self.send_command(&["cycle", "pause"]).await?;
    self.paused = !self.paused;
    Ok(())
  }

  /// Send one JSON IPC command to the running mpv.
  async fn send_command(&self, command: &[&str]) -> Result<()> {
    let path = self.ipc_path.as_ref().context("mpv is not running")?;
    let mut stream = UnixStream::connect(path).await.context("Failed to connect to mpv IPC socket")?;
    let mut line = json!({ "command": command }).to_string();
    line.push('\n');
    stream.write_all(line.as_bytes()).await.context("Failed to write to mpv IPC socket")?;
    Ok(())
  }

  fn args(&self, url: &str, ipc_path: &str) -> Vec<String> {
    let mut args = vec!["--force-window=immediate".to_string()];
    if self.audio_only {
      args.push("--no-video".to_string());
    }
    args.push(STATUS_FORMAT.to_string());
    args.push(format!("--input-ipc-server={}", ipc_path));
    args.push("--".to_string());
    args.push(url.to_string());
    args
  }

  fn spawn(&mut self, url: &str) -> Result<()> {
    let ipc_path = std::env::temp_dir().join(format!("vidgrid-mpv-{}.sock", std::process::id()));
    let ipc_str = ipc_path.to_str().context("Temp dir path is not valid UTF-8")?;
    // A crashed run can leave the socket behind.
    let _ = std::fs::remove_file(&ipc_path);

    let mut child = Command::new(&self.program)
      .args(self.args(url, ipc_str))
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      // Never drained; a pipe here would eventually stall mpv.
      .stderr(Stdio::null())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
          anyhow!("{} is not installed (try: apt install mpv, or brew install mpv)", self.program)
        }
        _ => anyhow!(e).context(format!("Failed to start {}", self.program)),
      })?;

    let stdout = child.stdout.take().context("mpv stdout was not captured")?;
    let (tx, rx) = mpsc::channel(10);
    self.status_task = Some(tokio::spawn(async move {
      let mut lines = BufReader::new(stdout).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    }));
    self.status_rx = Some(rx);
    self.child = Some(child);
    self.ipc_path = Some(ipc_path);
    Ok(())
  }
}

impl PlayerFrame for MpvFrame {
  fn source(&self) -> Option<&str> {
    self.source.as_deref()
  }

  async fn load(&mut self, url: &str) -> Result<()> {
    self.clear().await.context("Failed to stop previous playback")?;
    info!(url = %url, audio_only = self.audio_only, "player: starting mpv");
    if let Err(e) = self.spawn(url) {
      error!(err = %format!("{:#}", e), "player: spawn failed");
      return Err(e);
    }
    self.source = Some(url.to_string());
    Ok(())
  }

  async fn clear(&mut self) -> Result<()> {
    self.source = None;
    self.paused = false;
    self.last_status = None;
    self.status_rx = None;
    if let Some(task) = self.status_task.take() {
      task.abort();
    }
    if let Some(path) = self.ipc_path.take() {
      let _ = std::fs::remove_file(path);
    }

    let Some(mut child) = self.child.take() else { return Ok(()) };
    // Already gone (window closed by hand, or it never started playing).
    if let Ok(Some(status)) = child.try_wait() {
      info!(%status, "player: mpv had already exited");
      return Ok(());
    }
    if let Err(e) = child.kill().await {
      warn!(err = %e, "player: failed to kill mpv");
      return Err(anyhow!(e).context("Failed to stop mpv"));
    }
    Ok(())
  }
}
