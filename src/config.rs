use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// Manifest locations tried in order; the built-in defaults apply when empty.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sources: Vec<String>,
  pub probe_availability: Option<bool>,
  pub audio_only: Option<bool>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "vidgrid")
}

/// Directory for the log file; `None` when no home directory is known.
pub fn data_dir() -> Option<PathBuf> {
  project_dirs().map(|d| d.data_dir().to_path_buf())
}

impl Config {
  pub fn load() -> Self {
    match project_dirs() {
      Some(dirs) => Self::load_from(&dirs.config_dir().join("prefs.toml")),
      None => Self::default(),
    }
  }

  /// Read prefs from `path`; a missing or unreadable file yields defaults.
  pub fn load_from(path: &Path) -> Self {
    let Ok(content) = std::fs::read_to_string(path) else {
      return Self::default();
    };
    match toml::from_str(&content) {
      Ok(config) => config,
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: ignoring malformed prefs");
        Self::default()
      }
    }
  }

  pub fn save(&self) {
    if let Some(dirs) = project_dirs() {
      self.save_to(&dirs.config_dir().join("prefs.toml"));
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && std::fs::create_dir_all(dir).is_err()
    {
      return;
    }
    match toml::to_string(self) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          warn!(path = %path.display(), err = %e, "config: failed to save prefs");
        }
      }
      Err(e) => warn!(err = %e, "config: failed to serialize prefs"),
    }
  }
}
