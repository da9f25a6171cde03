use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User preferences persisted between runs in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_base: Option<String>,
  pub rating: Option<String>,
  pub content_type: Option<String>,
  /// Keep the modal player audio-only (no mpv video window).
  pub audio_only: Option<bool>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "amfilter")
}

fn config_file() -> Option<PathBuf> {
  project_dirs().map(|dirs| dirs.config_dir().join("prefs.toml"))
}

impl Config {
  pub fn load() -> Self {
    let Some(path) = config_file() else { return Self::default() };
    let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
    Self::parse(&content).unwrap_or_else(|| {
      warn!(path = %path.display(), "config: unreadable prefs, using defaults");
      Self::default()
    })
  }

  fn parse(content: &str) -> Option<Self> {
    toml::from_str(content).ok()
  }

  pub fn save(&self) {
    let Some(path) = config_file() else {
      warn!("config: no home directory, prefs not saved");
      return;
    };
    if let Err(e) = self.write_to(&path) {
      warn!(path = %path.display(), err = %format!("{:#}", e), "config: failed to save prefs");
    }
  }

  fn write_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("serializing prefs")?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_partial_prefs() {
    let config = Config::parse("theme_name = \"light\"\nrating = \"PG\"\n").unwrap();
    assert_eq!(config.theme_name.as_deref(), Some("light"));
    assert_eq!(config.rating.as_deref(), Some("PG"));
    assert_eq!(config.api_base, None);
    assert_eq!(config.audio_only, None);
  }

  #[test]
  fn empty_prefs_are_default() {
    assert_eq!(Config::parse(""), Some(Config::default()));
    assert_eq!(Config::parse("theme_name = ["), None);
  }

  #[test]
  fn save_reports_unwritable_location() {
    let dir = std::env::temp_dir().join(format!("amfilter-prefs-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let err = Config::default().write_to(&blocker.join("prefs.toml")).unwrap_err();
    assert!(format!("{:#}", err).contains("creating"));

    let path = dir.join("nested").join("prefs.toml");
    let config = Config { theme_name: Some("light".into()), ..Config::default() };
    config.write_to(&path).unwrap();
    assert_eq!(Config::parse(&std::fs::read_to_string(&path).unwrap()), Some(config));
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn prefs_survive_serialization() {
    let config = Config {
      theme_name: Some("dark".into()),
      api_base: Some("http://localhost:3000".into()),
      rating: Some("all".into()),
      content_type: Some("shorts".into()),
      audio_only: Some(true),
    };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(Config::parse(&text), Some(config));
  }
}
