use std::{
  fs,
  io::Error as IOError,
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use serde::Deserialize;
use toml::de::Error as TomlError;
use vellum_core::{
  autosave::AUTOSAVE_DELAY,
  catalog::Theme,
};

#[derive(Debug, Clone)]
pub struct Config {
  pub store_dir:      Option<PathBuf>,
  pub theme:          Theme,
  pub autosave_delay: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      store_dir:      None,
      theme:          Theme::default(),
      autosave_delay: AUTOSAVE_DELAY,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
  pub store_dir:           Option<PathBuf>,
  pub theme:               Option<String>,
  pub autosave_delay_secs: Option<u64>,
}

#[derive(Debug)]
pub enum ConfigLoadError {
  BadConfig(TomlError),
  BadTheme(String),
  Error(IOError),
}

impl std::fmt::Display for ConfigLoadError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::BadConfig(err) => write!(f, "Failed to parse config: {err}"),
      Self::BadTheme(err) => write!(f, "Failed to parse config: {err}"),
      Self::Error(err) => write!(f, "Failed to read config: {err}"),
    }
  }
}

impl std::error::Error for ConfigLoadError {}

impl Config {
  /// Load from `path`; a missing file is the default config, a present but
  /// invalid one is an error.
  pub fn load(path: &Path) -> Result<Config, ConfigLoadError> {
    let raw = match fs::read_to_string(path) {
      Ok(raw) => raw,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Config::default());
      },
      Err(err) => return Err(ConfigLoadError::Error(err)),
    };
    let raw: ConfigRaw = toml::from_str(&raw).map_err(ConfigLoadError::BadConfig)?;

    let theme = match raw.theme {
      Some(value) => value.parse().map_err(ConfigLoadError::BadTheme)?,
      None => Theme::default(),
    };

    Ok(Config {
      store_dir: raw.store_dir,
      theme,
      autosave_delay: raw
        .autosave_delay_secs
        .map_or(AUTOSAVE_DELAY, Duration::from_secs),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_is_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.theme, Theme::System);
    assert_eq!(config.autosave_delay, AUTOSAVE_DELAY);
    assert!(config.store_dir.is_none());
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
      &path,
      "store_dir = \"/tmp/docs\"\ntheme = \"dark\"\nautosave_delay_secs = 10\n",
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.store_dir.as_deref(), Some(Path::new("/tmp/docs")));
    assert_eq!(config.theme, Theme::Dark);
    assert_eq!(config.autosave_delay, Duration::from_secs(10));
  }

  #[test]
  fn unknown_keys_and_themes_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    fs::write(&path, "not_a_key = 1\n").unwrap();
    assert!(matches!(
      Config::load(&path),
      Err(ConfigLoadError::BadConfig(_))
    ));

    fs::write(&path, "theme = \"mauve\"\n").unwrap();
    assert!(matches!(
      Config::load(&path),
      Err(ConfigLoadError::BadTheme(_))
    ));
  }
}
