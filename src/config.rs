use crate::chime::ToneSettings;
use crate::router::View;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_MINUTES: u64 = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_minutes: u64,
    pub start_view: View,
    pub chime: ToneSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_minutes: DEFAULT_MINUTES,
            start_view: View::Home,
            chime: ToneSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub minutes: Option<u64>,
    pub no_sound: bool,
    pub view: Option<View>,
}

impl Config {
    /// Loads `path` or the default config location. A missing file yields defaults.
    #[tracing::instrument]
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Config::default()),
            },
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        let config: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config {:?}", path))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn apply(mut self, overrides: &Overrides) -> Config {
        if let Some(minutes) = overrides.minutes {
            self.default_minutes = minutes;
        }
        if overrides.no_sound {
            self.chime.enabled = false;
        }
        if let Some(view) = overrides.view {
            self.start_view = view;
        }
        self
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ticktask").map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = Config::load(Some(&temp.path().join("absent.yml"))).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.yml");
        fs::write(&path, "default_minutes: 10\nchime:\n  enabled: false\n").expect("write");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.default_minutes, 10);
        assert!(!config.chime.enabled);
        assert_eq!(config.chime.frequency_hz, 880.0);
        assert_eq!(config.start_view, View::Home);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.yml");
        fs::write(&path, "default_minutes: [").expect("write");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn overrides_win() {
        let config = Config::default().apply(&Overrides {
            minutes: Some(3),
            no_sound: true,
            view: Some(View::Timer),
        });
        assert_eq!(config.default_minutes, 3);
        assert!(!config.chime.enabled);
        assert_eq!(config.start_view, View::Timer);
    }
}
