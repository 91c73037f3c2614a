use std::{fs::read_to_string, path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, Result};
use colored::Colorize;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Global configuration values
///
/// Slotwatch's configuration is stored in a TOML file in the current user's
/// config directory, which is `~/.config/slotwatch/config.toml` by default.
///
/// A config can be loaded from a file with [`Config::load`].
/// You can also use [`Config::init`] to create a default config file if one
/// does not exist at the given path.
///
/// ## File Format
///
/// The configuration file is written as a TOML file.
/// Every field is optional and falls back to its default.
/// Durations are serialized as an integer count of seconds.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// File holding the persisted snapshot of every timer
    ///
    /// Default location is the user's state directory,
    /// which is usually `~/.local/state/slotwatch/board.json`.
    #[serde(default = "default_state_path")]
    pub state_file_path: PathBuf,
    /// Directory to find hook executables
    ///
    /// Default is a directory called `hooks` inside the config directory.
    #[serde(default = "default_hooks_directory")]
    pub hooks_directory: PathBuf,
    /// Number of timers on the board, numbered from 1
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,
    /// Number of timers per row on the display
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Duration given to a slot that has no persisted state
    ///
    /// Default is 5405 seconds.
    #[serde(default = "default_initial_duration", with = "crate::time::duration::seconds")]
    pub initial_duration: Duration,
    /// Duration a slot returns to when it is reset
    ///
    /// Default is 90 minutes (5400 seconds).
    #[serde(default = "default_reset_duration", with = "crate::time::duration::seconds")]
    pub reset_duration: Duration,
    /// Remaining time at or below which a running slot shows a warning
    ///
    /// Default is 20 minutes (1200 seconds).
    #[serde(default = "default_warning_threshold", with = "crate::time::duration::seconds")]
    pub warning_threshold: Duration,
    /// Remaining time at or below which a slot counts as near expiry
    ///
    /// Default is 10 minutes (600 seconds).
    #[serde(default = "default_near_expiry_threshold", with = "crate::time::duration::seconds")]
    pub near_expiry_threshold: Duration,
    /// How often the whole board is written to the state file
    ///
    /// Default is 5 minutes (300 seconds).
    #[serde(default = "default_save_interval", with = "crate::time::duration::seconds")]
    pub save_interval: Duration,
}

impl Config {
    /// Returns the config at the given path, creating a default config file if one does not exist
    pub fn init(config_path: &Path) -> Result<Self> {
        if let Some(conf) = Config::load(config_path)? {
            Ok(conf)
        } else {
            let conf = Config::default();

            println!(
                "Creating config file at {}",
                config_path.display().to_string().cyan()
            );

            conf.save(config_path)?;

            Ok(conf)
        }
    }

    /// Reads a TOML config file
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.try_exists()? {
            return Ok(None);
        }

        let config_str = read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| "Failed to parse config from TOML")?;

        Ok(Some(config))
    }

    /// Write this config file to the filesystem
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string(&self)
            .with_context(|| "Unable to format config as TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create config directory {}", parent.display()))?;
        }

        std::fs::write(path, toml)
            .with_context(|| format!("Unable to write config TOML to path {}", path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file_path: default_state_path(),
            hooks_directory: default_hooks_directory(),
            slot_count: default_slot_count(),
            columns: default_columns(),
            initial_duration: default_initial_duration(),
            reset_duration: default_reset_duration(),
            warning_threshold: default_warning_threshold(),
            near_expiry_threshold: default_near_expiry_threshold(),
            save_interval: default_save_interval(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "Slotwatch", "Slotwatch")
}

/// Get the default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    let conf_path = project_dirs()
        .with_context(|| "Unable to determine XDG directories")?
        .config_dir()
        .join("config.toml");

    Ok(conf_path)
}

fn default_state_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs
            .state_dir()
            .unwrap_or_else(|| dirs.data_dir())
            .join("board.json"),
        None => PathBuf::from("board.json"),
    }
}

fn default_hooks_directory() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("hooks"),
        None => PathBuf::from("hooks"),
    }
}

fn default_slot_count() -> u32 {
    50
}

fn default_columns() -> usize {
    10
}

fn default_initial_duration() -> Duration {
    Duration::from_secs(5405)
}

fn default_reset_duration() -> Duration {
    Duration::from_secs(90 * 60)
}

fn default_warning_threshold() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_near_expiry_threshold() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_save_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::config::Config;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.slot_count, 50);
        assert_eq!(config.initial_duration, Duration::from_secs(5405));
        assert_eq!(config.reset_duration, Duration::from_secs(5400));
    }

    #[test]
    fn durations_are_seconds() {
        let config: Config = toml::from_str(
            r#"
            slot_count = 12
            warning_threshold = 300
            save_interval = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.slot_count, 12);
        assert_eq!(config.warning_threshold, Duration::from_secs(300));
        assert_eq!(config.save_interval, Duration::from_secs(60));
        assert_eq!(config.near_expiry_threshold, Duration::from_secs(600));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result: Result<Config, _> = toml::from_str("save_interval = 0");

        assert!(result.is_err());
    }

    #[test]
    fn init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::init(&path).unwrap();

        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap(), Some(config));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(Config::load(&dir.path().join("config.toml")).unwrap(), None);
    }
}
