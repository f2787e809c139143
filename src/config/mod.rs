// Configuration management for Soundmand
// Handles loading/saving settings, writes sensible defaults on first run

use crate::error::{Result, SoundError};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Launchers reference the full executable path and save next to it
    pub portable_mode: bool,
    /// Adds .ogg to the supported formats (plays without volume control)
    pub ogg_support: bool,
    pub save_path: PathBuf,
    /// Clips must be strictly shorter than this many seconds
    pub max_duration: u64,
    /// 0-100, anything outside is clamped when converted
    pub volume: i32,
    /// -1 is the system default output
    pub device: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portable_mode: false,
            ogg_support: false,
            save_path: dirs::document_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Soundmand"),
            max_duration: 35,
            volume: 100,
            device: -1,
        }
    }
}

/// What happened when the config was looked up
#[derive(Debug)]
pub enum ConfigLoad {
    Loaded(Config),
    /// No file existed, defaults were written to this path
    Initialized(PathBuf),
}

impl Config {
    pub fn load() -> Result<ConfigLoad> {
        Self::load_or_init(&Self::config_path()?)
    }

    pub fn load_or_init(config_path: &Path) -> Result<ConfigLoad> {
        if config_path.exists() {
            Self::load_from(config_path).map(ConfigLoad::Loaded)
        } else {
            Config::default().save_to(config_path)?;
            Ok(ConfigLoad::Initialized(config_path.to_path_buf()))
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .map_err(|e| SoundError::Config(format!("{}: {}", config_path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| SoundError::Config(format!("{}: {}", config_path.display(), e)))
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SoundError::Config(e.to_string()))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| SoundError::Config(e.to_string()))?;
        fs::write(config_path, content).map_err(|e| SoundError::Config(e.to_string()))?;

        Ok(())
    }

    /// Default volume as a 0.0-1.0 scalar
    pub fn volume_scalar(&self) -> f32 {
        volume_to_scalar(self.volume)
    }

    /// A config next to the executable wins, so portable installs carry their own settings
    pub fn config_path() -> Result<PathBuf> {
        if let Some(beside_exe) = exe_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
            if beside_exe.exists() {
                return Ok(beside_exe);
            }
        }

        let config_dir = config_dir()
            .ok_or_else(|| SoundError::Config("Could not find config directory".to_string()))?
            .join("soundmand");

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Where logs go - alongside whichever config file is in use
    pub fn log_dir() -> PathBuf {
        Self::config_path()
            .ok()
            .and_then(|p| p.parent().map(|dir| dir.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

/// Convert a 0-100 percentage into the scalar the player uses
pub fn volume_to_scalar(percent: i32) -> f32 {
    (percent.clamp(0, 100) as f32) / 100.0
}

pub fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_first_run() {
        let config = Config::default();
        assert!(!config.portable_mode);
        assert!(!config.ogg_support);
        assert_eq!(config.max_duration, 35);
        assert_eq!(config.volume, 100);
        assert_eq!(config.device, -1);
        assert!(config.save_path.ends_with("Soundmand"));
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        match Config::load_or_init(&path).unwrap() {
            ConfigLoad::Initialized(written) => assert_eq!(written, path),
            other => panic!("expected a fresh config, got {:?}", other),
        }
        assert!(path.exists());

        match Config::load_or_init(&path).unwrap() {
            ConfigLoad::Loaded(config) => assert_eq!(config, Config::default()),
            other => panic!("expected the saved config, got {:?}", other),
        }
    }

    #[test]
    fn test_kebab_case_keys_and_partial_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "ogg-support = true\nmax-duration = 10\ndevice = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.ogg_support);
        assert_eq!(config.max_duration, 10);
        assert_eq!(config.device, 2);
        // keys left out keep their defaults
        assert_eq!(config.volume, 100);
        assert!(!config.portable_mode);

        let saved = toml::to_string_pretty(&config).unwrap();
        assert!(saved.contains("portable-mode"));
        assert!(saved.contains("save-path"));
    }

    #[test]
    fn test_garbage_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "volume = \"loud\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(SoundError::Config(_))));
    }

    #[test]
    fn test_volume_scalar_clamps() {
        assert_eq!(volume_to_scalar(50), 0.5);
        assert_eq!(volume_to_scalar(250), 1.0);
        let config = Config {
            volume: 100,
            ..Config::default()
        };
        assert_eq!(config.volume_scalar(), 1.0);
        assert_eq!(volume_to_scalar(-5), 0.0);
    }

    #[test]
    fn test_out_of_range_volume_loads_and_clamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "volume = 300\n").unwrap();
        let loud = Config::load_from(&path).unwrap();
        assert_eq!(loud.volume, 300);
        assert_eq!(loud.volume_scalar(), 1.0);

        fs::write(&path, "volume = -5\n").unwrap();
        let muted = Config::load_from(&path).unwrap();
        assert_eq!(muted.volume, -5);
        assert_eq!(muted.volume_scalar(), 0.0);
    }
}
