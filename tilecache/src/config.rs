//! Configuration file handling.
//!
//! Settings live in an INI file at `<config dir>/tilecache/config.ini`:
//!
//! ```ini
//! [cache]
//! directory = /home/user/.cache/tilecache
//! tag = tiles
//!
//! [logging]
//! directory = /home/user/.cache/tilecache/logs
//! level = info
//! ```
//!
//! Every key is optional; missing keys and a missing file fall back to the
//! defaults below.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::cache::TileTag;

/// Application directory name under the platform config/cache dirs.
pub const APP_DIR: &str = "tilecache";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default namespace tag for CLI-created providers.
pub const DEFAULT_TAG: &str = "tiles";

/// Default log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid INI.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A key holds a value of the wrong shape.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Cache settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    /// Root directory of the disk store.
    pub directory: PathBuf,

    /// Namespace tag for entries.
    pub tag: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            tag: DEFAULT_TAG.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for the log file; `None` logs to stderr only.
    pub directory: Option<PathBuf>,

    /// Default level filter, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, using defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: parse.to_string(),
            },
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(dir) = section.get("directory") {
                config.cache.directory = expand_tilde(dir);
            }
            if let Some(tag) = section.get("tag") {
                let tag = tag.trim();
                TileTag::new(tag).map_err(|_| ConfigError::InvalidValue {
                    key: "cache.tag".to_string(),
                    value: tag.to_string(),
                })?;
                config.cache.tag = tag.to_string();
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(dir) = section.get("directory") {
                let dir = dir.trim();
                config.logging.directory = (!dir.is_empty()).then(|| expand_tilde(dir));
            }
            if let Some(level) = section.get("level") {
                config.logging.level = level.trim().to_string();
            }
        }

        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.to_string_lossy())
            .set("tag", self.cache.tag.as_str());
        ini.with_section(Some("logging"))
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|dir| dir.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
            .set("level", self.logging.level.as_str());

        ini.write_to_file(path)?;
        Ok(())
    }
}

/// Location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

/// Default disk store location.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
