//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/waiq/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/waiq/` (~/.config/waiq/)
//! - Data: `$XDG_DATA_HOME/waiq/` (~/.local/share/waiq/)
//! - State/Logs: `$XDG_STATE_HOME/waiq/` (~/.local/state/waiq/)

use crate::error::{Error, Result};
use crate::platform::Permission;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Notification capture configuration
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Device capabilities granted to the engine
    #[serde(default)]
    pub permissions: Permissions,

    /// Storage location overrides
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Notification capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// Package identifier of this application; its own notifications are never captured
    #[serde(default = "default_own_package")]
    pub own_package: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            own_package: default_own_package(),
        }
    }
}

fn default_own_package() -> String {
    "com.example.waiq".to_string()
}

/// Device capabilities granted to the engine.
///
/// A missing grant never surfaces as an error to the consumer; the affected
/// reads simply report no data.
#[derive(Debug, Deserialize, Clone)]
pub struct Permissions {
    #[serde(default = "granted")]
    pub read_sms: bool,
    #[serde(default = "granted")]
    pub read_contacts: bool,
    #[serde(default = "granted")]
    pub location: bool,
    #[serde(default = "granted")]
    pub wifi: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            read_sms: true,
            read_contacts: true,
            location: true,
            wifi: true,
        }
    }
}

fn granted() -> bool {
    true
}

impl Permissions {
    /// Permission set with nothing granted
    pub fn none() -> Self {
        Self {
            read_sms: false,
            read_contacts: false,
            location: false,
            wifi: false,
        }
    }

    /// Whether the given capability is granted
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::ReadSms => self.read_sms,
            Permission::ReadContacts => self.read_contacts,
            Permission::Location => self.location,
            Permission::Wifi => self.wifi,
        }
    }

    /// Fails with [`Error::PermissionDenied`] unless the capability is granted
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(permission))
        }
    }
}

/// Storage location overrides
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Database file to use instead of the XDG default
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        if config.capture.own_package.trim().is_empty() {
            return Err(Error::Config(
                "capture.own_package must not be empty".to_string(),
            ));
        }

        Ok(config)
    }

    /// Database file for this configuration (override or XDG default)
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/waiq/config.toml` (~/.config/waiq/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("waiq").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/waiq/` (~/.local/share/waiq/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("waiq")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/waiq/` (~/.local/state/waiq/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("waiq")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/waiq/data.db` (~/.local/share/waiq/data.db)
    pub fn default_database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/waiq/waiq.log` (~/.local/state/waiq/waiq.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("waiq.log")
    }
}
