//! `wake.toml` loading.
//!
//! Every key is optional; anything left out falls back to the built-in
//! default. Example:
//!
//! ```toml
//! pin = 20
//! mac_address = "11:22:33:44:55:66"
//! interface = "wlan0"
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "wake.toml";

/// Directories searched, in order, when no `--config` path is given.
pub const SEARCH_DIRS: [&str; 2] = [".", "/etc/wake"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Contents of `wake.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Line offset on the GPIO chip (BCM numbering on a Raspberry Pi).
    #[serde(default = "default_pin")]
    pub pin: u32,
    /// Target MAC in colon-hex form.
    #[serde(default = "default_mac_address")]
    pub mac_address: String,
    /// Interface whose IPv4 address the broadcast is sent from.
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: PathBuf,
    /// UDP port of the broadcast. 9 and 7 are both common.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_pin() -> u32 {
    20
}
fn default_mac_address() -> String {
    "11:22:33:44:55:66".to_string()
}
fn default_interface() -> String {
    "wlan0".to_string()
}
fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}
fn default_port() -> u16 {
    crate::net::DEFAULT_PORT
}
fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            mac_address: default_mac_address(),
            interface: default_interface(),
            log_level: LogLevel::default(),
            gpio_chip: default_gpio_chip(),
            port: default_port(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Returns the first `wake.toml` found in `dirs`.
pub fn find_config_file<P: AsRef<Path>>(dirs: &[P]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.as_ref().join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Reads and parses the config file at `path`.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
