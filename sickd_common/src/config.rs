//! Daemon configuration: the `sickd.toml` tables and their loader.
//!
//! `[shared]` holds what every program of the workspace reads, `[daemon]`
//! the event loop and region settings, and `[[devices]]` one entry per
//! attached sensor. Missing tables fall back to the stock single-sensor
//! setup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sickd_common::config::{ConfigError, ConfigLoader, SickdConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SickdConfig::load(Path::new("/etc/sickd/sickd.toml"))?;
//!     config.validate()?;
//!     for device in &config.devices {
//!         println!("{} on {}", device.compatible, device.port);
//!     }
//!     Ok(())
//! }
//! ```

use crate::scan::RangeUnit;
use crate::shm::consts::SICKD_SHMEM_KEY;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sickd/sickd.toml";

/// Default serial port of a sensor.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default serial line speed. The PLS family powers up at 9600 baud.
pub const DEFAULT_BAUDRATE: u32 = 9600;

/// Default event loop wait, in milliseconds.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// Default device compatible string.
pub const DEFAULT_COMPATIBLE: &str = "pls201";

/// Line speeds the sensor family can be switched to.
pub const SUPPORTED_BAUDRATES: [u32; 4] = [9600, 19200, 38400, 500_000];

/// Why a configuration could not be used.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("configuration file not found")]
    FileNotFound,

    /// The file could not be read or is not valid TOML for these tables.
    #[error("cannot parse configuration: {0}")]
    ParseError(String),

    /// The values parse but cannot work together.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Default tracing level, written in lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every byte-level decision
    Trace,
    /// Resyncs, ignored telegrams, missed updates
    Debug,
    /// Start up, shutdown, sensor identification
    #[default]
    Info,
    /// Dropped payloads
    Warn,
    /// Fatal faults only
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across the sickd programs.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "sickd"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default tracing level, `RUST_LOG` overrides it.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name the program logs under.
    pub service_name: String,
}

impl SharedConfig {
    /// Check the common settings.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` for an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: "sickd".to_string(),
        }
    }
}

/// Event loop and shared region settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Upper bound of one readiness wait, in milliseconds.
    pub poll_timeout_ms: u64,

    /// Key of the shared scan region.
    pub shm_key: u32,
}

impl DaemonConfig {
    /// Readiness wait as a `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            shm_key: SICKD_SHMEM_KEY,
        }
    }
}

/// One sensor attached to a serial port.
///
/// # TOML Example
///
/// ```toml
/// [[devices]]
/// compatible = "pls201"
/// port = "/dev/ttyUSB0"
/// baudrate = 9600
/// range_unit = "centimeters"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Identifier matched against the driver id tables.
    pub compatible: String,

    /// Serial port path.
    #[serde(default = "default_port")]
    pub port: String,

    /// Serial line speed.
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,

    /// Unit the sensor was set up to report ranges in.
    #[serde(default)]
    pub range_unit: RangeUnit,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            compatible: DEFAULT_COMPATIBLE.to_string(),
            port: default_port(),
            baudrate: default_baudrate(),
            range_unit: RangeUnit::default(),
        }
    }
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_baudrate() -> u32 {
    DEFAULT_BAUDRATE
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SickdConfig {
    /// Common settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Event loop and shared region settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Attached sensors.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl SickdConfig {
    /// Check that the daemon can start with this configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` when:
    /// - `service_name` is empty
    /// - no device is configured
    /// - `poll_timeout_ms` is zero
    /// - a device has an empty port, empty compatible or unsupported baud rate
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.devices.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one device must be configured".to_string(),
            ));
        }

        if self.daemon.poll_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for (idx, device) in self.devices.iter().enumerate() {
            if device.compatible.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "device {idx}: compatible cannot be empty"
                )));
            }
            if device.port.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "device {idx}: port cannot be empty"
                )));
            }
            if !SUPPORTED_BAUDRATES.contains(&device.baudrate) {
                return Err(ConfigError::ValidationError(format!(
                    "device {idx}: unsupported baudrate {} (expected one of {:?})",
                    device.baudrate, SUPPORTED_BAUDRATES
                )));
            }
        }

        Ok(())
    }
}

impl Default for SickdConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            daemon: DaemonConfig::default(),
            devices: vec![DeviceConfig::default()],
        }
    }
}

/// Reads any deserializable configuration type from a TOML file.
///
/// A missing file is `ConfigError::FileNotFound`; unreadable or malformed
/// content is `ConfigError::ParseError`. Validation is left to the caller.
pub trait ConfigLoader: Sized + DeserializeOwned {
    /// Read and parse `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ParseError(format!("{}: {err}", path.display())),
        })?;

        toml::from_str(&text)
            .map_err(|err| ConfigError::ParseError(format!("{}: {err}", path.display())))
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}
