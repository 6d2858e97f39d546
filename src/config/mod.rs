//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure that aggregates
//! logging, thermometer, storage and controller settings. It handles loading
//! from TOML files, validation, and the debug/production switch that decides
//! which bus master, logging channel and database a run uses.
//!
//! The configuration is loaded early in the application lifecycle and is
//! intended to remain immutable thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{
    logger::LoggerConfig,
    thermo::{ChainConfig, ControllerConfig, DebugConfig, DisplayConfig, StorageConfig, ThermoConfig},
};

pub mod logger;
pub mod thermo;

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::now_stamp()).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::now_stamp()).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::now_stamp()).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Current UTC time for the early-boot print macros.
#[doc(hidden)]
pub fn now_stamp() -> String {
    let format = time::macros::format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    let now = time::OffsetDateTime::now_utc();
    now.format(format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "FERMBOT_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fermbot/config.toml";

/// Errors that can occur during configuration loading, parsing, validation,
/// or serialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failure during serialization (e.g., when saving a configuration file).
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Debug switch and the paths used while it is on.
    #[validate(nested)]
    pub debug: DebugConfig,

    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Production bus master and text log channel.
    #[validate(nested)]
    pub thermo: ThermoConfig,

    /// SQLite sink settings.
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Cooling controller settings.
    #[validate(nested)]
    pub controller: ControllerConfig,

    /// Logging chain behaviour.
    pub chain: ChainConfig,

    /// Display loop settings.
    #[validate(nested)]
    pub display: DisplayConfig,
}

impl Config {
    /// Constructs a new configuration by locating and loading the config file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration file cannot be found,
    /// read, parsed, or validated.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load(&config_path)
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `FERMBOT_CONFIG` environment variable
    /// 2. `/etc/fermbot/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Config` if no suitable file is found.
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Ok(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::Config(format!(
            "No configuration file found. Set {} or create {}",
            CONFIG_ENV, DEFAULT_CONFIG_PATH
        )))
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config_str = fs::read_to_string(path)?;
        let config = Self::from_toml(&config_str)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(config_str: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }

    /// Bus master to read: the debug fixture when debugging, sysfs otherwise.
    pub fn bus_master_path(&self) -> &Path {
        if self.debug.enabled {
            &self.debug.bus_master_path
        } else {
            &self.thermo.bus_master_path
        }
    }

    /// Channel name the text sink logs under.
    pub fn channel(&self) -> &str {
        if self.debug.enabled {
            &self.debug.channel
        } else {
            &self.thermo.channel
        }
    }

    /// SQLite database file.
    pub fn database_path(&self) -> &Path {
        if self.debug.enabled {
            &self.debug.database_path
        } else {
            &self.storage.database_path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{chain::FailurePolicy, device::DeviceKind, temperature::Temperature};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bus_master_path(), Path::new("/sys/devices/w1_bus_master1"));
        assert_eq!(config.channel(), "fermbotThermoApp");
        assert_eq!(
            config.database_path(),
            Path::new("/var/lib/fermbot/fermbot_thermo.db")
        );
        assert_eq!(config.controller.max_temp_f, Temperature::from_degrees(68));
        assert_eq!(config.controller.temp_band_f, Temperature::from_degrees(1));
    }

    #[test]
    fn test_debug_switch_selects_debug_paths() {
        let config = Config::from_toml(
            r#"
            [debug]
            enabled = true
            bus_master_path = "tests/data/thermo/dual_thermo_bus_master"
            channel = "fermbotThermoDebug"
            database_path = "test.db"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.bus_master_path(),
            Path::new("tests/data/thermo/dual_thermo_bus_master")
        );
        assert_eq!(config.channel(), "fermbotThermoDebug");
        assert_eq!(config.database_path(), Path::new("test.db"));
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [logger]
            level = "debug"

            [logger.file]
            enabled = true
            path = "/var/log/fermbot/fermbot_thermo.log"

            [thermo]
            bus_master_path = "/sys/devices/w1_bus_master2"
            channel = "cellar"

            [storage]
            database_path = "/srv/fermbot/thermo.db"

            [controller]
            max_temp_f = "65.5"
            temp_band_f = "0.5"
            device = "mock"

            [chain]
            failure_policy = "continue"

            [display]
            interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.logger.level, "debug");
        assert!(config.logger.file.as_ref().is_some_and(|f| f.enabled));
        assert_eq!(config.bus_master_path(), Path::new("/sys/devices/w1_bus_master2"));
        assert_eq!(config.channel(), "cellar");
        assert_eq!(config.controller.max_temp_f, "65.5".parse().unwrap());
        assert_eq!(config.controller.device, DeviceKind::Mock);
        assert_eq!(config.chain.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.display.interval_secs, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_toml("[logger]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::from_toml("[thermo]\nchannel = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::from_toml("[controller]\ntemp_band_f = \"-1.0\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::from_toml("[display]\ninterval_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::from_toml("[controller]\nmax_temp_f = \"warm\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.controller.max_temp_f, config.controller.max_temp_f);
        assert_eq!(back.channel(), config.channel());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[controller]\nmax_temp_f = \"70\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.controller.max_temp_f, Temperature::from_degrees(70));
    }
}
