//! Configuration structures for thermometer acquisition, storage and control.
//!
//! Temperatures are written as TOML strings (`max_temp_f = "68.0"`) and parsed
//! into the fixed-point [`Temperature`] type, so a threshold never passes
//! through a binary float.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::{
    bus::RPI_BUS_PATH, chain::FailurePolicy, cycle::ControllerSettings, device::DeviceKind,
    temperature::Temperature,
};

/// Production bus master and text log channel.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ThermoConfig {
    /// Directory of the w1 bus master, normally under `/sys/devices`.
    #[validate(custom(function = "validate_path"))]
    pub bus_master_path: PathBuf,

    /// Channel name attached to every text log line.
    #[validate(length(min = 1, message = "Channel name must not be empty"))]
    pub channel: String,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        ThermoConfig {
            bus_master_path: PathBuf::from(RPI_BUS_PATH),
            channel: "fermbotThermoApp".to_string(),
        }
    }
}

/// SQLite sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; the parent directory is created on first use.
    #[validate(custom(function = "validate_path"))]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database_path: PathBuf::from("/var/lib/fermbot/fermbot_thermo.db"),
        }
    }
}

/// Paths and channel used instead of the production ones when `enabled`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,

    #[validate(custom(function = "validate_path"))]
    pub bus_master_path: PathBuf,

    #[validate(length(min = 1, message = "Channel name must not be empty"))]
    pub channel: String,

    #[validate(custom(function = "validate_path"))]
    pub database_path: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        DebugConfig {
            enabled: false,
            bus_master_path: PathBuf::from("tests/data/thermo/dual_thermo_bus_master"),
            channel: "fermbotThermoDebug".to_string(),
            database_path: PathBuf::from("test.db"),
        }
    }
}

/// Cooling controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ControllerConfig {
    /// Cooling starts strictly above this temperature (°F).
    pub max_temp_f: Temperature,

    /// Hysteresis band (°F). Kept in the file format; the controller does not
    /// use it.
    #[validate(custom(function = "validate_non_negative"))]
    pub temp_band_f: Temperature,

    /// Actuator constructed at start-up.
    pub device: DeviceKind,
}

impl ControllerConfig {
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            max_temp_f: self.max_temp_f,
            temp_band_f: self.temp_band_f,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            max_temp_f: Temperature::from_degrees(68),
            temp_band_f: Temperature::from_degrees(1),
            device: DeviceKind::default(),
        }
    }
}

/// Logging chain behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// What to do when a sink fails.
    pub failure_policy: FailurePolicy,
}

/// Display loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DisplayConfig {
    /// Seconds between two passes. Must be at least 1.
    #[validate(range(min = 1, message = "Display interval must be at least 1 second"))]
    pub interval_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig { interval_secs: 5 }
    }
}

fn validate_path(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        let mut err = ValidationError::new("empty_path");
        err.message = Some("Path must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(value: &Temperature) -> Result<(), ValidationError> {
    if *value < Temperature::ZERO {
        let mut err = ValidationError::new("negative_temperature_band");
        err.message = Some(format!("Temperature band must not be negative: {}", value).into());
        return Err(err);
    }
    Ok(())
}
