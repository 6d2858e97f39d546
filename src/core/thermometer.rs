//! DS18B20 thermometers on a w1 bus master.
//!
//! Each thermometer exposes a `w1_slave` file maintained by the kernel driver:
//!
//! ```text
//! <bus_master>/
//!   28-0000041481e8/
//!     w1_slave   <- "39 01 4b 46 7f ff 07 10 8d : crc=8d YES"
//!                   "39 01 4b 46 7f ff 07 10 8d t=19562"
//! ```
//!
//! The first line ends with the CRC verdict, the second with the temperature
//! in millidegrees Celsius behind a `t=` marker.

use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use tracing::trace;

use super::{error::ThermoError, temperature::Temperature, types::ThermoResult};

/// Serial prefix of every supported device, the family code in lowercase hex.
pub const DS18B20_PREFIX: &str = "28";

/// Name of the per-device reading file.
pub const TEMPERATURE_FILE: &str = "w1_slave";

const CRC_OK: &str = "YES";
const CRC_FAILED: &str = "NO";

/// Length of the `t=` marker in front of the millidegree value.
const TEMPERATURE_MARKER_LEN: usize = 2;

/// Measurement range of the DS18B20 in millidegrees Celsius.
pub const DS18B20_RANGE_MILLIS: RangeInclusive<i64> = -55_000..=125_000;

/// A DS18B20 attached to a bus master.
///
/// Nothing is cached: every call to [`read_celsius`](Self::read_celsius) or
/// [`read_fahrenheit`](Self::read_fahrenheit) re-reads the device file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thermometer {
    bus_master_path: PathBuf,
    serial: String,
}

impl Thermometer {
    /// Creates a thermometer handle after validating both inputs.
    ///
    /// # Errors
    ///
    /// * [`ThermoError::InvalidSerial`] if `serial` is not `28-<address>`.
    /// * [`ThermoError::BusPathNotFound`] if `bus_master_path` does not exist.
    pub fn new(bus_master_path: impl AsRef<Path>, serial: impl Into<String>) -> ThermoResult<Self> {
        let serial = serial.into();
        if !is_supported_serial(&serial) {
            return Err(ThermoError::InvalidSerial {
                serial,
                prefix: DS18B20_PREFIX,
            });
        }

        let bus_master_path = bus_master_path.as_ref();
        if !bus_master_path.exists() {
            return Err(ThermoError::BusPathNotFound {
                path: bus_master_path.display().to_string(),
            });
        }

        Ok(Thermometer {
            bus_master_path: bus_master_path.to_path_buf(),
            serial,
        })
    }

    /// The 1-wire serial, e.g. `28-0000041481e8`.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The bus master directory this thermometer hangs off.
    pub fn bus_master_path(&self) -> &Path {
        &self.bus_master_path
    }

    /// Path of the raw reading file for this device.
    pub fn reading_path(&self) -> PathBuf {
        self.bus_master_path.join(&self.serial).join(TEMPERATURE_FILE)
    }

    /// Current temperature in degrees Celsius.
    ///
    /// Precision is a thousandth of a degree; the sensor itself is only
    /// accurate to about ±0.5 °C.
    pub fn read_celsius(&self) -> ThermoResult<Temperature> {
        let path = self.reading_path();
        let content = fs::read_to_string(&path).map_err(|source| ThermoError::FileRead {
            path: path.display().to_string(),
            source,
        })?;

        let celsius = parse_reading(&self.serial, &content)?;
        trace!(serial = %self.serial, celsius = %celsius, "Read thermometer");
        Ok(celsius)
    }

    /// Current temperature in degrees Fahrenheit, rounded to three decimals.
    pub fn read_fahrenheit(&self) -> ThermoResult<Temperature> {
        Ok(self.read_celsius()?.celsius_to_fahrenheit())
    }
}

/// True when `serial` is `28-` followed by a non-empty hex address.
pub fn is_supported_serial(serial: &str) -> bool {
    serial
        .strip_prefix(DS18B20_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|address| {
            !address.is_empty() && address.bytes().all(|b| b.is_ascii_hexdigit())
        })
}

/// Parses the contents of a `w1_slave` file into degrees Celsius.
fn parse_reading(serial: &str, content: &str) -> ThermoResult<Temperature> {
    let bad_reading = |reason: String| ThermoError::TempReading {
        serial: serial.to_string(),
        reason,
    };

    let mut lines = content.lines();
    let crc = lines
        .next()
        .and_then(|line| line.split_whitespace().last())
        .ok_or_else(|| bad_reading("missing CRC line".to_string()))?;

    match crc {
        CRC_OK => {}
        CRC_FAILED => return Err(bad_reading("CRC check failed".to_string())),
        other => return Err(bad_reading(format!("unexpected CRC status '{}'", other))),
    }

    let token = lines
        .next()
        .and_then(|line| line.split_whitespace().last())
        .ok_or_else(|| bad_reading("missing temperature line".to_string()))?;

    let digits = token
        .get(TEMPERATURE_MARKER_LEN..)
        .filter(|digits| !digits.is_empty())
        .ok_or_else(|| bad_reading(format!("malformed temperature token '{}'", token)))?;

    let millis: i64 = digits
        .parse()
        .map_err(|_| bad_reading(format!("malformed temperature token '{}'", token)))?;

    if !DS18B20_RANGE_MILLIS.contains(&millis) {
        return Err(bad_reading(format!(
            "temperature token '{}' outside the sensor range",
            token
        )));
    }

    Ok(Temperature::from_millis(millis))
}
