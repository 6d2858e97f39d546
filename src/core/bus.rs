//! Enumeration of the thermometers on a w1 bus master.

use std::{fs, path::Path};

use tracing::{debug, instrument};

use super::{
    error::ThermoError,
    thermometer::{is_supported_serial, Thermometer},
    types::ThermoResult,
};

/// Bus master directory exposed by the w1 driver on a Raspberry Pi.
pub const RPI_BUS_PATH: &str = "/sys/devices/w1_bus_master1";

/// Name of the slave list file under the bus master directory.
pub const SLAVE_LIST_FILE: &str = "w1_master_slaves";

/// Lists the DS18B20 thermometers attached to `bus_master_path`.
///
/// Reads `w1_master_slaves`, one device identifier per line, and returns a
/// thermometer for every supported identifier in file order. Devices of other
/// families and blank lines are skipped. The list is read fresh on each call.
///
/// # Errors
///
/// Returns [`ThermoError::FileRead`] if the slave list cannot be read and
/// [`ThermoError::BusPathNotFound`] if the bus directory vanishes between the
/// read and the construction of a thermometer.
#[instrument(skip_all, fields(bus = %bus_master_path.as_ref().display()))]
pub fn list_thermometers(bus_master_path: impl AsRef<Path>) -> ThermoResult<Vec<Thermometer>> {
    let bus_master_path = bus_master_path.as_ref();
    let slaves_path = bus_master_path.join(SLAVE_LIST_FILE);

    let slaves = fs::read_to_string(&slaves_path).map_err(|source| ThermoError::FileRead {
        path: slaves_path.display().to_string(),
        source,
    })?;

    let mut thermometers = Vec::new();
    for slave in slaves.lines().map(str::trim).filter(|s| !s.is_empty()) {
        if !is_supported_serial(slave) {
            debug!("Skipping unsupported 1-wire device '{}'", slave);
            continue;
        }
        thermometers.push(Thermometer::new(bus_master_path, slave)?);
    }

    debug!("Found {} thermometer(s)", thermometers.len());
    Ok(thermometers)
}
