//! Threshold cooling controller.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    bus::list_thermometers, device::DeviceInterface, error::ThermoError,
    temperature::Temperature, thermometer::Thermometer, types::ThermoResult,
};

/// What the controller wants the cooler to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerState {
    #[default]
    Off,
    Cooling,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Off => "OFF",
            ControllerState::Cooling => "COOLING",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cools whenever the bound thermometer reads above a maximum.
///
/// Each [`process`](Self::process) call recomputes the state from the latest
/// reading alone. The temperature band is carried for configuration parity
/// but not consulted, so there is no hysteresis around the threshold.
#[derive(Debug, Clone)]
pub struct TempController {
    thermometer: Thermometer,
    max_temp_f: Temperature,
    temp_band_f: Temperature,
    state: ControllerState,
    last_reading_f: Option<Temperature>,
}

impl TempController {
    pub fn new(thermometer: Thermometer, max_temp_f: Temperature) -> Self {
        TempController {
            thermometer,
            max_temp_f,
            temp_band_f: Temperature::ZERO,
            state: ControllerState::Off,
            last_reading_f: None,
        }
    }

    pub fn with_temp_band(mut self, temp_band_f: Temperature) -> Self {
        self.temp_band_f = temp_band_f;
        self
    }

    /// Builds a cooling controller bound to the last thermometer listed on the
    /// bus.
    ///
    /// # Errors
    ///
    /// Propagates enumeration errors and returns
    /// [`ThermoError::NoThermometers`] for an empty bus.
    pub fn simple_cooling(
        bus_master_path: impl AsRef<Path>,
        max_temp_f: Temperature,
        temp_band_f: Temperature,
    ) -> ThermoResult<Self> {
        let bus_master_path = bus_master_path.as_ref();
        let thermometer = list_thermometers(bus_master_path)?
            .pop()
            .ok_or_else(|| ThermoError::NoThermometers {
                path: bus_master_path.display().to_string(),
            })?;

        Ok(TempController::new(thermometer, max_temp_f).with_temp_band(temp_band_f))
    }

    /// Reads the thermometer and sets the state: cooling strictly above the
    /// maximum, off otherwise. A failed reading leaves the state untouched.
    #[instrument(skip(self), fields(serial = %self.thermometer.serial()))]
    pub fn process(&mut self) -> ThermoResult<ControllerState> {
        let current = self.thermometer.read_fahrenheit()?;

        self.state = if current > self.max_temp_f {
            ControllerState::Cooling
        } else {
            ControllerState::Off
        };
        self.last_reading_f = Some(current);

        debug!(
            "{} F against target {} F -> {}",
            current, self.max_temp_f, self.state
        );
        Ok(self.state)
    }

    /// Drives `device` from the current state.
    pub fn apply(&self, device: &mut dyn DeviceInterface) -> ThermoResult<()> {
        debug!("Applying {} to device '{}'", self.state, device.name());
        match self.state {
            ControllerState::Cooling => device.turn_on(),
            ControllerState::Off => device.turn_off(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn thermometer(&self) -> &Thermometer {
        &self.thermometer
    }

    pub fn max_temp_f(&self) -> Temperature {
        self.max_temp_f
    }

    pub fn temp_band_f(&self) -> Temperature {
        self.temp_band_f
    }

    /// Fahrenheit reading used by the last successful `process()`.
    pub fn last_reading_f(&self) -> Option<Temperature> {
        self.last_reading_f
    }
}
