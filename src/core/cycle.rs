//! One pass over the bus: log every thermometer, then run the controller.
//!
//! A cycle is meant to be started by cron or a systemd timer and to finish
//! quickly. A thermometer that fails is logged and skipped so the others still
//! get recorded; the failures come back in the [`CycleReport`] so the binary
//! can exit non-zero.

use std::path::{Path, PathBuf};

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use super::{
    bus::list_thermometers,
    chain::LoggerChain,
    controller::{ControllerState, TempController},
    device::DeviceInterface,
    error::ThermoError,
    temperature::Temperature,
    thermometer::Thermometer,
    types::ThermoResult,
};

/// Controller settings for a cycle.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub max_temp_f: Temperature,
    pub temp_band_f: Temperature,
}

/// A thermometer or controller step that did not complete.
#[derive(Debug)]
pub struct CycleFailure {
    /// Serial of the thermometer involved, if one was.
    pub serial: Option<String>,
    pub error: ThermoError,
}

/// Outcome of [`PollCycle::run`].
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Thermometers found on the bus.
    pub thermometers: usize,
    /// Thermometers whose reading made it through the whole chain.
    pub logged: usize,
    /// State decided by the controller, if it ran.
    pub controller_state: Option<ControllerState>,
    pub failures: Vec<CycleFailure>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything one cycle needs, borrowed from the caller.
pub struct PollCycle<'a> {
    bus_master_path: PathBuf,
    chain: &'a LoggerChain,
    device: &'a mut dyn DeviceInterface,
    settings: ControllerSettings,
}

impl<'a> PollCycle<'a> {
    pub fn new(
        bus_master_path: impl AsRef<Path>,
        chain: &'a LoggerChain,
        device: &'a mut dyn DeviceInterface,
        settings: ControllerSettings,
    ) -> Self {
        PollCycle {
            bus_master_path: bus_master_path.as_ref().to_path_buf(),
            chain,
            device,
            settings,
        }
    }

    /// Runs the cycle.
    ///
    /// # Errors
    ///
    /// Only enumeration failures abort the cycle. Everything after that is
    /// collected in the report.
    #[instrument(skip_all, fields(bus = %self.bus_master_path.display()))]
    pub fn run(&mut self) -> ThermoResult<CycleReport> {
        let thermometers = list_thermometers(&self.bus_master_path)?;
        let mut report = CycleReport {
            thermometers: thermometers.len(),
            ..Default::default()
        };

        for thermometer in &thermometers {
            match self.chain.log_temperature(thermometer) {
                Ok(()) => report.logged += 1,
                Err(e) => {
                    error!("Failed to log thermometer '{}': {}", thermometer.serial(), e);
                    report.failures.push(CycleFailure {
                        serial: Some(thermometer.serial().to_string()),
                        error: e,
                    });
                }
            }
        }

        // The controller follows the last thermometer on the bus.
        match thermometers.last() {
            Some(thermometer) => {
                if let Err((serial, e)) = self.run_controller(thermometer, &mut report) {
                    error!("Controller for '{}' failed: {}", serial, e);
                    report.failures.push(CycleFailure {
                        serial: Some(serial),
                        error: e,
                    });
                }
            }
            None => warn!("No thermometers on the bus, controller skipped"),
        }

        info!(
            "Cycle finished: {}/{} thermometer(s) logged, {} failure(s)",
            report.logged,
            report.thermometers,
            report.failures.len()
        );
        Ok(report)
    }

    fn run_controller(
        &mut self,
        thermometer: &Thermometer,
        report: &mut CycleReport,
    ) -> Result<(), (String, ThermoError)> {
        let serial = thermometer.serial().to_string();
        let mut controller = TempController::new(thermometer.clone(), self.settings.max_temp_f)
            .with_temp_band(self.settings.temp_band_f);

        let state = controller.process().map_err(|e| (serial.clone(), e))?;
        report.controller_state = Some(state);

        self.chain
            .log_controller_state(&controller)
            .map_err(|e| (serial.clone(), e))?;
        controller.apply(&mut *self.device).map_err(|e| (serial, e))
    }
}

const DISPLAY_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// `[2024-05-01 18:30:00] 28-0000041481e8: 67.2° F`
pub fn display_line(at: OffsetDateTime, serial: &str, fahrenheit: Temperature) -> String {
    let stamp = at
        .format(DISPLAY_TIME_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("[{}] {}: {}° F", stamp, serial, fahrenheit.round_to(1))
}

/// Reads every thermometer once and renders a [`display_line`] for each.
///
/// A failing thermometer is traced and left out; the bus itself failing is an
/// error.
pub fn display_pass(bus_master_path: impl AsRef<Path>, at: OffsetDateTime) -> ThermoResult<Vec<String>> {
    let mut lines = Vec::new();
    for thermometer in list_thermometers(bus_master_path)? {
        match thermometer.read_fahrenheit() {
            Ok(f) => lines.push(display_line(at, thermometer.serial(), f)),
            Err(e) => error!("Failed to read '{}': {}", thermometer.serial(), e),
        }
    }
    Ok(lines)
}
