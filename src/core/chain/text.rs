//! Human-readable text log sink.
//!
//! Lines go out as `tracing` events on the [`THERMO_LOG_TARGET`] target,
//! tagged with the sink's channel name. Where they land (console, journald,
//! the text log file) is decided by the logger set up in
//! [`LoggerManager`](crate::logger::LoggerManager).

use tracing::info;

use super::{ControllerSnapshot, TemperaturePoint, ThermoSink};
use crate::core::types::ThermoResult;

/// Target of every event emitted by [`TextSink`].
pub const THERMO_LOG_TARGET: &str = "fermbot::thermo";

/// Writes one line per event through a named logging channel.
#[derive(Debug, Clone)]
pub struct TextSink {
    channel: String,
}

impl TextSink {
    pub fn new(channel: impl Into<String>) -> Self {
        TextSink {
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// `28-0000041481e8 at 67.2° F`
pub fn temperature_line(point: &TemperaturePoint) -> String {
    format!("{} at {}° F", point.serial, point.fahrenheit.round_to(1))
}

/// `TempController 28-0000041481e8 at 67.212 F, target is 68.000 F so TC is OFF`
pub fn controller_line(snapshot: &ControllerSnapshot) -> String {
    let current = snapshot
        .current_f
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "TempController {} at {} F, target is {} F so TC is {}",
        snapshot.serial, current, snapshot.max_temp_f, snapshot.state
    )
}

impl ThermoSink for TextSink {
    fn name(&self) -> &'static str {
        "text"
    }

    fn log_temperature(&self, point: &TemperaturePoint) -> ThermoResult<()> {
        info!(target: THERMO_LOG_TARGET, channel = %self.channel, "{}", temperature_line(point));
        Ok(())
    }

    fn log_controller_state(&self, snapshot: &ControllerSnapshot) -> ThermoResult<()> {
        info!(target: THERMO_LOG_TARGET, channel = %self.channel, "{}", controller_line(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use tracing_test::traced_test;

    use super::*;
    use crate::core::{
        chain::LoggerChain,
        controller::{ControllerState, TempController},
        temperature::Temperature,
        test_support::fixture,
        thermometer::Thermometer,
    };

    fn point(millis: i64) -> TemperaturePoint {
        let celsius = Temperature::from_millis(millis);
        TemperaturePoint {
            serial: "28-0000041481e8".into(),
            celsius,
            fahrenheit: celsius.celsius_to_fahrenheit(),
            recorded_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_temperature_line() {
        assert_eq!(temperature_line(&point(19562)), "28-0000041481e8 at 67.2° F");
        assert_eq!(temperature_line(&point(18125)), "28-0000041481e8 at 64.6° F");
        assert_eq!(temperature_line(&point(-20000)), "28-0000041481e8 at -4.0° F");
    }

    #[test]
    fn test_controller_line() {
        let snapshot = ControllerSnapshot {
            serial: "28-0000041462fa".into(),
            current_f: Some("64.625".parse().unwrap()),
            max_temp_f: "68.0".parse().unwrap(),
            state: ControllerState::Off,
        };
        assert_eq!(
            controller_line(&snapshot),
            "TempController 28-0000041462fa at 64.625 F, target is 68.000 F so TC is OFF"
        );

        let unprocessed = ControllerSnapshot {
            current_f: None,
            state: ControllerState::Off,
            ..snapshot
        };
        assert!(controller_line(&unprocessed).contains("at unknown F"));
    }

    #[test]
    #[traced_test]
    fn test_text_sink_logs_reading() {
        let chain = LoggerChain::new(TextSink::new("fermbotThermoDebug"));
        let thermo =
            Thermometer::new(fixture("single_thermo_bus_master"), "28-0000041481e8").unwrap();

        chain.log_temperature(&thermo).unwrap();

        assert!(logs_contain("28-0000041481e8 at 67.2° F"));
        assert!(logs_contain("fermbotThermoDebug"));
    }

    #[test]
    #[traced_test]
    fn test_text_sink_logs_controller() {
        let chain = LoggerChain::new(TextSink::new("fermbotThermoDebug"));
        let mut controller = TempController::new(
            Thermometer::new(fixture("single_thermo_bus_master"), "28-0000041481e8").unwrap(),
            "60.0".parse().unwrap(),
        );
        controller.process().unwrap();

        chain.log_controller_state(&controller).unwrap();

        assert!(logs_contain(
            "TempController 28-0000041481e8 at 67.212 F, target is 60.000 F so TC is COOLING"
        ));
    }

    #[test]
    fn test_channel_name() {
        let sink = TextSink::new("fermbotThermoApp");
        assert_eq!(sink.channel(), "fermbotThermoApp");
        assert_eq!(sink.name(), "text");
    }
}
