//! Centralized logging configuration and initialization manager.
//!
//! The `LoggerManager` validates logging configuration and initializes
//! the global `tracing` subscriber with layers for console output, the
//! append-only text log file, and systemd journald. The text log is where the
//! thermometer and controller lines written by
//! [`TextSink`](crate::core::chain::TextSink) end up on disk.

use std::{fs::OpenOptions, io, sync::Mutex};

use thiserror::Error;
use tracing::{instrument, Level};
use tracing_subscriber::{
    filter::Targets, fmt, fmt::format::FmtSpan, prelude::*, EnvFilter, Layer, Registry,
};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig},
    core::chain::text::THERMO_LOG_TARGET,
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// General initialization failure with a descriptive message.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),

    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically while opening the log file or the journald socket.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald logger failed to initialize while console output is enabled.
    #[error(
        "Failed to initialize journald logger, and console logger is enabled. Please check your configuration."
    )]
    JournaldFailedWithConsoleEnabled,
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Initializes the global `tracing` subscriber with configured layers.
    ///
    /// Must be called once at application startup before any tracing macros
    /// are used.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid layers can be created, if the log file
    /// cannot be opened, or if a global subscriber is already installed.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let layers = self.build_layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    /// Builds every enabled output layer without installing them.
    pub fn build_layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if let Some(console_config) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.init_console_logger(console_config, self.env_filter()));
        }

        if let Some(file_config) = self.config.file.as_ref().filter(|f| f.enabled) {
            layers.push(self.init_file_logger(file_config)?);
            print_info!("Text log file: {}", file_config.path.display());
        }

        if let Some(journald_config) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.init_journald_logger(&journald_config.identifier) {
                Ok(journald_layer) => {
                    layers.push(journald_layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald_config.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if self.config.console.as_ref().is_some_and(|c| c.enabled) {
                        return Err(LoggerError::JournaldFailedWithConsoleEnabled);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }
        Ok(layers)
    }

    /// `RUST_LOG` when set, the configured level otherwise.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Constructs a console output layer according to the provided configuration.
    fn init_console_logger(&self, config: &ConsoleConfig, filter: EnvFilter) -> BoxedLayer {
        let span_events = if config.show_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_span_events(span_events)
            .with_ansi(config.ansi_colors)
            .with_writer(io::stdout);

        match config.format {
            LogFormat::Json => layer.json().with_filter(filter).boxed(),
            LogFormat::Pretty => layer.pretty().with_filter(filter).boxed(),
            LogFormat::Compact => layer.compact().with_filter(filter).boxed(),
        }
    }

    /// Constructs the text log file layer.
    ///
    /// With `readings_only` the file receives only the lines emitted on the
    /// thermometer log target, matching the classic one-line-per-reading log.
    fn init_file_logger(&self, config: &FileConfig) -> Result<BoxedLayer, LoggerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file));

        let layer = if config.readings_only {
            layer
                .with_filter(Targets::new().with_target(THERMO_LOG_TARGET, Level::INFO))
                .boxed()
        } else {
            layer.with_filter(self.env_filter()).boxed()
        };
        Ok(layer)
    }

    /// Constructs a journald output layer.
    #[cfg(feature = "journald")]
    fn init_journald_logger(&self, identifier: &str) -> Result<BoxedLayer, LoggerError> {
        let journald_layer = tracing_journald::layer()?.with_syslog_identifier(identifier.to_string());
        Ok(journald_layer.with_filter(self.env_filter()).boxed())
    }

    #[cfg(not(feature = "journald"))]
    fn init_journald_logger(&self, _identifier: &str) -> Result<BoxedLayer, LoggerError> {
        Err(LoggerError::InitializationError(
            "journald support not compiled in (enable the `journald` feature)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::logger::JournaldConfig;

    fn quiet() -> LoggerConfig {
        LoggerConfig {
            console: None,
            file: None,
            journald: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggerConfig {
            level: "chatty".into(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_no_layers_is_an_error() {
        let manager = LoggerManager::new(quiet()).unwrap();
        assert!(matches!(
            manager.build_layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }

    #[test]
    fn test_console_layer() {
        let manager = LoggerManager::new(LoggerConfig {
            console: Some(ConsoleConfig::default()),
            ..quiet()
        })
        .unwrap();
        assert_eq!(manager.build_layers().unwrap().len(), 1);
    }

    #[test]
    fn test_file_layer_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fermbot_thermo.log");
        let manager = LoggerManager::new(LoggerConfig {
            file: Some(FileConfig {
                enabled: true,
                path: path.clone(),
                readings_only: true,
            }),
            ..quiet()
        })
        .unwrap();

        assert_eq!(manager.build_layers().unwrap().len(), 1);
        assert!(path.exists());
    }

    #[test]
    fn test_file_layer_missing_directory() {
        let manager = LoggerManager::new(LoggerConfig {
            file: Some(FileConfig {
                enabled: true,
                path: "/definitely/not/a/dir/thermo.log".into(),
                readings_only: false,
            }),
            ..quiet()
        })
        .unwrap();
        assert!(matches!(
            manager.build_layers(),
            Err(LoggerError::IoError(_))
        ));
    }

    #[test]
    fn test_disabled_outputs_are_skipped() {
        let manager = LoggerManager::new(LoggerConfig {
            console: Some(ConsoleConfig {
                enabled: false,
                ..Default::default()
            }),
            journald: Some(JournaldConfig::default()),
            ..quiet()
        })
        .unwrap();
        assert!(matches!(
            manager.build_layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }
}
