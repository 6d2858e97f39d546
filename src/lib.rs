//! fermbot - one-wire thermometer logger and cooling controller
//!
//! This crate reads DS18B20 thermometers through the Linux `w1` sysfs
//! interface, records every reading through a chain of logging sinks, and runs
//! a threshold controller that decides whether a fermentation chamber needs
//! cooling. It is built to be started once per poll by cron or a systemd timer.
//!
//! ## Modules
//!
//! * `config` - TOML configuration with validation via the `validator` crate,
//!   including the debug/production switch for bus paths, channel and database.
//!
//! * `core` - Thermometer acquisition and the control loop:
//!   - Bus enumeration and `w1_slave` parsing
//!   - Fixed-point `Temperature` arithmetic
//!   - Logging chain with text and SQLite sinks
//!   - Threshold controller and device capability
//!   - Poll cycle and display pass
//!
//! * `logger` - Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON), an
//!   append-only text log file, and optional systemd journald integration.
//!
//! ## Features
//!
//! * `journald` - systemd journald output (default: enabled).
//! * `bundled-sqlite` - compile SQLite into the binary (default: enabled).

pub mod config;
pub mod core;
pub mod logger;
