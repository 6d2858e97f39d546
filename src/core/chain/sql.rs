//! SQLite sink.
//!
//! Each reading becomes one row of `temperature_points`. A connection is opened
//! per insert and dropped straight after, so every row is committed on its own
//! and nothing holds the database between poll cycles.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rusqlite::{params, Connection, OptionalExtension};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info, instrument};

use super::{ControllerSnapshot, TemperaturePoint, ThermoSink};
use crate::core::{error::ThermoError, temperature::Temperature, types::ThermoResult};

/// Schema script applied on every open. Safe to re-run.
const SCHEMA: &str = include_str!("schema/001_temperature_points.sql");

/// `PRAGMA user_version` written by [`SCHEMA`].
pub const SCHEMA_VERSION: i64 = 1;

/// UTC timestamps, sortable as text and understood by SQLite's date functions.
const RECORD_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

/// A row read back from `temperature_points`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPoint {
    pub serial: String,
    pub record_time: OffsetDateTime,
    pub celsius: Temperature,
}

/// Persists readings to an SQLite database file.
#[derive(Debug, Clone)]
pub struct SqlSink {
    path: PathBuf,
}

impl SqlSink {
    /// Prepares the database at `path`: creates the parent directory if needed
    /// and applies the schema.
    ///
    /// # Errors
    ///
    /// [`ThermoError::CreateDir`] if the directory cannot be created,
    /// [`ThermoError::Storage`] if the database cannot be opened or the schema
    /// fails to apply.
    #[instrument(skip_all, fields(db = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> ThermoResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            // create_dir_all already treats an existing directory as success
            fs::create_dir_all(dir).map_err(|source| ThermoError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let sink = SqlSink { path };
        let conn = sink.connect()?;
        conn.execute_batch(SCHEMA).map_err(|e| sink.storage_error(e))?;
        info!("SQLite sink ready (schema version {})", SCHEMA_VERSION);

        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version recorded in the database's `user_version` pragma.
    pub fn schema_version(&self) -> ThermoResult<i64> {
        let conn = self.connect()?;
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| self.storage_error(e))
    }

    /// Inserts one reading.
    pub fn insert(&self, point: &TemperaturePoint) -> ThermoResult<()> {
        let record_time = point
            .recorded_at
            .to_offset(time::UtcOffset::UTC)
            .format(RECORD_TIME_FORMAT)
            .map_err(|e| ThermoError::Storage {
                path: self.path.display().to_string(),
                source: rusqlite::Error::ToSqlConversionFailure(Box::new(e)),
            })?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO temperature_points (thermometer_serial, record_time, temp_celsius)
             VALUES (?1, ?2, ?3)",
            params![point.serial, record_time, point.celsius],
        )
        .map_err(|e| self.storage_error(e))?;

        debug!("Stored {} C for {}", point.celsius, point.serial);
        Ok(())
    }

    /// Most recent row, optionally restricted to one thermometer.
    pub fn latest(&self, serial: Option<&str>) -> ThermoResult<Option<StoredPoint>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT thermometer_serial, record_time, temp_celsius
             FROM temperature_points
             WHERE ?1 IS NULL OR thermometer_serial = ?1
             ORDER BY record_time DESC, rowid DESC
             LIMIT 1",
            params![serial],
            row_to_point,
        )
        .optional()
        .map_err(|e| self.storage_error(e))
    }

    /// Every row for `serial`, oldest first.
    pub fn points(&self, serial: &str) -> ThermoResult<Vec<StoredPoint>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT thermometer_serial, record_time, temp_celsius
                 FROM temperature_points
                 WHERE thermometer_serial = ?1
                 ORDER BY record_time ASC, rowid ASC",
            )
            .map_err(|e| self.storage_error(e))?;

        let rows = stmt
            .query_map(params![serial], row_to_point)
            .map_err(|e| self.storage_error(e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.storage_error(e))
    }

    fn connect(&self) -> ThermoResult<Connection> {
        Connection::open(&self.path).map_err(|e| self.storage_error(e))
    }

    fn storage_error(&self, source: rusqlite::Error) -> ThermoError {
        ThermoError::Storage {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn row_to_point(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPoint> {
    let record_time: String = row.get(1)?;
    let record_time = PrimitiveDateTime::parse(&record_time, RECORD_TIME_FORMAT)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?
        .assume_utc();

    Ok(StoredPoint {
        serial: row.get(0)?,
        record_time,
        celsius: row.get(2)?,
    })
}

impl ThermoSink for SqlSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn log_temperature(&self, point: &TemperaturePoint) -> ThermoResult<()> {
        self.insert(point)
    }

    fn log_controller_state(&self, _snapshot: &ControllerSnapshot) -> ThermoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::core::{
        bus::list_thermometers,
        chain::{tests::RecordingSink, FailurePolicy, LoggerChain, TextSink},
        controller::TempController,
        test_support::fixture,
    };

    fn point(serial: &str, celsius: &str, at: OffsetDateTime) -> TemperaturePoint {
        let celsius: Temperature = celsius.parse().unwrap();
        TemperaturePoint {
            serial: serial.into(),
            celsius,
            fahrenheit: celsius.celsius_to_fahrenheit(),
            recorded_at: at,
        }
    }

    fn count_tables(path: &Path) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'temperature_points'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_directory_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/lib/fermbot/fermbot_thermo.db");

        let sink = SqlSink::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(count_tables(&path), 1);
        assert_eq!(sink.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermo.db");

        let first = SqlSink::open(&path).unwrap();
        first
            .insert(&point("28-0000041481e8", "19.562", OffsetDateTime::now_utc()))
            .unwrap();
        let second = SqlSink::open(&path).unwrap();

        assert_eq!(count_tables(&path), 1);
        assert_eq!(second.points("28-0000041481e8").unwrap().len(), 1);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::open(dir.path().join("thermo.db")).unwrap();
        let now = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();

        sink.insert(&point("28-0000041462fa", "18.125", now)).unwrap();

        let stored = sink.latest(None).unwrap().unwrap();
        assert_eq!(stored.serial, "28-0000041462fa");
        assert_eq!(stored.celsius, "18.125".parse().unwrap());
        assert_eq!(stored.record_time, now);
    }

    #[test]
    fn test_round_trip_negative_and_whole_values() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::open(dir.path().join("thermo.db")).unwrap();
        let now = OffsetDateTime::now_utc();

        for value in ["-10.062", "0.000", "22.000", "85.000"] {
            sink.insert(&point("28-0000041481e8", value, now)).unwrap();
            let stored = sink.latest(Some("28-0000041481e8")).unwrap().unwrap();
            assert_eq!(stored.celsius, value.parse().unwrap(), "value {}", value);
        }
    }

    #[test]
    fn test_decimal_column_storage_class() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermo.db");
        let sink = SqlSink::open(&path).unwrap();
        let now = OffsetDateTime::now_utc();

        sink.insert(&point("28-0000041462fa", "18.125", now)).unwrap();
        sink.insert(&point("28-0000041481e8", "22.000", now)).unwrap();

        let conn = Connection::open(&path).unwrap();
        let stored: Vec<(String, String)> = conn
            .prepare(
                "SELECT typeof(temp_celsius), CAST(temp_celsius AS TEXT)
                 FROM temperature_points ORDER BY rowid",
            )
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            stored,
            vec![
                ("real".to_string(), "18.125".to_string()),
                ("integer".to_string(), "22".to_string()),
            ]
        );

        assert_eq!(
            sink.latest(Some("28-0000041462fa")).unwrap().unwrap().celsius,
            "18.125".parse().unwrap()
        );
        assert_eq!(
            sink.latest(Some("28-0000041481e8")).unwrap().unwrap().celsius,
            Temperature::from_degrees(22)
        );
    }

    #[test]
    fn test_latest_follows_insertion_time() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::open(dir.path().join("thermo.db")).unwrap();
        let start = OffsetDateTime::now_utc();

        sink.insert(&point("28-0000041481e8", "19.000", start)).unwrap();
        sink.insert(&point("28-0000041462fa", "18.000", start + Duration::seconds(1)))
            .unwrap();
        sink.insert(&point("28-0000041481e8", "19.500", start + Duration::seconds(2)))
            .unwrap();

        let latest = sink.latest(None).unwrap().unwrap();
        assert_eq!(latest.celsius, "19.500".parse().unwrap());

        let latest = sink.latest(Some("28-0000041462fa")).unwrap().unwrap();
        assert_eq!(latest.celsius, "18.000".parse().unwrap());

        let history: Vec<_> = sink
            .points("28-0000041481e8")
            .unwrap()
            .into_iter()
            .map(|p| p.celsius.to_string())
            .collect();
        assert_eq!(history, vec!["19.000", "19.500"]);
    }

    #[test]
    fn test_latest_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::open(dir.path().join("thermo.db")).unwrap();
        assert_eq!(sink.latest(None).unwrap(), None);
    }

    #[test]
    fn test_open_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = SqlSink::open(blocker.join("thermo.db")).unwrap_err();
        assert!(matches!(err, ThermoError::CreateDir { .. }));
    }

    #[test]
    fn test_chain_with_text_and_sql() {
        let dir = tempfile::tempdir().unwrap();
        let sql = SqlSink::open(dir.path().join("thermo.db")).unwrap();
        let recorder = RecordingSink::new("list");

        let mut chain = LoggerChain::new(TextSink::new("fermbotThermoDebug"))
            .with_policy(FailurePolicy::Continue);
        chain.append(sql.clone());
        chain.append(recorder.clone());

        for thermo in list_thermometers(fixture("dual_thermo_bus_master")).unwrap() {
            chain.log_temperature(&thermo).unwrap();
        }

        let controller = TempController::simple_cooling(
            fixture("dual_thermo_bus_master"),
            "68.0".parse().unwrap(),
            "1.0".parse().unwrap(),
        )
        .unwrap();
        chain.log_controller_state(&controller).unwrap();

        assert_eq!(
            sql.latest(Some("28-0000041481e8")).unwrap().unwrap().celsius,
            "19.562".parse().unwrap()
        );
        assert_eq!(
            sql.latest(Some("28-0000041462fa")).unwrap().unwrap().celsius,
            "18.125".parse().unwrap()
        );
        assert_eq!(recorder.temperatures().len(), 2);
        assert_eq!(recorder.states().len(), 1);
    }
}
