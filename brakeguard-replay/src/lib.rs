//! Offline Flight Log Replay
//!
//! Re-runs a recorded flight through the control core exactly as the
//! flight computer would have seen it: load a CSV sensor log, feed each
//! row into a [`FlightController`], and write the resulting telemetry
//! back out as CSV. Because the core is deterministic, replaying a log
//! with a modified configuration answers "what would this tune have
//! done on that flight" without burning a motor.
//!
//! Input format: a CSV with a header row containing `time` and
//! `pressure` columns and optionally an `accel` column. Empty cells are
//! treated as sensor dropouts. Timestamps may be in microseconds,
//! milliseconds or seconds; acceleration may be logged in g or m/s².

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::fs;
use std::io::Write as _;
use std::path::Path;

use thiserror_no_std::Error;

use brakeguard_core::constants::GRAVITY_M_PER_S2;
use brakeguard_core::{Config, ControlError, FlightController, SensorSample, TelemetryRecord};

/// Errors from loading, replaying, or writing a flight log.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is missing from the log header.
    #[error("log column '{0}' not found in header")]
    MissingColumn(String),

    /// A row failed to parse as numbers.
    #[error("malformed log row at line {0}")]
    Parse(usize),

    /// The time unit was not one of `us`, `ms`, `s`.
    #[error("invalid time unit '{0}' (expected us, ms or s)")]
    TimeUnit(String),

    /// The log contained a header but no rows.
    #[error("flight log is empty")]
    EmptyLog,

    /// The control core rejected the configuration or a tick.
    #[error("control error: {0}")]
    Control(#[from] ControlError),
}

/// Unit of the log's time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Microseconds.
    Micros,
    /// Milliseconds.
    Millis,
    /// Seconds.
    Seconds,
}

impl TimeUnit {
    /// Parses `us`, `ms` or `s`.
    pub fn parse(s: &str) -> Result<Self, ReplayError> {
        match s {
            "us" => Ok(TimeUnit::Micros),
            "ms" => Ok(TimeUnit::Millis),
            "s" => Ok(TimeUnit::Seconds),
            other => Err(ReplayError::TimeUnit(other.to_string())),
        }
    }

    fn to_seconds(self, value: f32) -> f32 {
        match self {
            TimeUnit::Micros => value * 1e-6,
            TimeUnit::Millis => value * 1e-3,
            TimeUnit::Seconds => value,
        }
    }
}

/// How to interpret the raw log columns.
#[derive(Debug, Clone, Copy)]
pub struct LogFormat {
    /// Unit of the `time` column.
    pub time_unit: TimeUnit,
    /// True when the `accel` column is logged in g rather than m/s².
    pub accel_in_g: bool,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Micros,
            accel_in_g: true,
        }
    }
}

/// One parsed log row, already converted to core units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightLogRow {
    /// Timestamp (s).
    pub time: f32,
    /// Absolute pressure (Pa), if logged this row.
    pub pressure: Option<f32>,
    /// Vertical acceleration (m/s²), if logged this row.
    pub accel: Option<f32>,
}

impl FlightLogRow {
    fn to_sample(self) -> SensorSample {
        SensorSample {
            time: self.time,
            pressure: self.pressure,
            accel: self.accel,
        }
    }
}

/// Loads a flight log CSV into core units.
pub fn load_flight_log(path: &Path, format: LogFormat) -> Result<Vec<FlightLogRow>, ReplayError> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines().enumerate();

    let (_, header) = lines.next().ok_or(ReplayError::EmptyLog)?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| columns.iter().position(|c| *c == name);
    let time_col = column("time").ok_or_else(|| ReplayError::MissingColumn("time".into()))?;
    let pressure_col =
        column("pressure").ok_or_else(|| ReplayError::MissingColumn("pressure".into()))?;
    let accel_col = column("accel");

    let accel_scale = if format.accel_in_g { GRAVITY_M_PER_S2 } else { 1.0 };

    let mut rows = Vec::new();
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let required = |col: usize| -> Result<f32, ReplayError> {
            fields
                .get(col)
                .and_then(|f| f.parse::<f32>().ok())
                .ok_or(ReplayError::Parse(index + 1))
        };
        // Empty optional cells are dropouts, malformed ones are errors.
        let optional = |col: usize| -> Result<Option<f32>, ReplayError> {
            match fields.get(col).map(|f| f.trim()) {
                None | Some("") => Ok(None),
                Some(f) => f
                    .parse::<f32>()
                    .map(Some)
                    .map_err(|_| ReplayError::Parse(index + 1)),
            }
        };

        rows.push(FlightLogRow {
            time: format.time_unit.to_seconds(required(time_col)?),
            pressure: optional(pressure_col)?,
            accel: match accel_col {
                Some(col) => optional(col)?.map(|a| a * accel_scale),
                None => None,
            },
        });
    }

    if rows.is_empty() {
        return Err(ReplayError::EmptyLog);
    }
    Ok(rows)
}

/// Replays rows through a fresh controller built from `config`.
pub fn replay(config: Config, rows: &[FlightLogRow]) -> Result<Vec<TelemetryRecord>, ReplayError> {
    let mut controller = FlightController::new(config)?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(controller.tick(&row.to_sample())?);
    }
    log::info!("replayed {} samples", records.len());
    Ok(records)
}

/// Writes telemetry records as CSV, using the record's own schema.
pub fn write_telemetry_csv(path: &Path, records: &[TelemetryRecord]) -> Result<(), ReplayError> {
    let mut out = fs::File::create(path)?;
    writeln!(out, "{}", TelemetryRecord::csv_header())?;
    for r in records {
        writeln!(out, "{}", r.to_csv_row())?;
    }
    Ok(())
}

/// End-to-end convenience: load, replay, write.
pub fn process_file(
    input: &Path,
    output: &Path,
    config: Config,
    format: LogFormat,
) -> Result<Vec<TelemetryRecord>, ReplayError> {
    let rows = load_flight_log(input, format)?;
    let records = replay(config, &rows)?;
    write_telemetry_csv(output, &records)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brakeguard_core::constants::{
        BAROMETRIC_EXPONENT, BAROMETRIC_SCALE_M, SEA_LEVEL_PRESSURE_PA,
    };
    use brakeguard_core::FlightPhase;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("brakeguard-replay-test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn pressure_at(altitude: f32) -> f32 {
        SEA_LEVEL_PRESSURE_PA
            * (1.0 - altitude / BAROMETRIC_SCALE_M).powf(1.0 / BAROMETRIC_EXPONENT)
    }

    #[test]
    fn loads_and_converts_units() {
        let path = temp_path("units.csv");
        std::fs::write(
            &path,
            "time,pressure,accel\n50000,101325.0,2.0\n100000,101300.0,\n",
        )
        .unwrap();

        let rows = load_flight_log(&path, LogFormat::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].time - 0.05).abs() < 1e-6);
        assert!((rows[0].accel.unwrap() - 2.0 * GRAVITY_M_PER_S2).abs() < 1e-4);
        // Empty accel cell is a dropout, not an error.
        assert_eq!(rows[1].accel, None);
        assert_eq!(rows[1].pressure, Some(101300.0));
    }

    #[test]
    fn missing_column_is_reported() {
        let path = temp_path("missing.csv");
        std::fs::write(&path, "time,baro\n1,101325\n").unwrap();
        assert!(matches!(
            load_flight_log(&path, LogFormat::default()).unwrap_err(),
            ReplayError::MissingColumn(c) if c == "pressure"
        ));
    }

    #[test]
    fn malformed_row_is_reported_with_line_number() {
        let path = temp_path("malformed.csv");
        std::fs::write(&path, "time,pressure\n1000,101325\nnope,101300\n").unwrap();
        assert!(matches!(
            load_flight_log(&path, LogFormat::default()).unwrap_err(),
            ReplayError::Parse(3)
        ));
    }

    #[test]
    fn empty_log_is_an_error() {
        let path = temp_path("empty.csv");
        std::fs::write(&path, "time,pressure\n").unwrap();
        assert!(matches!(
            load_flight_log(&path, LogFormat::default()).unwrap_err(),
            ReplayError::EmptyLog
        ));
    }

    #[test]
    fn replay_produces_one_record_per_row() {
        // Synthetic pad-then-climb log in seconds and m/s².
        let mut csv = String::from("time,pressure,accel\n");
        for i in 0..40 {
            let t = i as f32 * 0.05;
            let alt = if t < 0.5 { 0.0 } else { 40.0 * (t - 0.5) };
            csv.push_str(&format!("{},{},{}\n", t, pressure_at(alt), 0.0));
        }
        let path = temp_path("flight.csv");
        std::fs::write(&path, csv).unwrap();

        let format = LogFormat {
            time_unit: TimeUnit::Seconds,
            accel_in_g: false,
        };
        let rows = load_flight_log(&path, format).unwrap();
        let records = replay(Config::default(), &rows).unwrap();
        assert_eq!(records.len(), rows.len());
        // The climb must have been noticed.
        assert!(records.last().unwrap().phase != FlightPhase::Prelaunch);
        assert!(records.last().unwrap().altitude > 10.0);
    }

    #[test]
    fn csv_output_round_trips_header() {
        let path_in = temp_path("roundtrip_in.csv");
        std::fs::write(&path_in, "time,pressure\n0,101325\n50000,101325\n").unwrap();
        let rows = load_flight_log(&path_in, LogFormat::default()).unwrap();
        let records = replay(Config::default(), &rows).unwrap();

        let path_out = temp_path("roundtrip_out.csv");
        write_telemetry_csv(&path_out, &records).unwrap();
        let written = std::fs::read_to_string(&path_out).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().starts_with("time,phase,"));
        assert_eq!(lines.count(), records.len());
    }
}
