//! Per-Tick Telemetry
//!
//! Every control tick produces one [`TelemetryRecord`] carrying the raw
//! and filtered state, both apogee predictions, the commanded deployment
//! and a set of fault flags. The record is the only output channel of
//! the core: hosts log it, stream it, or drop it, but the control loop
//! itself never blocks on telemetry.
//!
//! Faults are conditions the core handled locally (gated, clamped, held)
//! that an analyst should still see. They are flags, not errors; a flight
//! with faults in every record can still be a successful flight.

use crate::phase::FlightPhase;

/// Bit set of per-tick fault conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultFlags(u8);

impl FaultFlags {
    /// The accelerometer reading was saturated and gated out.
    pub const ACCEL_SATURATED: FaultFlags = FaultFlags(1 << 0);
    /// The converted altitude fell outside the plausible band.
    pub const SUSPICIOUS_ALTITUDE: FaultFlags = FaultFlags(1 << 1);
    /// The apogee prediction was clamped to the current altitude.
    pub const PREDICTION_CLAMPED: FaultFlags = FaultFlags(1 << 2);
    /// The commanded deployment change was limited by the rate cap.
    pub const RATE_LIMITED: FaultFlags = FaultFlags(1 << 3);
    /// The pressure sample was missing; the previous altitude was held.
    pub const PRESSURE_DROPOUT: FaultFlags = FaultFlags(1 << 4);

    /// No faults.
    pub const fn empty() -> Self {
        FaultFlags(0)
    }

    /// True if no fault bits are set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every bit in `other` is set in `self`.
    pub const fn contains(&self, other: FaultFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits in `other`.
    pub fn insert(&mut self, other: FaultFlags) {
        self.0 |= other.0;
    }

    /// Raw bit representation, for compact logging.
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

/// One control tick's worth of observable state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryRecord {
    /// Sample timestamp (s).
    pub time: f32,
    /// Flight phase after this tick's gate update.
    pub phase: FlightPhase,
    /// Raw converted barometric altitude (m AGL).
    pub raw_altitude: f32,
    /// Raw accelerometer reading as supplied this tick (m/s²).
    pub raw_acceleration: Option<f32>,
    /// Filtered altitude (m AGL).
    pub altitude: f32,
    /// Filtered vertical velocity (m/s).
    pub velocity: f32,
    /// Filtered vertical acceleration (m/s²).
    pub acceleration: f32,
    /// Predicted apogee at the current deployment (m AGL).
    pub predicted_apogee: f32,
    /// Predicted apogee with the brake fully retracted (m AGL).
    pub predicted_apogee_no_brake: f32,
    /// Predicted apogee minus target (m); positive means overshoot.
    pub apogee_error: f32,
    /// No-brake predicted apogee minus target (m).
    pub apogee_error_no_brake: f32,
    /// Deployment fraction the strategy asked for this tick, before
    /// rate limiting. Outside active control it mirrors the command.
    pub desired_deployment: f32,
    /// Commanded deployment fraction in [0, 1] after shaping and rate
    /// limiting.
    pub commanded_deployment: f32,
    /// True when a strategy's output drove the actuator this tick.
    pub control_active: bool,
    /// Fault conditions observed this tick.
    pub faults: FaultFlags,
}

#[cfg(feature = "std")]
impl TelemetryRecord {
    /// Header row matching [`to_csv_row`](TelemetryRecord::to_csv_row).
    pub fn csv_header() -> &'static str {
        "time,phase,raw_altitude,raw_acceleration,altitude,velocity,acceleration,\
         predicted_apogee,predicted_apogee_no_brake,apogee_error,apogee_error_no_brake,\
         desired_deployment,commanded_deployment,control_active,faults"
    }

    /// Serializes one record as a CSV row. A missing raw acceleration
    /// becomes an empty cell, mirroring dropout cells in replay input
    /// logs.
    pub fn to_csv_row(&self) -> String {
        let raw_accel = self
            .raw_acceleration
            .map(|a| a.to_string())
            .unwrap_or_default();
        format!(
            "{},{:?},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.time,
            self.phase,
            self.raw_altitude,
            raw_accel,
            self.altitude,
            self.velocity,
            self.acceleration,
            self.predicted_apogee,
            self.predicted_apogee_no_brake,
            self.apogee_error,
            self.apogee_error_no_brake,
            self.desired_deployment,
            self.commanded_deployment,
            self.control_active,
            self.faults.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose() {
        let mut f = FaultFlags::empty();
        assert!(f.is_empty());

        f.insert(FaultFlags::ACCEL_SATURATED);
        f.insert(FaultFlags::RATE_LIMITED);
        assert!(f.contains(FaultFlags::ACCEL_SATURATED));
        assert!(f.contains(FaultFlags::RATE_LIMITED));
        assert!(!f.contains(FaultFlags::SUSPICIOUS_ALTITUDE));
        assert_eq!(f.bits(), 0b1001);
    }

    #[cfg(feature = "std")]
    #[test]
    fn csv_row_matches_header() {
        let record = TelemetryRecord {
            time: 1.25,
            phase: FlightPhase::CoastActive,
            raw_altitude: 101.1,
            raw_acceleration: None,
            altitude: 100.9,
            velocity: 38.5,
            acceleration: -11.7,
            predicted_apogee: 231.0,
            predicted_apogee_no_brake: 236.4,
            apogee_error: 2.4,
            apogee_error_no_brake: 7.8,
            desired_deployment: 0.6,
            commanded_deployment: 0.45,
            control_active: true,
            faults: FaultFlags::empty(),
        };

        let header_fields = TelemetryRecord::csv_header().split(',').count();
        let row = record.to_csv_row();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), header_fields);
        // The dropped accel cell is empty, and both deployments appear.
        assert_eq!(fields[3], "");
        assert_eq!(fields[11], "0.6");
        assert_eq!(fields[12], "0.45");
    }
}
