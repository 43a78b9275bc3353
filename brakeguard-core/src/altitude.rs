//! Barometric Altitude Conversion and Ground Calibration
//!
//! ## Physics Background
//!
//! A static-port barometer measures absolute pressure; the control loop
//! needs altitude above ground level (AGL). Two conversions are provided:
//!
//! **Barometric formula** (default, matches common altimeter firmware):
//!
//! ```text
//! h = 44330 · (1 − (p / p₀)^0.1903)
//! ```
//!
//! **Hypsometric formula** (temperature-aware, for hosts that want it):
//!
//! ```text
//! h = (R · T_mean / g) · ln(p₀ / p)
//! ```
//!
//! where `T_mean` is the layer-mean temperature from an [`Atmosphere`]
//! model, resolved by a short fixed-point iteration since the temperature
//! depends on the altitude being solved for.
//!
//! Both formulas are referenced to the calibrated ground pressure `p₀`,
//! so the result is AGL directly; no launch-site elevation is needed.
//!
//! ## Calibration
//!
//! [`GroundCalibrator`] averages the first N pressure samples taken on
//! the pad. Averaging suppresses sensor noise that would otherwise bias
//! every altitude of the flight by the noise of a single reading.

use libm::{logf, powf};

use crate::constants::{
    BAROMETRIC_EXPONENT, BAROMETRIC_SCALE_M, GAS_CONSTANT_DRY_AIR, GRAVITY_M_PER_S2,
    SUSPICIOUS_ALTITUDE_MAX_M, SUSPICIOUS_ALTITUDE_MIN_M,
};
use crate::lookup::Atmosphere;
use crate::macros::{log_info, log_warn};

/// A converted altitude sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeReading {
    /// Altitude above ground level (m).
    pub altitude_agl: f32,
    /// True when the altitude falls outside the plausible flight band.
    /// The value is still usable; the flag propagates to telemetry.
    pub suspicious: bool,
}

/// Accumulates pad pressure samples into a ground reference pressure.
#[derive(Debug, Clone)]
pub struct GroundCalibrator {
    samples_needed: usize,
    sum: f32,
    count: usize,
    ground_pressure: Option<f32>,
}

impl GroundCalibrator {
    /// Creates a calibrator that averages `samples_needed` readings.
    pub fn new(samples_needed: usize) -> Self {
        Self {
            samples_needed: samples_needed.max(1),
            sum: 0.0,
            count: 0,
            ground_pressure: None,
        }
    }

    /// Feeds one pad pressure sample (Pa). Returns the ground reference
    /// pressure once enough samples have been averaged; further samples
    /// are ignored. Non-positive pressure signals no reading and does
    /// not enter the average.
    pub fn add_sample(&mut self, pressure: f32) -> Option<f32> {
        if self.ground_pressure.is_some() {
            return self.ground_pressure;
        }
        if pressure <= 0.0 {
            log_warn!("ignoring non-positive calibration pressure {} Pa", pressure);
            return None;
        }
        self.sum += pressure;
        self.count += 1;
        if self.count >= self.samples_needed {
            let p0 = self.sum / self.count as f32;
            self.ground_pressure = Some(p0);
            log_info!("ground calibration complete: p0 = {} Pa over {} samples", p0, self.count);
        }
        self.ground_pressure
    }

    /// Ground reference pressure, if calibration has finished.
    pub fn ground_pressure(&self) -> Option<f32> {
        self.ground_pressure
    }

    /// True once enough samples have been averaged.
    pub fn is_complete(&self) -> bool {
        self.ground_pressure.is_some()
    }
}

/// Converts absolute pressure to altitude AGL against a calibrated
/// ground reference.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeConverter {
    ground_pressure: f32,
}

impl AltitudeConverter {
    /// Creates a converter referenced to the calibrated pad pressure.
    pub fn new(ground_pressure: f32) -> Self {
        Self { ground_pressure }
    }

    /// Barometric-formula conversion. Returns `None` for a non-positive
    /// pressure, which signals no reading rather than an altitude.
    /// In-band glitches are flagged but not rejected; a transient
    /// pressure excursion should perturb one tick, not abort the flight.
    pub fn barometric(&self, pressure: f32) -> Option<AltitudeReading> {
        if pressure <= 0.0 || self.ground_pressure <= 0.0 {
            return None;
        }
        let ratio = pressure / self.ground_pressure;
        let altitude_agl = BAROMETRIC_SCALE_M * (1.0 - powf(ratio, BAROMETRIC_EXPONENT));
        Some(self.flagged(altitude_agl))
    }

    /// Hypsometric conversion using a layer-mean temperature from the
    /// given atmosphere model.
    ///
    /// The mean temperature depends on the unknown altitude, so the
    /// solution is iterated: start from the ground temperature, convert,
    /// re-evaluate the mean at half the resulting altitude, convert
    /// again. Two passes land well inside sensor noise for flights under
    /// a few kilometers. Returns `None` for a non-positive pressure.
    pub fn hypsometric<A: Atmosphere>(
        &self,
        pressure: f32,
        atmosphere: &A,
    ) -> Option<AltitudeReading> {
        if pressure <= 0.0 || self.ground_pressure <= 0.0 {
            return None;
        }
        let log_ratio = logf(self.ground_pressure / pressure);
        let mut t_mean = atmosphere.temperature_at(0.0);
        let mut altitude_agl = 0.0;
        for _ in 0..2 {
            altitude_agl = GAS_CONSTANT_DRY_AIR * t_mean / GRAVITY_M_PER_S2 * log_ratio;
            t_mean = atmosphere.temperature_at(0.5 * altitude_agl.max(0.0));
        }
        Some(self.flagged(altitude_agl))
    }

    fn flagged(&self, altitude_agl: f32) -> AltitudeReading {
        let suspicious = !(SUSPICIOUS_ALTITUDE_MIN_M..=SUSPICIOUS_ALTITUDE_MAX_M)
            .contains(&altitude_agl);
        if suspicious {
            log_warn!("suspicious altitude reading: {} m AGL", altitude_agl);
        }
        AltitudeReading {
            altitude_agl,
            suspicious,
        }
    }
}
