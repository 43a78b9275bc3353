//! The Per-Tick Control Pipeline
//!
//! [`FlightController`] wires the whole core together behind a single
//! entry point: feed it one [`SensorSample`] per tick and it returns one
//! [`TelemetryRecord`]. Internally each tick runs, in order:
//!
//! 1. Ground calibration (until enough pad samples are averaged)
//! 2. Pressure-to-altitude conversion
//! 3. Kalman predict/update, with accelerometer saturation gating
//! 4. Flight phase gate
//! 5. Apogee prediction (current deployment and no-brake)
//! 6. Strategy command, error shaping, rate limiting
//!
//! The pipeline is synchronous and single-threaded; determinism comes
//! from the fact that every stage is a pure function of its inputs and
//! the accumulated state. Replaying a sensor log through a fresh
//! controller reproduces the flight bit for bit.
//!
//! Sensor dropouts never abort a tick. A missing (or non-positive)
//! pressure sample skips the filter update and holds the last good
//! estimate, a missing or saturated acceleration is gated out of the
//! filter, and each case is flagged in the record's faults.

use crate::altitude::{AltitudeConverter, GroundCalibrator};
use crate::config::Config;
use crate::constants::{GRAVITY_M_PER_S2, MIN_DT_SECONDS};
use crate::control::{ControlInput, Controller, RateLimiter};
use crate::errors::ControlResult;
use crate::estimator::{EstimatorMode, Measurement, StateEstimator};
use crate::phase::{FlightPhase, FlightPhaseGate};
use crate::predictor::predict_apogee;
use crate::telemetry::{FaultFlags, TelemetryRecord};

#[cfg(feature = "std")]
use crate::control::DeploymentSchedule;

/// One tick of raw sensor input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Sample timestamp (s). Expected monotonic; regressions are
    /// tolerated by flooring the filter's dt.
    pub time: f32,
    /// Absolute static pressure (Pa), if the barometer delivered.
    pub pressure: Option<f32>,
    /// Vertical acceleration excluding gravity (m/s²), if available.
    pub accel: Option<f32>,
}

/// The complete closed-loop airbrake controller.
#[derive(Debug, Clone)]
pub struct FlightController {
    config: Config,
    calibrator: GroundCalibrator,
    converter: Option<AltitudeConverter>,
    estimator: StateEstimator,
    gate: FlightPhaseGate,
    controller: Controller,
    limiter: RateLimiter,
    last_time: Option<f32>,
    last_raw_altitude: f32,
}

impl FlightController {
    /// Builds a controller fusing altitude and acceleration.
    pub fn new(config: Config) -> ControlResult<Self> {
        Self::with_mode(config, EstimatorMode::AltAccel)
    }

    /// Builds a controller with an explicit estimator mode (baro-only
    /// flights pass [`EstimatorMode::AltOnly`]).
    pub fn with_mode(config: Config, mode: EstimatorMode) -> ControlResult<Self> {
        config.validate()?;
        let controller = Controller::from_config(&config)?;
        Ok(Self::assemble(config, mode, controller))
    }

    /// Builds a schedule-replay controller.
    #[cfg(feature = "std")]
    pub fn with_schedule(
        config: Config,
        mode: EstimatorMode,
        schedule: DeploymentSchedule,
    ) -> ControlResult<Self> {
        config.validate()?;
        let controller = Controller::with_schedule(schedule);
        Ok(Self::assemble(config, mode, controller))
    }

    fn assemble(config: Config, mode: EstimatorMode, controller: Controller) -> Self {
        Self {
            calibrator: GroundCalibrator::new(config.calibration_samples),
            converter: None,
            estimator: StateEstimator::new(&config, mode),
            gate: FlightPhaseGate::new(&config),
            limiter: RateLimiter::new(config.max_deployment_rate),
            controller,
            last_time: None,
            last_raw_altitude: 0.0,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current flight phase.
    pub fn phase(&self) -> FlightPhase {
        self.gate.phase()
    }

    /// True once ground calibration has completed.
    pub fn is_calibrated(&self) -> bool {
        self.converter.is_some()
    }

    /// Runs one control tick.
    pub fn tick(&mut self, sample: &SensorSample) -> ControlResult<TelemetryRecord> {
        let mut faults = FaultFlags::empty();

        let dt = match self.last_time {
            None => self.config.nominal_dt(),
            Some(last) => (sample.time - last).max(MIN_DT_SECONDS),
        };
        self.last_time = Some(sample.time);

        // Non-positive pressure is a barometer fault, not a reading.
        let pressure = sample.pressure.filter(|p| *p > 0.0);
        if pressure.is_none() {
            faults.insert(FaultFlags::PRESSURE_DROPOUT);
        }

        // Stage 1: calibration. Until the pad reference exists there is
        // no altitude, no estimate and no control.
        let Some(converter) = self.converter else {
            if let Some(p) = pressure {
                if let Some(p0) = self.calibrator.add_sample(p) {
                    self.converter = Some(AltitudeConverter::new(p0));
                    // Ground reference defines 0 m AGL.
                    self.estimator.initialize(0.0);
                }
            }
            return Ok(self.idle_record(sample, faults));
        };

        // Stages 2+3: altitude conversion and state estimation. With no
        // new pressure sample there is nothing to fuse: the filter is
        // not updated and the last good estimate is held.
        let saturated = sample
            .accel
            .map(|a| a.abs() >= self.config.accel_saturation_g * GRAVITY_M_PER_S2)
            .unwrap_or(false);
        if saturated {
            faults.insert(FaultFlags::ACCEL_SATURATED);
        }
        let (raw_altitude, estimate) = match pressure.and_then(|p| converter.barometric(p)) {
            Some(reading) => {
                if reading.suspicious {
                    faults.insert(FaultFlags::SUSPICIOUS_ALTITUDE);
                }
                self.last_raw_altitude = reading.altitude_agl;
                let measurement = Measurement {
                    altitude_agl: reading.altitude_agl,
                    accel: sample.accel,
                    accel_saturated: saturated,
                };
                let estimate =
                    self.estimator
                        .update(sample.time, &measurement, self.gate.is_burning())?;
                (reading.altitude_agl, estimate)
            }
            None => (self.last_raw_altitude, self.estimator.estimate()),
        };

        // Stage 4: phase gate on the filtered velocity.
        let phase = self.gate.update(sample.time, estimate.velocity);

        // Stage 5: apogee predictions at the current command and clean.
        let current = self.limiter.current();
        let predicted_apogee =
            predict_apogee(&self.config, estimate.altitude, estimate.velocity, current);
        let predicted_apogee_no_brake =
            predict_apogee(&self.config, estimate.altitude, estimate.velocity, 0.0);
        if estimate.velocity > 0.0 && predicted_apogee <= estimate.altitude {
            faults.insert(FaultFlags::PREDICTION_CLAMPED);
        }
        let apogee_error = predicted_apogee - self.config.target_apogee;
        let apogee_error_no_brake = predicted_apogee_no_brake - self.config.target_apogee;

        // Stage 6: command. Only CoastActive writes a strategy output;
        // on the pad the brake is pinned retracted, everywhere else the
        // actuator holds its last commanded value.
        let (desired_deployment, commanded_deployment) = match phase {
            FlightPhase::CoastActive => {
                let input = ControlInput {
                    time: sample.time,
                    dt,
                    time_since_liftoff: self.gate.time_since_liftoff(sample.time),
                    altitude: estimate.altitude,
                    velocity: estimate.velocity,
                    acceleration: estimate.acceleration,
                    predicted_apogee,
                    predicted_apogee_no_brake,
                    apogee_error,
                    apogee_error_no_brake,
                    previous_command: current,
                };
                let requested = self.controller.compute(&self.config, &input);
                let (out, limited) = self.limiter.limit(requested, dt);
                if limited {
                    faults.insert(FaultFlags::RATE_LIMITED);
                }
                (requested, out)
            }
            FlightPhase::Prelaunch => {
                self.limiter.force(0.0);
                (0.0, 0.0)
            }
            FlightPhase::Burn | FlightPhase::CoastInactive | FlightPhase::Descent => {
                let held = self.limiter.current();
                (held, held)
            }
        };

        Ok(TelemetryRecord {
            time: sample.time,
            phase,
            raw_altitude,
            raw_acceleration: sample.accel,
            altitude: estimate.altitude,
            velocity: estimate.velocity,
            acceleration: estimate.acceleration,
            predicted_apogee,
            predicted_apogee_no_brake,
            apogee_error,
            apogee_error_no_brake,
            desired_deployment,
            commanded_deployment,
            control_active: phase == FlightPhase::CoastActive,
            faults,
        })
    }

    fn idle_record(&self, sample: &SensorSample, faults: FaultFlags) -> TelemetryRecord {
        TelemetryRecord {
            time: sample.time,
            phase: self.gate.phase(),
            raw_altitude: 0.0,
            raw_acceleration: sample.accel,
            altitude: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            predicted_apogee: 0.0,
            predicted_apogee_no_brake: 0.0,
            apogee_error: -self.config.target_apogee,
            apogee_error_no_brake: -self.config.target_apogee,
            desired_deployment: 0.0,
            commanded_deployment: 0.0,
            control_active: false,
            faults,
        }
    }
}
