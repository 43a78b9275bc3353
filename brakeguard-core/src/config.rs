//! Flight Configuration
//!
//! A flat, immutable bundle of the physical and tuning constants the
//! control core needs. The bundle is loaded once before a flight and
//! passed by reference into every component (constructor injection);
//! nothing in the core mutates it and no runtime reconfiguration is
//! supported mid-flight.
//!
//! Defaults mirror a 0.5 kg minimum-diameter rocket on an F-class motor
//! targeting 228.6 m (750 ft) AGL, the airframe the core was tuned on.
//! Every field is an explicit scalar with a documented default; optional
//! behavior is selected through enums rather than sentinel values.

use core::str::FromStr;

use crate::errors::ConfigError;

/// Selectable deployment-control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// Incremental PID on the with-brake apogee error.
    Pid,
    /// Full deploy / full retract on the sign of the no-brake error.
    BangBang,
    /// Direct inversion of the apogee predictor by bounded 1-D search.
    Optimizer,
    /// Optimizer-solved deployment fed through a PID-style increment.
    OptimizerPid,
    /// Replay of a pre-recorded (time, deployment) schedule.
    FileReplay,
}

impl Strategy {
    /// Canonical configuration-file spelling of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Pid => "PID",
            Strategy::BangBang => "BANGBANG",
            Strategy::Optimizer => "OPTIMIZER",
            Strategy::OptimizerPid => "OPTIMIZERPID",
            Strategy::FileReplay => "FILE",
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case-insensitive without allocating: compare byte-wise.
        let matches = |candidate: &str| s.eq_ignore_ascii_case(candidate);

        if matches("PID") {
            Ok(Strategy::Pid)
        } else if matches("BANGBANG") {
            Ok(Strategy::BangBang)
        } else if matches("OPTIMIZER") {
            Ok(Strategy::Optimizer)
        } else if matches("OPTIMIZERPID") {
            Ok(Strategy::OptimizerPid)
        } else if matches("FILE") || matches("FILEREPLAY") {
            Ok(Strategy::FileReplay)
        } else {
            let mut name = heapless::String::new();
            // Strategy names are ASCII; truncate anything longer.
            for c in s.chars().take(32) {
                if name.push(c).is_err() {
                    break;
                }
            }
            Err(ConfigError::UnknownStrategy(name))
        }
    }
}

/// How the apogee error is shaped near the target before it reaches a
/// strategy, to prevent actuator chatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeadbandMode {
    /// Inside the band the error is scaled toward zero proportionally:
    /// `error · |error| / deadband`.
    Proportional,
    /// Inside the band the effective error is zero; outside it is
    /// `sign(error) · (|error| − deadband) · hysteresis_factor`.
    Hysteresis,
}

/// Immutable flight configuration.
///
/// Lifecycle: built (or deserialized) once before a run, validated with
/// [`Config::validate`], then shared read-only by every component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    // --- Physical parameters ---
    /// Rocket cross-sectional reference area (m²).
    pub reference_area: f32,
    /// Base drag coefficient of the clean rocket, matched to its drag
    /// curve around coast velocities.
    pub rocket_cd: f32,
    /// Additional drag coefficient contributed by the airbrake at full
    /// deployment.
    pub airbrake_cd: f32,
    /// Air density used by the apogee predictor (kg/m³).
    pub air_density: f32,
    /// Rocket mass after burnout (kg).
    pub burnout_mass: f32,
    /// Motor burn duration from liftoff (s).
    pub burn_time: f32,
    /// Target apogee above ground level (m).
    pub target_apogee: f32,

    // --- Sampling ---
    /// Control loop rate (Hz).
    pub sampling_rate: u32,
    /// Number of pressure samples averaged for ground calibration.
    pub calibration_samples: usize,
    /// Vertical velocity above which liftoff is declared (m/s).
    pub liftoff_velocity: f32,

    // --- Kalman filter ---
    /// Barometric altitude measurement standard deviation (m).
    pub alt_std: f32,
    /// Accelerometer measurement standard deviation (m/s²).
    pub accel_std: f32,
    /// Process noise std for altitude during motor burn (m).
    pub model_y_std_burn: f32,
    /// Process noise std for velocity during motor burn (m/s).
    pub model_v_std_burn: f32,
    /// Process noise std for acceleration during motor burn (m/s²).
    pub model_a_std_burn: f32,
    /// Process noise std for altitude during coast (m).
    pub model_y_std_coast: f32,
    /// Process noise std for velocity during coast (m/s).
    pub model_v_std_coast: f32,
    /// Process noise std for acceleration during coast (m/s²).
    pub model_a_std_coast: f32,
    /// Acceleration-state decay factor while the motor burns.
    pub accel_decay_burn: f32,
    /// Acceleration-state decay factor after burnout. Smaller than the
    /// burn value: acceleration information goes stale faster once
    /// thrust ends.
    pub accel_decay_coast: f32,
    /// Initial altitude variance after `initialize` (m²).
    pub initial_alt_var: f32,
    /// Initial velocity variance after `initialize` (m²/s²).
    pub initial_vel_var: f32,
    /// Initial acceleration variance after `initialize` (m²/s⁴).
    pub initial_accel_var: f32,
    /// Accelerometer saturation threshold (g). Readings at or beyond
    /// this magnitude are gated out of the filter for the tick.
    pub accel_saturation_g: f32,

    // --- Control ---
    /// Selected deployment strategy.
    pub strategy: Strategy,
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain.
    pub kd: f32,
    /// Trailing integral window length (s); older error·dt samples are
    /// dropped (bounded-memory anti-windup).
    pub integral_window: f32,
    /// Settling time after burnout before the integral term engages (s).
    pub settling_time: f32,
    /// Apogee-error deadband half-width (m).
    pub deadband: f32,
    /// Gain applied outside the band in [`DeadbandMode::Hysteresis`].
    pub hysteresis_factor: f32,
    /// Error-shaping variant applied before each strategy.
    pub deadband_mode: DeadbandMode,
    /// Maximum commanded deployment change per second (1/s).
    pub max_deployment_rate: f32,
    /// Master enable for the airbrake; when false the phase gate never
    /// reaches the active-control state.
    pub airbrakes_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_area: 0.00246,
            rocket_cd: 0.71,
            airbrake_cd: 0.35,
            air_density: 1.2,
            burnout_mass: 0.5,
            burn_time: 1.4,
            target_apogee: 228.6,

            sampling_rate: 20,
            calibration_samples: 5,
            liftoff_velocity: 2.0,

            alt_std: 0.26,
            accel_std: 0.013,
            model_y_std_burn: 0.05,
            model_v_std_burn: 0.5,
            model_a_std_burn: 0.1,
            model_y_std_coast: 0.02,
            model_v_std_coast: 0.1,
            model_a_std_coast: 0.015,
            accel_decay_burn: 0.95,
            accel_decay_coast: 0.85,
            initial_alt_var: 1.0,
            initial_vel_var: 5.0,
            initial_accel_var: 5.0,
            accel_saturation_g: 4.0,

            strategy: Strategy::Pid,
            kp: 0.012,
            ki: 0.0,
            kd: 0.0,
            integral_window: 2.0,
            settling_time: 1.5,
            deadband: 0.1,
            hysteresis_factor: 0.5,
            deadband_mode: DeadbandMode::Proportional,
            max_deployment_rate: 2.5,
            airbrakes_enabled: true,
        }
    }
}

impl Config {
    /// Nominal tick interval implied by the sampling rate (s).
    pub fn nominal_dt(&self) -> f32 {
        1.0 / self.sampling_rate as f32
    }

    /// Checks the handful of parameters whose sign or magnitude the
    /// core divides by. Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("sampling_rate", self.sampling_rate as f32),
            ("burnout_mass", self.burnout_mass),
            ("reference_area", self.reference_area),
            ("air_density", self.air_density),
            ("max_deployment_rate", self.max_deployment_rate),
            ("alt_std", self.alt_std),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if self.calibration_samples == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "calibration_samples",
                value: 0.0,
            });
        }
        for (name, value) in [
            ("accel_decay_burn", self.accel_decay_burn),
            ("accel_decay_coast", self.accel_decay_coast),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}
