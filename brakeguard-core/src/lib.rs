//! Apogee-targeting airbrake control core for BrakeGuard
//!
//! Fuses noisy barometric altitude and accelerometer readings into a
//! vertical state estimate, predicts the coasting apogee under quadratic
//! drag, and commands a normalized airbrake deployment level that steers
//! the flight toward a target apogee above ground level.
//!
//! Key constraints:
//! - Runs on flight computers without an OS (no_std capable)
//! - No heap allocation in the per-tick hot path
//! - Deterministic: identical sensor sequences produce identical commands
//!
//! ```no_run
//! use brakeguard_core::{Config, FlightController, SensorSample};
//!
//! let config = Config::default();
//! let mut controller = FlightController::new(config).unwrap();
//!
//! // One control tick: pressure in Pa, vertical acceleration in m/s^2
//! let sample = SensorSample { time: 0.05, pressure: Some(101_200.0), accel: Some(0.2) };
//! let record = controller.tick(&sample).unwrap();
//! println!("commanded deployment: {}", record.commanded_deployment);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod macros;

pub mod altitude;
pub mod config;
pub mod constants;
pub mod control;
pub mod errors;
pub mod estimator;
pub mod lookup;
pub mod matrix;
pub mod phase;
pub mod pipeline;
pub mod predictor;
pub mod telemetry;

// Public API
pub use config::{Config, DeadbandMode, Strategy};
pub use control::{ControlInput, Controller};
#[cfg(feature = "std")]
pub use control::DeploymentSchedule;
pub use errors::{ConfigError, ControlError, ControlResult, EstimatorError};
pub use estimator::{EstimatorMode, Measurement, StateEstimate, StateEstimator};
pub use phase::{FlightPhase, FlightPhaseGate};
pub use pipeline::{FlightController, SensorSample};
pub use predictor::predict_apogee;
pub use telemetry::{FaultFlags, TelemetryRecord};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
