//! Error Types for the Airbrake Control Core
//!
//! ## Design Philosophy
//!
//! The core distinguishes hard failures from in-flight faults:
//!
//! 1. **Configuration and sequencing errors are fatal.** An unknown
//!    controller strategy, a missing replay schedule, or an estimator
//!    update before initialization means there is no safe control
//!    behavior to fall back on; initialization must abort with a
//!    diagnostic.
//!
//! 2. **Sensor and numeric faults are not errors.** A saturated
//!    accelerometer, a suspicious barometric altitude, or a degenerate
//!    apogee prediction is handled locally (covariance gating, clamping,
//!    holding the last good value) and surfaced only as
//!    [`FaultFlags`](crate::telemetry::FaultFlags) in telemetry. They
//!    never appear in these enums.
//!
//! 3. **No heap in error values.** Variants carry scalars, `&'static str`,
//!    or bounded strings so errors stay cheap to return from the hot
//!    path. Only the std-gated schedule-loading variants own a `String`,
//!    since they occur once at startup.

use thiserror_no_std::Error;

/// Result type for control-core operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Fatal configuration problems detected at startup.
///
/// None of these are recoverable mid-flight; construction of the
/// [`FlightController`](crate::pipeline::FlightController) fails instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configured controller strategy name matched no known strategy.
    #[error("unknown controller strategy '{0}'")]
    UnknownStrategy(heapless::String<32>),

    /// A configuration scalar is outside its admissible range.
    #[error("invalid configuration parameter {name} = {value}")]
    InvalidParameter {
        /// Name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// The FileReplay strategy was selected but no deployment schedule
    /// was supplied.
    #[error("FileReplay strategy requires a deployment schedule")]
    MissingSchedule,

    /// A deployment schedule was supplied but contained no samples.
    #[error("deployment schedule is empty")]
    ScheduleEmpty,

    /// The schedule file could not be opened.
    #[cfg(feature = "std")]
    #[error("deployment schedule file not found: {0}")]
    ScheduleNotFound(String),

    /// A required column is missing from the schedule file header.
    #[cfg(feature = "std")]
    #[error("schedule column '{0}' not found in file header")]
    ScheduleColumn(String),

    /// A schedule row failed to parse as numbers.
    #[cfg(feature = "std")]
    #[error("malformed schedule row at line {0}")]
    ScheduleParse(usize),

    /// The schedule time unit was not one of `us`, `ms`, `s`.
    #[cfg(feature = "std")]
    #[error("invalid schedule time unit '{0}' (expected us, ms or s)")]
    ScheduleTimeUnit(String),
}

/// Estimator failures.
///
/// `Uninitialized` indicates a sequencing bug in the host loop and is
/// fatal; the numerical variants indicate a covariance collapse that
/// should never occur with sane noise configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorError {
    /// `update` was called before `initialize`.
    #[error("state estimator updated before initialization")]
    Uninitialized,

    /// The innovation covariance could not be inverted.
    #[error("innovation covariance is singular")]
    SingularInnovation,

    /// The error covariance lost positive definiteness or conditioning.
    #[error("error covariance is ill-conditioned")]
    IllConditioned,
}

/// Top-level error for the control pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Fatal configuration problem.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal estimator problem.
    #[error("estimator error: {0}")]
    Estimator(#[from] EstimatorError),
}
