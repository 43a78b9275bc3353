//! Deployment Control Strategies
//!
//! Every strategy maps the same per-tick [`ControlInput`] to a desired
//! airbrake deployment fraction in [0, 1]. The pipeline owns the shared
//! post-processing (error shaping, rate limiting, phase gating); a
//! strategy only decides how much brake it wants.
//!
//! Strategies are dispatched through the [`Controller`] enum rather than
//! trait objects so the whole control path stays allocation-free and
//! monomorphic on no_std targets.
//!
//! Sign convention: apogee errors are `predicted − target`, so a
//! positive error means the rocket will overshoot and needs more brake.

pub mod bang_bang;
pub mod optimizer;
pub mod pid;
#[cfg(feature = "std")]
pub mod replay;
pub mod shaping;

pub use bang_bang::BangBangController;
pub use optimizer::{OptimizerController, OptimizerPidController};
pub use pid::PidController;
#[cfg(feature = "std")]
pub use replay::{DeploymentSchedule, ScheduleReplayController};
pub use shaping::{shape_error, RateLimiter};

use crate::config::{Config, Strategy};
use crate::errors::ConfigError;

/// Everything a strategy may consume on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInput {
    /// Sample timestamp (s).
    pub time: f32,
    /// Interval since the previous tick (s).
    pub dt: f32,
    /// Seconds since liftoff was declared.
    pub time_since_liftoff: f32,
    /// Filtered altitude (m AGL).
    pub altitude: f32,
    /// Filtered vertical velocity (m/s).
    pub velocity: f32,
    /// Filtered vertical acceleration (m/s²).
    pub acceleration: f32,
    /// Predicted apogee at the current deployment (m AGL).
    pub predicted_apogee: f32,
    /// Predicted apogee with the brake retracted (m AGL).
    pub predicted_apogee_no_brake: f32,
    /// `predicted_apogee − target` (m); positive means overshoot.
    pub apogee_error: f32,
    /// `predicted_apogee_no_brake − target` (m).
    pub apogee_error_no_brake: f32,
    /// The deployment actually commanded last tick, after rate limiting.
    pub previous_command: f32,
}

/// Strategy dispatch.
#[derive(Debug, Clone)]
pub enum Controller {
    /// Incremental PID on the shaped apogee error.
    Pid(PidController),
    /// Sign-of-error full deploy / full retract.
    BangBang(BangBangController),
    /// Per-tick inversion of the apogee predictor.
    Optimizer(OptimizerController),
    /// Optimizer setpoint tracked by an incremental PID.
    OptimizerPid(OptimizerPidController),
    /// Pre-recorded deployment schedule replay.
    #[cfg(feature = "std")]
    FileReplay(ScheduleReplayController),
}

impl Controller {
    /// Builds the controller selected by `config.strategy`.
    ///
    /// [`Strategy::FileReplay`] needs a schedule and must be built with
    /// [`Controller::with_schedule`]; selecting it here is a
    /// configuration error.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.strategy {
            Strategy::Pid => Ok(Controller::Pid(PidController::new(config))),
            Strategy::BangBang => Ok(Controller::BangBang(BangBangController::new())),
            Strategy::Optimizer => Ok(Controller::Optimizer(OptimizerController::new())),
            Strategy::OptimizerPid => {
                Ok(Controller::OptimizerPid(OptimizerPidController::new(config)))
            }
            Strategy::FileReplay => Err(ConfigError::MissingSchedule),
        }
    }

    /// Builds a schedule-replay controller regardless of the configured
    /// strategy name.
    #[cfg(feature = "std")]
    pub fn with_schedule(schedule: DeploymentSchedule) -> Self {
        Controller::FileReplay(ScheduleReplayController::new(schedule))
    }

    /// Desired deployment fraction for this tick, in [0, 1], before
    /// rate limiting.
    pub fn compute(&mut self, config: &Config, input: &ControlInput) -> f32 {
        match self {
            Controller::Pid(c) => c.compute(config, input),
            Controller::BangBang(c) => c.compute(config, input),
            Controller::Optimizer(c) => c.compute(config, input),
            Controller::OptimizerPid(c) => c.compute(config, input),
            #[cfg(feature = "std")]
            Controller::FileReplay(c) => c.compute(input),
        }
    }

    /// Clears accumulated state (integral windows, setpoint history).
    pub fn reset(&mut self) {
        match self {
            Controller::Pid(c) => c.reset(),
            Controller::BangBang(_) => {}
            Controller::Optimizer(_) => {}
            Controller::OptimizerPid(c) => c.reset(),
            #[cfg(feature = "std")]
            Controller::FileReplay(_) => {}
        }
    }
}
