//! Optimizer Strategies
//!
//! The apogee predictor is cheap and monotonic in deployment, so instead
//! of feeding its error through a tuned loop we can invert it directly:
//! find the deployment whose predicted apogee is closest to the target.
//! A golden-section search over [0, 1] needs no derivative, converges
//! unconditionally on the unimodal squared error, and runs a fixed
//! iteration count so the tick cost is deterministic.
//!
//! Two flavors:
//!
//! - [`OptimizerController`] commands the solved deployment directly,
//!   leaving smoothing entirely to the pipeline's rate limiter.
//! - [`OptimizerPidController`] treats the solved deployment as a
//!   setpoint and tracks it with an incremental PID on the
//!   deployment-space error. The error is measured against the command
//!   actually emitted last tick (after rate limiting), so the loop never
//!   winds up against the actuator's slew limit.

use crate::config::Config;
use crate::constants::OPTIMIZER_ITERATIONS;
use crate::control::pid::{deadband_attenuation, IncrementForm, IncrementalPid};
use crate::control::ControlInput;
use crate::predictor::predict_apogee;

/// Golden ratio conjugate, the bracket shrink factor per iteration.
const INV_PHI: f32 = 0.618_034;

/// Deployment in [0, 1] minimizing the squared apogee error for the
/// given state, by golden-section search.
fn solve_deployment(config: &Config, altitude: f32, velocity: f32, target: f32) -> f32 {
    let objective = |d: f32| {
        let miss = predict_apogee(config, altitude, velocity, d) - target;
        miss * miss
    };

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut a = hi - INV_PHI * (hi - lo);
    let mut b = lo + INV_PHI * (hi - lo);
    let mut f_a = objective(a);
    let mut f_b = objective(b);

    for _ in 0..OPTIMIZER_ITERATIONS {
        if f_a < f_b {
            hi = b;
            b = a;
            f_b = f_a;
            a = hi - INV_PHI * (hi - lo);
            f_a = objective(a);
        } else {
            lo = a;
            a = b;
            f_a = f_b;
            b = lo + INV_PHI * (hi - lo);
            f_b = objective(b);
        }
    }
    0.5 * (lo + hi)
}

/// Direct predictor inversion.
#[derive(Debug, Clone, Default)]
pub struct OptimizerController;

impl OptimizerController {
    /// Creates the controller (stateless).
    pub fn new() -> Self {
        Self
    }

    /// Desired deployment for this tick.
    pub fn compute(&mut self, config: &Config, input: &ControlInput) -> f32 {
        solve_deployment(config, input.altitude, input.velocity, config.target_apogee)
    }
}

/// Optimizer setpoint tracked by an incremental PID.
#[derive(Debug, Clone)]
pub struct OptimizerPidController {
    pid: IncrementalPid,
    settle_after: f32,
}

impl OptimizerPidController {
    /// Builds the controller from the flight configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            pid: IncrementalPid::new(),
            settle_after: config.burn_time + config.settling_time,
        }
    }

    /// Desired deployment for this tick.
    pub fn compute(&mut self, config: &Config, input: &ControlInput) -> f32 {
        let setpoint =
            solve_deployment(config, input.altitude, input.velocity, config.target_apogee);
        let error = setpoint - input.previous_command;
        // The deadband is specified in meters of apogee error, so the
        // attenuation is taken from the apogee-space error even though
        // the loop runs in deployment space.
        let attenuation = deadband_attenuation(config, input.apogee_error);
        let integrate = input.time_since_liftoff > self.settle_after;
        // The setpoint error lives in deployment units already, so the
        // whole increment advances at the tick rate.
        self.pid.step(
            config,
            error,
            input.dt,
            attenuation,
            integrate,
            IncrementForm::DtScaled,
        )
    }

    /// Clears accumulated state.
    pub fn reset(&mut self) {
        self.pid.reset();
    }
}
