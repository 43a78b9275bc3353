//! Incremental PID Strategy
//!
//! Works in deployment increments rather than absolute commands: each
//! tick adds `kp·e·dt + kd·(Δe/dt) + ki·Σ(e·dt)` to the running
//! deployment. The incremental form has no setpoint kick and bumplessly
//! picks up from wherever the brake currently sits.
//!
//! Two anti-windup measures bound the integral term:
//!
//! - the error history is a trailing window (`integral_window` seconds),
//!   so old error cannot dominate forever;
//! - the windowed sum only enters the output `settling_time` seconds
//!   after burnout, when the estimator has recovered from the
//!   saturated-accelerometer stretch of the burn and the error signal is
//!   trustworthy. The window itself keeps filling from the first tick,
//!   so the first post-settling increment sees the trailing history
//!   rather than an empty sum.
//!
//! The deadband attenuates the whole increment rather than the error
//! alone, so inside the band the deployment freezes smoothly instead of
//! creeping on the integral term.

use heapless::Deque;

use crate::config::Config;
use crate::constants::{MIN_DT_SECONDS, PID_WINDOW_CAPACITY};
use crate::control::shaping::shape_error;
use crate::control::ControlInput;

/// How the three terms combine into a deployment change.
///
/// The apogee-space loop weights each term with its own time factor;
/// the deployment-space setpoint loop advances the whole sum at the
/// tick rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IncrementForm {
    /// `kp·e·dt + kd·(Δe/dt) + ki·Σ(e·dt)`
    PerTerm,
    /// `(kp·e + kd·(Δe/dt) + ki·Σ(e·dt))·dt`
    DtScaled,
}

/// Shared incremental-PID state, also driven by the optimizer-tracking
/// strategy with a deployment-space error.
#[derive(Debug, Clone)]
pub(crate) struct IncrementalPid {
    deployment: f32,
    last_error: Option<f32>,
    window: Deque<f32, PID_WINDOW_CAPACITY>,
}

impl IncrementalPid {
    pub(crate) fn new() -> Self {
        Self {
            deployment: 0.0,
            last_error: None,
            window: Deque::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.deployment = 0.0;
        self.last_error = None;
        self.window.clear();
    }

    /// One increment step. `attenuation` scales the whole change;
    /// `integrate` gates whether the windowed sum enters the output
    /// (the window itself accumulates every tick).
    pub(crate) fn step(
        &mut self,
        config: &Config,
        error: f32,
        dt: f32,
        attenuation: f32,
        integrate: bool,
        form: IncrementForm,
    ) -> f32 {
        let dt = dt.max(MIN_DT_SECONDS);
        let window_len =
            ((config.sampling_rate as f32 * config.integral_window) as usize).min(PID_WINDOW_CAPACITY);

        if self.window.len() >= window_len {
            self.window.pop_front();
        }
        // Capacity is bounded by window_len above; a full deque
        // cannot occur, but don't panic if it ever does.
        let _ = self.window.push_back(error * dt);
        let integral: f32 = if integrate {
            self.window.iter().sum()
        } else {
            0.0
        };

        let derivative = match self.last_error {
            Some(last) => (error - last) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        let change = match form {
            IncrementForm::PerTerm => {
                config.kp * error * dt + config.kd * derivative + config.ki * integral
            }
            IncrementForm::DtScaled => {
                (config.kp * error + config.kd * derivative + config.ki * integral) * dt
            }
        } * attenuation;
        self.deployment = (self.deployment + change).clamp(0.0, 1.0);
        self.deployment
    }
}

/// Attenuation factor implied by the deadband: the ratio of the shaped
/// error to the raw error, capped at 1.
pub(crate) fn deadband_attenuation(config: &Config, error: f32) -> f32 {
    let magnitude = error.abs();
    if magnitude < 1e-6 {
        return 0.0;
    }
    (shape_error(config, error).abs() / magnitude).min(1.0)
}

/// PID on the with-brake apogee error.
#[derive(Debug, Clone)]
pub struct PidController {
    pid: IncrementalPid,
    settle_after: f32,
}

impl PidController {
    /// Builds the controller; the integral engages `settling_time`
    /// seconds after the configured burnout.
    pub fn new(config: &Config) -> Self {
        Self {
            pid: IncrementalPid::new(),
            settle_after: config.burn_time + config.settling_time,
        }
    }

    /// Desired deployment for this tick.
    pub fn compute(&mut self, config: &Config, input: &ControlInput) -> f32 {
        let error = input.apogee_error;
        let attenuation = deadband_attenuation(config, error);
        let integrate = input.time_since_liftoff > self.settle_after;
        self.pid
            .step(config, error, input.dt, attenuation, integrate, IncrementForm::PerTerm)
    }

    /// Clears the accumulated deployment and error history.
    pub fn reset(&mut self) {
        self.pid.reset();
    }
}
