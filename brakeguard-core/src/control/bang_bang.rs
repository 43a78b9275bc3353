//! Bang-Bang Strategy
//!
//! The simplest possible policy, kept deliberately deadband-free as a
//! reference and worst-case strategy: if the rocket would overshoot the
//! target with the brake retracted, deploy fully; otherwise retract
//! fully. Decisions are made on the no-brake error so the strategy does
//! not argue with its own braking (the with-brake prediction drops as
//! soon as the brake opens, which would immediately retract it again).
//! Chatter around the switching point is bounded only by the pipeline's
//! rate limiter.

use crate::config::Config;
use crate::control::ControlInput;

/// Full-deploy / full-retract on the sign of the no-brake error.
#[derive(Debug, Clone, Default)]
pub struct BangBangController;

impl BangBangController {
    /// Creates the controller (stateless).
    pub fn new() -> Self {
        Self
    }

    /// Desired deployment for this tick.
    pub fn compute(&mut self, _config: &Config, input: &ControlInput) -> f32 {
        if input.apogee_error_no_brake > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(error_no_brake: f32) -> ControlInput {
        ControlInput {
            time: 3.0,
            dt: 0.05,
            time_since_liftoff: 3.0,
            altitude: 180.0,
            velocity: 25.0,
            acceleration: -11.0,
            predicted_apogee: 225.0,
            predicted_apogee_no_brake: 228.6 + error_no_brake,
            apogee_error: error_no_brake - 3.0,
            apogee_error_no_brake: error_no_brake,
            previous_command: 0.0,
        }
    }

    #[test]
    fn overshoot_deploys_undershoot_retracts() {
        let cfg = Config::default();
        let mut bb = BangBangController::new();
        assert_eq!(bb.compute(&cfg, &input(5.0)), 1.0);
        assert_eq!(bb.compute(&cfg, &input(-5.0)), 0.0);
        assert_eq!(bb.compute(&cfg, &input(0.0)), 0.0);
    }

    #[test]
    fn ignores_the_deadband() {
        // The reference strategy is deliberately deadband-free.
        let cfg = Config {
            deadband: 10.0,
            ..Config::default()
        };
        let mut bb = BangBangController::new();
        assert_eq!(bb.compute(&cfg, &input(0.5)), 1.0);
        assert_eq!(bb.compute(&cfg, &input(-0.5)), 0.0);
    }
}
