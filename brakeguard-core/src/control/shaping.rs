//! Command Shaping: Deadband and Rate Limiting
//!
//! Two protections shared by every strategy:
//!
//! - **Error shaping** keeps the actuator quiet once the predicted
//!   apogee is close enough to the target that further correction is
//!   below sensor noise. Constant chatter near the setpoint wears the
//!   servo and buys no accuracy.
//! - **Rate limiting** bounds how fast the commanded deployment may
//!   change, matching the mechanical slew rate of the brake. Commands
//!   the hardware cannot follow would make the predictor's notion of
//!   the current drag state wrong.

use crate::config::{Config, DeadbandMode};

/// Shapes a raw apogee error according to the configured deadband mode.
///
/// Proportional mode scales the error quadratically toward zero inside
/// the band (`e·|e|/deadband`), giving a smooth approach with no
/// discontinuity at the band edge. Hysteresis mode zeroes the error
/// inside the band and re-references it to the band edge outside.
pub fn shape_error(config: &Config, error: f32) -> f32 {
    let deadband = config.deadband;
    if deadband <= 0.0 {
        return error;
    }
    let magnitude = error.abs();
    match config.deadband_mode {
        DeadbandMode::Proportional => {
            if magnitude < deadband {
                error * magnitude / deadband
            } else {
                error
            }
        }
        DeadbandMode::Hysteresis => {
            if magnitude < deadband {
                0.0
            } else {
                let sign = if error >= 0.0 { 1.0 } else { -1.0 };
                sign * (magnitude - deadband) * config.hysteresis_factor
            }
        }
    }
}

/// Slew-rate limiter with memory of the last emitted command.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    current: f32,
    max_rate: f32,
}

impl RateLimiter {
    /// Creates a limiter starting from a retracted brake.
    pub fn new(max_rate: f32) -> Self {
        Self {
            current: 0.0,
            max_rate,
        }
    }

    /// The last emitted command.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Limits `requested` against the previous command: the change is
    /// capped at `max_rate · dt` and the result clamped to [0, 1].
    /// Returns the emitted command and whether the cap bound.
    pub fn limit(&mut self, requested: f32, dt: f32) -> (f32, bool) {
        let max_step = self.max_rate * dt.max(0.0);
        let delta = requested - self.current;
        let limited = delta.abs() > max_step;
        let step = delta.clamp(-max_step, max_step);
        self.current = (self.current + step).clamp(0.0, 1.0);
        (self.current, limited)
    }

    /// Snaps the limiter to a known position (e.g. retract on descent).
    pub fn force(&mut self, value: f32) {
        self.current = value.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(mode: DeadbandMode) -> Config {
        Config {
            deadband: 2.0,
            hysteresis_factor: 0.5,
            deadband_mode: mode,
            ..Config::default()
        }
    }

    #[test]
    fn proportional_shaping_is_quadratic_inside_band() {
        let c = cfg(DeadbandMode::Proportional);
        assert_eq!(shape_error(&c, 1.0), 0.5);
        assert_eq!(shape_error(&c, -1.0), -0.5);
        // Continuous at the edge, identity outside
        assert_eq!(shape_error(&c, 2.0), 2.0);
        assert_eq!(shape_error(&c, 5.0), 5.0);
    }

    #[test]
    fn hysteresis_shaping_zeroes_band() {
        let c = cfg(DeadbandMode::Hysteresis);
        assert_eq!(shape_error(&c, 1.5), 0.0);
        assert_eq!(shape_error(&c, -1.5), 0.0);
        assert_eq!(shape_error(&c, 4.0), 1.0);
        assert_eq!(shape_error(&c, -4.0), -1.0);
    }

    #[test]
    fn zero_deadband_passes_through() {
        let c = Config {
            deadband: 0.0,
            ..Config::default()
        };
        assert_eq!(shape_error(&c, 0.05), 0.05);
    }

    #[test]
    fn rate_limiter_caps_step() {
        let mut rl = RateLimiter::new(2.5);
        // Step toward full deploy at 20 Hz: max 0.125 per tick
        let (out, limited) = rl.limit(1.0, 0.05);
        assert!((out - 0.125).abs() < 1e-6);
        assert!(limited);

        // Small request passes unlimited
        let (out, limited) = rl.limit(0.15, 0.05);
        assert!((out - 0.15).abs() < 1e-6);
        assert!(!limited);
    }

    #[test]
    fn rate_limiter_clamps_to_unit_interval() {
        let mut rl = RateLimiter::new(100.0);
        let (out, _) = rl.limit(2.0, 1.0);
        assert_eq!(out, 1.0);
        let (out, _) = rl.limit(-1.0, 1.0);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn repeated_limited_steps_converge() {
        let mut rl = RateLimiter::new(2.5);
        for _ in 0..20 {
            rl.limit(1.0, 0.05);
        }
        assert_eq!(rl.current(), 1.0);
    }
}
