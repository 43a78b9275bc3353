//! Flight Phase Gating
//!
//! A small state machine that decides when the airbrake is allowed to
//! act. The brake must never deploy on the pad or under thrust: on the
//! pad it would desensitize calibration, and under thrust the drag model
//! behind the apogee predictor is invalid. After apogee the command is
//! frozen; recovery events own the actuator from there.
//!
//! ```text
//! Prelaunch ──liftoff──► Burn ──burnout──► CoastInactive ──v>0, enabled──► CoastActive
//!                                                └────────────v≤0──► Descent ◄──v≤0────┘
//! ```
//!
//! Liftoff is declared on filtered velocity crossing the configured
//! threshold; burnout on elapsed time since liftoff reaching the
//! configured burn time. A velocity-based burnout detector would react
//! to motor variation, but the timer is robust against the very
//! acceleration-saturation faults that occur during burn, which is why
//! the configured time wins.
//!
//! Descent is only evaluated from the coast states. Velocity hovers
//! around zero on the pad, so an any-state rule would trip straight to
//! Descent before liftoff.

use crate::config::Config;
use crate::macros::log_info;

/// Flight phase as seen by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlightPhase {
    /// On the pad; calibration runs here.
    Prelaunch,
    /// Motor burning; estimator runs, control held at zero.
    Burn,
    /// Coasting with airbrakes disabled; command held at zero.
    CoastInactive,
    /// Coasting with control authority; strategies command the brake.
    CoastActive,
    /// Past apogee; brake retracts and stays retracted.
    Descent,
}

/// Phase state machine fed with filtered velocity each tick.
#[derive(Debug, Clone)]
pub struct FlightPhaseGate {
    phase: FlightPhase,
    liftoff_velocity: f32,
    burn_time: f32,
    airbrakes_enabled: bool,
    liftoff_time: Option<f32>,
}

impl FlightPhaseGate {
    /// Builds a gate from the flight configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            phase: FlightPhase::Prelaunch,
            liftoff_velocity: config.liftoff_velocity,
            burn_time: config.burn_time,
            airbrakes_enabled: config.airbrakes_enabled,
            liftoff_time: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// Timestamp at which liftoff was declared, if it has happened.
    pub fn liftoff_time(&self) -> Option<f32> {
        self.liftoff_time
    }

    /// Seconds since liftoff, or zero before liftoff.
    pub fn time_since_liftoff(&self, time: f32) -> f32 {
        match self.liftoff_time {
            Some(t0) => (time - t0).max(0.0),
            None => 0.0,
        }
    }

    /// True while the motor is assumed to be producing thrust.
    pub fn is_burning(&self) -> bool {
        self.phase == FlightPhase::Burn
    }

    /// True when a strategy's command should drive the actuator.
    pub fn is_control_active(&self) -> bool {
        self.phase == FlightPhase::CoastActive
    }

    /// Advances the state machine one tick. Transitions are one-way;
    /// the gate never returns to an earlier phase. Burnout cascades
    /// into activation on the same tick when the brakes are enabled
    /// and the rocket is still ascending.
    pub fn update(&mut self, time: f32, velocity: f32) -> FlightPhase {
        match self.phase {
            FlightPhase::Prelaunch => {
                if velocity >= self.liftoff_velocity {
                    self.liftoff_time = Some(time);
                    self.phase = FlightPhase::Burn;
                    log_info!("liftoff detected at t={} s (v={} m/s)", time, velocity);
                }
            }
            FlightPhase::Burn => {
                if self.time_since_liftoff(time) >= self.burn_time {
                    self.phase = FlightPhase::CoastInactive;
                    log_info!("burnout at t={} s", time);
                }
            }
            FlightPhase::CoastActive | FlightPhase::CoastInactive => {}
            FlightPhase::Descent => {}
        }
        if self.phase == FlightPhase::CoastInactive && self.airbrakes_enabled && velocity > 0.0 {
            self.phase = FlightPhase::CoastActive;
            log_info!("control active at t={} s", time);
        }
        if matches!(
            self.phase,
            FlightPhase::CoastActive | FlightPhase::CoastInactive
        ) && velocity <= 0.0
        {
            self.phase = FlightPhase::Descent;
            log_info!("apogee passed at t={} s", time);
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(enabled: bool) -> FlightPhaseGate {
        let cfg = Config {
            airbrakes_enabled: enabled,
            ..Config::default()
        };
        FlightPhaseGate::new(&cfg)
    }

    #[test]
    fn pad_noise_does_not_trigger_liftoff_or_descent() {
        let mut g = gate(true);
        for (t, v) in [(0.0, 0.1), (0.05, -0.2), (0.10, 0.4), (0.15, -0.1)] {
            assert_eq!(g.update(t, v), FlightPhase::Prelaunch);
        }
    }

    #[test]
    fn full_flight_sequence() {
        let mut g = gate(true);
        assert_eq!(g.update(1.0, 0.0), FlightPhase::Prelaunch);
        // Liftoff
        assert_eq!(g.update(1.05, 8.0), FlightPhase::Burn);
        assert_eq!(g.liftoff_time(), Some(1.05));
        // Still burning just before the configured burn time elapses
        assert_eq!(g.update(2.40, 60.0), FlightPhase::Burn);
        // Burnout at liftoff + burn_time (1.4 s)
        assert_eq!(g.update(2.45, 62.0), FlightPhase::CoastActive);
        assert!(g.is_control_active());
        // Coast continues while ascending
        assert_eq!(g.update(4.0, 20.0), FlightPhase::CoastActive);
        // Apogee
        assert_eq!(g.update(6.0, -0.5), FlightPhase::Descent);
        // Terminal
        assert_eq!(g.update(7.0, 30.0), FlightPhase::Descent);
    }

    #[test]
    fn disabled_airbrakes_never_activate() {
        let mut g = gate(false);
        g.update(0.0, 5.0);
        let phase = g.update(1.5, 50.0);
        assert_eq!(phase, FlightPhase::CoastInactive);
        assert!(!g.is_control_active());
        assert_eq!(g.update(5.0, -1.0), FlightPhase::Descent);
    }

    #[test]
    fn burn_ends_on_time_not_velocity() {
        let mut g = gate(true);
        g.update(0.0, 10.0);
        // Velocity momentarily dips (chuffing) during burn; stay in Burn.
        assert_eq!(g.update(0.5, -1.0), FlightPhase::Burn);
    }
}
