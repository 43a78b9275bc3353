//! Shared test harness: deterministic noise and a closed-loop flight
//! simulator.
//!
//! The simulator integrates simple 1-D vertical dynamics with the same
//! quadratic drag model the controller assumes, feeds synthetic baro and
//! accel readings into a [`FlightController`], and applies the commanded
//! deployment back to the physics. It is the ground truth the
//! integration tests measure the controller against.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use brakeguard_core::constants::{
    BAROMETRIC_EXPONENT, BAROMETRIC_SCALE_M, GRAVITY_M_PER_S2, SEA_LEVEL_PRESSURE_PA,
};
use brakeguard_core::{Config, FlightController, FlightPhase, SensorSample, TelemetryRecord};

/// Deterministic xorshift RNG so test runs are reproducible.
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Standard normal via Box-Muller.
    pub fn gaussian(&mut self, std: f32) -> f32 {
        let u1 = self.next_f32().max(1e-7);
        let u2 = self.next_f32();
        let mag = (-2.0 * u1.ln()).sqrt();
        std * mag * (core::f32::consts::TAU * u2).cos()
    }
}

/// Pressure a perfect barometer would read at `altitude` m AGL with the
/// ground at standard sea level.
pub fn pressure_at(altitude: f32) -> f32 {
    SEA_LEVEL_PRESSURE_PA
        * (1.0 - altitude / BAROMETRIC_SCALE_M).powf(1.0 / BAROMETRIC_EXPONENT)
}

/// Outcome of one simulated flight.
pub struct SimResult {
    /// Highest true altitude reached (m AGL).
    pub apogee: f32,
    /// Every telemetry record the controller produced.
    pub records: Vec<TelemetryRecord>,
}

impl SimResult {
    /// Records produced while control was active.
    pub fn active_records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records
            .iter()
            .filter(|r| r.phase == FlightPhase::CoastActive)
    }
}

/// Closed-loop 1-D flight simulator.
pub struct FlightSim {
    pub config: Config,
    pub rng: TestRng,
    /// Net kinematic acceleration commanded by the motor before gravity
    /// and drag (m/s²).
    pub thrust_accel: f32,
    /// Barometer noise std (m of altitude equivalent, applied to the
    /// true altitude before conversion to pressure).
    pub alt_noise_std: f32,
    /// Accelerometer noise std (m/s²).
    pub accel_noise_std: f32,
}

impl FlightSim {
    pub fn new(config: Config, seed: u32) -> Self {
        Self {
            config,
            rng: TestRng::new(seed),
            thrust_accel: 65.0,
            alt_noise_std: 0.25,
            accel_noise_std: 0.3,
        }
    }

    /// Flies one complete flight through the controller and returns the
    /// truth apogee plus the telemetry stream. The simulated burn starts
    /// `pad_time` seconds in, after calibration has had time to finish.
    pub fn fly(&mut self, controller: &mut FlightController, pad_time: f32) -> SimResult {
        let dt = 1.0 / self.config.sampling_rate as f32;
        let sat_limit = self.config.accel_saturation_g * GRAVITY_M_PER_S2;
        let mass = self.config.burnout_mass;

        let mut t = 0.0f32;
        let mut altitude = 0.0f32;
        let mut velocity = 0.0f32;
        let mut deployment = 0.0f32;
        let mut apogee = 0.0f32;
        let mut records = Vec::new();
        let mut descent_ticks = 0;

        loop {
            let burning = t >= pad_time && t < pad_time + self.config.burn_time;
            let flying = t >= pad_time;

            // True kinematic acceleration.
            let cd = self.config.rocket_cd + self.config.airbrake_cd * deployment;
            let k = 0.5 * self.config.air_density * cd * self.config.reference_area;
            let drag = k * velocity * velocity.abs() / mass;
            let accel = if !flying {
                0.0
            } else if burning {
                self.thrust_accel - GRAVITY_M_PER_S2 - drag
            } else {
                -GRAVITY_M_PER_S2 - drag
            };

            // Sensors observe the truth plus noise; the accelerometer
            // clips at its range limit like real hardware.
            let measured_alt = altitude + self.rng.gaussian(self.alt_noise_std);
            let measured_accel =
                (accel + self.rng.gaussian(self.accel_noise_std)).clamp(-sat_limit, sat_limit);
            let sample = SensorSample {
                time: t,
                pressure: Some(pressure_at(measured_alt.max(-50.0))),
                accel: Some(measured_accel),
            };
            let record = controller.tick(&sample).expect("tick failed");
            deployment = record.commanded_deployment;
            records.push(record);

            // Integrate the truth forward.
            if flying {
                velocity += accel * dt;
                altitude += velocity * dt;
                apogee = apogee.max(altitude);
            }
            t += dt;

            if flying && velocity < 0.0 {
                descent_ticks += 1;
                if descent_ticks > 20 || altitude < 0.0 {
                    break;
                }
            }
            assert!(t < 60.0, "simulation failed to reach apogee");
        }

        SimResult { apogee, records }
    }
}

/// The apogee this configuration reaches with the brake never deployed.
pub fn no_brake_apogee(config: &Config, seed: u32) -> f32 {
    let mut cfg = config.clone();
    cfg.airbrakes_enabled = false;
    let mut sim = FlightSim::new(cfg.clone(), seed);
    let mut fc = FlightController::new(cfg).expect("controller");
    sim.fly(&mut fc, 0.5).apogee
}
