//! Vertical State Estimation
//!
//! ## Overview
//!
//! A 3-state Kalman filter tracking `[altitude, velocity, acceleration]`
//! from noisy barometric altitude and (optionally) vertical acceleration.
//! The filter is the single source of truth for the control loop: the
//! apogee predictor and every deployment strategy consume its output, so
//! its tuning directly bounds how well the brake can hit the target.
//!
//! ## Process Model
//!
//! Constant-acceleration kinematics with a decaying acceleration state:
//!
//! ```text
//!     ⎡1   dt  dt²/2⎤
//! F = ⎢0   1   dt   ⎥
//!     ⎣0   0   λ    ⎦
//! ```
//!
//! The decay factor λ < 1 encodes that acceleration information goes
//! stale: thrust and drag both change faster than the filter can track,
//! so the state is pulled toward zero between measurements. λ and the
//! process noise are switched between burn and coast values because the
//! dynamics differ by an order of magnitude across the two regimes.
//!
//! ## Measurement Models
//!
//! - [`EstimatorMode::AltOnly`]: `H = [1 0 0]`, barometer only.
//! - [`EstimatorMode::AltAccel`]: `H = [[1 0 0], [0 0 1]]`, barometer
//!   plus accelerometer.
//!
//! ## Saturation Gating
//!
//! Cheap accelerometers clip during motor burn. A saturated (or missing)
//! acceleration channel is gated out for exactly one tick by substituting
//! a huge measurement variance, which collapses that channel's Kalman
//! gain to ~0 without touching the filter state. The barometer channel is
//! unaffected and the real variance is restored on the next tick.

use crate::config::Config;
use crate::constants::{MIN_DT_SECONDS, SATURATED_ACCEL_VARIANCE};
use crate::errors::EstimatorError;
use crate::matrix::{
    add, invert, is_well_conditioned, make_symmetric, matvec, multiply, transpose, Matrix,
    SquareMatrix, Vector,
};

/// Number of filter states: altitude, velocity, acceleration.
const N: usize = 3;

/// Which sensor channels the filter fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMode {
    /// Barometric altitude only.
    AltOnly,
    /// Barometric altitude plus vertical acceleration.
    AltAccel,
}

/// One tick's sensor input to the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Converted barometric altitude (m AGL).
    pub altitude_agl: f32,
    /// Vertical acceleration excluding gravity (m/s²), if available.
    pub accel: Option<f32>,
    /// True when the acceleration reading is clipped at the sensor's
    /// range limit and must not be trusted this tick.
    pub accel_saturated: bool,
}

/// Filtered vertical state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateEstimate {
    /// Altitude above ground level (m).
    pub altitude: f32,
    /// Vertical velocity (m/s).
    pub velocity: f32,
    /// Vertical acceleration (m/s²).
    pub acceleration: f32,
}

/// Fixed-dimension Kalman core, generic over the measurement count.
#[derive(Debug, Clone)]
struct KalmanCore<const M: usize> {
    x: Vector<N>,
    p: SquareMatrix<N>,
    h: Matrix<M, N>,
    r: SquareMatrix<M>,
}

impl<const M: usize> KalmanCore<M> {
    fn new(h: Matrix<M, N>, r: SquareMatrix<M>) -> Self {
        Self {
            x: [0.0; N],
            p: [[0.0; N]; N],
            h,
            r,
        }
    }

    /// Time update: propagate state and covariance through F, add Q.
    fn predict(&mut self, dt: f32, decay: f32, q_diag: &[f32; N]) {
        let f: SquareMatrix<N> = [
            [1.0, dt, 0.5 * dt * dt],
            [0.0, 1.0, dt],
            [0.0, 0.0, decay],
        ];

        let mut x_new = [0.0; N];
        matvec(&f, &self.x, &mut x_new);
        self.x = x_new;

        // P = F P Fᵀ + Q
        let mut fp = [[0.0; N]; N];
        multiply(&f, &self.p, &mut fp);
        let mut f_t = [[0.0; N]; N];
        transpose(&f, &mut f_t);
        let mut fpf_t = [[0.0; N]; N];
        multiply(&fp, &f_t, &mut fpf_t);

        let mut q = [[0.0; N]; N];
        for i in 0..N {
            q[i][i] = q_diag[i];
        }
        add(&fpf_t, &q, &mut self.p);
        make_symmetric(&mut self.p);
    }

    /// Measurement update with a per-tick measurement covariance
    /// (allows the saturation gate to inflate one channel).
    fn update(&mut self, z: &Vector<M>, r: &SquareMatrix<M>) -> Result<(), EstimatorError> {
        // Innovation: y = z − H x
        let mut h_x = [0.0; M];
        matvec(&self.h, &self.x, &mut h_x);
        let mut innovation = [0.0; M];
        for i in 0..M {
            innovation[i] = z[i] - h_x[i];
        }

        // S = H P Hᵀ + R
        let mut hp: Matrix<M, N> = [[0.0; N]; M];
        multiply(&self.h, &self.p, &mut hp);
        let mut h_t: Matrix<N, M> = [[0.0; M]; N];
        transpose(&self.h, &mut h_t);
        let mut hph_t: SquareMatrix<M> = [[0.0; M]; M];
        multiply(&hp, &h_t, &mut hph_t);
        let mut s: SquareMatrix<M> = [[0.0; M]; M];
        add(&hph_t, r, &mut s);

        let mut s_inv: SquareMatrix<M> = [[0.0; M]; M];
        if !invert(&s, &mut s_inv) {
            return Err(EstimatorError::SingularInnovation);
        }

        // K = P Hᵀ S⁻¹
        let mut ph_t: Matrix<N, M> = [[0.0; M]; N];
        multiply(&self.p, &h_t, &mut ph_t);
        let mut k: Matrix<N, M> = [[0.0; M]; N];
        multiply(&ph_t, &s_inv, &mut k);

        // x = x + K y
        let mut correction = [0.0; N];
        matvec(&k, &innovation, &mut correction);
        for i in 0..N {
            self.x[i] += correction[i];
        }

        // P = (I − K H) P
        let mut kh: SquareMatrix<N> = [[0.0; N]; N];
        multiply(&k, &self.h, &mut kh);
        let mut i_minus_kh: SquareMatrix<N> = [[0.0; N]; N];
        for i in 0..N {
            for j in 0..N {
                let identity = if i == j { 1.0 } else { 0.0 };
                i_minus_kh[i][j] = identity - kh[i][j];
            }
        }
        let p_old = self.p;
        multiply(&i_minus_kh, &p_old, &mut self.p);
        make_symmetric(&mut self.p);

        if !is_well_conditioned(&self.p) {
            return Err(EstimatorError::IllConditioned);
        }
        Ok(())
    }
}

/// Mode-selected filter core.
#[derive(Debug, Clone)]
enum Core {
    AltOnly(KalmanCore<1>),
    AltAccel(KalmanCore<2>),
}

/// The vertical state estimator.
///
/// Call [`initialize`](StateEstimator::initialize) once calibration has
/// produced a first altitude, then [`update`](StateEstimator::update)
/// every tick. Updating before initializing is a sequencing bug and
/// returns [`EstimatorError::Uninitialized`].
#[derive(Debug, Clone)]
pub struct StateEstimator {
    core: Core,
    q_burn: [f32; N],
    q_coast: [f32; N],
    decay_burn: f32,
    decay_coast: f32,
    initial_p: [f32; N],
    nominal_dt: f32,
    last_time: Option<f32>,
    initialized: bool,
}

impl StateEstimator {
    /// Builds an estimator from the flight configuration.
    pub fn new(config: &Config, mode: EstimatorMode) -> Self {
        let core = match mode {
            EstimatorMode::AltOnly => {
                let h = [[1.0, 0.0, 0.0]];
                let r = [[config.alt_std * config.alt_std]];
                Core::AltOnly(KalmanCore::new(h, r))
            }
            EstimatorMode::AltAccel => {
                let h = [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
                let r = [
                    [config.alt_std * config.alt_std, 0.0],
                    [0.0, config.accel_std * config.accel_std],
                ];
                Core::AltAccel(KalmanCore::new(h, r))
            }
        };
        Self {
            core,
            q_burn: [
                config.model_y_std_burn * config.model_y_std_burn,
                config.model_v_std_burn * config.model_v_std_burn,
                config.model_a_std_burn * config.model_a_std_burn,
            ],
            q_coast: [
                config.model_y_std_coast * config.model_y_std_coast,
                config.model_v_std_coast * config.model_v_std_coast,
                config.model_a_std_coast * config.model_a_std_coast,
            ],
            decay_burn: config.accel_decay_burn,
            decay_coast: config.accel_decay_coast,
            initial_p: [
                config.initial_alt_var,
                config.initial_vel_var,
                config.initial_accel_var,
            ],
            nominal_dt: config.nominal_dt(),
            last_time: None,
            initialized: false,
        }
    }

    /// Which channels this estimator fuses.
    pub fn mode(&self) -> EstimatorMode {
        match self.core {
            Core::AltOnly(_) => EstimatorMode::AltOnly,
            Core::AltAccel(_) => EstimatorMode::AltAccel,
        }
    }

    /// True once [`initialize`](StateEstimator::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Seeds the filter at the given altitude with zero velocity and
    /// acceleration and the configured initial covariance.
    pub fn initialize(&mut self, altitude_agl: f32) {
        let (x, p) = (
            [altitude_agl, 0.0, 0.0],
            [
                [self.initial_p[0], 0.0, 0.0],
                [0.0, self.initial_p[1], 0.0],
                [0.0, 0.0, self.initial_p[2]],
            ],
        );
        match &mut self.core {
            Core::AltOnly(core) => {
                core.x = x;
                core.p = p;
            }
            Core::AltAccel(core) => {
                core.x = x;
                core.p = p;
            }
        }
        self.last_time = None;
        self.initialized = true;
    }

    /// Returns the filter to the uninitialized state for a new flight.
    /// [`update`](StateEstimator::update) errors again until the next
    /// [`initialize`](StateEstimator::initialize).
    pub fn reset(&mut self) {
        match &mut self.core {
            Core::AltOnly(core) => {
                core.x = [0.0; N];
                core.p = [[0.0; N]; N];
            }
            Core::AltAccel(core) => {
                core.x = [0.0; N];
                core.p = [[0.0; N]; N];
            }
        }
        self.last_time = None;
        self.initialized = false;
    }

    /// One filter tick: predict to `time`, then fuse the measurement.
    ///
    /// `burning` selects the burn-phase process noise and acceleration
    /// decay; pass the phase gate's view of whether the motor is lit.
    pub fn update(
        &mut self,
        time: f32,
        measurement: &Measurement,
        burning: bool,
    ) -> Result<StateEstimate, EstimatorError> {
        if !self.initialized {
            return Err(EstimatorError::Uninitialized);
        }

        let dt = match self.last_time {
            // First tick has no predecessor; assume one nominal interval.
            None => self.nominal_dt,
            Some(last) => (time - last).max(MIN_DT_SECONDS),
        };
        self.last_time = Some(time);

        let (q, decay) = if burning {
            (self.q_burn, self.decay_burn)
        } else {
            (self.q_coast, self.decay_coast)
        };

        match &mut self.core {
            Core::AltOnly(core) => {
                core.predict(dt, decay, &q);
                let z = [measurement.altitude_agl];
                let r = core.r;
                core.update(&z, &r)?;
            }
            Core::AltAccel(core) => {
                core.predict(dt, decay, &q);
                // Missing accel is treated as saturated: gate the channel
                // rather than switching measurement models mid-flight.
                let gated = measurement.accel_saturated || measurement.accel.is_none();
                let accel = measurement.accel.unwrap_or(core.x[2]);
                let z = [measurement.altitude_agl, accel];
                let mut r = core.r;
                if gated {
                    r[1][1] = SATURATED_ACCEL_VARIANCE;
                }
                core.update(&z, &r)?;
            }
        }
        Ok(self.estimate())
    }

    /// Current filtered state.
    pub fn estimate(&self) -> StateEstimate {
        let x = match &self.core {
            Core::AltOnly(core) => &core.x,
            Core::AltAccel(core) => &core.x,
        };
        StateEstimate {
            altitude: x[0],
            velocity: x[1],
            acceleration: x[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn update_before_initialize_is_an_error() {
        let mut est = StateEstimator::new(&config(), EstimatorMode::AltOnly);
        let m = Measurement {
            altitude_agl: 5.0,
            accel: None,
            accel_saturated: false,
        };
        assert_eq!(est.update(0.0, &m, false), Err(EstimatorError::Uninitialized));
    }

    #[test]
    fn initialize_seeds_state() {
        let mut est = StateEstimator::new(&config(), EstimatorMode::AltAccel);
        est.initialize(3.2);
        let s = est.estimate();
        assert_eq!(s.altitude, 3.2);
        assert_eq!(s.velocity, 0.0);
        assert_eq!(s.acceleration, 0.0);
    }

    #[test]
    fn reset_returns_to_uninitialized() {
        let mut est = StateEstimator::new(&config(), EstimatorMode::AltOnly);
        est.initialize(12.0);
        let m = Measurement {
            altitude_agl: 12.5,
            accel: None,
            accel_saturated: false,
        };
        est.update(0.05, &m, false).unwrap();

        est.reset();
        assert!(!est.is_initialized());
        assert_eq!(est.estimate(), StateEstimate::default());
        assert_eq!(est.update(0.10, &m, false), Err(EstimatorError::Uninitialized));

        // A fresh flight starts cleanly from a new initialization.
        est.initialize(0.0);
        let s = est.update(0.05, &m, false).unwrap();
        assert!(s.altitude > 0.0);
    }

    #[test]
    fn tracks_constant_velocity_ramp() {
        let cfg = config();
        let mut est = StateEstimator::new(&cfg, EstimatorMode::AltOnly);
        est.initialize(0.0);

        // Noise-free 30 m/s climb sampled at 20 Hz.
        let dt = 0.05;
        let mut state = StateEstimate::default();
        for i in 1..=100 {
            let t = i as f32 * dt;
            let m = Measurement {
                altitude_agl: 30.0 * t,
                accel: None,
                accel_saturated: false,
            };
            state = est.update(t, &m, false).unwrap();
        }
        assert!((state.velocity - 30.0).abs() < 1.0, "velocity {}", state.velocity);
        assert!((state.altitude - 150.0).abs() < 1.0, "altitude {}", state.altitude);
    }

    #[test]
    fn accel_channel_speeds_up_velocity_tracking() {
        let cfg = config();
        let mut alt_only = StateEstimator::new(&cfg, EstimatorMode::AltOnly);
        let mut alt_accel = StateEstimator::new(&cfg, EstimatorMode::AltAccel);
        alt_only.initialize(0.0);
        alt_accel.initialize(0.0);

        // Constant 20 m/s² climb-out for half a second.
        let dt = 0.05;
        let accel = 20.0;
        let mut v_only = 0.0;
        let mut v_accel = 0.0;
        for i in 1..=10 {
            let t = i as f32 * dt;
            let altitude = 0.5 * accel * t * t;
            let m_base = Measurement {
                altitude_agl: altitude,
                accel: None,
                accel_saturated: false,
            };
            let m_accel = Measurement {
                accel: Some(accel),
                ..m_base
            };
            v_only = alt_only.update(t, &m_base, true).unwrap().velocity;
            v_accel = alt_accel.update(t, &m_accel, true).unwrap().velocity;
        }
        let truth = accel * 0.5;
        assert!(
            (v_accel - truth).abs() < (v_only - truth).abs(),
            "accel-aided {} vs alt-only {} (truth {})",
            v_accel,
            v_only,
            truth
        );
    }

    #[test]
    fn saturated_accel_is_gated_for_one_tick() {
        let cfg = config();
        let mut est = StateEstimator::new(&cfg, EstimatorMode::AltAccel);
        est.initialize(0.0);

        // Settle the filter on a gentle climb first.
        for i in 1..=20 {
            let t = i as f32 * 0.05;
            let m = Measurement {
                altitude_agl: 5.0 * t,
                accel: Some(0.0),
                accel_saturated: false,
            };
            est.update(t, &m, false).unwrap();
        }
        let before = est.estimate();

        // A clipped full-scale reading must barely move the accel state.
        let m = Measurement {
            altitude_agl: before.altitude + 5.0 * 0.05,
            accel: Some(160.0),
            accel_saturated: true,
        };
        let after = est.update(1.05, &m, false).unwrap();
        assert!(
            (after.acceleration - before.acceleration).abs() < 0.5,
            "gated update moved acceleration from {} to {}",
            before.acceleration,
            after.acceleration
        );

        // Next tick the channel trusts the sensor again.
        let m = Measurement {
            altitude_agl: after.altitude + 5.0 * 0.05,
            accel: Some(-9.0),
            accel_saturated: false,
        };
        let restored = est.update(1.10, &m, false).unwrap();
        assert!(restored.acceleration < after.acceleration - 1.0);
    }

    #[test]
    fn missing_accel_behaves_like_saturated() {
        let cfg = config();
        let mut est = StateEstimator::new(&cfg, EstimatorMode::AltAccel);
        est.initialize(0.0);
        let m = Measurement {
            altitude_agl: 0.1,
            accel: None,
            accel_saturated: false,
        };
        // Must not error and must not inject a phantom acceleration.
        let s = est.update(0.05, &m, false).unwrap();
        assert!(s.acceleration.abs() < 0.1);
    }

    #[test]
    fn non_monotonic_timestamps_are_floored() {
        let cfg = config();
        let mut est = StateEstimator::new(&cfg, EstimatorMode::AltOnly);
        est.initialize(0.0);
        let m = Measurement {
            altitude_agl: 1.0,
            accel: None,
            accel_saturated: false,
        };
        est.update(0.05, &m, false).unwrap();
        // Repeated timestamp: dt floors to MIN_DT_SECONDS, no NaN/panic.
        let s = est.update(0.05, &m, false).unwrap();
        assert!(s.altitude.is_finite());
        assert!(s.velocity.is_finite());
    }
}
