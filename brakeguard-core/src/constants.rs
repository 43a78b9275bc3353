//! Physical and Numerical Constants for the Control Core
//!
//! Values used by the altitude conversion, the state estimator, and the
//! apogee predictor. Tuning constants that vary per rocket live in
//! [`crate::config::Config`]; only quantities that are genuinely fixed
//! belong here.

// ===== FUNDAMENTAL PHYSICS CONSTANTS =====

/// Standard gravitational acceleration (m/s²).
///
/// Used by the apogee predictor's drag integration and the replay
/// tooling's g-to-m/s² saturation threshold conversion.
pub const GRAVITY_M_PER_S2: f32 = 9.81;

/// Standard atmospheric pressure at sea level (Pa).
///
/// Source: International Standard Atmosphere (ISA)
pub const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;

/// Standard sea-level temperature (K).
///
/// Source: International Standard Atmosphere (ISA)
pub const SEA_LEVEL_TEMPERATURE_K: f32 = 288.15;

/// Tropospheric temperature lapse rate (K/m).
///
/// Temperature drop per meter of altitude, valid up to ~11 km.
pub const TEMPERATURE_LAPSE_RATE_K_PER_M: f32 = 0.0065;

/// Specific gas constant for dry air (J/(kg·K)).
pub const GAS_CONSTANT_DRY_AIR: f32 = 287.05;

// ===== BAROMETRIC ALTITUDE CONVERSION =====

/// Scale constant of the barometric altitude formula (m).
///
/// `h = 44330 · (1 − (p/p0)^BAROMETRIC_EXPONENT)` gives altitude above
/// the reference pressure `p0` for near-ground flight.
pub const BAROMETRIC_SCALE_M: f32 = 44_330.0;

/// Exponent of the barometric altitude formula (dimensionless).
///
/// Equals `R·L/(g·M)` for the standard atmosphere, ≈ 0.1903.
pub const BAROMETRIC_EXPONENT: f32 = 0.1903;

/// Lower bound of the plausible converted-altitude band (m AGL).
///
/// Readings below this are flagged suspicious but still returned.
pub const SUSPICIOUS_ALTITUDE_MIN_M: f32 = -10.0;

/// Upper bound of the plausible converted-altitude band (m AGL).
pub const SUSPICIOUS_ALTITUDE_MAX_M: f32 = 1000.0;

// ===== ESTIMATOR NUMERICS =====

/// Smallest admissible tick interval (s).
///
/// Timestamps closer together than this are floored to avoid a
/// division by zero in the derivative and state-transition terms.
pub const MIN_DT_SECONDS: f32 = 1e-6;

/// Measurement variance substituted for a saturated acceleration
/// channel (m²/s⁴).
///
/// Large enough that the corresponding Kalman gain collapses to ~0 for
/// the gated tick, without re-initializing the filter.
pub const SATURATED_ACCEL_VARIANCE: f32 = 1e10;

// ===== CONTROLLER BOUNDS =====

/// Maximum number of integral-window samples the PID strategies retain.
///
/// Covers a 25 s trailing window at a 20 Hz control rate; windows that
/// would exceed this are truncated to the newest samples.
pub const PID_WINDOW_CAPACITY: usize = 512;

/// Iterations of golden-section search used by the optimizer strategy.
///
/// Shrinks the [0, 1] deployment bracket below 1e-4, well under the
/// mechanical resolution of the brake actuator.
pub const OPTIMIZER_ITERATIONS: usize = 40;
