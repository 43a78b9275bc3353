//! Standard-Atmosphere Lookup Table
//!
//! ## Motivation
//!
//! The hypsometric altitude conversion needs the ambient temperature at
//! the current altitude. The ISA temperature profile is piecewise linear
//! (constant lapse in the troposphere, isothermal above the tropopause),
//! and the flight computer may lack an FPU, so the profile is stored as a
//! small pre-computed table with linear interpolation rather than being
//! re-derived per tick.
//!
//! ## Physics Background
//!
//! The International Standard Atmosphere models temperature as:
//!
//! ```text
//! T(h) = 288.15 − 0.0065·h          for h ≤ 11 000 m (troposphere)
//! T(h) = 216.65                     for 11 000 m < h ≤ 20 000 m
//! ```
//!
//! The kink at the tropopause is what makes a table preferable to a
//! single closed-form expression.
//!
//! ## Table Design
//!
//! 1 km steps from 0 to 20 km (21 entries, 84 bytes). Amateur airbrake
//! flights stay in the first two entries; the rest of the range costs
//! almost nothing and keeps the table honest for high-altitude use.
//! Inputs outside the range are clamped and a warning is logged.

use crate::macros::log_warn;

/// Altitude step between table entries (m).
const TABLE_STEP_M: f32 = 1000.0;

/// Maximum altitude covered by the table (m).
const TABLE_MAX_M: f32 = 20_000.0;

/// ISA temperature at 1 km intervals from sea level to 20 km (K).
const ISA_TEMPERATURE_K: [f32; 21] = [
    288.15, 281.65, 275.15, 268.65, 262.15, 255.65, 249.15, 242.65, 236.15,
    229.65, 223.15, 216.65, 216.65, 216.65, 216.65, 216.65, 216.65, 216.65,
    216.65, 216.65, 216.65,
];

/// Atmospheric temperature model used by the hypsometric conversion.
///
/// The default implementation is the ISA table below; hosts with a
/// calibrated temperature sensor can substitute their own model.
pub trait Atmosphere {
    /// Ambient temperature at the given altitude above sea level (K).
    fn temperature_at(&self, altitude_m: f32) -> f32;
}

/// ISA temperature profile backed by the pre-computed table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAtmosphere;

impl Atmosphere for StandardAtmosphere {
    fn temperature_at(&self, altitude_m: f32) -> f32 {
        isa_temperature(altitude_m)
    }
}

/// ISA temperature at `altitude_m` (K), linearly interpolated from the
/// table. Altitudes outside [0, 20 000] m are clamped.
pub fn isa_temperature(altitude_m: f32) -> f32 {
    let clamped = altitude_m.clamp(0.0, TABLE_MAX_M);
    if clamped != altitude_m {
        log_warn!(
            "altitude {} m outside atmosphere table, clamped to {} m",
            altitude_m,
            clamped
        );
    }

    let position = clamped / TABLE_STEP_M;
    let index = position as usize;
    if index >= ISA_TEMPERATURE_K.len() - 1 {
        return ISA_TEMPERATURE_K[ISA_TEMPERATURE_K.len() - 1];
    }

    let frac = position - index as f32;
    let lower = ISA_TEMPERATURE_K[index];
    let upper = ISA_TEMPERATURE_K[index + 1];
    lower + (upper - lower) * frac
}
