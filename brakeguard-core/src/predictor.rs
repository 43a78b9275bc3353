//! Closed-Form Apogee Prediction Under Quadratic Drag
//!
//! ## Physics Background
//!
//! During coast the rocket decelerates under gravity plus aerodynamic
//! drag. With drag quadratic in velocity, the remaining altitude gain
//! from state `(y, v)` has a closed form:
//!
//! ```text
//! k  = ½ · ρ · Cd_eff · A
//! Δh = (m / 2k) · ln(1 + k·v² / (m·g))
//! apogee = y + Δh
//! ```
//!
//! where the effective drag coefficient blends the clean airframe with
//! the brake contribution linearly in the deployment fraction:
//!
//! ```text
//! Cd_eff = rocket_cd + airbrake_cd · deployment
//! ```
//!
//! The closed form is exact for constant ρ, Cd and vertical flight; those
//! assumptions hold well over the few hundred meters of a coast. Being a
//! single `ln` call, it is cheap enough that the optimizer strategy can
//! evaluate it dozens of times per tick.
//!
//! ## Edge Cases
//!
//! - `v ≤ 0`: the rocket is already at or past apogee; the prediction is
//!   the current altitude.
//! - Degenerate drag constant (k ≤ 0 from a bad config) or a
//!   non-positive log argument: the prediction is the current altitude,
//!   logged as degenerate.
//! - The result is clamped to be no lower than the current altitude. A
//!   prediction below the rocket is numerically possible with extreme
//!   inputs but physically meaningless, so it is clamped and logged.

use libm::logf;

use crate::config::Config;
use crate::constants::GRAVITY_M_PER_S2;
use crate::macros::log_warn;

/// Predicts the apogee (m AGL) reached from the given state at a fixed
/// airbrake deployment fraction in [0, 1].
pub fn predict_apogee(config: &Config, altitude: f32, velocity: f32, deployment: f32) -> f32 {
    if velocity <= 0.0 {
        return altitude;
    }

    let cd_eff = config.rocket_cd + config.airbrake_cd * deployment.clamp(0.0, 1.0);
    let k = 0.5 * config.air_density * cd_eff * config.reference_area;
    let m = config.burnout_mass;

    if k <= 0.0 {
        log_warn!("degenerate drag constant {}, holding current altitude", k);
        return altitude;
    }
    let log_arg = 1.0 + k * velocity * velocity / (m * GRAVITY_M_PER_S2);
    if log_arg <= 0.0 {
        log_warn!("degenerate prediction argument {}, holding current altitude", log_arg);
        return altitude;
    }

    let apogee = altitude + (m / (2.0 * k)) * logf(log_arg);
    if apogee < altitude {
        log_warn!(
            "apogee prediction {} below current altitude {}, clamping",
            apogee,
            altitude
        );
        return altitude;
    }
    apogee
}
