//! Conversions between the logical 0..=90 protocol range and physical servo angles.
//!
//! Mapping is integer linear interpolation with truncating division, the same
//! convention hobby-servo firmware uses for `map()`. Inputs outside the declared
//! domain are extrapolated, not clamped.
//!
//! ```rust
//! use throttle_envoy::calibration::{SERVO_MAX_POSITION, SERVO_MIN_POSITION};
//! use throttle_envoy::position::{logical_to_physical, physical_to_logical};
//!
//! assert_eq!(logical_to_physical(0), SERVO_MIN_POSITION);
//! assert_eq!(logical_to_physical(90), SERVO_MAX_POSITION);
//! assert_eq!(physical_to_logical(logical_to_physical(45)), 45);
//! ```

use core::f32::consts::FRAC_2_PI;

use crate::calibration::{CALIBRATION, SATURATION_CUTOFF, SATURATION_STEEPNESS};

/// Linearly map `value` from `in_min..=in_max` onto `out_min..=out_max`.
///
/// Computed in 128-bit; the division truncates toward zero. Results that do not
/// fit in an `i32` saturate at its bounds. A degenerate input range maps
/// everything to `out_min`.
#[must_use]
pub const fn map_range(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let in_span = in_max as i128 - in_min as i128;
    if in_span == 0 {
        return out_min;
    }
    let out_span = out_max as i128 - out_min as i128;
    let mapped = (value as i128 - in_min as i128) * out_span / in_span + out_min as i128;
    saturate_to_i32(mapped)
}

const fn saturate_to_i32(value: i128) -> i32 {
    if value > i32::MAX as i128 {
        i32::MAX
    } else if value < i32::MIN as i128 {
        i32::MIN
    } else {
        value as i32
    }
}

/// Map a logical position (0..=90) to the calibrated physical servo angle.
#[must_use]
pub const fn logical_to_physical(logical: i32) -> i32 {
    CALIBRATION.logical_to_physical(logical)
}

/// Map a physical servo angle back to a logical position (0..=90).
#[must_use]
pub const fn physical_to_logical(physical: i32) -> i32 {
    CALIBRATION.physical_to_logical(physical)
}

/// Compress a control input into `[-1.0, 1.0]` with a smooth S-curve.
///
/// Returns -1.0 below `-SATURATION_CUTOFF`, 1.0 above `SATURATION_CUTOFF`, and
/// `atan(SATURATION_STEEPNESS * value) * 2/π` in between.
///
/// Not used by the default command path.
#[must_use]
pub fn saturate(value: f32) -> f32 {
    saturate_with(value, SATURATION_CUTOFF, SATURATION_STEEPNESS)
}

/// [`saturate`] with an explicit cutoff and steepness.
#[must_use]
pub fn saturate_with(value: f32, cutoff: f32, steepness: f32) -> f32 {
    if value < -cutoff {
        return -1.0;
    }
    if value > cutoff {
        return 1.0;
    }
    libm::atanf(steepness * value) * FRAC_2_PI
}
