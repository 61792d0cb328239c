//! Compile-time calibration of the throttle body servo and its bus.
//!
//! All values are constants. [`CALIBRATION`] bundles the servo-related ones so the
//! controller and the actuation loop can be built against an alternative calibration
//! in tests.

use embassy_time::Duration;

use crate::position::{map_range, saturate_with};

/// Physical servo angle (degrees) that corresponds to logical position 0.
pub const SERVO_MIN_POSITION: i32 = 16;

/// Physical servo angle (degrees) that corresponds to logical position 90.
pub const SERVO_MAX_POSITION: i32 = 118;

/// Smallest logical position the protocol uses.
pub const LOGICAL_MIN_POSITION: i32 = 0;

/// Largest logical position the protocol uses.
pub const LOGICAL_MAX_POSITION: i32 = 90;

/// Angle a hobby servo reports right after attach, before any command arrives.
pub const SERVO_STARTUP_POSITION: i32 = 90;

/// Delay between actuation loop iterations.
pub const LOOP_DELAY: Duration = Duration::from_millis(100);

/// Settling delay after each write to the servo.
pub const SERVO_SETTLE_DELAY: Duration = Duration::from_millis(15);

/// Magnitude beyond which [`saturate`](crate::position::saturate) returns ±1.
pub const SATURATION_CUTOFF: f32 = 20.0;

/// Steepness of the `atan` response curve inside the cutoff.
pub const SATURATION_STEEPNESS: f32 = 10.0;

/// 7-bit I2C slave address of the throttle body board.
pub const I2C_ADDRESS: u8 = 0x08;

/// I2C bus clock the master is expected to use (Hz).
pub const I2C_BAUD_RATE: u32 = 100_000;

/// The calibration used by the firmware.
pub const CALIBRATION: Calibration = Calibration::new(SERVO_MIN_POSITION, SERVO_MAX_POSITION);

/// Servo calibration: the physical range, loop timing, and saturation curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Physical angle for logical 0.
    pub servo_min_position: i32,
    /// Physical angle for logical 90.
    pub servo_max_position: i32,
    /// Physical angle assumed before the first `SetServoPosition`.
    pub startup_position: i32,
    /// Delay between actuation loop iterations.
    pub loop_delay: Duration,
    /// Settling delay after each write to the servo.
    pub settle_delay: Duration,
    /// Saturation cutoff.
    pub saturation_cutoff: f32,
    /// Saturation steepness.
    pub saturation_steepness: f32,
}

impl Calibration {
    /// Calibration over a physical range, with the default timing and saturation curve.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const`) if `servo_min_position`
    /// is not less than `servo_max_position`.
    #[must_use]
    pub const fn new(servo_min_position: i32, servo_max_position: i32) -> Self {
        assert!(
            servo_min_position < servo_max_position,
            "servo_min_position must be less than servo_max_position"
        );
        Self {
            servo_min_position,
            servo_max_position,
            startup_position: SERVO_STARTUP_POSITION,
            loop_delay: LOOP_DELAY,
            settle_delay: SERVO_SETTLE_DELAY,
            saturation_cutoff: SATURATION_CUTOFF,
            saturation_steepness: SATURATION_STEEPNESS,
        }
    }

    /// Same calibration with a different startup position.
    #[must_use]
    pub const fn with_startup_position(mut self, startup_position: i32) -> Self {
        self.startup_position = startup_position;
        self
    }

    /// Map a logical position (0..=90) to a physical angle. Not clamped.
    #[must_use]
    pub const fn logical_to_physical(&self, logical: i32) -> i32 {
        map_range(
            logical,
            LOGICAL_MIN_POSITION,
            LOGICAL_MAX_POSITION,
            self.servo_min_position,
            self.servo_max_position,
        )
    }

    /// Map a physical angle back to a logical position. Not clamped.
    #[must_use]
    pub const fn physical_to_logical(&self, physical: i32) -> i32 {
        map_range(
            physical,
            self.servo_min_position,
            self.servo_max_position,
            LOGICAL_MIN_POSITION,
            LOGICAL_MAX_POSITION,
        )
    }

    /// Apply this calibration's saturation curve.
    #[must_use]
    pub fn saturate(&self, value: f32) -> f32 {
        saturate_with(value, self.saturation_cutoff, self.saturation_steepness)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        CALIBRATION
    }
}
