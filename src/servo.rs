//! A PWM driver for the throttle body's hobby servo.
//!
//! See [`Servo`] for usage.

use defmt::info;
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pwm::{Config, Pwm};

use crate::actuation::Actuator;

const SERVO_PERIOD_US: u16 = 20_000; // 20 ms

/// Default minimum pulse width for hobby servos (microseconds).
pub const SERVO_MIN_US_DEFAULT: u16 = 500;

/// Default maximum pulse width for hobby servos (microseconds).
pub const SERVO_MAX_US_DEFAULT: u16 = 2_500;

/// Full mechanical travel of a hobby servo (degrees).
pub const SERVO_MAX_DEGREES: u16 = 180;

/// A hobby servo on channel B of a PWM slice.
///
/// # Example
/// ```rust,no_run
/// # #![no_std]
/// # #![no_main]
/// use throttle_envoy::servo::{SERVO_MAX_US_DEFAULT, SERVO_MIN_US_DEFAULT, Servo};
/// # use core::panic::PanicInfo;
/// # #[panic_handler]
/// # fn panic(_info: &PanicInfo) -> ! { loop {} }
/// async fn example(p: embassy_rp::Peripherals) {
///     // GPIO 3 is channel B of PWM slice 1.
///     let pwm = embassy_rp::pwm::Pwm::new_output_b(p.PWM_SLICE1, p.PIN_3, Default::default());
///     let mut servo = Servo::new_output_b(pwm, SERVO_MIN_US_DEFAULT, SERVO_MAX_US_DEFAULT);
///
///     servo.set_degrees(45);
/// }
/// ```
pub struct Servo<'d> {
    pwm: Pwm<'d>,
    cfg: Config, // kept so reconfiguring never resets the divider
    top: u16,
    min_us: u16,
    max_us: u16,
}

impl<'d> Servo<'d> {
    /// Create a servo on a PWM output B channel.
    #[must_use]
    pub fn new_output_b(mut pwm: Pwm<'d>, min_us: u16, max_us: u16) -> Self {
        assert!(min_us < max_us, "min_us must be less than max_us");
        let top = SERVO_PERIOD_US - 1; // 19_999 -> 20_000 ticks per frame
        assert!(max_us <= top, "max_us must fit in the PWM frame");

        // One tick per microsecond: integer divider clk_sys / 1 MHz.
        let clk = u64::from(clk_sys_freq());
        let div_int = u8::try_from((clk / 1_000_000).clamp(1, 255)).unwrap_or(u8::MAX);

        let mut cfg = Config::default();
        cfg.top = top;
        cfg.phase_correct = false; // edge-aligned => exact 1 µs steps
        cfg.divider = div_int.into();
        cfg.enable = true;
        pwm.set_config(&cfg);

        info!("servo clk={}Hz div={} top={}", clk, div_int, top);

        let mut servo = Self {
            pwm,
            cfg,
            top,
            min_us,
            max_us,
        };
        servo.center();
        servo
    }

    /// Move to the midpoint of the pulse range.
    fn center(&mut self) {
        self.set_pulse_us(self.min_us + (self.max_us - self.min_us) / 2);
    }

    /// Set position in degrees 0..=180 mapped into `[min_us, max_us]`.
    /// Larger values are clamped to 180.
    pub fn set_degrees(&mut self, degrees: u16) {
        let degrees = degrees.min(SERVO_MAX_DEGREES);
        let span = u32::from(self.max_us - self.min_us);
        let us = u32::from(self.min_us) + u32::from(degrees) * span / u32::from(SERVO_MAX_DEGREES);
        self.set_pulse_us(u16::try_from(us).unwrap_or(self.max_us));
    }

    /// Set the raw pulse width in microseconds. Only the compare register changes.
    fn set_pulse_us(&mut self, us: u16) {
        self.cfg.compare_b = us.min(self.top);
        self.pwm.set_config(&self.cfg);
    }
}

impl Actuator for Servo<'_> {
    /// Angles outside 0..=180 are clamped to the servo's mechanical travel.
    fn move_to(&mut self, degrees: i32) {
        let degrees = degrees.clamp(0, i32::from(SERVO_MAX_DEGREES));
        self.set_degrees(u16::try_from(degrees).unwrap_or(SERVO_MAX_DEGREES));
    }
}
