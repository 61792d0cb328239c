//! The periodic loop that pushes the last commanded position to the servo.
//!
//! The loop never branches on state: every cycle it waits the loop delay,
//! writes whatever position the [`ServoController`] holds, then waits the
//! settling delay so the servo is never driven faster than it can respond.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::controller::ServoController;

/// Something that can be moved to a physical angle, such as [`Servo`](crate::servo::Servo).
pub trait Actuator {
    /// Start moving to `degrees`. Returns immediately; the motion itself is asynchronous.
    fn move_to(&mut self, degrees: i32);
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn move_to(&mut self, degrees: i32) {
        (**self).move_to(degrees);
    }
}

/// Rate-limited writer from a [`ServoController`] to an [`Actuator`].
pub struct ActuationLoop<'a, A, D> {
    controller: &'a ServoController,
    actuator: A,
    delay: D,
}

impl<'a, A: Actuator, D: DelayNs> ActuationLoop<'a, A, D> {
    /// Bind a controller to an actuator. Timing comes from the controller's calibration.
    pub const fn new(controller: &'a ServoController, actuator: A, delay: D) -> Self {
        Self {
            controller,
            actuator,
            delay,
        }
    }

    /// Run one cycle: loop delay, write, settling delay.
    pub async fn tick(&mut self) {
        let calibration = self.controller.calibration();
        let (loop_delay, settle_delay) = (calibration.loop_delay, calibration.settle_delay);

        wait(&mut self.delay, loop_delay).await;
        self.actuator.move_to(self.controller.servo_position());
        wait(&mut self.delay, settle_delay).await;
    }

    /// Run forever.
    pub async fn run(mut self) -> ! {
        loop {
            self.tick().await;
        }
    }

    /// Give back the actuator and delay.
    pub fn into_parts(self) -> (A, D) {
        (self.actuator, self.delay)
    }
}

async fn wait<D: DelayNs>(delay: &mut D, duration: Duration) {
    let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
    delay.delay_us(micros).await;
}
