//! A device abstraction for the throttle body: an I2C slave that drives one servo.
//!
//! See [`ThrottleBody`] for usage.

use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_rp::i2c::{InterruptHandler, SclPin, SdaPin};
use embassy_rp::i2c_slave::{self, I2cSlave};
use embassy_rp::peripherals::I2C0;
use embassy_rp::{Peri, bind_interrupts};
use embassy_time::Delay;
use static_cell::StaticCell;

use crate::Result;
use crate::actuation::ActuationLoop;
use crate::calibration::{CALIBRATION, I2C_ADDRESS};
use crate::command_buffer::{CommandBuffer, ENCODED_LEN};
use crate::controller::{BusEvent, Received, ServoController};
use crate::servo::Servo;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => InterruptHandler<I2C0>;
});

// One spare byte so an exact-length write ends on STOP instead of filling the buffer.
const LISTEN_LEN: usize = ENCODED_LEN + 1;

/// Static resources for [`ThrottleBody`].
pub struct ThrottleBodyStatic {
    controller_cell: StaticCell<ServoController>,
    throttle_body_cell: StaticCell<ThrottleBody>,
}

impl ThrottleBodyStatic {
    /// Create static resources for the throttle body device.
    #[must_use]
    pub const fn new_static() -> Self {
        Self {
            controller_cell: StaticCell::new(),
            throttle_body_cell: StaticCell::new(),
        }
    }
}

/// The throttle body: answers the command buffer protocol on I2C0 and keeps the
/// servo at the last commanded position.
///
/// Creating it spawns two tasks: the I2C slave listener, which runs the
/// [`ServoController`] receive/request handlers, and the actuation loop, which
/// writes the commanded position to the servo every
/// [`LOOP_DELAY`](crate::calibration::LOOP_DELAY).
///
/// # Example
///
/// ```rust,no_run
/// # #![no_std]
/// # #![no_main]
/// # use panic_probe as _;
/// use throttle_envoy::{
///     Result,
///     servo::{SERVO_MAX_US_DEFAULT, SERVO_MIN_US_DEFAULT, Servo},
///     throttle_body::{ThrottleBody, ThrottleBodyStatic},
/// };
///
/// async fn example(spawner: embassy_executor::Spawner) -> Result<()> {
///     let p = embassy_rp::init(Default::default());
///
///     let pwm = embassy_rp::pwm::Pwm::new_output_b(p.PWM_SLICE1, p.PIN_3, Default::default());
///     let servo = Servo::new_output_b(pwm, SERVO_MIN_US_DEFAULT, SERVO_MAX_US_DEFAULT);
///
///     static THROTTLE_BODY_STATIC: ThrottleBodyStatic = ThrottleBody::new_static();
///     let throttle_body =
///         ThrottleBody::new(&THROTTLE_BODY_STATIC, p.I2C0, p.PIN_5, p.PIN_4, servo, spawner)?;
///
///     defmt::info!("servo at {}", throttle_body.servo_position());
///     Ok(())
/// }
/// ```
pub struct ThrottleBody {
    controller: &'static ServoController,
}

impl ThrottleBody {
    /// Create static resources for [`ThrottleBody`].
    #[must_use]
    pub const fn new_static() -> ThrottleBodyStatic {
        ThrottleBodyStatic::new_static()
    }

    /// Start listening on I2C0 at [`I2C_ADDRESS`] and spawn the actuation loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskSpawn`](crate::Error::TaskSpawn) if either task cannot be spawned.
    pub fn new(
        throttle_body_static: &'static ThrottleBodyStatic,
        i2c: Peri<'static, I2C0>,
        scl: Peri<'static, impl SclPin<I2C0>>,
        sda: Peri<'static, impl SdaPin<I2C0>>,
        servo: Servo<'static>,
        spawner: Spawner,
    ) -> Result<&'static Self> {
        let controller: &'static ServoController = throttle_body_static
            .controller_cell
            .init(ServoController::new(CALIBRATION));

        let mut config = i2c_slave::Config::default();
        config.addr = u16::from(I2C_ADDRESS);
        let slave = I2cSlave::new(i2c, scl, sda, Irqs, config);

        spawner.spawn(i2c_slave_task(controller, slave))?;
        spawner.spawn(actuation_task(controller, servo))?;
        info!("ThrottleBody: listening at {=u8:#x}", I2C_ADDRESS);

        Ok(throttle_body_static
            .throttle_body_cell
            .init(Self { controller }))
    }

    /// Last commanded physical servo angle.
    #[must_use]
    pub fn servo_position(&self) -> i32 {
        self.controller.servo_position()
    }

    /// Last commanded position in the logical 0..=90 range.
    #[must_use]
    pub fn logical_position(&self) -> i32 {
        self.controller.logical_position()
    }

    /// The buffer the next master read will receive.
    #[must_use]
    pub fn response(&self) -> CommandBuffer {
        self.controller.response()
    }
}

#[embassy_executor::task]
async fn i2c_slave_task(
    controller: &'static ServoController,
    mut slave: I2cSlave<'static, I2C0>,
) -> ! {
    let mut buffer = [0u8; LISTEN_LEN];
    loop {
        let command = slave.listen(&mut buffer).await;
        let event = match command {
            Ok(i2c_slave::Command::Write(len)) => BusEvent::Write(buffer.get(..len).unwrap_or(&[])),
            Ok(i2c_slave::Command::Read) => BusEvent::Read,
            Ok(i2c_slave::Command::WriteRead(len)) => {
                BusEvent::WriteRead(buffer.get(..len).unwrap_or(&[]))
            }
            Ok(i2c_slave::Command::GeneralCall(len)) => {
                debug!("ThrottleBody: ignoring {}-byte general call", len);
                BusEvent::GeneralCall(buffer.get(..len).unwrap_or(&[]))
            }
            Err(i2c_slave::Error::PartialWrite(len)) => {
                warn!("ThrottleBody: dropping write of at least {} bytes", len);
                BusEvent::Overrun { len }
            }
            Err(err) => {
                warn!("ThrottleBody: I2C error {}", err);
                continue;
            }
        };

        let reply = controller.on_bus_event(event);
        if let Some(received) = reply.received {
            log_received(received);
        }
        if let Some(response) = reply.response {
            match slave.respond_and_fill(&response, 0x00).await {
                Ok(status) => debug!("ThrottleBody: response sent ({})", status),
                Err(err) => warn!("ThrottleBody: response failed {}", err),
            }
        }
    }
}

fn log_received(received: Received) {
    match received {
        Received::Dropped { len } => {
            debug!("ThrottleBody: dropping {}-byte write (expected {})", len, ENCODED_LEN);
        }
        Received::ServoPositionSet { logical, physical } => {
            info!("Setting servo to {} (logical {})", physical, logical);
        }
        Received::ServoPositionReported { logical } => {
            debug!("ThrottleBody: reporting logical position {}", logical);
        }
        Received::Ignored { tag } => debug!("ThrottleBody: ignoring command tag {}", tag),
    }
}

#[embassy_executor::task]
async fn actuation_task(controller: &'static ServoController, servo: Servo<'static>) -> ! {
    info!(
        "ThrottleBody: actuation loop started at {} degrees",
        controller.servo_position()
    );
    ActuationLoop::new(controller, servo, Delay).run().await
}
