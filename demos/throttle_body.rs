//! Throttle body firmware: I2C slave at 0x08 on GPIO 5 (SCL) / GPIO 4 (SDA),
//! servo signal on GPIO 3.
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, future, panic};
use embassy_executor::Spawner;
use embassy_rp::pwm::Pwm;
use throttle_envoy::{
    Result,
    servo::{SERVO_MAX_US_DEFAULT, SERVO_MIN_US_DEFAULT, Servo},
    throttle_body::{ThrottleBody, ThrottleBodyStatic},
};
use {defmt::info, defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // GPIO 3 → PWM slice 1, channel B
    let pwm = Pwm::new_output_b(p.PWM_SLICE1, p.PIN_3, Default::default());
    let servo = Servo::new_output_b(pwm, SERVO_MIN_US_DEFAULT, SERVO_MAX_US_DEFAULT);

    static THROTTLE_BODY_STATIC: ThrottleBodyStatic = ThrottleBody::new_static();
    let throttle_body =
        ThrottleBody::new(&THROTTLE_BODY_STATIC, p.I2C0, p.PIN_5, p.PIN_4, servo, spawner)?;

    info!(
        "Throttle body ready, servo at {} degrees",
        throttle_body.servo_position()
    );

    future::pending().await
}
