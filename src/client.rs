//! The bus-master side of the command buffer protocol.
//!
//! [`ServoClient`] talks to a throttle body over any blocking
//! [`embedded_hal::i2c::I2c`] bus: a Linux I2C adapter on the engine controller,
//! another microcontroller, or a loopback in tests.

use embedded_hal::i2c::{Error as _, I2c, SevenBitAddress};
use heapless::String;

use crate::calibration::{I2C_ADDRESS, LOGICAL_MAX_POSITION, LOGICAL_MIN_POSITION};
use crate::command_buffer::{Command, CommandBuffer, ENCODED_LEN};
use crate::{Error, Result};

/// A bus master for one throttle body.
///
/// Each call is a write of one command buffer followed by a read of the
/// response. A negative response tag becomes [`Error::Remote`].
///
/// # Example
///
/// ```rust,no_run
/// use embedded_hal::i2c::I2c;
/// use throttle_envoy::{Result, client::ServoClient};
///
/// fn open_throttle<I2C: I2c>(bus: I2C) -> Result<i32> {
///     let mut client = ServoClient::new(bus);
///     client.set_servo_position(60)?;
///     client.get_servo_position()
/// }
/// ```
pub struct ServoClient<I2C> {
    bus: I2C,
    address: SevenBitAddress,
}

impl<I2C: I2c> ServoClient<I2C> {
    /// Client for a throttle body at the default [`I2C_ADDRESS`].
    #[must_use]
    pub const fn new(bus: I2C) -> Self {
        Self::with_address(bus, I2C_ADDRESS)
    }

    /// Client for a throttle body at `address`.
    #[must_use]
    pub const fn with_address(bus: I2C, address: SevenBitAddress) -> Self {
        Self { bus, address }
    }

    /// Give back the bus.
    #[must_use]
    pub fn release(self) -> I2C {
        self.bus
    }

    /// Send `request` and return the device's response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bus`] if either transfer fails and [`Error::Remote`] if
    /// the device answers with an error tag.
    pub fn call(&mut self, request: &CommandBuffer) -> Result<CommandBuffer> {
        self.bus
            .write(self.address, &request.encode())
            .map_err(|err| Error::Bus(err.kind()))?;

        let mut bytes = [0u8; ENCODED_LEN];
        self.bus
            .read(self.address, &mut bytes)
            .map_err(|err| Error::Bus(err.kind()))?;

        let response = CommandBuffer::decode(&bytes)?;
        if let Command::Error(code) = response.command() {
            let mut message = String::new();
            // The text view is at most 28 bytes; anything past capacity is dropped.
            for ch in response.text_prefix().chars() {
                if message.push(ch).is_err() {
                    break;
                }
            }
            return Err(Error::Remote {
                code: code.tag(),
                message,
            });
        }
        Ok(response)
    }

    /// Read the servo's logical position (0..=90).
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub fn get_servo_position(&mut self) -> Result<i32> {
        Ok(self
            .call(&CommandBuffer::new(Command::GetServoPosition))?
            .first_param_i32())
    }

    /// Move the servo to a logical position. Values outside 0..=90 are clamped first.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub fn set_servo_position(&mut self, logical: i32) -> Result<()> {
        let mut request = CommandBuffer::new(Command::SetServoPosition);
        request.set_first_param_i32(logical.clamp(LOGICAL_MIN_POSITION, LOGICAL_MAX_POSITION));
        self.call(&request)?;
        Ok(())
    }
}
