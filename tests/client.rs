#![allow(missing_docs)]
//! Host-level tests for the bus-master client against an in-process device.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};
use throttle_envoy::Error;
use throttle_envoy::calibration::{CALIBRATION, I2C_ADDRESS};
use throttle_envoy::client::ServoClient;
use throttle_envoy::command_buffer::{Command, CommandBuffer, ENCODED_LEN, ErrorCode};
use throttle_envoy::controller::ServoController;

/// Routes writes to `on_receive` and reads to `on_request`, like the slave task does.
struct Loopback<'a> {
    controller: &'a ServoController,
    address: SevenBitAddress,
    writes: usize,
}

impl<'a> Loopback<'a> {
    fn new(controller: &'a ServoController) -> Self {
        Self {
            controller,
            address: I2C_ADDRESS,
            writes: 0,
        }
    }
}

impl ErrorType for Loopback<'_> {
    type Error = ErrorKind;
}

impl I2c for Loopback<'_> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    self.writes += 1;
                    self.controller.on_receive(*bytes);
                }
                Operation::Read(bytes) => {
                    let response = self.controller.on_request();
                    let len = bytes.len().min(ENCODED_LEN);
                    bytes[..len].copy_from_slice(&response[..len]);
                }
            }
        }
        Ok(())
    }
}

/// A device that always answers with the same buffer.
struct Canned(CommandBuffer);

impl ErrorType for Canned {
    type Error = ErrorKind;
}

impl I2c for Canned {
    fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            if let Operation::Read(bytes) = operation {
                bytes.copy_from_slice(&self.0.encode());
            }
        }
        Ok(())
    }
}

#[test]
fn set_then_get_round_trips_through_the_device() {
    let controller = ServoController::new(CALIBRATION);
    let mut client = ServoClient::new(Loopback::new(&controller));

    client.set_servo_position(45).unwrap();
    assert_eq!(controller.servo_position(), 67);
    assert_eq!(client.get_servo_position().unwrap(), 45);

    let bus = client.release();
    assert_eq!(bus.writes, 2);
}

#[test]
fn set_clamps_to_logical_range() {
    let controller = ServoController::new(CALIBRATION);
    let mut client = ServoClient::new(Loopback::new(&controller));

    client.set_servo_position(500).unwrap();
    assert_eq!(controller.servo_position(), 118);
    assert_eq!(client.get_servo_position().unwrap(), 90);

    client.set_servo_position(-20).unwrap();
    assert_eq!(controller.servo_position(), 16);
    assert_eq!(client.get_servo_position().unwrap(), 0);
}

#[test]
fn call_returns_the_raw_response() {
    let controller = ServoController::new(CALIBRATION);
    let mut client = ServoClient::new(Loopback::new(&controller));

    let mut request = CommandBuffer::zeroed();
    request.set_command(Command::Unrecognized(42));
    request.set_param_u32(3, 7).unwrap();

    let response = client.call(&request).unwrap();
    assert_eq!(response, request);
}

#[test]
fn wrong_address_is_a_bus_error() {
    let controller = ServoController::new(CALIBRATION);
    let mut client = ServoClient::with_address(Loopback::new(&controller), 0x09);

    match client.get_servo_position() {
        Err(Error::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))) => {}
        other => panic!("expected address NACK, got {other:?}"),
    }
    assert_eq!(client.release().writes, 0);
}

#[test]
fn error_response_surfaces_code_and_message() {
    let mut response = CommandBuffer::zeroed();
    response.set_error(ErrorCode::new(-3).unwrap(), "servo stalled");
    let mut client = ServoClient::new(Canned(response));

    match client.get_servo_position() {
        Err(Error::Remote { code, message }) => {
            assert_eq!(code, -3);
            assert_eq!(message.as_str(), "servo stalled");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn long_error_message_arrives_truncated() {
    let mut response = CommandBuffer::zeroed();
    response.set_error(ErrorCode::GENERIC, "abcdefghijklmnopqrstuvwxyz0123456789");
    let mut client = ServoClient::new(Canned(response));

    match client.set_servo_position(10) {
        Err(Error::Remote { code, message }) => {
            assert_eq!(code, -1);
            assert_eq!(message.as_str(), "abcdefghijklmnopqrstuvwxyz0");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn multibyte_error_message_keeps_its_leading_text() {
    let mut response = CommandBuffer::zeroed();
    response.set_error(ErrorCode::GENERIC, "servo stalled at position é!");
    let mut client = ServoClient::new(Canned(response));

    match client.get_servo_position() {
        Err(Error::Remote { code, message }) => {
            assert_eq!(code, -1);
            assert_eq!(message.as_str(), "servo stalled at position ");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn malformed_error_text_keeps_valid_prefix() {
    let mut bytes = [0u8; ENCODED_LEN];
    bytes[0] = 0xfe; // -2
    bytes[1..8].copy_from_slice(b"jam \xe2\x82 ");
    let response = CommandBuffer::decode(&bytes).unwrap();
    let mut client = ServoClient::new(Canned(response));

    match client.set_servo_position(30) {
        Err(Error::Remote { code, message }) => {
            assert_eq!(code, -2);
            assert_eq!(message.as_str(), "jam ");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}
