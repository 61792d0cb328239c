#![allow(missing_docs)]
//! Host-level tests for the receive/request dispatcher.

use throttle_envoy::calibration::{CALIBRATION, Calibration, SERVO_STARTUP_POSITION};
use throttle_envoy::command_buffer::{
    Command, CommandBuffer, ENCODED_LEN, ErrorCode, PARAM_SLOTS,
};
use throttle_envoy::controller::{BusEvent, BusReply, Received, ServoController};

fn set_request(logical: i32) -> [u8; ENCODED_LEN] {
    let mut request = CommandBuffer::new(Command::SetServoPosition);
    request.set_param_i32(0, logical).unwrap();
    request.encode()
}

fn get_request() -> [u8; ENCODED_LEN] {
    CommandBuffer::new(Command::GetServoPosition).encode()
}

#[test]
fn starts_at_startup_position_with_zeroed_buffer() {
    let controller = ServoController::new(CALIBRATION);
    assert_eq!(controller.servo_position(), SERVO_STARTUP_POSITION);
    assert_eq!(controller.on_request(), [0u8; ENCODED_LEN]);
    assert_eq!(controller.response(), CommandBuffer::zeroed());
}

#[test]
fn set_then_get_reports_the_same_logical_position() {
    let controller = ServoController::new(CALIBRATION);

    assert_eq!(
        controller.on_receive(&set_request(45)),
        Received::ServoPositionSet {
            logical: 45,
            physical: 67
        }
    );
    assert_eq!(controller.servo_position(), 67);

    assert_eq!(
        controller.on_receive(&get_request()),
        Received::ServoPositionReported { logical: 45 }
    );
    let response = CommandBuffer::decode(&controller.on_request()).unwrap();
    assert_eq!(response.command(), Command::NoError);
    assert_eq!(response.param_i32(0).unwrap(), 45);
    assert!(response.params()[4..].iter().all(|&byte| byte == 0));
}

#[test]
fn set_response_is_a_cleared_buffer() {
    let controller = ServoController::new(CALIBRATION);
    let mut request = CommandBuffer::new(Command::SetServoPosition);
    for slot in 0..PARAM_SLOTS {
        request.set_param_i32(slot, 90).unwrap();
    }

    controller.on_receive(&request.encode());

    assert_eq!(controller.on_request(), [0u8; ENCODED_LEN]);
    assert_eq!(controller.servo_position(), 118);
}

#[test]
fn set_endpoints_reach_calibrated_limits() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(0));
    assert_eq!(controller.servo_position(), 16);
    controller.on_receive(&set_request(90));
    assert_eq!(controller.servo_position(), 118);
}

#[test]
fn set_out_of_range_is_extrapolated() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(100));
    assert_eq!(controller.servo_position(), 129);
    assert_eq!(controller.logical_position(), 99);
}

#[test]
fn wrong_length_writes_leave_state_unchanged() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(30));
    let position = controller.servo_position();
    let buffer = controller.on_request();

    for len in [0, 1, 16, 31, 33] {
        let mut bytes = vec![0u8; len];
        if let Some(tag) = bytes.first_mut() {
            *tag = 2;
        }
        assert_eq!(controller.on_receive(&bytes), Received::Dropped { len });
        assert_eq!(controller.servo_position(), position);
        assert_eq!(controller.on_request(), buffer);
    }
}

#[test]
fn unknown_tag_keeps_received_bytes_and_position() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(20));
    let position = controller.servo_position();

    let mut request = CommandBuffer::zeroed();
    request.set_command(Command::Unrecognized(99));
    request.set_param_i32(0, 45).unwrap();
    let bytes = request.encode();

    assert_eq!(controller.on_receive(&bytes), Received::Ignored { tag: 99 });
    assert_eq!(controller.servo_position(), position);
    assert_eq!(controller.on_request(), bytes);
}

#[test]
fn reserved_bytes_are_not_echoed() {
    let controller = ServoController::new(CALIBRATION);
    let mut bytes = [0u8; ENCODED_LEN];
    bytes[0] = 99;
    bytes[29..].copy_from_slice(&[0xaa; 3]);

    controller.on_receive(&bytes);

    let response = controller.on_request();
    assert_eq!(response[0], 99);
    assert_eq!(&response[29..], &[0; 3]);
}

#[test]
fn error_and_no_error_tags_are_ignored() {
    let controller = ServoController::new(CALIBRATION);

    let mut error = CommandBuffer::zeroed();
    error.set_error(ErrorCode::GENERIC, "from master");
    assert_eq!(controller.on_receive(&error.encode()), Received::Ignored { tag: -1 });
    assert_eq!(controller.response(), error);

    let no_error = CommandBuffer::new(Command::NoError).encode();
    assert_eq!(controller.on_receive(&no_error), Received::Ignored { tag: 0 });
    assert_eq!(controller.servo_position(), SERVO_STARTUP_POSITION);
}

#[test]
fn get_reports_startup_position_before_any_set() {
    let controller = ServoController::new(CALIBRATION);
    // 90 physical maps back to (90 - 16) * 90 / 102 = 65.
    assert_eq!(
        controller.on_receive(&get_request()),
        Received::ServoPositionReported { logical: 65 }
    );
    let response = CommandBuffer::decode(&controller.on_request()).unwrap();
    assert_eq!(response.param_i32(0).unwrap(), 65);
}

#[test]
fn response_only_changes_on_a_valid_write() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&get_request());
    let first = controller.on_request();
    assert_eq!(controller.on_request(), first);
    assert_eq!(controller.on_request(), first);
}

#[test]
fn custom_calibration_is_used_for_mapping() {
    let calibration = Calibration::new(0, 180).with_startup_position(0);
    let controller = ServoController::new(calibration);
    assert_eq!(controller.servo_position(), 0);
    assert_eq!(controller.calibration(), &calibration);

    controller.on_receive(&set_request(45));
    assert_eq!(controller.servo_position(), 90);
}

#[test]
fn bus_write_dispatches_without_responding() {
    let controller = ServoController::new(CALIBRATION);
    let reply = controller.on_bus_event(BusEvent::Write(&set_request(45)));

    assert_eq!(
        reply,
        BusReply {
            received: Some(Received::ServoPositionSet {
                logical: 45,
                physical: 67
            }),
            response: None,
        }
    );
    assert_eq!(controller.servo_position(), 67);
}

#[test]
fn bus_read_responds_with_resident_buffer_only() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&get_request());
    let position = controller.servo_position();

    let reply = controller.on_bus_event(BusEvent::Read);

    assert_eq!(reply.received, None);
    assert_eq!(reply.response, Some(controller.on_request()));
    assert_eq!(controller.servo_position(), position);
}

#[test]
fn bus_write_read_responds_with_the_fresh_result() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(90));

    let reply = controller.on_bus_event(BusEvent::WriteRead(&get_request()));

    assert_eq!(reply.received, Some(Received::ServoPositionReported { logical: 90 }));
    let response = CommandBuffer::decode(&reply.response.unwrap()).unwrap();
    assert_eq!(response.command(), Command::NoError);
    assert_eq!(response.first_param_i32(), 90);
}

#[test]
fn bus_general_call_is_never_dispatched() {
    let controller = ServoController::new(CALIBRATION);
    let buffer = controller.on_request();

    let reply = controller.on_bus_event(BusEvent::GeneralCall(&set_request(0)));

    assert_eq!(
        reply,
        BusReply {
            received: Some(Received::Dropped { len: ENCODED_LEN }),
            response: None,
        }
    );
    assert_eq!(controller.servo_position(), SERVO_STARTUP_POSITION);
    assert_eq!(controller.on_request(), buffer);
}

#[test]
fn bus_overrun_is_dropped() {
    let controller = ServoController::new(CALIBRATION);
    controller.on_receive(&set_request(10));
    let position = controller.servo_position();
    let buffer = controller.on_request();

    let reply = controller.on_bus_event(BusEvent::Overrun { len: 33 });

    assert_eq!(reply.received, Some(Received::Dropped { len: 33 }));
    assert_eq!(reply.response, None);
    assert_eq!(controller.servo_position(), position);
    assert_eq!(controller.on_request(), buffer);
}
