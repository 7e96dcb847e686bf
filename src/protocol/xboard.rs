//! Outbound packets of the wiseXboard family.
//!
//! Simple commands are 9 bytes, `X R cmd d0 d1 d2 d3 d4 S`, without checksum.
//! Motion commands are 15 bytes with an additive checksum over bytes 6..14.
use super::checksum::Checksum;
use super::packet::{clamp, signed_clamped, Packet};

pub const CMD_DC_MOTOR: u8 = 0;
pub const CMD_DIGITAL_WRITE: u8 = 2;
pub const CMD_SERVO_ANGLE: u8 = 3;

pub const MOTOR_SPEED_LIMIT: i32 = 10;
pub const SERVO_ANGLE_LIMIT: i32 = 90;
pub const PINS: (i32, i32) = (1, 5);

/// Motion index that makes the board execute the last simple command.
pub const MOTION_EXECUTE: u8 = 2;

const MOTION_TEMPLATE: [u8; 15] = [0xFF, 0xFF, 0x4C, 0x53, 0, 0, 0, 0, 0x30, 0x0C, 0x03, 0, 0, 100, 0];
const MOTION_INDEX_OFFSET: usize = 11;
const MOTION_CHECKSUM_OFFSET: usize = 14;

pub fn simple(cmd: u8, data: [u8; 5]) -> Packet {
    let mut bytes = Vec::with_capacity(9);
    bytes.extend_from_slice(b"XR");
    bytes.push(cmd);
    bytes.extend_from_slice(&data);
    bytes.push(b'S');
    Packet::from_vec(bytes)
}

pub fn motion(index: u8) -> Packet {
    let mut bytes = MOTION_TEMPLATE.to_vec();
    bytes[MOTION_INDEX_OFFSET] = index;
    Checksum::AdditiveOverRange {
        start: 6,
        end: MOTION_CHECKSUM_OFFSET,
    }
    .seal(&mut bytes, MOTION_CHECKSUM_OFFSET);
    Packet::from_vec(bytes)
}

pub fn motion_execute() -> Packet {
    motion(MOTION_EXECUTE)
}

pub fn digital_write(pin: i32, value: i32) -> Packet {
    let pin = clamp(pin, PINS.0, PINS.1) as usize;
    let mut data = [0u8; 5];
    data[pin - 1] = u8::from(value > 0);
    simple(CMD_DIGITAL_WRITE, data)
}

pub fn stop_dc_motor() -> Packet {
    simple(CMD_DC_MOTOR, [0; 5])
}

pub fn dc_motor_speed(l1: i32, r1: i32, l2: i32, r2: i32) -> Packet {
    simple(
        CMD_DC_MOTOR,
        [
            signed_clamped(l1, MOTOR_SPEED_LIMIT),
            signed_clamped(r1, MOTOR_SPEED_LIMIT),
            signed_clamped(l2, MOTOR_SPEED_LIMIT),
            signed_clamped(r2, MOTOR_SPEED_LIMIT),
            0,
        ],
    )
}

pub fn servo_motor_angle(pin: i32, angle: i32) -> Packet {
    simple(
        CMD_SERVO_ANGLE,
        [
            clamp(pin, PINS.0, PINS.1) as u8,
            signed_clamped(angle, SERVO_ANGLE_LIMIT),
            0,
            0,
            0,
        ],
    )
}
