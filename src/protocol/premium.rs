//! Outbound packets of the wiseXboardPremium family.
//!
//! ```text
//! ┌────────┬─────────┬────────┬────────────┬────────────┐
//! │ 0x23   │ len     │ opcode │ payload    │ checksum   │
//! │ header │ op+data │        │ (fixed/op) │ XOR 2..n-1 │
//! └────────┴─────────┴────────┴────────────┴────────────┘
//! ```
use super::checksum::Checksum;
use super::packet::{clamp, signed_byte, signed_clamped, Packet};

pub const HEADER: u8 = 0x23;

pub const OP_DIGITAL_WRITE: u8 = 0x80;
pub const OP_SERVO_ANGLE: u8 = 0x81;
pub const OP_DC_MOTOR_SPEED: u8 = 0x82;
pub const OP_STOP_DC_MOTOR: u8 = 0x83;
pub const OP_SEND_KEY: u8 = 0x84;
pub const OP_DC_MOTOR1_SPEED: u8 = 0x85;
pub const OP_DC_MOTOR2_SPEED: u8 = 0x86;

pub const MOTOR_SPEED_LIMIT: i32 = 100;
pub const SERVO_ANGLE_LIMIT: i32 = 90;
pub const SERVO_PINS: (i32, i32) = (3, 6);
pub const SERVO_SPEED: (i32, i32) = (1, 30);
pub const DIGITAL_PINS: (i32, i32) = (0, 5);

/// `[0x23, len, opcode, payload.., xor]` with the XOR taken over opcode and payload.
pub fn packet(opcode: u8, payload: &[u8]) -> Packet {
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.push(HEADER);
    bytes.push((payload.len() + 1) as u8);
    bytes.push(opcode);
    bytes.extend_from_slice(payload);
    bytes.push(0);
    let trailer = bytes.len() - 1;
    Checksum::XorOverRange { start: 2, end: trailer }.seal(&mut bytes, trailer);
    Packet::from_vec(bytes)
}

pub fn dc_motor_speed(l1: i32, r1: i32, l2: i32, r2: i32) -> Packet {
    packet(
        OP_DC_MOTOR_SPEED,
        &[
            signed_clamped(l1, MOTOR_SPEED_LIMIT),
            signed_clamped(r1, MOTOR_SPEED_LIMIT),
            signed_clamped(l2, MOTOR_SPEED_LIMIT),
            signed_clamped(r2, MOTOR_SPEED_LIMIT),
        ],
    )
}

pub fn dc_motor1_speed(l1: i32, r1: i32) -> Packet {
    packet(
        OP_DC_MOTOR1_SPEED,
        &[signed_clamped(l1, MOTOR_SPEED_LIMIT), signed_clamped(r1, MOTOR_SPEED_LIMIT)],
    )
}

pub fn dc_motor2_speed(l2: i32, r2: i32) -> Packet {
    packet(
        OP_DC_MOTOR2_SPEED,
        &[signed_clamped(l2, MOTOR_SPEED_LIMIT), signed_clamped(r2, MOTOR_SPEED_LIMIT)],
    )
}

pub fn stop_dc_motor() -> Packet {
    packet(OP_STOP_DC_MOTOR, &[])
}

pub fn servo_motor_angle(pin: i32, angle: i32, speed: i32) -> Packet {
    packet(
        OP_SERVO_ANGLE,
        &[
            clamp(pin, SERVO_PINS.0, SERVO_PINS.1) as u8,
            signed_clamped(angle, SERVO_ANGLE_LIMIT),
            clamp(speed, SERVO_SPEED.0, SERVO_SPEED.1) as u8,
        ],
    )
}

pub fn digital_write(pin: i32, value: i32) -> Packet {
    packet(
        OP_DIGITAL_WRITE,
        &[clamp(pin, DIGITAL_PINS.0, DIGITAL_PINS.1) as u8, u8::from(value > 0)],
    )
}

pub fn send_key(key: i32) -> Packet {
    packet(OP_SEND_KEY, &[signed_byte(key)])
}
