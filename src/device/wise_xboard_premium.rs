use std::sync::Arc;

use async_trait::async_trait;

use super::{ensure_readable, DeviceControl, DeviceDescriptor, DeviceKind, Result, RetryingReader};
use crate::logging::LinkLog;
use crate::protocol::layout::WISE_XBOARD_PREMIUM;
use crate::protocol::{decode_pins, premium, Packet, PinReading, ProtocolError};
use crate::serial::SerialLink;

pub static DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    kind: DeviceKind::WiseXboardPremium,
    id: "wiseXboardPremium",
    baud_rate: 38400,
    layout: WISE_XBOARD_PREMIUM,
    manufacturer: "Silicon Labs",
    noisy: true,
};

/// Index of the remote-control receiver in the telemetry frame.
const REMOCON_PIN: usize = 6;

/// wiseXboardPremium controller. Telemetry frames carry an XOR checksum and
/// the line is noisy, so every read goes through a [`RetryingReader`].
pub struct WiseXboardPremiumControl {
    link: Arc<SerialLink>,
    reader: RetryingReader,
    log: LinkLog,
}

impl WiseXboardPremiumControl {
    pub fn new(link: Arc<SerialLink>) -> Self {
        let log = link.log().child("control");
        let reader = RetryingReader::new(link.config().retry_attempts, log.child("retry"));
        Self { link, reader, log }
    }

    async fn read_pins_once(&self) -> Result<PinReading> {
        let frame = self.link.read_next().await?;
        if Some(frame.len()) != DESCRIPTOR.layout.expected_len {
            self.log.warn(format_args!("check delimiter, frame {}", hex::encode(&frame)));
        }
        Ok(decode_pins(&DESCRIPTOR.layout, &frame)?)
    }

    async fn read_pins(&self) -> Result<PinReading> {
        ensure_readable(&self.link)?;
        self.reader.read(|| self.read_pins_once()).await
    }

    async fn send(&self, packet: Packet) -> Result<()> {
        ensure_readable(&self.link)?;
        self.link.write(packet.as_bytes()).await?;
        Ok(())
    }

    /// Value of the remote-control receiver.
    pub async fn read_remocon(&self) -> Result<u8> {
        let reading = self.read_pins().await?;
        let value = reading.get(REMOCON_PIN).ok_or(ProtocolError::FrameLength {
            expected: REMOCON_PIN + 1,
            actual: reading.len(),
        })?;
        Ok(value)
    }

    /// Both DC motors; speeds are clamped to [-100, 100].
    pub async fn set_dc_motor_speed(&self, l1: i32, r1: i32, l2: i32, r2: i32) -> Result<()> {
        self.log.debug(format_args!("set_dc_motor_speed l1={} r1={} l2={} r2={}", l1, r1, l2, r2));
        self.send(premium::dc_motor_speed(l1, r1, l2, r2)).await
    }

    pub async fn set_dc_motor1_speed(&self, l1: i32, r1: i32) -> Result<()> {
        self.log.debug(format_args!("set_dc_motor1_speed l1={} r1={}", l1, r1));
        self.send(premium::dc_motor1_speed(l1, r1)).await
    }

    pub async fn set_dc_motor2_speed(&self, l2: i32, r2: i32) -> Result<()> {
        self.log.debug(format_args!("set_dc_motor2_speed l2={} r2={}", l2, r2));
        self.send(premium::dc_motor2_speed(l2, r2)).await
    }

    pub async fn stop_dc_motor(&self) -> Result<()> {
        self.log.debug(format_args!("stop_dc_motor"));
        self.send(premium::stop_dc_motor()).await
    }

    /// pin = [3, 6], angle = [-90, 90], speed = [1, 30]
    pub async fn set_servo_motor_angle(&self, pin: i32, angle: i32, speed: i32) -> Result<()> {
        self.log.debug(format_args!("set_servo_motor_angle pin={} angle={} speed={}", pin, angle, speed));
        self.send(premium::servo_motor_angle(pin, angle, speed)).await
    }

    /// pin = [0, 5]
    pub async fn digital_write(&self, pin: i32, value: i32) -> Result<()> {
        self.log.debug(format_args!("digital_write pin={} value={}", pin, value));
        self.send(premium::digital_write(pin, value)).await
    }

    pub async fn send_key(&self, key: i32) -> Result<()> {
        self.log.debug(format_args!("send_key key={}", key));
        self.send(premium::send_key(key)).await
    }
}

#[async_trait]
impl DeviceControl for WiseXboardPremiumControl {
    fn descriptor(&self) -> &'static DeviceDescriptor {
        &DESCRIPTOR
    }

    fn link(&self) -> &Arc<SerialLink> {
        &self.link
    }

    /// Pins 1 to 7.
    async fn analog_read(&self) -> Result<PinReading> {
        self.read_pins().await
    }
}
