use std::sync::Arc;

use async_trait::async_trait;

use super::{ensure_readable, DeviceControl, DeviceDescriptor, DeviceKind, Result};
use crate::logging::LinkLog;
use crate::protocol::layout::WISE_XBOARD;
use crate::protocol::{decode_pins, xboard, Packet, PinReading};
use crate::serial::SerialLink;

pub static DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    kind: DeviceKind::WiseXboard,
    id: "wiseXboard",
    baud_rate: 38400,
    layout: WISE_XBOARD,
    manufacturer: "Silicon Labs",
    noisy: false,
};

/// wiseXboard controller.
///
/// Motor and servo commands only take effect once the board receives the
/// motion-execute packet, so they are written as a pair under the link's
/// writer lock.
pub struct WiseXboardControl {
    link: Arc<SerialLink>,
    log: LinkLog,
}

impl WiseXboardControl {
    pub fn new(link: Arc<SerialLink>) -> Self {
        let log = link.log().child("control");
        Self { link, log }
    }

    async fn send(&self, packet: Packet) -> Result<()> {
        ensure_readable(&self.link)?;
        self.link.write(packet.as_bytes()).await?;
        Ok(())
    }

    async fn send_and_execute(&self, packet: Packet) -> Result<()> {
        ensure_readable(&self.link)?;
        let execute = xboard::motion_execute();
        self.link.write_packets(&[packet.as_bytes(), execute.as_bytes()]).await?;
        Ok(())
    }

    /// pin = [1, 5]
    pub async fn digital_write(&self, pin: i32, value: i32) -> Result<()> {
        self.log.debug(format_args!("digital_write pin={} value={}", pin, value));
        self.send(xboard::digital_write(pin, value)).await
    }

    pub async fn set_humanoid_motion(&self, index: u8) -> Result<()> {
        self.log.debug(format_args!("set_humanoid_motion index={}", index));
        self.send(xboard::motion(index)).await
    }

    pub async fn stop_dc_motor(&self) -> Result<()> {
        self.log.debug(format_args!("stop_dc_motor"));
        self.send_and_execute(xboard::stop_dc_motor()).await
    }

    /// Speeds are clamped to [-10, 10].
    pub async fn set_dc_motor_speed(&self, l1: i32, r1: i32, l2: i32, r2: i32) -> Result<()> {
        self.log.debug(format_args!("set_dc_motor_speed l1={} r1={} l2={} r2={}", l1, r1, l2, r2));
        self.send_and_execute(xboard::dc_motor_speed(l1, r1, l2, r2)).await
    }

    /// pin = [1, 5], angle = [-90, 90]
    pub async fn set_servo_motor_angle(&self, pin: i32, angle: i32) -> Result<()> {
        self.log.debug(format_args!("set_servo_motor_angle pin={} angle={}", pin, angle));
        self.send_and_execute(xboard::servo_motor_angle(pin, angle)).await
    }
}

#[async_trait]
impl DeviceControl for WiseXboardControl {
    fn descriptor(&self) -> &'static DeviceDescriptor {
        &DESCRIPTOR
    }

    fn link(&self) -> &Arc<SerialLink> {
        &self.link
    }

    /// Pins 1 to 5.
    async fn analog_read(&self) -> Result<PinReading> {
        ensure_readable(&self.link)?;
        let frame = self.link.read_next().await?;
        Ok(decode_pins(&DESCRIPTOR.layout, &frame)?)
    }
}
