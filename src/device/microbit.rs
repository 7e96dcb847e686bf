use std::sync::Arc;

use async_trait::async_trait;

use super::{ensure_readable, DeviceControl, DeviceDescriptor, DeviceKind, Result};
use crate::logging::LinkLog;
use crate::protocol::layout::MICROBIT;
use crate::protocol::{decode_pins, PinReading};
use crate::serial::SerialLink;

pub static DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    kind: DeviceKind::Microbit,
    id: "microbit",
    baud_rate: 115200,
    layout: MICROBIT,
    manufacturer: "mbed",
    noisy: false,
};

/// micro:bit running the analog streaming sketch. Read-only.
pub struct MicrobitControl {
    link: Arc<SerialLink>,
    log: LinkLog,
}

impl MicrobitControl {
    pub fn new(link: Arc<SerialLink>) -> Self {
        let log = link.log().child("control");
        Self { link, log }
    }
}

#[async_trait]
impl DeviceControl for MicrobitControl {
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
        let reading = decode_pins(&DESCRIPTOR.layout, &frame)?;
        self.log.debug(format_args!("analog_read {:?}", reading.values()));
        Ok(reading)
    }
}
