use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DeviceError;
use crate::config::LinkConfig;
use crate::protocol::FrameLayout;
use crate::serial::{Connector, PortInfo, SerialLink, SerialPortConnector};

/// Supported board families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "microbit")]
    Microbit,
    #[serde(rename = "wiseXboard")]
    WiseXboard,
    #[serde(rename = "wiseXboardPremium")]
    WiseXboardPremium,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Microbit, DeviceKind::WiseXboard, DeviceKind::WiseXboardPremium];

    pub fn descriptor(&self) -> &'static DeviceDescriptor {
        match self {
            DeviceKind::Microbit => &super::microbit::DESCRIPTOR,
            DeviceKind::WiseXboard => &super::wise_xboard::DESCRIPTOR,
            DeviceKind::WiseXboardPremium => &super::wise_xboard_premium::DESCRIPTOR,
        }
    }

    pub fn id(&self) -> &'static str {
        self.descriptor().id
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DeviceKind {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| DeviceError::UnknownDevice(s.to_string()))
    }
}

/// Static wiring of one board family: identity, line settings, frame layout
/// and the port metadata it is recognised by.
#[derive(Debug)]
pub struct DeviceDescriptor {
    pub kind: DeviceKind,
    pub id: &'static str,
    pub baud_rate: u32,
    pub layout: FrameLayout,
    /// Manufacturer string reported by the board's USB bridge.
    pub manufacturer: &'static str,
    /// Whether reads tolerate corrupted frames with bounded retry.
    pub noisy: bool,
}

impl DeviceDescriptor {
    pub fn is_match(&self, port: &PortInfo) -> bool {
        port.manufacturer.as_deref() == Some(self.manufacturer)
    }

    pub fn delimiter(&self) -> Option<&'static [u8]> {
        self.layout.delimiter
    }

    /// Link to the serial device at `path`, not yet opened.
    pub fn link(&self, path: &str, config: LinkConfig) -> SerialLink {
        let baud_rate = config.baud_rate.unwrap_or(self.baud_rate);
        self.link_with(SerialPortConnector::new(path, baud_rate), config)
    }

    /// Link over an arbitrary transport, framed for this family. Not yet opened.
    pub fn link_with(&self, connector: impl Connector + 'static, config: LinkConfig) -> SerialLink {
        let log = config.log(&format!("boardlink::{}", self.id));
        SerialLink::builder(connector)
            .delimiter(self.delimiter())
            .config(config)
            .log(log)
            .build()
    }
}
